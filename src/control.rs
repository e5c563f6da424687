mod controller;
mod driver;
mod rule;
mod state;

pub use controller::*;
pub use driver::*;
pub use rule::*;
pub use state::*;
