mod record;
mod sink;

pub use record::*;
pub use sink::*;
