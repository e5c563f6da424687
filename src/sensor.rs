mod kind;
mod poller;
mod reading;
mod source;

pub use kind::*;
pub use poller::*;
pub use reading::*;
pub use source::*;
