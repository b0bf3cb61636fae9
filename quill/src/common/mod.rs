mod constants;
mod deferred;
mod event_bus;
mod path;
mod sort_order;
mod util;
mod value;

pub use constants::*;
pub use deferred::*;
pub use event_bus::*;
pub use path::*;
pub use sort_order::*;
pub use util::*;
pub use value::*;
