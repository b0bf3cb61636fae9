//! The patch pipeline: operators, mutation sinks and the routine that walks
//! a patch against a document tree.

mod apply;
mod observer;
mod operator;
mod sink;
mod update_options;

pub use apply::*;
pub use observer::*;
pub use operator::*;
pub use sink::*;
pub use update_options::*;
