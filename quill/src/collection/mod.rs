mod document;
mod find_options;
mod sub_collection;

pub use document::*;
pub use find_options::*;
pub(crate) use sub_collection::*;
