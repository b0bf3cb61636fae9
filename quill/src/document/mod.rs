//! Named documents, their events and the registry that hands them out.

mod document_factory;
mod event;
mod quill_document;
mod sub_document;

pub use document_factory::*;
pub use event::*;
pub use quill_document::*;
pub use sub_document::*;
