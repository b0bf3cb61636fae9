#![allow(clippy::module_inception)]
//! # Quill - in-memory documents with MongoDB-style updates
//!
//! Quill keeps named JSON-like documents in memory and changes them through
//! update patches such as `{"$inc": {"count": 1}}`. A document is either
//! edited silently in place or bound to an observer that is told about every
//! primitive edit, which is what UI data binding needs.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use quill::{doc, Quill};
//! use quill::filter::{all, field};
//!
//! let db = Quill::builder().open()?;
//! let cart = db.document("cart")?.unwrap();
//!
//! cart.set_data(doc! { items: [{ sku: "a", qty: 1 }, { sku: "b", qty: 2 }] })?;
//! cart.update(&field("items.sku").eq("b"), &doc! { "items.$": { "$inc": { qty: 1 } } })?;
//!
//! let big = cart.find_sub(
//!     &all(),
//!     "items",
//!     &field("qty").gt(2),
//!     &quill::document::SubDocumentOptions::new(),
//! )?;
//!
//! // deliver the coalesced change events
//! db.flush();
//! db.close()?;
//! ```
//!
//! ## Events
//!
//! Each mutation publishes `ImmediateChange` synchronously and defers one
//! `Change` per document until the next [Quill::flush]. The database
//! publishes `Create` for new documents and re-publishes each document's
//! `Change`.
//!
//! ## Module Organization
//!
//! - [`collection`] - the [Document] tree, find options, sub-collections
//! - [`common`] - values, paths, event bus, deferred queue, utilities
//! - [`document`] - named documents, their events and the registry
//! - [`errors`] - error types and result definitions
//! - [`filter`] - query filters
//! - [`update`] - update operators, mutation sinks and the patch routine
//! - [`quill`] - the database handle
//! - [`quill_builder`] / [`quill_config`] - configuration

pub mod collection;
pub mod common;
pub mod document;
pub mod errors;
pub mod filter;
pub mod quill;
pub mod quill_builder;
pub mod quill_config;
pub mod update;

pub use collection::Document;
pub use common::Value;
pub use document::{DocumentOptions, DocumentRef, QuillDocument};
pub use errors::{ErrorKind, QuillError, QuillResult};
pub use quill::Quill;
pub use quill_builder::QuillBuilder;
pub use quill_config::QuillConfig;
