//! Query filters for selecting documents.
//!
//! Filters decide whether a [Document](crate::collection::Document) matches a
//! condition. They select the parent of a sub-document query, the items of an
//! ephemeral sub-collection, and the array elements targeted by a positional
//! update.
//!
//! # Creating Filters
//!
//! ```rust,ignore
//! use quill::filter::{all, field, and};
//!
//! let by_sku = field("sku").eq("a-100");
//! let cheap = field("price").lt(10);
//! let both = by_sku.and(cheap);
//! let tagged = field("tags").eq("sale");        // matches any array element
//! let any_large = field("parts").elem_match(field("size").gte(5));
//! ```
//!
//! # Array fields
//!
//! When a field resolves to an array, comparison filters match if any element
//! satisfies the condition, or if the whole array equals the operand.
//!
//! # Supported Operators
//!
//! - **Equality**: `eq`, `ne`, `exists`
//! - **Comparison**: `gt`, `gte`, `lt`, `lte`
//! - **Pattern**: `regex`
//! - **Array**: `in_array`, `not_in_array`, `elem_match`
//! - **Logical**: `and`, `or`, `not`
//! - **Special**: `all`

mod filter;
mod fluent;

mod basic_filters;
mod logical_filters;
mod pattern_filters;
mod range_filters;

pub(crate) use basic_filters::*;
pub use filter::*;
pub use fluent::*;
pub(crate) use logical_filters::*;
pub(crate) use pattern_filters::*;
pub(crate) use range_filters::*;
