use crate::collection::Document;
use crate::common::Value;
use crate::errors::QuillResult;
use std::any::Any;
use std::fmt::Display;
use std::ops::Deref;
use std::sync::Arc;

use super::{AllFilter, AndFilter, NotFilter, OrFilter};

/// Trait for implementing filters.
///
/// A `FilterProvider` decides whether a document matches. Implementations
/// must be cheap to share between threads; a [Filter] wraps one in an `Arc`.
pub trait FilterProvider: Any + Send + Sync + Display {
    /// Applies the filter to a document and returns whether it matches.
    fn apply(&self, entry: &Document) -> QuillResult<bool>;

    /// The field this filter reads, if it reads exactly one.
    fn field_name(&self) -> Option<&str> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

/// A query filter for selecting documents.
///
/// Filters compose with [Filter::and], [Filter::or] and [Filter::not].
#[derive(Clone)]
pub struct Filter {
    inner: Arc<dyn FilterProvider>,
}

impl Filter {
    pub fn new<T: FilterProvider + 'static>(inner: T) -> Self {
        Filter {
            inner: Arc::new(inner),
        }
    }

    pub fn and(&self, filter: Filter) -> Self {
        Filter::new(AndFilter::new(vec![self.clone(), filter]))
    }

    pub fn or(&self, filter: Filter) -> Self {
        Filter::new(OrFilter::new(vec![self.clone(), filter]))
    }

    pub fn not(&self) -> Self {
        Filter::new(NotFilter::new(self.clone()))
    }
}

impl Display for Filter {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl std::fmt::Debug for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Filter{}", self.inner)
    }
}

impl Deref for Filter {
    type Target = Arc<dyn FilterProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Creates a filter that matches every document.
pub fn all() -> Filter {
    Filter::new(AllFilter)
}

/// Matches documents satisfying every filter. An empty list matches all.
pub fn and(filters: Vec<Filter>) -> Filter {
    Filter::new(AndFilter::new(filters))
}

/// Matches documents satisfying at least one filter. An empty list matches none.
pub fn or(filters: Vec<Filter>) -> Filter {
    Filter::new(OrFilter::new(filters))
}

pub fn not(filter: Filter) -> Filter {
    Filter::new(NotFilter::new(filter))
}

pub(crate) fn is_all_filter(filter: &Filter) -> bool {
    filter.as_any().is::<AllFilter>()
}

/// Evaluates `predicate` against a field value with array semantics: the
/// whole value is tried first, then every element of an array value.
pub(crate) fn any_match<F>(value: &Value, mut predicate: F) -> QuillResult<bool>
where
    F: FnMut(&Value) -> QuillResult<bool>,
{
    if predicate(value)? {
        return Ok(true);
    }

    if let Value::Array(items) = value {
        for item in items {
            if predicate(item)? {
                return Ok(true);
            }
        }
    }
    Ok(false)
}
