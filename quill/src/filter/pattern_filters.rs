use std::{any::Any, fmt::Display};

use regex::Regex;

use crate::{
    collection::Document,
    common::Value,
    errors::{ErrorKind, QuillError, QuillResult},
};

use super::{any_match, Filter, FilterProvider};

/// Matches documents whose string field matches a regular expression.
///
/// The pattern is compiled once at construction. An invalid pattern is
/// logged there and reported as a [ErrorKind::FilterError] when applied.
pub(crate) struct RegexFilter {
    field_name: String,
    field_value: String,
    pattern: Option<Regex>,
}

impl RegexFilter {
    pub(crate) fn new(field_name: String, field_value: String) -> Self {
        let pattern = match Regex::new(&field_value) {
            Ok(regex) => Some(regex),
            Err(e) => {
                log::error!("Invalid regex pattern '{}': {}", field_value, e);
                None
            }
        };

        RegexFilter {
            field_name,
            field_value,
            pattern,
        }
    }
}

impl Display for RegexFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} =~ {})", self.field_name, self.field_value)
    }
}

impl FilterProvider for RegexFilter {
    fn apply(&self, entry: &Document) -> QuillResult<bool> {
        let pattern = match &self.pattern {
            Some(p) => p,
            None => {
                log::error!("Invalid regex pattern for filter {}", self);
                return Err(QuillError::new(
                    &format!("Invalid regex pattern {}", self.field_value),
                    ErrorKind::FilterError,
                ));
            }
        };

        let value = entry.get(&self.field_name)?;
        any_match(&value, |v| {
            Ok(v.as_string().map(|s| pattern.is_match(s)).unwrap_or(false))
        })
    }

    fn field_name(&self) -> Option<&str> {
        Some(&self.field_name)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Matches documents whose array field holds at least one element that
/// satisfies the inner filter.
///
/// Document elements are tested directly. Scalar elements are wrapped in a
/// document under the key `$`, so `field("$").gt(3)` tests the element itself.
pub(crate) struct ElementMatchFilter {
    field_name: String,
    filter: Filter,
}

impl ElementMatchFilter {
    pub(crate) fn new(field_name: String, filter: Filter) -> Self {
        ElementMatchFilter { field_name, filter }
    }

    fn match_element(&self, value: &Value) -> QuillResult<bool> {
        match value {
            Value::Document(doc) => self.filter.apply(doc),
            _ => {
                let mut doc = Document::new();
                doc.insert("$", value.clone());
                self.filter.apply(&doc)
            }
        }
    }
}

impl Display for ElementMatchFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} elemMatch {})", self.field_name, self.filter)
    }
}

impl FilterProvider for ElementMatchFilter {
    fn apply(&self, entry: &Document) -> QuillResult<bool> {
        if is_element_match_filter(&self.filter) {
            log::error!(
                "ElementMatchFilter {} cannot have another ElementMatchFilter {}",
                self,
                self.filter
            );
            return Err(QuillError::new(
                "ElementMatchFilter cannot have another ElementMatchFilter",
                ErrorKind::FilterError,
            ));
        }

        match entry.get(&self.field_name)? {
            Value::Array(items) => {
                for item in &items {
                    if self.match_element(item)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            _ => Ok(false),
        }
    }

    fn field_name(&self) -> Option<&str> {
        Some(&self.field_name)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(crate) fn is_element_match_filter(filter: &Filter) -> bool {
    filter.as_any().is::<ElementMatchFilter>()
}

#[cfg(test)]
mod tests {
    use crate::doc;
    use crate::errors::ErrorKind;
    use crate::filter::field;

    #[test]
    fn test_regex() {
        let doc = doc! { email: "ada@example.com", aliases: ["x@test.org", "y@example.com"] };
        assert!(field("email").regex(r".*@example\.com$").apply(&doc).unwrap());
        assert!(!field("email").regex(r"^bob").apply(&doc).unwrap());
        assert!(field("aliases").regex(r"@test\.org$").apply(&doc).unwrap());
        assert!(!field("missing").regex(".*").apply(&doc).unwrap());
    }

    #[test]
    fn test_invalid_regex_errors_on_apply() {
        let doc = doc! { email: "a" };
        let err = field("email").regex("(").apply(&doc).unwrap_err();
        assert_eq!(*err.kind(), ErrorKind::FilterError);
    }

    #[test]
    fn test_elem_match_on_documents() {
        let doc = doc! { parts: [{ size: 2, color: "red" }, { size: 7, color: "blue" }] };
        let filter = field("parts").elem_match(field("size").gt(5).and(field("color").eq("blue")));
        assert!(filter.apply(&doc).unwrap());

        let filter = field("parts").elem_match(field("size").gt(5).and(field("color").eq("red")));
        assert!(!filter.apply(&doc).unwrap());
    }

    #[test]
    fn test_elem_match_on_scalars() {
        let doc = doc! { scores: [1, 4, 9] };
        assert!(field("scores").elem_match(field("$").gt(8)).apply(&doc).unwrap());
        assert!(!field("scores").elem_match(field("$").gt(9)).apply(&doc).unwrap());
    }

    #[test]
    fn test_elem_match_on_non_array() {
        let doc = doc! { scores: 3 };
        assert!(!field("scores").elem_match(field("$").gt(1)).apply(&doc).unwrap());
    }

    #[test]
    fn test_nested_elem_match_is_rejected() {
        let doc = doc! { a: [] };
        let inner = field("b").elem_match(field("$").eq(1));
        assert!(field("a").elem_match(inner).apply(&doc).is_err());
    }
}
