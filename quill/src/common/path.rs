use crate::collection::Document;
use crate::common::{Value, FIELD_SEPARATOR};
use crate::errors::{ErrorKind, QuillError, QuillResult};
use itertools::Itertools;
use smallvec::SmallVec;
use std::fmt::{Display, Formatter};

type Segments = SmallVec<[String; 4]>;

/// A parsed dotted path such as `items.0.price`.
///
/// Paths are resolved against a [Document] in two ways:
///
/// * [FieldPath::value] follows the document accessor rules: a numeric
///   segment indexes an array, any other segment decomposes the array into the
///   de-duplicated values found in its elements;
/// * [FieldPath::resolve] fans out over arrays and returns every value found,
///   in document order, without de-duplication. An array is returned whole
///   when the path ends on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Segments,
}

impl FieldPath {
    pub fn parse(path: &str) -> QuillResult<FieldPath> {
        if path.is_empty() {
            log::error!("Field path cannot be empty");
            return Err(QuillError::new(
                "Field path cannot be empty",
                ErrorKind::InvalidFieldName,
            ));
        }

        let segments: Segments = path.split(FIELD_SEPARATOR).map(str::to_string).collect();
        if segments.iter().any(|s| s.is_empty()) {
            log::error!("Field path {} contains an empty segment", path);
            return Err(QuillError::new(
                &format!("Field path {} contains an empty segment", path),
                ErrorKind::InvalidFieldName,
            ));
        }

        Ok(FieldPath { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// The path without its last segment, `None` for a single segment path.
    pub fn parent(&self) -> Option<FieldPath> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(FieldPath {
            segments: self.segments[..self.segments.len() - 1]
                .iter()
                .cloned()
                .collect(),
        })
    }

    /// Resolves the path with fan-out over arrays.
    pub fn resolve(&self, document: &Document) -> Vec<Value> {
        let mut found = Vec::new();
        match document.get_field(&self.segments[0]) {
            Some(value) => collect(value, &self.segments[1..], &mut found),
            None => return found,
        }
        found
    }

    /// Resolves the path to a single value, [Value::Null] when nothing matches.
    pub fn value(&self, document: &Document) -> QuillResult<Value> {
        recursive_get(document.get_field(&self.segments[0]), &self.segments[1..])
    }

    /// Resolves the path for mutation. Only documents are traversed; array
    /// elements are reached through numeric segments.
    pub(crate) fn value_mut<'a>(&self, document: &'a mut Document) -> Option<&'a mut Value> {
        let mut current = document.get_field_mut(&self.segments[0])?;
        for segment in &self.segments[1..] {
            current = match current {
                Value::Document(doc) => doc.get_field_mut(segment)?,
                Value::Array(items) => {
                    let index = segment.parse::<usize>().ok()?;
                    items.get_mut(index)?
                }
                _ => return None,
            };
        }
        Some(current)
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.segments.join(FIELD_SEPARATOR))
    }
}

fn collect(value: &Value, segments: &[String], found: &mut Vec<Value>) {
    let (segment, rest) = match segments.split_first() {
        Some(split) => split,
        None => {
            found.push(value.clone());
            return;
        }
    };

    match value {
        Value::Document(doc) => {
            if let Some(child) = doc.get_field(segment) {
                collect(child, rest, found);
            }
        }
        Value::Array(items) => match segment.parse::<usize>() {
            Ok(index) => {
                if let Some(item) = items.get(index) {
                    collect(item, rest, found);
                }
            }
            Err(_) => {
                for item in items {
                    collect(item, segments, found);
                }
            }
        },
        _ => {}
    }
}

fn recursive_get(value: Option<&Value>, segments: &[String]) -> QuillResult<Value> {
    let value = match value {
        None => return Ok(Value::Null),
        Some(v) => v,
    };

    let (segment, rest) = match segments.split_first() {
        Some(split) => split,
        None => return Ok(value.clone()),
    };

    match value {
        Value::Document(doc) => recursive_get(doc.get_field(segment), rest),
        Value::Array(items) => {
            if let Ok(index) = segment.parse::<isize>() {
                if index < 0 {
                    log::error!(
                        "Invalid array index {} to access array inside a document",
                        index
                    );
                    return Err(QuillError::new(
                        &format!(
                            "Invalid array index {} to access array inside a document",
                            index
                        ),
                        ErrorKind::ValidationError,
                    ));
                }

                // out of range reads as missing
                recursive_get(items.get(index as usize), rest)
            } else {
                decompose(items, segments)
            }
        }
        _ => Ok(Value::Null),
    }
}

fn decompose(items: &[Value], segments: &[String]) -> QuillResult<Value> {
    let mut values: Vec<Value> = Vec::with_capacity(items.len());

    for item in items {
        match recursive_get(Some(item), segments)? {
            Value::Array(nested) => values.extend(nested),
            Value::Null => {}
            value => values.push(value),
        }
    }

    Ok(Value::Array(values.into_iter().unique().collect()))
}
