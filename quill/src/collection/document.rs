use im::OrdMap;
use smallvec::SmallVec;

use crate::common::{FieldPath, Value, FIELD_SEPARATOR};
use crate::errors::{ErrorKind, QuillError, QuillResult};
use std::fmt::{Debug, Display};

type FieldVec = SmallVec<[String; 8]>;

/// A JSON-like data tree: an ordered mapping from [String] keys to [Value]s.
///
/// Values may themselves be documents or arrays, so a document describes a
/// whole tree. Two families of accessors exist:
///
/// * literal accessors ([Document::insert], [Document::get_field],
///   [Document::remove_field]) treat the key as a single opaque name, so a
///   key such as `"items.$"` is stored as-is;
/// * path accessors ([Document::get], [Document::put], [Document::remove])
///   split the key on `.` and walk nested documents and arrays. A numeric
///   segment addresses an array element; any other segment applied to an
///   array is mapped over its elements.
///
/// The backing map is persistent (`im::OrdMap`), so cloning is O(1) and every
/// clone is semantically independent of the others.
#[derive(Clone, Eq, PartialEq, Hash, Default, Ord, PartialOrd, serde::Deserialize, serde::Serialize)]
pub struct Document {
    data: OrdMap<String, Value>,
}

impl Document {
    /// Creates a new empty document.
    pub fn new() -> Self {
        Document {
            data: OrdMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Associates `value` with the literal `key`, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.data.insert(key.into(), value.into())
    }

    /// Returns the value stored under the literal `key`.
    pub fn get_field(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn get_field_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.data.get_mut(key)
    }

    /// Removes the literal `key`, returning its value.
    pub fn remove_field(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Returns the value at `path`, or [Value::Null] when nothing is there.
    ///
    /// A literal key takes precedence over a dotted path with the same text.
    ///
    /// ```ignore
    /// let doc = doc!{ "location": { "city": "Berlin" }, "items": [1, 2] };
    /// assert_eq!(doc.get("location.city")?, Value::from("Berlin"));
    /// assert_eq!(doc.get("items.1")?, Value::from(2));
    /// assert_eq!(doc.get("missing")?, Value::Null);
    /// ```
    pub fn get(&self, path: &str) -> QuillResult<Value> {
        if let Some(value) = self.data.get(path) {
            return Ok(value.clone());
        }

        if path.contains(FIELD_SEPARATOR) {
            FieldPath::parse(path)?.value(self)
        } else {
            Ok(Value::Null)
        }
    }

    /// Sets the value at `path`, creating intermediate documents as needed.
    ///
    /// A numeric segment addressing an existing array element descends into
    /// that element; an index equal to the array length appends.
    pub fn put(&mut self, path: &str, value: impl Into<Value>) -> QuillResult<()> {
        let path = FieldPath::parse(path)?;
        self.deep_put(path.segments(), value.into())
    }

    /// Removes the value at `path`. Missing paths are ignored.
    pub fn remove(&mut self, path: &str) -> QuillResult<()> {
        let path = FieldPath::parse(path)?;
        self.deep_remove(path.segments())
    }

    /// Returns every leaf field as a dotted path. Arrays count as leaves.
    pub fn fields(&self) -> Vec<String> {
        self.get_fields_internal("").into_vec()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.data.iter()
    }

    /// Rebuilds the whole tree so that it shares no structure with `self`.
    pub fn deep_copy(&self) -> Document {
        Document {
            data: self
                .data
                .iter()
                .map(|(k, v)| (k.clone(), v.deep_copy()))
                .collect(),
        }
    }

    pub(crate) fn to_pretty_json(&self, indent: usize) -> String {
        if self.data.is_empty() {
            return "{}".to_string();
        }

        let mut json_string = String::with_capacity(self.data.len() * 30 + indent * 2);
        json_string.push_str("{\n");
        let indent_str = " ".repeat(indent + 2);
        for (key, value) in self.data.iter() {
            json_string.push_str(&format!(
                "{}\"{}\": {},\n",
                indent_str,
                crate::common::escape_json(key),
                value.to_pretty_json(indent + 2)
            ));
        }

        json_string.pop();
        json_string.pop();
        json_string.push_str(&format!("\n{}}}", " ".repeat(indent)));
        json_string
    }

    pub(crate) fn to_debug_string(&self, indent: usize) -> String {
        if self.data.is_empty() {
            return "{}".to_string();
        }

        let mut debug_string = String::new();
        debug_string.push_str("{\n");
        let indent_str = " ".repeat(indent + 2);
        for (key, value) in self.data.iter() {
            debug_string.push_str(&format!(
                "{}\"{}\": {},\n",
                indent_str,
                key,
                value.to_debug_string(indent + 2)
            ));
        }

        debug_string.pop();
        debug_string.pop();
        debug_string.push_str(&format!("\n{}}}", " ".repeat(indent)));
        debug_string
    }

    fn get_fields_internal(&self, prefix: &str) -> FieldVec {
        let mut fields = FieldVec::new();

        for (key, value) in self.data.iter() {
            if key.is_empty() {
                continue;
            }

            let field = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}{}{}", prefix, FIELD_SEPARATOR, key)
            };

            match value {
                Value::Document(doc) if !doc.is_empty() => {
                    fields.append(&mut doc.get_fields_internal(&field));
                }
                _ => fields.push(field),
            }
        }
        fields
    }

    fn deep_put(&mut self, segments: &[String], value: Value) -> QuillResult<()> {
        let (key, rest) = match segments.split_first() {
            Some(split) => split,
            None => {
                log::error!("Empty embedded key");
                return Err(QuillError::new("Empty embedded key", ErrorKind::InvalidFieldName));
            }
        };

        if rest.is_empty() {
            self.data.insert(key.clone(), value);
            return Ok(());
        }

        match self.data.get_mut(key.as_str()) {
            Some(Value::Document(nested)) => nested.deep_put(rest, value),
            Some(Value::Array(items)) => put_into_array(items, rest, value),
            _ => {
                let mut nested = Document::new();
                nested.deep_put(rest, value)?;
                self.data.insert(key.clone(), Value::Document(nested));
                Ok(())
            }
        }
    }

    fn deep_remove(&mut self, segments: &[String]) -> QuillResult<()> {
        let (key, rest) = match segments.split_first() {
            Some(split) => split,
            None => {
                log::error!("Empty embedded key");
                return Err(QuillError::new("Empty embedded key", ErrorKind::InvalidFieldName));
            }
        };

        if rest.is_empty() {
            self.data.remove(key.as_str());
            return Ok(());
        }

        match self.data.get_mut(key.as_str()) {
            Some(Value::Document(nested)) => nested.deep_remove(rest),
            Some(Value::Array(items)) => remove_from_array(items, rest),
            _ => Ok(()),
        }
    }
}

fn array_index(segment: &str, len: usize) -> QuillResult<usize> {
    match segment.parse::<usize>() {
        Ok(index) if index <= len => Ok(index),
        Ok(index) => {
            log::error!("Array index {} out of bound", index);
            Err(QuillError::new(
                &format!("Array index {} out of bound", index),
                ErrorKind::ValidationError,
            ))
        }
        Err(_) => {
            log::error!("Invalid array index {} to access array inside a document", segment);
            Err(QuillError::new(
                &format!("Invalid array index {} to access array inside a document", segment),
                ErrorKind::InvalidFieldName,
            ))
        }
    }
}

fn put_into_array(items: &mut Vec<Value>, segments: &[String], value: Value) -> QuillResult<()> {
    let (first, rest) = match segments.split_first() {
        Some(split) => split,
        None => return Ok(()),
    };

    let index = array_index(first, items.len())?;
    if index == items.len() {
        items.push(Value::Null);
    }

    if rest.is_empty() {
        items[index] = value;
        return Ok(());
    }

    match &mut items[index] {
        Value::Document(nested) => nested.deep_put(rest, value),
        Value::Array(nested) => put_into_array(nested, rest, value),
        slot => {
            let mut nested = Document::new();
            nested.deep_put(rest, value)?;
            *slot = Value::Document(nested);
            Ok(())
        }
    }
}

fn remove_from_array(items: &mut Vec<Value>, segments: &[String]) -> QuillResult<()> {
    let (first, rest) = match segments.split_first() {
        Some(split) => split,
        None => return Ok(()),
    };

    let index = array_index(first, items.len())?;
    if index == items.len() {
        return Ok(());
    }

    if rest.is_empty() {
        items.remove(index);
        return Ok(());
    }

    match &mut items[index] {
        Value::Document(nested) => nested.deep_remove(rest),
        Value::Array(nested) => remove_from_array(nested, rest),
        _ => Ok(()),
    }
}

impl Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_debug_string(0))
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_pretty_json(0))
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Document {
            data: iter.into_iter().collect(),
        }
    }
}

/// Strips the quotes `stringify!` leaves around string-literal keys.
pub fn normalize(value: &str) -> String {
    value.trim_matches('"').to_string()
}

/// Creates a [Document] with JSON-like syntax.
///
/// Keys are stored literally. Negative numbers and other multi-token
/// expressions must be wrapped in parentheses.
///
/// ```rust
/// use quill::doc;
///
/// let empty = doc!{};
///
/// let simple = doc!{ name: "Alice", age: 30 };
///
/// let base = 100;
/// let with_expr = doc!{ score: (base * 2), delta: (-5) };
///
/// let nested = doc!{
///     "user": { "name": "Charlie", "tags": ["admin", "user"] },
///     "items.$": { "qty": 1 },
/// };
/// ```
#[macro_export]
macro_rules! doc {
    ({}) => {
        $crate::collection::Document::new()
    };

    () => {
        $crate::collection::Document::new()
    };

    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::doc!($($key : $value),*)
    };

    ($($key:tt : $value:tt),* $(,)?) => {
        {
            #[allow(unused_imports)]
            use $crate::doc_value;

            let mut doc = $crate::collection::Document::new();
            $(
                doc.insert($crate::collection::normalize(stringify!($key)), $crate::doc_value!($value));
            )*
            doc
        }
    };
}

/// Converts a single `doc!` value: nested documents, arrays or expressions.
#[macro_export]
macro_rules! doc_value {
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::common::Value::Document($crate::doc!{ $($key : $value),* })
    };

    ([ $($value:tt),* $(,)? ]) => {
        $crate::common::Value::Array(vec![$($crate::doc_value!($value)),*])
    };

    ($value:expr) => {
        $crate::common::Value::from($value)
    };
}
