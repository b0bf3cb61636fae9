use crate::collection::Document;
use crate::errors::{ErrorKind, QuillError, QuillResult};
use std::cmp::Ordering;
use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};

/// Compare two floats with proper NaN and total ordering.
#[inline]
fn num_cmp_float(a: f64, b: f64) -> Ordering {
    // Handle NaN: treat NaN as greater than all other values
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Represents a node of a [Document] tree.
///
/// The data model is JSON-like: scalars, nested documents (mappings) and
/// ordered arrays. Integers and floats compare and hash consistently, so
/// `Value::I64(2) == Value::F64(2.0)`.
///
/// # Usage
/// Create values using the `From` conversions or the `doc!` macro:
/// ```text
/// let v1: Value = 42.into();
/// let v2 = Value::from("hello");
/// let doc = doc! { "age": 42, "name": "Alice", "tags": ["a", "b"] };
/// ```
#[derive(Clone, Default, serde::Deserialize, serde::Serialize)]
pub enum Value {
    /// Represents a null value.
    #[default]
    Null,
    /// Represents a boolean value.
    Bool(bool),
    /// Represents a signed 64-bit integer value.
    I64(i64),
    /// Represents a 64-bit floating point value.
    F64(f64),
    /// Represents a string value.
    String(String),
    /// Represents a nested document value.
    Document(Document),
    /// Represents an ordered array of values.
    Array(Vec<Value>),
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_debug_string(0))
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_pretty_json(0))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::I64(a), Value::I64(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Document(a), Value::Document(b)) => a.cmp(b),
            (Value::Array(a), Value::Array(b)) => a.cmp(b),
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => num_cmp_float(a, b),
                _ => self.type_rank().cmp(&other.type_rank()),
            },
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Null => 0u8.hash(state),
            Value::Bool(v) => {
                1u8.hash(state);
                v.hash(state);
            }
            Value::I64(v) => {
                2u8.hash(state);
                v.hash(state);
            }
            Value::F64(v) => {
                2u8.hash(state);
                // integral floats must hash like the equal integer
                if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v <= i64::MAX as f64 {
                    (*v as i64).hash(state);
                } else {
                    v.to_bits().hash(state);
                }
            }
            Value::String(v) => {
                3u8.hash(state);
                v.hash(state);
            }
            Value::Document(v) => {
                4u8.hash(state);
                v.hash(state);
            }
            Value::Array(v) => {
                5u8.hash(state);
                v.hash(state);
            }
        }
    }
}

impl Value {
    /// Creates a new [Value] from anything that converts into one.
    pub fn from<T: Into<Value>>(value: T) -> Value {
        value.into()
    }

    /// Creates an array value from a vector of convertible items.
    pub fn from_vec<T: Into<Value>>(values: Vec<T>) -> Value {
        Value::Array(values.into_iter().map(|v| v.into()).collect())
    }

    pub fn as_bool(&self) -> Option<&bool> {
        match self {
            Value::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<&i64> {
        match self {
            Value::I64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<&f64> {
        match self {
            Value::F64(v) => Some(v),
            _ => None,
        }
    }

    /// Returns any numeric value widened to `f64`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::I64(v) => Some(*v as f64),
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as a non-negative index, if it is an integral number.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Value::I64(v) if *v >= 0 => Some(*v as usize),
            Value::F64(v) if *v >= 0.0 && v.fract() == 0.0 => Some(*v as usize),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&String> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_document_mut(&mut self) -> Option<&mut Document> {
        match self {
            Value::Document(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::I64(_) | Value::F64(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    pub fn is_document(&self) -> bool {
        matches!(self, Value::Document(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Replaces the value with [Value::Null] and returns the previous one.
    pub fn take(&mut self) -> Value {
        std::mem::replace(self, Value::Null)
    }

    /// Returns a short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I64(_) => "integer",
            Value::F64(_) => "float",
            Value::String(_) => "string",
            Value::Document(_) => "document",
            Value::Array(_) => "array",
        }
    }

    /// Rebuilds the value without sharing any structure with `self`.
    pub fn deep_copy(&self) -> Value {
        match self {
            Value::Document(doc) => Value::Document(doc.deep_copy()),
            Value::Array(items) => Value::Array(items.iter().map(Value::deep_copy).collect()),
            other => other.clone(),
        }
    }

    /// Numeric addition used by `$inc`. Integer overflow widens to float.
    pub(crate) fn add(&self, other: &Value) -> QuillResult<Value> {
        if let (Value::I64(a), Value::I64(b)) = (self, other) {
            return Ok(a
                .checked_add(*b)
                .map(Value::I64)
                .unwrap_or(Value::F64(*a as f64 + *b as f64)));
        }

        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => Ok(Value::F64(a + b)),
            _ => {
                log::error!("Cannot add {} to {}", other.type_name(), self.type_name());
                Err(QuillError::new(
                    &format!("Cannot add {} to {}", other.type_name(), self.type_name()),
                    ErrorKind::InvalidDataType,
                ))
            }
        }
    }

    /// Numeric multiplication used by `$mul`. Integer overflow widens to float.
    pub(crate) fn multiply(&self, other: &Value) -> QuillResult<Value> {
        if let (Value::I64(a), Value::I64(b)) = (self, other) {
            return Ok(a
                .checked_mul(*b)
                .map(Value::I64)
                .unwrap_or(Value::F64(*a as f64 * *b as f64)));
        }

        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => Ok(Value::F64(a * b)),
            _ => {
                log::error!("Cannot multiply {} by {}", self.type_name(), other.type_name());
                Err(QuillError::new(
                    &format!("Cannot multiply {} by {}", self.type_name(), other.type_name()),
                    ErrorKind::InvalidDataType,
                ))
            }
        }
    }

    pub(crate) fn type_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::I64(_) | Value::F64(_) => 2,
            Value::String(_) => 3,
            Value::Document(_) => 4,
            Value::Array(_) => 5,
        }
    }

    pub(crate) fn to_pretty_json(&self, indent: usize) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(v) => v.to_string(),
            Value::I64(v) => v.to_string(),
            Value::F64(v) => v.to_string(),
            Value::String(v) => format!("\"{}\"", escape_json(v)),
            Value::Document(v) => v.to_pretty_json(indent),
            Value::Array(v) => {
                if v.is_empty() {
                    return "[]".to_string();
                }

                let mut json_str = String::new();
                json_str.push_str("[\n");
                let indent_str = " ".repeat(indent + 2);
                for value in v {
                    json_str.push_str(&format!(
                        "{}{},\n",
                        indent_str,
                        value.to_pretty_json(indent + 2)
                    ));
                }
                json_str.pop(); // remove last newline
                json_str.pop(); // remove last comma
                json_str.push_str(&format!("\n{}]", " ".repeat(indent)));
                json_str
            }
        }
    }

    pub(crate) fn to_debug_string(&self, indent: usize) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(v) => format!("bool({})", v),
            Value::I64(v) => format!("i64({})", v),
            Value::F64(v) => format!("f64({})", v),
            Value::String(v) => format!("string(\"{}\")", escape_json(v)),
            Value::Document(v) => format!("object({})", v.to_debug_string(indent)),
            Value::Array(v) => {
                if v.is_empty() {
                    return "array([])".to_string();
                }

                let mut debug_str = String::new();
                debug_str.push_str("array([\n");
                let indent_str = " ".repeat(indent + 2);
                for value in v {
                    debug_str.push_str(&format!(
                        "{}{},\n",
                        indent_str,
                        value.to_debug_string(indent + 2)
                    ));
                }
                debug_str.pop();
                debug_str.pop();
                debug_str.push_str(&format!("\n{}])", " ".repeat(indent)));
                debug_str
            }
        }
    }
}

pub(crate) fn escape_json(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c => escaped.push(c),
        }
    }
    escaped
}

impl From<bool> for Value {
    #[inline]
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

macro_rules! impl_from_small_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                #[inline]
                fn from(value: $t) -> Self {
                    Value::I64(value as i64)
                }
            }
        )*
    };
}

impl_from_small_int!(i8, u8, i16, u16, i32, u32, i64);

impl From<u64> for Value {
    #[inline]
    fn from(value: u64) -> Self {
        i64::try_from(value)
            .map(Value::I64)
            .unwrap_or(Value::F64(value as f64))
    }
}

impl From<usize> for Value {
    #[inline]
    fn from(value: usize) -> Self {
        i64::try_from(value)
            .map(Value::I64)
            .unwrap_or(Value::F64(value as f64))
    }
}

impl From<isize> for Value {
    #[inline]
    fn from(value: isize) -> Self {
        Value::I64(value as i64)
    }
}

impl From<f32> for Value {
    #[inline]
    fn from(value: f32) -> Self {
        Value::F64(value as f64)
    }
}

impl From<f64> for Value {
    #[inline]
    fn from(value: f64) -> Self {
        Value::F64(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::String(value.clone())
    }
}

impl From<Document> for Value {
    fn from(value: Document) -> Self {
        Value::Document(value)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

impl<T> From<Vec<T>> for Value
where
    T: Into<Value>,
{
    fn from(value: Vec<T>) -> Self {
        Value::Array(value.into_iter().map(|v| v.into()).collect())
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(value: &Value) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_numeric_equality_across_variants() {
        assert_eq!(Value::I64(2), Value::F64(2.0));
        assert_ne!(Value::I64(2), Value::F64(2.5));
        assert_eq!(hash_of(&Value::I64(2)), hash_of(&Value::F64(2.0)));
    }

    #[test]
    fn test_ordering_by_type_rank() {
        assert!(Value::Null < Value::Bool(false));
        assert!(Value::Bool(true) < Value::I64(0));
        assert!(Value::I64(10) < Value::String("a".to_string()));
        assert!(Value::String("z".to_string()) < Value::Document(Document::new()));
        assert!(Value::Document(Document::new()) < Value::Array(vec![]));
    }

    #[test]
    fn test_ordering_numbers() {
        assert!(Value::I64(1) < Value::F64(1.5));
        assert!(Value::F64(-3.0) < Value::I64(-2));
        assert!(Value::F64(f64::NAN) > Value::I64(i64::MAX));
    }

    #[test]
    fn test_from_conversions() {
        assert_eq!(Value::from(5i32), Value::I64(5));
        assert_eq!(Value::from(5u8), Value::I64(5));
        assert_eq!(Value::from(1.5f32), Value::F64(1.5));
        assert_eq!(Value::from("x"), Value::String("x".to_string()));
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some(3)), Value::I64(3));
        assert_eq!(
            Value::from(vec![1, 2]),
            Value::Array(vec![Value::I64(1), Value::I64(2)])
        );
        assert_eq!(Value::from(u64::MAX), Value::F64(u64::MAX as f64));
    }

    #[test]
    fn test_add() {
        assert_eq!(Value::I64(5).add(&Value::I64(1)).unwrap(), Value::I64(6));
        assert_eq!(Value::I64(5).add(&Value::F64(0.5)).unwrap(), Value::F64(5.5));
        assert_eq!(
            Value::I64(i64::MAX).add(&Value::I64(1)).unwrap(),
            Value::F64(i64::MAX as f64 + 1.0)
        );
        let err = Value::String("a".to_string()).add(&Value::I64(1)).unwrap_err();
        assert_eq!(*err.kind(), ErrorKind::InvalidDataType);
    }

    #[test]
    fn test_multiply() {
        assert_eq!(Value::I64(5).multiply(&Value::I64(3)).unwrap(), Value::I64(15));
        assert_eq!(Value::F64(2.5).multiply(&Value::I64(2)).unwrap(), Value::F64(5.0));
        assert!(Value::Null.multiply(&Value::I64(2)).is_err());
    }

    #[test]
    fn test_as_index() {
        assert_eq!(Value::I64(3).as_index(), Some(3));
        assert_eq!(Value::F64(2.0).as_index(), Some(2));
        assert_eq!(Value::I64(-1).as_index(), None);
        assert_eq!(Value::F64(1.5).as_index(), None);
        assert_eq!(Value::String("1".to_string()).as_index(), None);
    }

    #[test]
    fn test_deep_copy_is_equal() {
        let value = Value::Document(doc! { "a": { "b": [1, 2, { "c": 3 }] } });
        assert_eq!(value.deep_copy(), value);
    }

    #[test]
    fn test_take() {
        let mut value = Value::I64(4);
        assert_eq!(value.take(), Value::I64(4));
        assert!(value.is_null());
    }

    #[test]
    fn test_display_escapes_strings() {
        let value = Value::String("say \"hi\"".to_string());
        assert_eq!(format!("{}", value), "\"say \\\"hi\\\"\"");
    }

    #[test]
    fn test_debug_of_array() {
        let value = Value::Array(vec![Value::I64(1)]);
        let debug = format!("{:?}", value);
        assert!(debug.starts_with("array(["));
        assert!(debug.contains("i64(1)"));
    }
}
