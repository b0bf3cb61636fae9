use backtrace::Backtrace;
use serde::{de, ser};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;

use crate::common::{atomic, Atomic};

/// Error kinds for Quill operations.
///
/// Each kind describes one category of failure so callers can branch on
/// [QuillError::kind] instead of parsing messages.
///
/// # Examples
///
/// ```rust,ignore
/// use quill::errors::{QuillError, ErrorKind, QuillResult};
///
/// fn example() -> QuillResult<()> {
///     Err(QuillError::new("Document name is missing", ErrorKind::MissingName))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    // Registry errors
    /// A registry lookup was made without a resolvable document name
    MissingName,
    /// The named document does not exist and auto-create was disabled
    NotFoundAutoCreateDisabled,
    /// No parent document contained the requested sub-document path.
    /// Only used to classify soft failures, never returned as an `Err`.
    NoMatchingPath,

    // Lifecycle errors
    /// The document has been dropped and can no longer be used
    DocumentDropped,
    /// The database has been closed
    DatabaseClosed,

    // Operation errors
    /// The operation is not valid in the current context
    InvalidOperation,
    /// Invalid data type for operation
    InvalidDataType,
    /// Invalid field name or path
    InvalidFieldName,
    /// Generic validation error
    ValidationError,

    // Query errors
    /// Error during filter evaluation or construction
    FilterError,

    // Event errors
    /// Error in event processing
    EventError,

    // Serialization errors
    /// Error encoding or decoding data
    EncodingError,

    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::MissingName => write!(f, "Missing name"),
            ErrorKind::NotFoundAutoCreateDisabled => write!(f, "Not found, auto-create disabled"),
            ErrorKind::NoMatchingPath => write!(f, "No matching path"),
            ErrorKind::DocumentDropped => write!(f, "Document dropped"),
            ErrorKind::DatabaseClosed => write!(f, "Database closed"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::InvalidDataType => write!(f, "Invalid data type"),
            ErrorKind::InvalidFieldName => write!(f, "Invalid field name"),
            ErrorKind::ValidationError => write!(f, "Validation error"),
            ErrorKind::FilterError => write!(f, "Filter error"),
            ErrorKind::EventError => write!(f, "Event error"),
            ErrorKind::EncodingError => write!(f, "Encoding error"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Custom Quill error type.
///
/// `QuillError` carries a message, an [ErrorKind], an optional cause and the
/// backtrace captured where the error was created.
///
/// # Examples
///
/// ```rust,ignore
/// use quill::errors::{QuillError, ErrorKind};
///
/// let cause = QuillError::new("bad operand", ErrorKind::InvalidDataType);
/// let err = QuillError::new_with_cause("Update failed", ErrorKind::InvalidOperation, cause);
/// ```
#[derive(Clone)]
pub struct QuillError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<QuillError>>,
    backtrace: Atomic<Backtrace>,
}

impl QuillError {
    /// Creates a new `QuillError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        QuillError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: atomic(Backtrace::new()),
        }
    }

    /// Creates a new `QuillError` that wraps the error which caused it.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: QuillError) -> Self {
        QuillError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: atomic(Backtrace::new()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&QuillError> {
        self.cause.as_deref()
    }
}

impl Display for QuillError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for QuillError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // print error message with stack trace followed by cause
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace.read()),
        }
    }
}

impl Error for QuillError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for Quill operations.
pub type QuillResult<T> = Result<T, QuillError>;

impl de::Error for QuillError {
    fn custom<T: Display>(msg: T) -> Self {
        QuillError::new(&msg.to_string(), ErrorKind::EncodingError)
    }
}

impl ser::Error for QuillError {
    fn custom<T: Display>(msg: T) -> Self {
        QuillError::new(&msg.to_string(), ErrorKind::EncodingError)
    }
}

impl From<regex::Error> for QuillError {
    fn from(err: regex::Error) -> Self {
        QuillError::new(
            &format!("Invalid regular expression: {}", err),
            ErrorKind::FilterError,
        )
    }
}

impl From<std::fmt::Error> for QuillError {
    fn from(err: std::fmt::Error) -> Self {
        QuillError::new(
            &format!("Formatting error: {}", err),
            ErrorKind::InternalError,
        )
    }
}

impl From<String> for QuillError {
    fn from(msg: String) -> Self {
        QuillError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for QuillError {
    fn from(msg: &str) -> Self {
        QuillError::new(msg, ErrorKind::InternalError)
    }
}
