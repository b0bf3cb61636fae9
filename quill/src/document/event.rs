use crate::collection::Document;
use crate::document::QuillDocument;
use crate::errors::QuillResult;
use anyhow::Error;
use basu::error::BasuError;
use basu::event::Event;
use basu::Handle;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

/// Events a single document emits.
///
/// - `ImmediateChange`: published synchronously inside `set_data`/`update`
/// - `Change`: deferred and coalesced, delivered at the next flush
/// - `Drop`: published synchronously when the document is dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentEvents {
    ImmediateChange,
    Change,
    Drop,
}

impl DocumentEvents {
    pub(crate) fn key(&self) -> &'static str {
        match self {
            DocumentEvents::ImmediateChange => "immediateChange",
            DocumentEvents::Change => "change",
            DocumentEvents::Drop => "drop",
        }
    }
}

impl Display for DocumentEvents {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// What kind of mutation produced a change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeType {
    SetData,
    Update,
}

/// Payload of a document event.
///
/// The carried data is a decoupled snapshot taken when the event was created;
/// later mutations of the document never show through it.
#[derive(Clone)]
pub struct DocumentEventInfo {
    inner: Arc<DocumentEventInner>,
}

struct DocumentEventInner {
    event_type: DocumentEvents,
    change_type: Option<ChangeType>,
    data: Option<Document>,
    name: String,
    timestamp: i64,
}

impl DocumentEventInfo {
    pub(crate) fn change(event_type: DocumentEvents, change_type: ChangeType, data: Document, name: &str) -> Self {
        Self::new(event_type, Some(change_type), Some(data), name)
    }

    pub(crate) fn dropped(name: &str) -> Self {
        Self::new(DocumentEvents::Drop, None, None, name)
    }

    fn new(event_type: DocumentEvents, change_type: Option<ChangeType>, data: Option<Document>, name: &str) -> Self {
        DocumentEventInfo {
            inner: Arc::new(DocumentEventInner {
                event_type,
                change_type,
                data,
                name: name.to_string(),
                timestamp: chrono::Utc::now().timestamp_millis(),
            }),
        }
    }

    /// Retargets a copy of this event, keeping payload and timestamp.
    pub(crate) fn with_event_type(&self, event_type: DocumentEvents) -> Self {
        DocumentEventInfo {
            inner: Arc::new(DocumentEventInner {
                event_type,
                change_type: self.inner.change_type,
                data: self.inner.data.clone(),
                name: self.inner.name.clone(),
                timestamp: self.inner.timestamp,
            }),
        }
    }

    pub fn event_type(&self) -> DocumentEvents {
        self.inner.event_type
    }

    /// `None` for `Drop` events.
    pub fn change_type(&self) -> Option<ChangeType> {
        self.inner.change_type
    }

    pub fn data(&self) -> Option<&Document> {
        self.inner.data.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Milliseconds since the Unix epoch.
    pub fn timestamp(&self) -> i64 {
        self.inner.timestamp
    }
}

impl Debug for DocumentEventInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentEventInfo")
            .field("event_type", &self.event_type())
            .field("change_type", &self.change_type())
            .field("name", &self.name())
            .field("timestamp", &self.timestamp())
            .finish()
    }
}

pub trait DocumentEventCallback: Send + Sync + Fn(DocumentEventInfo) -> QuillResult<()> {}

impl<F> DocumentEventCallback for F where F: Send + Sync + Fn(DocumentEventInfo) -> QuillResult<()> {}

/// Listener for the events of one document.
///
/// ```ignore
/// document.subscribe(DocumentEventListener::new(|event| {
///     if event.event_type() == DocumentEvents::Change {
///         println!("{} changed", event.name());
///     }
///     Ok(())
/// }))?;
/// ```
#[derive(Clone)]
pub struct DocumentEventListener {
    on_event: Arc<dyn DocumentEventCallback>,
}

impl DocumentEventListener {
    pub fn new(on_event: impl DocumentEventCallback + 'static) -> Self {
        DocumentEventListener {
            on_event: Arc::new(on_event),
        }
    }
}

impl Handle<DocumentEventInfo> for DocumentEventListener {
    fn handle(&self, event: &Event<DocumentEventInfo>) -> Result<(), BasuError> {
        match (self.on_event)(event.data.clone()) {
            Ok(_) => Ok(()),
            Err(e) => Err(BasuError::HandlerError(Error::from(e))),
        }
    }
}

impl Debug for DocumentEventListener {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentEventListener").finish()
    }
}

/// Events the database emits about its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseEvents {
    /// A document was created; deferred and coalesced.
    Create,
    /// A registered document emitted its deferred `Change`.
    Change,
}

impl DatabaseEvents {
    pub(crate) fn key(&self) -> &'static str {
        match self {
            DatabaseEvents::Create => "create",
            DatabaseEvents::Change => "change",
        }
    }
}

impl Display for DatabaseEvents {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Payload of a database event: the document, its kind and its name.
#[derive(Clone)]
pub struct DatabaseEventInfo {
    inner: Arc<DatabaseEventInner>,
}

struct DatabaseEventInner {
    event_type: DatabaseEvents,
    document: QuillDocument,
    kind: &'static str,
    name: String,
    timestamp: i64,
}

impl DatabaseEventInfo {
    pub(crate) fn new(event_type: DatabaseEvents, document: QuillDocument) -> Self {
        let name = document.name().to_string();
        DatabaseEventInfo {
            inner: Arc::new(DatabaseEventInner {
                event_type,
                document,
                kind: "document",
                name,
                timestamp: chrono::Utc::now().timestamp_millis(),
            }),
        }
    }

    pub fn event_type(&self) -> DatabaseEvents {
        self.inner.event_type
    }

    pub fn document(&self) -> &QuillDocument {
        &self.inner.document
    }

    /// Always `"document"`.
    pub fn kind(&self) -> &str {
        self.inner.kind
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn timestamp(&self) -> i64 {
        self.inner.timestamp
    }
}

impl Debug for DatabaseEventInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseEventInfo")
            .field("event_type", &self.event_type())
            .field("kind", &self.kind())
            .field("name", &self.name())
            .field("timestamp", &self.timestamp())
            .finish()
    }
}

pub trait DatabaseEventCallback: Send + Sync + Fn(DatabaseEventInfo) -> QuillResult<()> {}

impl<F> DatabaseEventCallback for F where F: Send + Sync + Fn(DatabaseEventInfo) -> QuillResult<()> {}

#[derive(Clone)]
pub struct DatabaseEventListener {
    on_event: Arc<dyn DatabaseEventCallback>,
}

impl DatabaseEventListener {
    pub fn new(on_event: impl DatabaseEventCallback + 'static) -> Self {
        DatabaseEventListener {
            on_event: Arc::new(on_event),
        }
    }
}

impl Handle<DatabaseEventInfo> for DatabaseEventListener {
    fn handle(&self, event: &Event<DatabaseEventInfo>) -> Result<(), BasuError> {
        match (self.on_event)(event.data.clone()) {
            Ok(_) => Ok(()),
            Err(e) => Err(BasuError::HandlerError(Error::from(e))),
        }
    }
}

impl Debug for DatabaseEventListener {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseEventListener").finish()
    }
}
