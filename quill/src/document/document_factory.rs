use std::sync::Arc;

use indexmap::IndexMap;

use crate::common::{atomic, Atomic, DeferredQueue, QuillEventBus, ReadExecutor, WriteExecutor, DATABASE_RECIPIENT};
use crate::document::{
    Binding, DatabaseEventInfo, DatabaseEventListener, DatabaseEvents, DocumentEventInfo, DocumentEventListener,
    DocumentEvents, QuillDocument,
};
use crate::errors::{ErrorKind, QuillError, QuillResult};
use crate::quill_config::QuillConfig;
use crate::update::BindingObserver;

/// Options of a registry lookup.
#[derive(Debug, Clone)]
pub struct DocumentOptions {
    /// Create the document when the name is unknown. Defaults to `true`.
    pub auto_create: bool,
    /// Report a missing name or a failed lookup as an error instead of
    /// `Ok(None)`. Defaults to `true`.
    pub throw_error: bool,
    /// Binding of a newly created document; ignored for existing ones.
    pub binding: Binding,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        DocumentOptions {
            auto_create: true,
            throw_error: true,
            binding: Binding::Direct,
        }
    }
}

impl DocumentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auto_create(mut self, auto_create: bool) -> Self {
        self.auto_create = auto_create;
        self
    }

    pub fn throw_error(mut self, throw_error: bool) -> Self {
        self.throw_error = throw_error;
        self
    }

    pub fn observed(mut self, observer: Arc<dyn BindingObserver>) -> Self {
        self.binding = Binding::Observed(observer);
        self
    }
}

/// The ways to ask the registry for a document.
#[derive(Debug, Clone)]
pub enum DocumentRef {
    /// A new document under a random name.
    Generated,
    /// This instance, or a fresh one under its name when it was dropped.
    Instance(QuillDocument),
    Named(String),
    NamedWithOptions(String, DocumentOptions),
}

impl From<&str> for DocumentRef {
    fn from(name: &str) -> Self {
        DocumentRef::Named(name.to_string())
    }
}

impl From<String> for DocumentRef {
    fn from(name: String) -> Self {
        DocumentRef::Named(name)
    }
}

impl From<&String> for DocumentRef {
    fn from(name: &String) -> Self {
        DocumentRef::Named(name.clone())
    }
}

impl From<QuillDocument> for DocumentRef {
    fn from(document: QuillDocument) -> Self {
        DocumentRef::Instance(document)
    }
}

impl From<&QuillDocument> for DocumentRef {
    fn from(document: &QuillDocument) -> Self {
        DocumentRef::Instance(document.clone())
    }
}

impl From<(&str, DocumentOptions)> for DocumentRef {
    fn from((name, options): (&str, DocumentOptions)) -> Self {
        DocumentRef::NamedWithOptions(name.to_string(), options)
    }
}

impl From<(String, DocumentOptions)> for DocumentRef {
    fn from((name, options): (String, DocumentOptions)) -> Self {
        DocumentRef::NamedWithOptions(name, options)
    }
}

/// Registry listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInfo {
    pub name: String,
    pub linked: bool,
}

/// Name-to-document registry of one database.
#[derive(Clone)]
pub(crate) struct DocumentFactory {
    inner: Arc<DocumentFactoryInner>,
}

pub(crate) struct DocumentFactoryInner {
    document_map: Atomic<IndexMap<String, QuillDocument>>,
    config: QuillConfig,
    deferred: DeferredQueue,
    event_bus: QuillEventBus<DatabaseEventInfo, DatabaseEventListener>,
}

impl DocumentFactory {
    pub fn new(
        config: QuillConfig,
        deferred: DeferredQueue,
        event_bus: QuillEventBus<DatabaseEventInfo, DatabaseEventListener>,
    ) -> Self {
        DocumentFactory {
            inner: Arc::new(DocumentFactoryInner {
                document_map: atomic(IndexMap::new()),
                config,
                deferred,
                event_bus,
            }),
        }
    }

    /// Get-or-create. `Ok(None)` only when `throw_error` is off and the
    /// lookup could not produce a document.
    pub fn get_document(&self, reference: DocumentRef) -> QuillResult<Option<QuillDocument>> {
        let (name, options) = match reference {
            DocumentRef::Generated => (uuid::Uuid::new_v4().to_string(), DocumentOptions::default()),
            DocumentRef::Instance(document) => {
                if !document.is_dropped() {
                    return Ok(Some(document));
                }
                (document.name().to_string(), DocumentOptions::default())
            }
            DocumentRef::Named(name) => (name, DocumentOptions::default()),
            DocumentRef::NamedWithOptions(name, options) => (name, options),
        };

        if name.is_empty() {
            if !options.throw_error {
                return Ok(None);
            }
            log::error!("Cannot get a document without a name");
            return Err(QuillError::new(
                "Cannot get a document without a name",
                ErrorKind::MissingName,
            ));
        }

        let existing = self.inner.document_map.read_with(|map| map.get(&name).cloned());
        if let Some(document) = existing {
            if !document.is_dropped() {
                return Ok(Some(document));
            }
        }

        if !options.auto_create {
            if !options.throw_error {
                return Ok(None);
            }
            log::error!("No document named {} exists and auto-create is disabled", name);
            return Err(QuillError::new(
                &format!("No document named {} exists and auto-create is disabled", name),
                ErrorKind::NotFoundAutoCreateDisabled,
            ));
        }

        self.create_document(&name, options.binding).map(Some)
    }

    fn create_document(&self, name: &str, binding: Binding) -> QuillResult<QuillDocument> {
        let document = QuillDocument::new(
            name,
            binding,
            self.inner.config.clone(),
            self.inner.deferred.clone(),
            Arc::downgrade(&self.inner),
        );

        // another thread may have created it since the lookup
        let winner = self.inner.document_map.write_with(|map| match map.get(name) {
            Some(existing) if !existing.is_dropped() => Some(existing.clone()),
            _ => {
                map.insert(name.to_string(), document.clone());
                None
            }
        });
        if let Some(existing) = winner {
            return Ok(existing);
        }

        let weak = document.downgrade();
        let event_bus = self.inner.event_bus.clone();
        document.subscribe(DocumentEventListener::new(move |event: DocumentEventInfo| {
            if event.event_type() == DocumentEvents::Change {
                if let Some(document) = QuillDocument::upgrade(&weak) {
                    event_bus.publish(DatabaseEventInfo::new(DatabaseEvents::Change, document))?;
                }
            }
            Ok(())
        }))?;

        let event_bus = self.inner.event_bus.clone();
        let created = document.clone();
        self.inner.deferred.defer(DATABASE_RECIPIENT, DatabaseEvents::Create.key(), move || {
            if let Err(e) = event_bus.publish(DatabaseEventInfo::new(DatabaseEvents::Create, created)) {
                log::warn!("Database listener failed on create: {}", e);
            }
        });

        log::debug!("Created document {}", name);
        Ok(document)
    }

    pub fn has_document(&self, name: &str) -> bool {
        self.inner.document_map.read_with(|map| map.contains_key(name))
    }

    /// Registered documents in creation order.
    pub fn documents(&self) -> Vec<DocumentInfo> {
        self.inner.document_map.read_with(|map| {
            map.values()
                .map(|document| DocumentInfo {
                    name: document.name().to_string(),
                    linked: document.is_linked(),
                })
                .collect()
        })
    }

    /// Drops every registered document.
    pub fn clear(&self) {
        let documents: Vec<QuillDocument> = self.inner.document_map.read_with(|map| map.values().cloned().collect());
        for document in documents {
            document.drop();
        }
        self.inner.document_map.write_with(|map| map.clear());
    }
}

impl DocumentFactoryInner {
    /// Unregisters `document` if it is the registered instance for its name.
    pub(crate) fn remove_document(&self, document: &QuillDocument) -> bool {
        self.document_map.write_with(|map| match map.get(document.name()) {
            Some(registered) if registered.same_instance(document) => {
                map.shift_remove(document.name());
                true
            }
            _ => false,
        })
    }
}
