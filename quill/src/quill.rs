use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::common::{DeferredQueue, QuillEventBus, Scheduler, SubscriberRef};
use crate::document::{
    DatabaseEventInfo, DatabaseEventListener, DocumentFactory, DocumentInfo, DocumentRef, QuillDocument,
};
use crate::errors::{ErrorKind, QuillError, QuillResult};
use crate::quill_builder::QuillBuilder;
use crate::quill_config::QuillConfig;

/// An in-memory database of named documents.
///
/// `Quill` is a cheap handle; clones share the same registry, event queue
/// and listeners. Deferred events (`Change` of documents, `Create` of the
/// database) are delivered by [Quill::flush], and additionally on a timer
/// when the database was opened with
/// [QuillBuilder::auto_flush](crate::quill_builder::QuillBuilder::auto_flush).
///
/// # Examples
///
/// ```rust,ignore
/// use quill::{doc, Quill};
///
/// let db = Quill::builder().open()?;
/// let settings = db.document("settings")?.unwrap();
/// settings.set_data(doc! { theme: "dark" })?;
/// db.flush();
/// db.close()?;
/// ```
#[derive(Clone)]
pub struct Quill {
    inner: Arc<QuillInner>,
}

struct QuillInner {
    config: QuillConfig,
    factory: DocumentFactory,
    deferred: DeferredQueue,
    event_bus: QuillEventBus<DatabaseEventInfo, DatabaseEventListener>,
    scheduler: Mutex<Option<Scheduler>>,
    closed: AtomicBool,
}

impl Quill {
    pub fn builder() -> QuillBuilder {
        QuillBuilder::new()
    }

    pub(crate) fn new(config: QuillConfig) -> Self {
        let deferred = DeferredQueue::new();
        let event_bus = QuillEventBus::new();
        let factory = DocumentFactory::new(config.clone(), deferred.clone(), event_bus.clone());

        let scheduler = config.auto_flush_interval().map(|interval| {
            let scheduler = Scheduler::new();
            let queue = deferred.clone();
            scheduler.schedule(interval, move || {
                let delivered = queue.flush();
                if delivered > 0 {
                    log::trace!("Auto flush delivered {} events", delivered);
                }
            });
            scheduler
        });

        Quill {
            inner: Arc::new(QuillInner {
                config,
                factory,
                deferred,
                event_bus,
                scheduler: Mutex::new(scheduler),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Gets or creates a document.
    ///
    /// Accepts anything convertible into a [DocumentRef]: a name, a
    /// `(name, DocumentOptions)` pair, an existing [QuillDocument] or
    /// [DocumentRef::Generated].
    ///
    /// # Errors
    ///
    /// - `MissingName` for an empty name
    /// - `NotFoundAutoCreateDisabled` for an unknown name with auto-create off
    /// - `DatabaseClosed` after [Quill::close]
    ///
    /// The first two become `Ok(None)` when the options turn `throw_error` off.
    pub fn document(&self, reference: impl Into<DocumentRef>) -> QuillResult<Option<QuillDocument>> {
        self.ensure_open()?;
        self.inner.factory.get_document(reference.into())
    }

    pub fn documents(&self) -> Vec<DocumentInfo> {
        self.inner.factory.documents()
    }

    pub fn has_document(&self, name: &str) -> bool {
        self.inner.factory.has_document(name)
    }

    /// Listens to `Create` and `Change` events of the registry.
    pub fn subscribe(&self, listener: DatabaseEventListener) -> QuillResult<SubscriberRef> {
        self.ensure_open()?;
        self.inner.event_bus.register(listener)
    }

    pub fn unsubscribe(&self, subscriber: SubscriberRef) -> QuillResult<()> {
        self.inner.event_bus.deregister(subscriber)
    }

    /// Delivers every deferred event and returns how many were delivered.
    pub fn flush(&self) -> usize {
        self.inner.deferred.flush()
    }

    /// Number of deferred events waiting for the next flush.
    pub fn pending_events(&self) -> usize {
        self.inner.deferred.pending()
    }

    pub fn config(&self) -> &QuillConfig {
        &self.inner.config
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Stops the flush timer, delivers what is still pending, drops every
    /// document and removes every listener. Closing twice is a no-op.
    pub fn close(&self) -> QuillResult<()> {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        if let Some(scheduler) = self.inner.scheduler.lock().take() {
            scheduler.stop();
        }

        self.inner.deferred.flush();
        self.inner.factory.clear();
        self.inner.deferred.clear();
        self.inner.event_bus.close()?;
        log::debug!("Quill database closed");
        Ok(())
    }

    fn ensure_open(&self) -> QuillResult<()> {
        if self.is_closed() {
            log::error!("Quill database is closed");
            return Err(QuillError::new("Quill database is closed", ErrorKind::DatabaseClosed));
        }
        Ok(())
    }
}
