use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use crate::collection::Document;
use crate::common::{atomic, Atomic, DeferredQueue, QuillEventBus, ReadExecutor, SubscriberRef, WriteExecutor};
use crate::document::{
    find_sub_documents, ChangeType, DocumentEventInfo, DocumentEventListener, DocumentEvents,
    DocumentFactoryInner, SubDocumentOptions, SubDocuments,
};
use crate::errors::{ErrorKind, QuillError, QuillResult};
use crate::filter::{all, Filter};
use crate::quill_config::QuillConfig;
use crate::update::{apply_patch, diff_unset, BindingObserver, DirectSink, MutationSink, ObservedSink, UpdateOptions};

/// How a document routes its edits.
#[derive(Clone, Default)]
pub enum Binding {
    /// Edit the tree in place, silently.
    #[default]
    Direct,
    /// Edit the tree and report every primitive edit to the observer.
    Observed(Arc<dyn BindingObserver>),
}

impl Binding {
    pub fn is_observed(&self) -> bool {
        matches!(self, Binding::Observed(_))
    }

    fn sink(&self) -> Arc<dyn MutationSink> {
        match self {
            Binding::Direct => Arc::new(DirectSink),
            Binding::Observed(observer) => Arc::new(ObservedSink::new(observer.clone())),
        }
    }
}

impl Debug for Binding {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Binding::Direct => write!(f, "Direct"),
            Binding::Observed(_) => write!(f, "Observed"),
        }
    }
}

/// Options of [QuillDocument::set_data_with_options].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetDataOptions {
    /// Rebuild the incoming tree so it shares no structure with the caller's.
    pub decouple: bool,
}

impl Default for SetDataOptions {
    fn default() -> Self {
        SetDataOptions { decouple: true }
    }
}

impl SetDataOptions {
    pub fn new(decouple: bool) -> Self {
        SetDataOptions { decouple }
    }
}

/// A named document holding one data tree.
///
/// `QuillDocument` is a cheap handle; clones refer to the same document.
/// Documents are obtained from [Quill::document](crate::Quill::document) and
/// stay registered until [QuillDocument::drop] is called.
///
/// Every successful mutation publishes `ImmediateChange` to the document's
/// listeners before returning and defers a `Change` that is delivered once
/// per flush, carrying the state at the time of the last mutation.
///
/// # Examples
///
/// ```rust,ignore
/// use quill::{doc, Quill};
/// use quill::filter::field;
///
/// let db = Quill::builder().open()?;
/// let cart = db.document("cart")?.unwrap();
/// cart.set_data(doc! { items: [{ sku: "a", qty: 1 }] })?;
/// cart.update(&field("items.sku").eq("a"), &doc! { "items.$": { "$inc": { qty: 1 } } })?;
/// ```
#[derive(Clone)]
pub struct QuillDocument {
    inner: Arc<QuillDocumentInner>,
}

pub(crate) struct QuillDocumentInner {
    id: String,
    name: String,
    data: Atomic<Option<Document>>,
    binding: Atomic<Binding>,
    sink: Atomic<Arc<dyn MutationSink>>,
    dropped: AtomicBool,
    config: QuillConfig,
    event_bus: QuillEventBus<DocumentEventInfo, DocumentEventListener>,
    deferred: DeferredQueue,
    registry: Weak<DocumentFactoryInner>,
}

impl QuillDocument {
    pub(crate) fn new(
        name: &str,
        binding: Binding,
        config: QuillConfig,
        deferred: DeferredQueue,
        registry: Weak<DocumentFactoryInner>,
    ) -> Self {
        let sink = binding.sink();
        QuillDocument {
            inner: Arc::new(QuillDocumentInner {
                id: uuid::Uuid::new_v4().to_string(),
                name: name.to_string(),
                data: atomic(Some(Document::new())),
                binding: atomic(binding),
                sink: atomic(sink),
                dropped: AtomicBool::new(false),
                config,
                event_bus: QuillEventBus::new(),
                deferred,
                registry,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Unique id of this instance; a document recreated under the same name
    /// gets a new one.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn is_dropped(&self) -> bool {
        self.inner.dropped.load(Ordering::Acquire)
    }

    /// Whether both handles refer to the same document instance.
    pub fn same_instance(&self, other: &QuillDocument) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Replaces the data tree, decoupling the input as configured on the
    /// database. `None` is ignored.
    ///
    /// On an observed document the new tree is applied as a patch, with an
    /// `$unset` for every top-level key that disappeared, so the observer
    /// sees granular edits. Keys starting with the reserved prefix are kept.
    pub fn set_data(&self, data: impl Into<Option<Document>>) -> QuillResult<()> {
        let options = SetDataOptions::new(self.inner.config.decouple());
        self.set_data_with_options(data, options)
    }

    pub fn set_data_with_options(&self, data: impl Into<Option<Document>>, options: SetDataOptions) -> QuillResult<()> {
        let incoming = match data.into() {
            Some(incoming) => incoming,
            None => return Ok(()),
        };
        let incoming = if options.decouple { incoming.deep_copy() } else { incoming };

        let observed = self.inner.binding.read_with(|binding| binding.is_observed());
        let sink = self.current_sink();
        let snapshot = self.inner.data.write_with(|data| -> QuillResult<Document> {
            let current = match data.as_mut() {
                Some(current) => current,
                None => return Err(self.dropped_error("set data on")),
            };

            if observed {
                let patch = diff_unset(current, &incoming, &self.inner.config.reserved_key_prefix());
                apply_patch(sink.as_ref(), current, &patch, &all(), &UpdateOptions::default())?;
            } else {
                *current = incoming;
            }
            Ok(current.clone())
        })?;

        self.emit_change(ChangeType::SetData, snapshot);
        Ok(())
    }

    /// Returns a copy of the data when it matches `filter`.
    ///
    /// A dropped document has no data and never matches.
    pub fn find(&self, filter: &Filter) -> QuillResult<Option<Document>> {
        let data = self.inner.data.read_with(|data| data.clone());
        match data {
            Some(data) if filter.apply(&data)? => Ok(Some(data)),
            _ => Ok(None),
        }
    }

    /// Queries the array at `path` of the data, when the data matches
    /// `match_filter`, with `sub_filter`.
    ///
    /// A missing path is not an error; with `options.stats` it is reported
    /// through [SubDocumentStats::path_found](crate::document::SubDocumentStats).
    pub fn find_sub(
        &self,
        match_filter: &Filter,
        path: &str,
        sub_filter: &Filter,
        options: &SubDocumentOptions,
    ) -> QuillResult<SubDocuments> {
        let parents: Vec<Document> = self.find(match_filter)?.into_iter().collect();
        find_sub_documents(&self.inner.id, parents, path, sub_filter, options)
    }

    /// Applies `patch` and returns whether anything changed. `query` selects
    /// the array elements targeted by positional keys such as `"items.$"`.
    pub fn update(&self, query: &Filter, patch: &Document) -> QuillResult<bool> {
        self.update_with_options(query, patch, &UpdateOptions::default())
    }

    pub fn update_with_options(&self, query: &Filter, patch: &Document, options: &UpdateOptions) -> QuillResult<bool> {
        let sink = self.current_sink();
        let snapshot = self.inner.data.write_with(|data| -> QuillResult<Option<Document>> {
            let current = match data.as_mut() {
                Some(current) => current,
                None => return Err(self.dropped_error("update")),
            };

            if apply_patch(sink.as_ref(), current, patch, query, options)? {
                Ok(Some(current.clone()))
            } else {
                Ok(None)
            }
        })?;

        match snapshot {
            Some(snapshot) => {
                self.emit_change(ChangeType::Update, snapshot);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drops the document. See [QuillDocument::drop_with_callback].
    pub fn drop(&self) -> bool {
        self.drop_document(None)
    }

    /// Drops the document: it leaves the registry, loses its data, publishes
    /// `Drop`, calls `callback` with `(None, true)` and loses its listeners.
    ///
    /// Returns `true` when the document is dropped, including when it already
    /// was (then nothing happens and `callback` is not called). Returns
    /// `false` when its registry no longer knows it.
    pub fn drop_with_callback<F>(&self, callback: F) -> bool
    where
        F: FnOnce(Option<QuillError>, bool) + 'static,
    {
        self.drop_document(Some(Box::new(callback)))
    }

    pub fn subscribe(&self, listener: DocumentEventListener) -> QuillResult<SubscriberRef> {
        if self.is_dropped() {
            return Err(self.dropped_error("subscribe to"));
        }
        self.inner.event_bus.register(listener)
    }

    pub fn unsubscribe(&self, subscriber: SubscriberRef) -> QuillResult<()> {
        self.inner.event_bus.deregister(subscriber)
    }

    /// Routes every further edit through `observer`.
    pub fn link(&self, observer: Arc<dyn BindingObserver>) {
        self.set_binding(Binding::Observed(observer));
    }

    /// Goes back to silent in-place edits.
    pub fn unlink(&self) {
        self.set_binding(Binding::Direct);
    }

    pub fn is_linked(&self) -> bool {
        self.inner.binding.read_with(|binding| binding.is_observed())
    }

    pub(crate) fn downgrade(&self) -> Weak<QuillDocumentInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(inner: &Weak<QuillDocumentInner>) -> Option<QuillDocument> {
        inner.upgrade().map(|inner| QuillDocument { inner })
    }

    fn set_binding(&self, binding: Binding) {
        log::debug!("Document {} binding set to {:?}", self.inner.name, binding);
        let sink = binding.sink();
        self.inner.binding.write_with(|it| *it = binding);
        self.inner.sink.write_with(|it| *it = sink);
    }

    fn current_sink(&self) -> Arc<dyn MutationSink> {
        self.inner.sink.read_with(|sink| sink.clone())
    }

    fn emit_change(&self, change_type: ChangeType, snapshot: Document) {
        let immediate = DocumentEventInfo::change(DocumentEvents::ImmediateChange, change_type, snapshot, &self.inner.name);
        let deferred = immediate.with_event_type(DocumentEvents::Change);

        if let Err(e) = self.inner.event_bus.publish(immediate) {
            log::warn!("Listener of document {} failed on immediate change: {}", self.inner.name, e);
        }

        let event_bus = self.inner.event_bus.clone();
        let name = self.inner.name.clone();
        self.inner.deferred.defer(&self.inner.id, DocumentEvents::Change.key(), move || {
            if let Err(e) = event_bus.publish(deferred) {
                log::warn!("Listener of document {} failed on change: {}", name, e);
            }
        });
    }

    fn drop_document(&self, callback: Option<Box<dyn FnOnce(Option<QuillError>, bool)>>) -> bool {
        if self.is_dropped() {
            return true;
        }

        let removed = match self.inner.registry.upgrade() {
            Some(registry) => registry.remove_document(self),
            None => false,
        };
        if !removed {
            log::warn!("Document {} is not registered, cannot drop it", self.inner.name);
            return self.is_dropped();
        }

        self.inner.dropped.store(true, Ordering::Release);
        self.inner.data.write_with(|data| *data = None);
        self.inner.deferred.cancel(&self.inner.id);
        log::debug!("Dropped document {}", self.inner.name);

        if let Err(e) = self.inner.event_bus.publish(DocumentEventInfo::dropped(&self.inner.name)) {
            log::warn!("Listener of document {} failed on drop: {}", self.inner.name, e);
        }

        if let Some(callback) = callback {
            callback(None, true);
        }

        if let Err(e) = self.inner.event_bus.close() {
            log::warn!("Failed to clear listeners of document {}: {}", self.inner.name, e);
        }
        true
    }

    fn dropped_error(&self, action: &str) -> QuillError {
        log::error!("Cannot {} dropped document {}", action, self.inner.name);
        QuillError::new(
            &format!("Cannot {} dropped document {}", action, self.inner.name),
            ErrorKind::DocumentDropped,
        )
    }
}

impl Debug for QuillDocument {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuillDocument")
            .field("name", &self.inner.name)
            .field("id", &self.inner.id)
            .field("dropped", &self.is_dropped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Value;
    use crate::doc;
    use crate::filter::field;
    use crate::update::{just_once, RecordingObserver};
    use parking_lot::Mutex;

    fn standalone(binding: Binding) -> (QuillDocument, DeferredQueue) {
        let deferred = DeferredQueue::new();
        let document = QuillDocument::new("test", binding, QuillConfig::new(), deferred.clone(), Weak::new());
        (document, deferred)
    }

    fn record_events(document: &QuillDocument) -> Arc<Mutex<Vec<(DocumentEvents, Option<ChangeType>)>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        document
            .subscribe(DocumentEventListener::new(move |event: DocumentEventInfo| {
                sink.lock().push((event.event_type(), event.change_type()));
                Ok(())
            }))
            .unwrap();
        events
    }

    #[test]
    fn test_new_document_is_empty() {
        let (document, _) = standalone(Binding::Direct);
        assert_eq!(document.name(), "test");
        assert!(!document.is_dropped());
        assert!(!document.is_linked());
        assert_eq!(document.find(&all()).unwrap(), Some(Document::new()));
    }

    #[test]
    fn test_set_data_direct_replaces_tree() {
        let (document, _) = standalone(Binding::Direct);
        document.set_data(doc! { a: 1, b: 2 }).unwrap();
        document.set_data(doc! { c: 3 }).unwrap();
        assert_eq!(document.find(&all()).unwrap(), Some(doc! { c: 3 }));
    }

    #[test]
    fn test_set_data_none_is_noop() {
        let (document, deferred) = standalone(Binding::Direct);
        let events = record_events(&document);
        document.set_data(None).unwrap();
        assert!(events.lock().is_empty());
        assert_eq!(deferred.pending(), 0);
    }

    #[test]
    fn test_set_data_observed_unsets_stale_keys() {
        let observer = Arc::new(RecordingObserver::default());
        let (document, _) = standalone(Binding::Observed(observer.clone()));
        document.set_data(doc! { a: 1, b: 2, "__view": 1 }).unwrap();
        document.set_data(doc! { a: 1, c: 3 }).unwrap();

        assert_eq!(document.find(&all()).unwrap(), Some(doc! { a: 1, c: 3, "__view": 1 }));
        let events = observer.events();
        assert!(events.contains(&"unset :b".to_string()));
        assert!(!events.iter().any(|e| e.contains("unset :__view")));
    }

    #[test]
    fn test_set_data_emits_immediate_then_deferred_change() {
        let (document, deferred) = standalone(Binding::Direct);
        let events = record_events(&document);

        document.set_data(doc! { a: 1 }).unwrap();
        assert_eq!(*events.lock(), vec![(DocumentEvents::ImmediateChange, Some(ChangeType::SetData))]);

        assert_eq!(deferred.flush(), 1);
        assert_eq!(
            events.lock().last(),
            Some(&(DocumentEvents::Change, Some(ChangeType::SetData)))
        );
    }

    #[test]
    fn test_update_emits_only_on_change() {
        let (document, deferred) = standalone(Binding::Direct);
        document.set_data(doc! { count: 1 }).unwrap();
        deferred.flush();
        let events = record_events(&document);

        assert!(!document.update(&all(), &doc! { count: 1 }).unwrap());
        assert!(events.lock().is_empty());
        assert_eq!(deferred.pending(), 0);

        assert!(document.update(&all(), &doc! { "$inc": { count: 2 } }).unwrap());
        assert_eq!(*events.lock(), vec![(DocumentEvents::ImmediateChange, Some(ChangeType::Update))]);
        assert_eq!(deferred.pending(), 1);
        assert_eq!(document.find(&all()).unwrap(), Some(doc! { count: 3 }));
    }

    #[test]
    fn test_changes_coalesce_until_flush() {
        let (document, deferred) = standalone(Binding::Direct);
        let last = Arc::new(Mutex::new(Vec::new()));
        let sink = last.clone();
        document
            .subscribe(DocumentEventListener::new(move |event: DocumentEventInfo| {
                if event.event_type() == DocumentEvents::Change {
                    sink.lock().push(event.data().cloned());
                }
                Ok(())
            }))
            .unwrap();

        for n in 1..=3 {
            document.update(&all(), &doc! { n: n }).unwrap();
        }
        assert_eq!(deferred.flush(), 1);
        assert_eq!(*last.lock(), vec![Some(doc! { n: 3 })]);
    }

    #[test]
    fn test_failed_update_leaves_data() {
        let (document, deferred) = standalone(Binding::Direct);
        document.set_data(doc! { name: "x" }).unwrap();
        deferred.flush();

        let err = document.update(&all(), &doc! { "$inc": { name: 1 } }).unwrap_err();
        assert_eq!(*err.kind(), ErrorKind::InvalidDataType);
        assert_eq!(document.find(&all()).unwrap(), Some(doc! { name: "x" }));
        assert_eq!(deferred.pending(), 0);
    }

    #[test]
    fn test_positional_update_just_once() {
        let (document, _) = standalone(Binding::Direct);
        document.set_data(doc! { items: [{ k: 1, v: 0 }, { k: 1, v: 0 }] }).unwrap();
        document
            .update_with_options(&field("items.k").eq(1), &doc! { "items.$": { v: 5 } }, &just_once())
            .unwrap();
        assert_eq!(
            document.find(&all()).unwrap(),
            Some(doc! { items: [{ k: 1, v: 5 }, { k: 1, v: 0 }] })
        );
    }

    #[test]
    fn test_find_applies_filter() {
        let (document, _) = standalone(Binding::Direct);
        document.set_data(doc! { kind: "cart" }).unwrap();
        assert!(document.find(&field("kind").eq("cart")).unwrap().is_some());
        assert!(document.find(&field("kind").eq("order")).unwrap().is_none());
    }

    #[test]
    fn test_find_returns_independent_copy() {
        let (document, _) = standalone(Binding::Direct);
        document.set_data(doc! { a: 1 }).unwrap();
        let mut copy = document.find(&all()).unwrap().unwrap();
        copy.insert("a", 99);
        assert_eq!(document.find(&all()).unwrap(), Some(doc! { a: 1 }));
    }

    #[test]
    fn test_find_sub() {
        let (document, _) = standalone(Binding::Direct);
        document.set_data(doc! { items: [{ sku: "a" }, { sku: "b" }] }).unwrap();
        let result = document
            .find_sub(&all(), "items", &field("sku").eq("b"), &SubDocumentOptions::new())
            .unwrap();
        assert_eq!(result.single(), Some(&Value::from(doc! { sku: "b" })));
    }

    #[test]
    fn test_link_switches_sink() {
        let observer = Arc::new(RecordingObserver::default());
        let (document, _) = standalone(Binding::Direct);

        document.update(&all(), &doc! { a: 1 }).unwrap();
        document.link(observer.clone());
        assert!(document.is_linked());
        document.update(&all(), &doc! { b: 2 }).unwrap();
        document.unlink();
        document.update(&all(), &doc! { c: 3 }).unwrap();

        assert_eq!(observer.events(), vec!["set :b=2"]);
    }

    #[test]
    fn test_drop_without_registry_fails() {
        let (document, _) = standalone(Binding::Direct);
        assert!(!document.drop());
        assert!(!document.is_dropped());
        assert!(document.set_data(doc! { a: 1 }).is_ok());
    }
}
