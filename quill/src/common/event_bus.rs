use crate::common::QUILL_EVENT;
use crate::errors::{ErrorKind, QuillError, QuillResult};
use basu::error::BasuError;
use basu::event::Event;
use basu::{EventBus, Handle, HandlerId};
use std::marker::PhantomData;
use std::sync::Arc;

/// Synchronous publish/subscribe channel for one kind of event.
///
/// Documents own a bus for their own events and the database owns one for
/// registry events. Listeners run on the publishing thread, in registration
/// order; callers must not hold their own locks while publishing.
///
/// ```ignore
/// let bus: QuillEventBus<DocumentEventInfo, DocumentEventListener> = QuillEventBus::new();
/// let subscriber = bus.register(listener)?;
/// bus.publish(info)?;
/// bus.deregister(subscriber)?;
/// ```
#[derive(Clone)]
pub struct QuillEventBus<E, L> {
    inner: Arc<QuillEventBusInner<E, L>>,
}

impl<E, L> Default for QuillEventBus<E, L>
where
    L: Handle<E> + 'static,
    E: Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E, L> QuillEventBus<E, L>
where
    L: Handle<E> + 'static,
    E: Send + Sync,
{
    pub fn new() -> Self {
        QuillEventBus {
            inner: Arc::new(QuillEventBusInner::new()),
        }
    }

    pub fn register(&self, listener: L) -> QuillResult<SubscriberRef> {
        self.inner.register(listener)
    }

    pub fn deregister(&self, subscriber: SubscriberRef) -> QuillResult<()> {
        self.inner.deregister(subscriber)
    }

    /// Delivers the event to every registered listener. Publishing with no
    /// listeners is a no-op.
    pub fn publish(&self, event: E) -> QuillResult<()> {
        self.inner.publish(event)
    }

    /// Removes every listener.
    pub fn close(&self) -> QuillResult<()> {
        self.inner.close()
    }

    pub fn has_listeners(&self) -> bool {
        self.inner.has_listeners()
    }
}

/// Handle returned by a subscription, used to unsubscribe later.
#[derive(Debug)]
pub struct SubscriberRef {
    pub(crate) inner: HandlerId,
}

impl SubscriberRef {
    pub fn new(inner: HandlerId) -> Self {
        SubscriberRef { inner }
    }
}

struct QuillEventBusInner<E, L> {
    event_bus: EventBus<E>,
    phantom_data: PhantomData<L>,
}

impl<E, L> QuillEventBusInner<E, L>
where
    L: Handle<E> + 'static,
    E: Send + Sync,
{
    fn new() -> Self {
        QuillEventBusInner {
            event_bus: EventBus::new(),
            phantom_data: PhantomData,
        }
    }

    fn register(&self, listener: L) -> QuillResult<SubscriberRef> {
        match self.event_bus.subscribe(QUILL_EVENT, Box::new(listener)) {
            Ok(id) => Ok(SubscriberRef::new(id)),
            Err(e) => Err(Self::quill_error(e)),
        }
    }

    fn deregister(&self, subscriber: SubscriberRef) -> QuillResult<()> {
        self.event_bus
            .unsubscribe(QUILL_EVENT, &subscriber.inner)
            .map_err(Self::quill_error)
    }

    fn publish(&self, event: E) -> QuillResult<()> {
        match self.event_bus.get_handler_count(QUILL_EVENT) {
            Ok(0) => return Ok(()),
            Ok(_) => {}
            Err(BasuError::EventTypeNotFOUND) => return Ok(()),
            Err(e) => return Err(Self::quill_error(e)),
        }

        let event = Event::new(event);
        self.event_bus
            .publish(QUILL_EVENT, &event)
            .map_err(Self::quill_error)
    }

    fn close(&self) -> QuillResult<()> {
        self.event_bus.clear().map_err(Self::quill_error)
    }

    fn has_listeners(&self) -> bool {
        match self.event_bus.get_handler_count(QUILL_EVENT) {
            Ok(count) => count > 0,
            Err(BasuError::EventTypeNotFOUND) => false,
            Err(e) => {
                log::warn!("Failed to count event listeners: {}", e);
                false
            }
        }
    }

    fn quill_error(e: BasuError) -> QuillError {
        let message = match e {
            BasuError::EventTypeNotFOUND => "Event bus error: no listener was ever registered".to_string(),
            BasuError::MutexPoisoned => "Event bus error: internal mutex poisoned".to_string(),
            BasuError::HandlerError(e) => format!("Event listener failed: {}", e),
        };
        log::error!("{}", message);
        QuillError::new(&message, ErrorKind::EventError)
    }
}
