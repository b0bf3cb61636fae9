use indexmap::IndexMap;
use parking_lot::Mutex;
use std::sync::Arc;

type DeferredTask = Box<dyn FnOnce() + Send>;

/// Slot key of a pending emission.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeferredKey {
    recipient: String,
    event: String,
}

impl DeferredKey {
    pub fn new(recipient: &str, event: &str) -> Self {
        DeferredKey {
            recipient: recipient.to_string(),
            event: event.to_string(),
        }
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn event(&self) -> &str {
        &self.event
    }
}

/// Coalescing queue of emissions waiting for the next flush.
///
/// There is one slot per `(recipient, event)`. Deferring into an occupied
/// slot replaces the pending task but keeps the slot's place in the queue,
/// so a burst of changes to one document is delivered once with the last
/// payload.
#[derive(Clone, Default)]
pub struct DeferredQueue {
    pending: Arc<Mutex<IndexMap<DeferredKey, DeferredTask>>>,
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn defer<F>(&self, recipient: &str, event: &str, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let key = DeferredKey::new(recipient, event);
        let replaced = self.pending.lock().insert(key, Box::new(task)).is_some();
        if replaced {
            log::trace!("Coalesced pending {} event for {}", event, recipient);
        }
    }

    /// Runs every pending task in queue order and returns how many ran.
    ///
    /// Tasks run outside the queue lock, so a task may defer again; such
    /// emissions wait for the following flush.
    pub fn flush(&self) -> usize {
        let drained: Vec<(DeferredKey, DeferredTask)> = {
            let mut pending = self.pending.lock();
            pending.drain(..).collect()
        };

        let count = drained.len();
        for (key, task) in drained {
            log::trace!("Delivering deferred {} event for {}", key.event, key.recipient);
            task();
        }
        count
    }

    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_pending(&self, recipient: &str, event: &str) -> bool {
        self.pending.lock().contains_key(&DeferredKey::new(recipient, event))
    }

    /// Discards every pending task addressed to `recipient`.
    pub fn cancel(&self, recipient: &str) -> usize {
        let mut pending = self.pending.lock();
        let before = pending.len();
        pending.retain(|key, _| key.recipient != recipient);
        before - pending.len()
    }

    pub fn clear(&self) {
        self.pending.lock().clear();
    }
}
