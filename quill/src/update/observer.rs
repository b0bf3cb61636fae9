use crate::common::Value;

/// Receives fine-grained notifications for edits made to a linked document.
///
/// This is the contract an embedding UI layer implements to keep bound views
/// in sync. Every call names the `scope`, the dotted path of the container
/// that changed (`""` for the root document, `"items"` for an array field,
/// `"items.2"` for the third element of that array).
///
/// Callbacks run synchronously while the document is being edited and hold
/// its write lock, so an observer must not call back into the same document.
pub trait BindingObserver: Send + Sync {
    /// A property was created or overwritten. `old` is `None` for a new key.
    fn property_set(&self, scope: &str, key: &str, old: Option<&Value>, new: &Value) {
        let _ = (scope, key, old, new);
    }

    fn property_removed(&self, scope: &str, key: &str, old: &Value) {
        let _ = (scope, key, old);
    }

    /// `value` now lives at `index` of the array at `scope`.
    fn item_inserted(&self, scope: &str, index: usize, value: &Value) {
        let _ = (scope, index, value);
    }

    fn item_removed(&self, scope: &str, index: usize, value: &Value) {
        let _ = (scope, index, value);
    }

    /// The element at `from` now lives at `to`.
    fn item_moved(&self, scope: &str, from: usize, to: usize) {
        let _ = (scope, from, to);
    }
}

/// An observer that ignores every notification.
pub struct NoopObserver;

impl BindingObserver for NoopObserver {}

/// Records every notification as a short string, for assertions.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingObserver {
    pub(crate) events: parking_lot::Mutex<Vec<String>>,
}

#[cfg(test)]
impl RecordingObserver {
    pub(crate) fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }
}

#[cfg(test)]
impl BindingObserver for RecordingObserver {
    fn property_set(&self, scope: &str, key: &str, _old: Option<&Value>, new: &Value) {
        self.events.lock().push(format!("set {}:{}={}", scope, key, new));
    }

    fn property_removed(&self, scope: &str, key: &str, _old: &Value) {
        self.events.lock().push(format!("unset {}:{}", scope, key));
    }

    fn item_inserted(&self, scope: &str, index: usize, value: &Value) {
        self.events.lock().push(format!("insert {}[{}]={}", scope, index, value));
    }

    fn item_removed(&self, scope: &str, index: usize, _value: &Value) {
        self.events.lock().push(format!("remove {}[{}]", scope, index));
    }

    fn item_moved(&self, scope: &str, from: usize, to: usize) {
        self.events.lock().push(format!("move {}[{}->{}]", scope, from, to));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_observer_accepts_everything() {
        let observer = NoopObserver;
        observer.property_set("", "a", None, &Value::I64(1));
        observer.property_removed("", "a", &Value::I64(1));
        observer.item_inserted("list", 0, &Value::Null);
        observer.item_removed("list", 0, &Value::Null);
        observer.item_moved("list", 0, 1);
    }
}
