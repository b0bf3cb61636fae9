use crate::collection::Document;
use crate::common::Value;
use crate::errors::QuillResult;
use crate::update::BindingObserver;
use std::sync::Arc;

/// The primitive edits every update operator is reduced to.
///
/// A document picks one sink when it is created (or re-linked) and routes all
/// edits through it. [DirectSink] edits the tree in place; [ObservedSink]
/// makes the same edit and then tells a [BindingObserver] about it.
///
/// `scope` is the dotted path of the container being edited, relative to the
/// document root.
pub trait MutationSink: Send + Sync {
    fn set_property(&self, scope: &str, doc: &mut Document, key: &str, value: Value);

    /// Adds `delta` to `doc[key]`. A missing field counts as 0.
    fn increment(&self, scope: &str, doc: &mut Document, key: &str, delta: &Value) -> QuillResult<()>;

    /// Multiplies `doc[key]` by `factor`. A missing field becomes 0.
    fn multiply(&self, scope: &str, doc: &mut Document, key: &str, factor: &Value) -> QuillResult<()>;

    /// Moves the value of `old_key` to `new_key`. No-op when `old_key` is missing.
    fn rename(&self, scope: &str, doc: &mut Document, old_key: &str, new_key: &str);

    fn remove_property(&self, scope: &str, doc: &mut Document, key: &str);

    fn append_to_end(&self, scope: &str, array: &mut Vec<Value>, value: Value);

    /// Inserts at `index` when it is inside the array, otherwise appends.
    fn insert_at(&self, scope: &str, array: &mut Vec<Value>, index: usize, value: Value);

    fn remove_at(&self, scope: &str, array: &mut Vec<Value>, index: usize);

    /// Removes the element at `from` and re-inserts it at `to`, clamped to
    /// the end of the array.
    fn move_index(&self, scope: &str, array: &mut Vec<Value>, from: usize, to: usize);

    fn is_observed(&self) -> bool;
}

fn native_set(doc: &mut Document, key: &str, value: Value) -> Option<Value> {
    doc.insert(key, value)
}

fn native_increment(doc: &mut Document, key: &str, delta: &Value) -> QuillResult<(Option<Value>, Value)> {
    let old = doc.get_field(key).cloned();
    let base = match &old {
        None | Some(Value::Null) => Value::I64(0),
        Some(v) => v.clone(),
    };
    let new = base.add(delta)?;
    doc.insert(key, new.clone());
    Ok((old, new))
}

fn native_multiply(doc: &mut Document, key: &str, factor: &Value) -> QuillResult<(Option<Value>, Value)> {
    let old = doc.get_field(key).cloned();
    let new = match &old {
        // validates the factor even though the result is fixed
        None | Some(Value::Null) => Value::I64(0).multiply(factor)?,
        Some(v) => v.multiply(factor)?,
    };
    doc.insert(key, new.clone());
    Ok((old, new))
}

fn native_insert_at(array: &mut Vec<Value>, index: usize, value: Value) -> usize {
    if index < array.len() {
        array.insert(index, value);
        index
    } else {
        array.push(value);
        array.len() - 1
    }
}

fn native_move(array: &mut Vec<Value>, from: usize, to: usize) -> Option<usize> {
    if from >= array.len() {
        return None;
    }
    let item = array.remove(from);
    let to = to.min(array.len());
    array.insert(to, item);
    Some(to)
}

/// Edits the tree in place without telling anyone.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectSink;

impl MutationSink for DirectSink {
    fn set_property(&self, scope: &str, doc: &mut Document, key: &str, value: Value) {
        log::debug!("Setting non-data-bound property {}:{}", scope, key);
        native_set(doc, key, value);
    }

    fn increment(&self, scope: &str, doc: &mut Document, key: &str, delta: &Value) -> QuillResult<()> {
        log::debug!("Incrementing non-data-bound property {}:{} by {}", scope, key, delta);
        native_increment(doc, key, delta).map(|_| ())
    }

    fn multiply(&self, scope: &str, doc: &mut Document, key: &str, factor: &Value) -> QuillResult<()> {
        log::debug!("Multiplying non-data-bound property {}:{} by {}", scope, key, factor);
        native_multiply(doc, key, factor).map(|_| ())
    }

    fn rename(&self, scope: &str, doc: &mut Document, old_key: &str, new_key: &str) {
        log::debug!("Renaming non-data-bound property {}:{} to {}", scope, old_key, new_key);
        if let Some(value) = doc.remove_field(old_key) {
            native_set(doc, new_key, value);
        }
    }

    fn remove_property(&self, scope: &str, doc: &mut Document, key: &str) {
        log::debug!("Removing non-data-bound property {}:{}", scope, key);
        doc.remove_field(key);
    }

    fn append_to_end(&self, scope: &str, array: &mut Vec<Value>, value: Value) {
        log::debug!("Appending to non-data-bound array {}", scope);
        array.push(value);
    }

    fn insert_at(&self, scope: &str, array: &mut Vec<Value>, index: usize, value: Value) {
        log::debug!("Inserting into non-data-bound array {} at {}", scope, index);
        native_insert_at(array, index, value);
    }

    fn remove_at(&self, scope: &str, array: &mut Vec<Value>, index: usize) {
        log::debug!("Removing non-data-bound array {} index {}", scope, index);
        if index < array.len() {
            array.remove(index);
        }
    }

    fn move_index(&self, scope: &str, array: &mut Vec<Value>, from: usize, to: usize) {
        log::debug!("Moving non-data-bound array {} index from {} to {}", scope, from, to);
        native_move(array, from, to);
    }

    fn is_observed(&self) -> bool {
        false
    }
}

/// Edits the tree in place, then reports each edit to a [BindingObserver].
#[derive(Clone)]
pub struct ObservedSink {
    observer: Arc<dyn BindingObserver>,
}

impl ObservedSink {
    pub fn new(observer: Arc<dyn BindingObserver>) -> Self {
        ObservedSink { observer }
    }

    pub fn observer(&self) -> &Arc<dyn BindingObserver> {
        &self.observer
    }
}

impl MutationSink for ObservedSink {
    fn set_property(&self, scope: &str, doc: &mut Document, key: &str, value: Value) {
        log::debug!("Setting data-bound property {}:{}", scope, key);
        let old = native_set(doc, key, value.clone());
        self.observer.property_set(scope, key, old.as_ref(), &value);
    }

    fn increment(&self, scope: &str, doc: &mut Document, key: &str, delta: &Value) -> QuillResult<()> {
        log::debug!("Incrementing data-bound property {}:{} by {}", scope, key, delta);
        let (old, new) = native_increment(doc, key, delta)?;
        self.observer.property_set(scope, key, old.as_ref(), &new);
        Ok(())
    }

    fn multiply(&self, scope: &str, doc: &mut Document, key: &str, factor: &Value) -> QuillResult<()> {
        log::debug!("Multiplying data-bound property {}:{} by {}", scope, key, factor);
        let (old, new) = native_multiply(doc, key, factor)?;
        self.observer.property_set(scope, key, old.as_ref(), &new);
        Ok(())
    }

    fn rename(&self, scope: &str, doc: &mut Document, old_key: &str, new_key: &str) {
        log::debug!("Renaming data-bound property {}:{} to {}", scope, old_key, new_key);
        if old_key == new_key {
            return;
        }
        if let Some(value) = doc.get_field(old_key).cloned() {
            self.set_property(scope, doc, new_key, value);
            self.remove_property(scope, doc, old_key);
        }
    }

    fn remove_property(&self, scope: &str, doc: &mut Document, key: &str) {
        log::debug!("Removing data-bound property {}:{}", scope, key);
        if let Some(old) = doc.remove_field(key) {
            self.observer.property_removed(scope, key, &old);
        }
    }

    fn append_to_end(&self, scope: &str, array: &mut Vec<Value>, value: Value) {
        log::debug!("Appending to data-bound array {}", scope);
        array.push(value);
        let index = array.len() - 1;
        self.observer.item_inserted(scope, index, &array[index]);
    }

    fn insert_at(&self, scope: &str, array: &mut Vec<Value>, index: usize, value: Value) {
        log::debug!("Inserting into data-bound array {} at {}", scope, index);
        let index = native_insert_at(array, index, value);
        self.observer.item_inserted(scope, index, &array[index]);
    }

    fn remove_at(&self, scope: &str, array: &mut Vec<Value>, index: usize) {
        log::debug!("Removing data-bound array {} index {}", scope, index);
        if index < array.len() {
            let removed = array.remove(index);
            self.observer.item_removed(scope, index, &removed);
        }
    }

    fn move_index(&self, scope: &str, array: &mut Vec<Value>, from: usize, to: usize) {
        log::debug!("Moving data-bound array {} index from {} to {}", scope, from, to);
        if let Some(to) = native_move(array, from, to) {
            self.observer.item_moved(scope, from, to);
        }
    }

    fn is_observed(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;
    use crate::errors::ErrorKind;
    use crate::update::RecordingObserver;

    fn observed() -> (ObservedSink, Arc<RecordingObserver>) {
        let observer = Arc::new(RecordingObserver::default());
        (ObservedSink::new(observer.clone()), observer)
    }

    fn numbers() -> Vec<Value> {
        vec![Value::from(1), Value::from(2), Value::from(3)]
    }

    #[test]
    fn test_direct_property_edits() {
        let sink = DirectSink;
        let mut doc = doc! { a: 1, b: 2 };

        sink.set_property("", &mut doc, "c", Value::from(3));
        sink.increment("", &mut doc, "a", &Value::from(5)).unwrap();
        sink.multiply("", &mut doc, "b", &Value::from(1.5)).unwrap();
        sink.rename("", &mut doc, "c", "d");
        sink.remove_property("", &mut doc, "missing");

        assert_eq!(doc, doc! { a: 6, b: 3.0, d: 3 });
        assert!(!sink.is_observed());
    }

    #[test]
    fn test_increment_and_multiply_missing_fields() {
        let sink = DirectSink;
        let mut doc = Document::new();

        sink.increment("", &mut doc, "count", &Value::from(2)).unwrap();
        sink.multiply("", &mut doc, "total", &Value::from(10)).unwrap();

        assert_eq!(doc, doc! { count: 2, total: 0 });
    }

    #[test]
    fn test_increment_rejects_non_numbers() {
        let sink = DirectSink;
        let mut doc = doc! { name: "x" };

        let err = sink.increment("", &mut doc, "name", &Value::from(1)).unwrap_err();
        assert_eq!(*err.kind(), ErrorKind::InvalidDataType);

        let err = sink.multiply("", &mut doc, "missing", &Value::from("2")).unwrap_err();
        assert_eq!(*err.kind(), ErrorKind::InvalidDataType);
        assert_eq!(doc, doc! { name: "x" });
    }

    #[test]
    fn test_rename_missing_key_is_noop() {
        let sink = DirectSink;
        let mut doc = doc! { a: 1 };
        sink.rename("", &mut doc, "b", "c");
        assert_eq!(doc, doc! { a: 1 });
    }

    #[test]
    fn test_direct_array_edits() {
        let sink = DirectSink;
        let mut array = numbers();

        sink.append_to_end("list", &mut array, Value::from(4));
        sink.insert_at("list", &mut array, 0, Value::from(0));
        sink.insert_at("list", &mut array, 99, Value::from(5));
        assert_eq!(array, Value::from(vec![0, 1, 2, 3, 4, 5]).as_array().unwrap().clone());

        sink.remove_at("list", &mut array, 0);
        sink.remove_at("list", &mut array, 99);
        assert_eq!(array.len(), 5);

        sink.move_index("list", &mut array, 0, 2);
        assert_eq!(array, Value::from(vec![2, 3, 1, 4, 5]).as_array().unwrap().clone());

        sink.move_index("list", &mut array, 1, 99);
        assert_eq!(array, Value::from(vec![2, 1, 4, 5, 3]).as_array().unwrap().clone());
    }

    #[test]
    fn test_insert_at_boundary_appends() {
        let sink = DirectSink;
        let mut array = numbers();
        sink.insert_at("list", &mut array, 3, Value::from(9));
        assert_eq!(array[3], Value::from(9));
    }

    #[test]
    fn test_observed_property_edits_notify() {
        let (sink, observer) = observed();
        let mut doc = doc! { a: 1 };

        sink.set_property("", &mut doc, "a", Value::from(2));
        sink.increment("", &mut doc, "a", &Value::from(1)).unwrap();
        sink.multiply("", &mut doc, "a", &Value::from(2)).unwrap();
        sink.rename("", &mut doc, "a", "b");
        sink.remove_property("", &mut doc, "b");
        sink.remove_property("", &mut doc, "b");

        assert!(doc.is_empty());
        assert_eq!(
            observer.events(),
            vec!["set :a=2", "set :a=3", "set :a=6", "set :b=6", "unset :a", "unset :b"]
        );
        assert!(sink.is_observed());
    }

    #[test]
    fn test_observed_array_edits_notify() {
        let (sink, observer) = observed();
        let mut array = numbers();

        sink.append_to_end("list", &mut array, Value::from(4));
        sink.insert_at("list", &mut array, 10, Value::from(5));
        sink.insert_at("list", &mut array, 1, Value::from(7));
        sink.remove_at("list", &mut array, 0);
        sink.move_index("list", &mut array, 0, 10);
        sink.move_index("list", &mut array, 10, 0);

        assert_eq!(
            observer.events(),
            vec![
                "insert list[3]=4",
                "insert list[4]=5",
                "insert list[1]=7",
                "remove list[0]",
                "move list[0->4]",
            ]
        );
        assert_eq!(array, Value::from(vec![2, 3, 4, 5, 7]).as_array().unwrap().clone());
    }

    #[test]
    fn test_observed_failure_does_not_notify() {
        let (sink, observer) = observed();
        let mut doc = doc! { a: "x" };
        assert!(sink.increment("", &mut doc, "a", &Value::from(1)).is_err());
        assert!(observer.events().is_empty());
    }
}
