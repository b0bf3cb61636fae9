use crate::collection::Document;
use crate::common::{FieldPath, Value, FIELD_SEPARATOR, INDEX_KEY, OPERATOR_PREFIX, UNSET_KEY};
use crate::errors::{ErrorKind, QuillError, QuillResult};
use crate::filter::{is_all_filter, Filter};
use crate::update::{positional_base, DirectSink, MutationSink, UpdateOperator, UpdateOptions};

/// Operand key carrying a scalar for `$splicePush` and `$spliceMove`.
pub const VALUE_KEY: &str = "$value";

/// Applies `patch` to `tree`, routing every primitive edit through `sink`.
///
/// `query` selects the array elements addressed by positional keys
/// (`"items.$"`). Returns `true` when anything in the tree changed.
///
/// The patch is validated before anything is touched, and the edits are made
/// on a working copy that replaces `tree` only when the whole patch succeeded.
/// An observed sink is first rehearsed silently, so its observer only hears
/// about patches that commit.
pub fn apply_patch(
    sink: &dyn MutationSink,
    tree: &mut Document,
    patch: &Document,
    query: &Filter,
    options: &UpdateOptions,
) -> QuillResult<bool> {
    validate_patch(patch)?;

    let snapshot = tree.clone();
    if sink.is_observed() {
        let mut rehearsal = tree.clone();
        PatchRoutine {
            sink: &DirectSink,
            snapshot: &snapshot,
            query,
            options,
        }
        .apply_object(&mut rehearsal, patch, "")?;
    }

    let mut working = tree.clone();
    let routine = PatchRoutine {
        sink,
        snapshot: &snapshot,
        query,
        options,
    };

    let changed = routine.apply_object(&mut working, patch, "")?;
    *tree = working;
    Ok(changed)
}

/// Builds the patch that turns `current` into `incoming` on a linked document:
/// `incoming` plus a `$unset` entry for every top-level key of `current`
/// that `incoming` lacks. Keys starting with `reserved_prefix` are never
/// unset.
pub fn diff_unset(current: &Document, incoming: &Document, reserved_prefix: &str) -> Document {
    let mut unset = Document::new();
    for key in current.keys() {
        if key.starts_with(reserved_prefix) || incoming.contains_key(key) {
            continue;
        }
        unset.insert(key.clone(), 1);
    }

    let mut patch = incoming.clone();
    patch.insert(UNSET_KEY, unset);
    patch
}

/// Rejects unknown operators and malformed operands.
pub fn validate_patch(patch: &Document) -> QuillResult<()> {
    for (key, value) in patch.iter() {
        let operator = UpdateOperator::from_key(key)?;
        match operator {
            UpdateOperator::Set => {
                if let Value::Document(nested) = value {
                    if positional_base(key).is_some() || has_operator_keys(nested) {
                        validate_patch(nested)?;
                    }
                }
            }
            _ => {
                let operand = operand_document(operator, value)?;
                for (field, argument) in operand.iter() {
                    validate_argument(operator, field, argument)?;
                }
            }
        }
    }
    Ok(())
}

fn validate_argument(operator: UpdateOperator, field: &str, argument: &Value) -> QuillResult<()> {
    match operator {
        UpdateOperator::Inc | UpdateOperator::Mul if !argument.is_number() => {
            log::error!("{} operand for {} must be a number, found {}", operator, field, argument.type_name());
            Err(QuillError::new(
                &format!("{} operand for {} must be a number", operator, field),
                ErrorKind::InvalidDataType,
            ))
        }
        UpdateOperator::Rename if !argument.is_string() => {
            log::error!("$rename target for {} must be a string", field);
            Err(QuillError::new(
                &format!("$rename target for {} must be a string", field),
                ErrorKind::InvalidDataType,
            ))
        }
        UpdateOperator::SplicePush | UpdateOperator::SpliceMove => {
            splice_index(operator, field, argument).map(|_| ())
        }
        _ => Ok(()),
    }
}

fn operand_document(operator: UpdateOperator, value: &Value) -> QuillResult<&Document> {
    match value {
        Value::Document(doc) => Ok(doc),
        other => {
            log::error!("{} expects a document operand, found {}", operator, other.type_name());
            Err(QuillError::new(
                &format!("{} expects a document operand", operator),
                ErrorKind::InvalidOperation,
            ))
        }
    }
}

fn splice_index(operator: UpdateOperator, field: &str, argument: &Value) -> QuillResult<usize> {
    let index = argument
        .as_document()
        .and_then(|spec| spec.get_field(INDEX_KEY))
        .and_then(|index| index.as_index());

    match index {
        Some(index) => Ok(index),
        None => {
            log::error!("{} for {} requires a non-negative integer {}", operator, field, INDEX_KEY);
            Err(QuillError::new(
                &format!("{} for {} requires a non-negative integer {}", operator, field, INDEX_KEY),
                ErrorKind::InvalidOperation,
            ))
        }
    }
}

/// The value an operand stands for: `$value` when present, otherwise the
/// operand document without its `$index`.
fn splice_value(argument: &Value) -> Value {
    match argument {
        Value::Document(spec) => match spec.get_field(VALUE_KEY) {
            Some(value) => value.clone(),
            None => {
                let mut value = spec.clone();
                value.remove_field(INDEX_KEY);
                Value::Document(value)
            }
        },
        other => other.clone(),
    }
}

fn has_operator_keys(doc: &Document) -> bool {
    doc.keys().any(|k| k.starts_with(OPERATOR_PREFIX))
}

fn join(scope: &str, key: &str) -> String {
    if scope.is_empty() {
        key.to_string()
    } else {
        format!("{}{}{}", scope, FIELD_SEPARATOR, key)
    }
}

/// An array element matches a `$pull` or `$spliceMove` operand when they are
/// equal, or when the operand is a document whose every path holds the same
/// value in the element.
fn element_matches(element: &Value, matcher: &Value) -> QuillResult<bool> {
    if element == matcher {
        return Ok(true);
    }

    match (element, matcher) {
        (Value::Document(doc), Value::Document(pattern)) if !pattern.is_empty() => {
            for (path, expected) in pattern.iter() {
                if &doc.get(path)? != expected {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        _ => Ok(false),
    }
}

struct PatchRoutine<'a> {
    sink: &'a dyn MutationSink,
    snapshot: &'a Document,
    query: &'a Filter,
    options: &'a UpdateOptions,
}

impl PatchRoutine<'_> {
    fn apply_object(&self, doc: &mut Document, patch: &Document, scope: &str) -> QuillResult<bool> {
        let mut changed = false;

        for (key, value) in patch.iter() {
            let operator = UpdateOperator::from_key(key)?;
            let updated = match operator {
                UpdateOperator::Set => match positional_base(key) {
                    Some(base) => self.apply_positional(doc, base, value, scope)?,
                    None => self.apply_set(doc, key, value, scope)?,
                },
                _ => self.apply_operator(doc, operator, operand_document(operator, value)?, scope)?,
            };
            changed |= updated;
        }

        Ok(changed)
    }

    fn apply_set(&self, doc: &mut Document, key: &str, value: &Value, scope: &str) -> QuillResult<bool> {
        let nested_patch = match value {
            Value::Document(nested) => Some(nested),
            _ => None,
        };
        let merge = matches!(doc.get_field(key), Some(Value::Document(_))) && nested_patch.is_some();

        if merge {
            if let (Some(Value::Document(current)), Some(nested)) = (doc.get_field_mut(key), nested_patch) {
                return self.apply_object(current, nested, &join(scope, key));
            }
            return Ok(false);
        }

        match nested_patch {
            Some(nested) if has_operator_keys(nested) => {
                // built off-tree, the observer only sees the finished value
                let mut fresh = Document::new();
                let builder = PatchRoutine {
                    sink: &DirectSink,
                    snapshot: self.snapshot,
                    query: self.query,
                    options: self.options,
                };
                builder.apply_object(&mut fresh, nested, &join(scope, key))?;
                self.sink.set_property(scope, doc, key, Value::Document(fresh));
                Ok(true)
            }
            _ => {
                if doc.get_field(key) == Some(value) {
                    return Ok(false);
                }
                self.sink.set_property(scope, doc, key, value.clone());
                Ok(true)
            }
        }
    }

    fn apply_positional(&self, doc: &mut Document, base: &str, value: &Value, scope: &str) -> QuillResult<bool> {
        let path = FieldPath::parse(base)?;
        let full_path = join(scope, base);

        let items = match doc.get(base)? {
            Value::Array(items) => items,
            _ => {
                log::warn!("Positional update target {} is not an array", full_path);
                return Ok(false);
            }
        };

        let mut matched = Vec::new();
        for (index, item) in items.iter().enumerate() {
            if self.element_selected(&full_path, item)? {
                matched.push(index);
                if self.options.is_just_once() {
                    break;
                }
            }
        }

        let patch = match value {
            Value::Document(patch) => patch,
            other => {
                log::error!("Positional update for {} needs a document, found {}", full_path, other.type_name());
                return Err(QuillError::new(
                    &format!("Positional update for {} needs a document", full_path),
                    ErrorKind::InvalidDataType,
                ));
            }
        };

        let mut changed = false;
        for index in matched {
            let element = match path.value_mut(doc) {
                Some(Value::Array(items)) => items.get_mut(index),
                _ => None,
            };

            match element {
                Some(Value::Document(element)) => {
                    let element_scope = join(&full_path, &index.to_string());
                    changed |= self.apply_object(element, patch, &element_scope)?;
                }
                Some(other) => {
                    log::error!("Positional update on {} hit a {} element", full_path, other.type_name());
                    return Err(QuillError::new(
                        &format!("Positional update on {} requires document elements", full_path),
                        ErrorKind::InvalidDataType,
                    ));
                }
                None => {}
            }
        }
        Ok(changed)
    }

    /// An element is selected when the query matches the document as it was
    /// before the patch, with the array narrowed down to that one element.
    fn element_selected(&self, full_path: &str, item: &Value) -> QuillResult<bool> {
        if is_all_filter(self.query) {
            return Ok(true);
        }

        let mut narrowed = self.snapshot.clone();
        narrowed.put(full_path, Value::Array(vec![item.clone()]))?;
        self.query.apply(&narrowed)
    }

    fn apply_operator(
        &self,
        doc: &mut Document,
        operator: UpdateOperator,
        operand: &Document,
        scope: &str,
    ) -> QuillResult<bool> {
        let mut changed = false;

        for (field, argument) in operand.iter() {
            let updated = match operator {
                UpdateOperator::Inc => {
                    let old = doc.get_field(field).cloned();
                    self.sink.increment(scope, doc, field, argument)?;
                    doc.get_field(field) != old.as_ref()
                }
                UpdateOperator::Mul => {
                    let old = doc.get_field(field).cloned();
                    self.sink.multiply(scope, doc, field, argument)?;
                    doc.get_field(field) != old.as_ref()
                }
                UpdateOperator::Rename => match argument.as_string() {
                    Some(new_key) if doc.contains_key(field) && new_key != field => {
                        self.sink.rename(scope, doc, field, new_key);
                        true
                    }
                    _ => false,
                },
                UpdateOperator::Unset => {
                    if doc.contains_key(field) {
                        self.sink.remove_property(scope, doc, field);
                        true
                    } else {
                        false
                    }
                }
                UpdateOperator::Push => {
                    let array_scope = join(scope, field);
                    let array = self.array_for_insert(doc, field, scope)?;
                    self.sink.append_to_end(&array_scope, array, argument.clone());
                    true
                }
                UpdateOperator::SplicePush => {
                    let index = splice_index(operator, field, argument)?;
                    let array_scope = join(scope, field);
                    let array = self.array_for_insert(doc, field, scope)?;
                    self.sink.insert_at(&array_scope, array, index, splice_value(argument));
                    true
                }
                UpdateOperator::Pull => {
                    let array_scope = join(scope, field);
                    match doc.get_field_mut(field) {
                        Some(Value::Array(array)) => {
                            let mut matched = Vec::new();
                            for (index, element) in array.iter().enumerate() {
                                if element_matches(element, argument)? {
                                    matched.push(index);
                                }
                            }
                            // back to front so earlier indices stay valid
                            for index in matched.iter().rev() {
                                self.sink.remove_at(&array_scope, array, *index);
                            }
                            !matched.is_empty()
                        }
                        _ => false,
                    }
                }
                UpdateOperator::SpliceMove => {
                    let to = splice_index(operator, field, argument)?;
                    let matcher = splice_value(argument);
                    let array_scope = join(scope, field);
                    match doc.get_field_mut(field) {
                        Some(Value::Array(array)) => {
                            let mut from = None;
                            for (index, element) in array.iter().enumerate() {
                                if element_matches(element, &matcher)? {
                                    from = Some(index);
                                    break;
                                }
                            }
                            match from {
                                Some(from) if from != to.min(array.len() - 1) => {
                                    self.sink.move_index(&array_scope, array, from, to);
                                    true
                                }
                                _ => false,
                            }
                        }
                        _ => false,
                    }
                }
                UpdateOperator::Set => false,
            };
            changed |= updated;
        }

        Ok(changed)
    }

    /// Returns the array at `field`, creating an empty one when it is missing.
    fn array_for_insert<'d>(
        &self,
        doc: &'d mut Document,
        field: &str,
        scope: &str,
    ) -> QuillResult<&'d mut Vec<Value>> {
        match doc.get_field(field) {
            Some(Value::Array(_)) => {}
            None | Some(Value::Null) => {
                self.sink.set_property(scope, doc, field, Value::Array(Vec::new()));
            }
            Some(other) => {
                log::error!("Cannot insert into {} field {}", other.type_name(), join(scope, field));
                return Err(QuillError::new(
                    &format!("Cannot insert into non-array field {}", join(scope, field)),
                    ErrorKind::InvalidDataType,
                ));
            }
        }

        match doc.get_field_mut(field) {
            Some(Value::Array(array)) => Ok(array),
            _ => Err(QuillError::new(
                &format!("Array field {} disappeared during update", join(scope, field)),
                ErrorKind::InternalError,
            )),
        }
    }
}
