use crate::common::{OPERATOR_PREFIX, POSITIONAL_SUFFIX};
use crate::errors::{ErrorKind, QuillError, QuillResult};
use std::fmt::{Display, Formatter};

/// The update operators a patch may contain.
///
/// A patch key that does not start with `$` is a plain assignment
/// ([UpdateOperator::Set]). Operator keys hold a document mapping target
/// fields to operands:
///
/// ```text
/// { "$inc": { "views": 1 }, "$push": { "tags": "new" }, "title": "Hello" }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateOperator {
    /// Overwrite a field; nested documents merge recursively.
    Set,
    /// `$inc`: add a number to a field, a missing field counts as 0.
    Inc,
    /// `$mul`: multiply a field by a number, a missing field becomes 0.
    Mul,
    /// `$rename`: move a field's value to a new key.
    Rename,
    /// `$unset`: delete a field.
    Unset,
    /// `$push`: append to an array, creating it when missing.
    Push,
    /// `$splicePush`: insert into an array at `$index`, appending when the
    /// index is past the end.
    SplicePush,
    /// `$pull`: remove every array element matching the operand.
    Pull,
    /// `$spliceMove`: move the first element matching the operand to `$index`.
    SpliceMove,
}

impl UpdateOperator {
    /// Classifies a patch key. Keys without the `$` prefix are assignments.
    pub fn from_key(key: &str) -> QuillResult<UpdateOperator> {
        if !key.starts_with(OPERATOR_PREFIX) {
            return Ok(UpdateOperator::Set);
        }

        match key {
            "$inc" => Ok(UpdateOperator::Inc),
            "$mul" => Ok(UpdateOperator::Mul),
            "$rename" => Ok(UpdateOperator::Rename),
            "$unset" => Ok(UpdateOperator::Unset),
            "$push" => Ok(UpdateOperator::Push),
            "$splicePush" => Ok(UpdateOperator::SplicePush),
            "$pull" => Ok(UpdateOperator::Pull),
            "$spliceMove" => Ok(UpdateOperator::SpliceMove),
            _ => {
                log::error!("Unknown update operator {}", key);
                Err(QuillError::new(
                    &format!("Unknown update operator {}", key),
                    ErrorKind::InvalidOperation,
                ))
            }
        }
    }

    /// The patch key of the operator, `None` for a plain assignment.
    pub fn key(&self) -> Option<&'static str> {
        match self {
            UpdateOperator::Set => None,
            UpdateOperator::Inc => Some("$inc"),
            UpdateOperator::Mul => Some("$mul"),
            UpdateOperator::Rename => Some("$rename"),
            UpdateOperator::Unset => Some("$unset"),
            UpdateOperator::Push => Some("$push"),
            UpdateOperator::SplicePush => Some("$splicePush"),
            UpdateOperator::Pull => Some("$pull"),
            UpdateOperator::SpliceMove => Some("$spliceMove"),
        }
    }

    /// Whether the operator edits an array rather than a property.
    pub fn targets_array(&self) -> bool {
        matches!(
            self,
            UpdateOperator::Push
                | UpdateOperator::SplicePush
                | UpdateOperator::Pull
                | UpdateOperator::SpliceMove
        )
    }
}

impl Display for UpdateOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key().unwrap_or("set"))
    }
}

/// Returns `true` when `key` ends in exactly `.$`, marking an update of the
/// array elements matched by the update's query.
pub fn is_positional_key(key: &str) -> bool {
    key.len() >= POSITIONAL_SUFFIX.len() && key.ends_with(POSITIONAL_SUFFIX)
}

/// The array path of a positional key: `"items.$"` gives `"items"`.
pub(crate) fn positional_base(key: &str) -> Option<&str> {
    if is_positional_key(key) {
        Some(&key[..key.len() - POSITIONAL_SUFFIX.len()])
    } else {
        None
    }
}
