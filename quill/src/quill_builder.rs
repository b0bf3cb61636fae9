use std::time::Duration;

use crate::errors::QuillError;
use crate::{errors::QuillResult, quill::Quill, quill_config::QuillConfig};

/// Builder for a [Quill] database.
///
/// Errors from individual settings are kept and returned by
/// [QuillBuilder::open], so the chain never has to be interrupted.
///
/// # Examples
///
/// ```rust,ignore
/// use std::time::Duration;
/// use quill::Quill;
///
/// let db = Quill::builder()
///     .reserved_key_prefix("_ui_")
///     .decouple(false)
///     .auto_flush(Duration::from_millis(16))
///     .open()?;
/// ```
#[derive(Default)]
pub struct QuillBuilder {
    error: Option<QuillError>,
    quill_config: QuillConfig,
}

impl QuillBuilder {
    pub fn new() -> Self {
        QuillBuilder {
            error: None,
            quill_config: QuillConfig::new(),
        }
    }

    /// Top-level keys starting with `prefix` survive an observed
    /// `set_data` even when the new data lacks them. Must not be empty.
    pub fn reserved_key_prefix(mut self, prefix: &str) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.quill_config.set_reserved_key_prefix(prefix) {
                self.error = Some(e);
            }
        }
        self
    }

    /// Default of [SetDataOptions::decouple](crate::document::SetDataOptions)
    /// for `set_data`.
    pub fn decouple(mut self, decouple: bool) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.quill_config.set_decouple(decouple) {
                self.error = Some(e);
            }
        }
        self
    }

    /// Flushes deferred events on a timer every `interval`, in addition to
    /// explicit [Quill::flush] calls.
    pub fn auto_flush(mut self, interval: Duration) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.quill_config.set_auto_flush_interval(Some(interval)) {
                self.error = Some(e);
            }
        }
        self
    }

    /// Opens the database, or returns the first error any setting produced.
    pub fn open(self) -> QuillResult<Quill> {
        if let Some(error) = self.error {
            return Err(error);
        }

        self.quill_config.initialize();
        Ok(Quill::new(self.quill_config))
    }
}
