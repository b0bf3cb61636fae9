//! Configuration of a Quill database.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::common::{atomic, Atomic, ReadExecutor, WriteExecutor, DEFAULT_RESERVED_KEY_PREFIX};
use crate::errors::{ErrorKind, QuillError, QuillResult};

/// Settings shared by a database and every document it creates.
///
/// Settings are mutable until the database opens; afterwards every setter
/// fails with [ErrorKind::InvalidOperation].
///
/// # Examples
///
/// ```rust,ignore
/// use quill::Quill;
///
/// let db = Quill::builder()
///     .reserved_key_prefix("_ui_")
///     .open()?;
/// assert_eq!(db.config().reserved_key_prefix(), "_ui_");
/// ```
#[derive(Clone)]
pub struct QuillConfig {
    inner: Arc<QuillConfigInner>,
}

impl Default for QuillConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl QuillConfig {
    pub fn new() -> Self {
        QuillConfig {
            inner: Arc::new(QuillConfigInner::new()),
        }
    }

    /// Prefix of top-level keys that an observed `set_data` never unsets.
    pub fn reserved_key_prefix(&self) -> String {
        self.inner.reserved_key_prefix()
    }

    /// Sets the reserved key prefix.
    ///
    /// # Errors
    ///
    /// Returns error if already initialized or if the prefix is empty.
    pub fn set_reserved_key_prefix(&self, prefix: &str) -> QuillResult<()> {
        self.inner.set_reserved_key_prefix(prefix)
    }

    /// Whether `set_data` deep-copies its input when the caller does not say.
    pub fn decouple(&self) -> bool {
        self.inner.decouple()
    }

    pub fn set_decouple(&self, decouple: bool) -> QuillResult<()> {
        self.inner.set_decouple(decouple)
    }

    /// Interval of the background flush, if one was requested.
    pub fn auto_flush_interval(&self) -> Option<Duration> {
        self.inner.auto_flush_interval()
    }

    /// Sets the background flush interval.
    ///
    /// # Errors
    ///
    /// Returns error if already initialized or if the interval is zero.
    pub fn set_auto_flush_interval(&self, interval: Option<Duration>) -> QuillResult<()> {
        self.inner.set_auto_flush_interval(interval)
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.configured.load(Ordering::Relaxed)
    }

    pub(crate) fn initialize(&self) {
        self.inner.configured.store(true, Ordering::Relaxed);
    }
}

struct QuillConfigInner {
    configured: AtomicBool,
    reserved_key_prefix: Atomic<String>,
    decouple: AtomicBool,
    auto_flush_interval: Atomic<Option<Duration>>,
}

impl QuillConfigInner {
    fn new() -> Self {
        QuillConfigInner {
            configured: AtomicBool::from(false),
            reserved_key_prefix: atomic(DEFAULT_RESERVED_KEY_PREFIX.to_string()),
            decouple: AtomicBool::from(true),
            auto_flush_interval: atomic(None),
        }
    }

    fn ensure_not_configured(&self, setting: &str) -> QuillResult<()> {
        if self.configured.load(Ordering::Relaxed) {
            log::error!("{} cannot be changed after initialization", setting);
            return Err(QuillError::new(
                &format!("{} cannot be changed after initialization", setting),
                ErrorKind::InvalidOperation,
            ));
        }
        Ok(())
    }

    fn reserved_key_prefix(&self) -> String {
        self.reserved_key_prefix.read_with(|it| it.clone())
    }

    fn set_reserved_key_prefix(&self, prefix: &str) -> QuillResult<()> {
        self.ensure_not_configured("Reserved key prefix")?;
        if prefix.is_empty() {
            log::error!("Reserved key prefix cannot be empty");
            return Err(QuillError::new(
                "Reserved key prefix cannot be empty",
                ErrorKind::ValidationError,
            ));
        }

        self.reserved_key_prefix.write_with(|it| *it = prefix.to_string());
        Ok(())
    }

    fn decouple(&self) -> bool {
        self.decouple.load(Ordering::Relaxed)
    }

    fn set_decouple(&self, decouple: bool) -> QuillResult<()> {
        self.ensure_not_configured("Decouple flag")?;
        self.decouple.store(decouple, Ordering::Relaxed);
        Ok(())
    }

    fn auto_flush_interval(&self) -> Option<Duration> {
        self.auto_flush_interval.read_with(|it| *it)
    }

    fn set_auto_flush_interval(&self, interval: Option<Duration>) -> QuillResult<()> {
        self.ensure_not_configured("Auto flush interval")?;
        if interval == Some(Duration::ZERO) {
            log::error!("Auto flush interval must be greater than zero");
            return Err(QuillError::new(
                "Auto flush interval must be greater than zero",
                ErrorKind::ValidationError,
            ));
        }

        self.auto_flush_interval.write_with(|it| *it = interval);
        Ok(())
    }
}
