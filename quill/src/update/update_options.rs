/// Options for controlling an update.
///
/// ```rust,ignore
/// use quill::update::{UpdateOptions, just_once};
///
/// // update only the first array element matched by a positional key
/// document.update_with_options(&query, &patch, &just_once())?;
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    just_once: bool,
}

impl UpdateOptions {
    /// * `just_once` - If true, a positional key updates only the first
    ///   matching array element
    pub fn new(just_once: bool) -> Self {
        Self { just_once }
    }

    pub fn is_just_once(&self) -> bool {
        self.just_once
    }
}

/// Creates `UpdateOptions` that update only the first matching array element.
pub fn just_once() -> UpdateOptions {
    UpdateOptions::new(true)
}
