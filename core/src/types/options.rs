use crate::filter::FilterSpec;
use std::collections::HashSet;

/// How series completion is reported to a [`ReadObserver`](crate::ReadObserver)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "kebab-case"))]
pub enum NotificationMode {
    /// One notification once the whole read is merged
    #[default]
    Batch,
    /// One notification per merged series, no batch notification
    Progressive,
}

/// What to do with entities whose identifying tags are all missing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "kebab-case"))]
pub enum EmptyKeyPolicy {
    /// Every entity with an empty key resolves to the same entity
    #[default]
    Merge,
    /// Entities with an empty key get one identity per series
    Isolate,
}

/// Configuration of a read
///
/// # Example
///
/// ```
/// use seriesdb_core::{FilterSpec, ReadOptions};
///
/// let options = ReadOptions::default()
///     .with_sop_classes(["1.2.840.10008.5.1.4.1.1.2"])
///     .with_filters(vec![
///         "instance-number-sorter".parse::<FilterSpec>().unwrap(),
///         "slice-spacing-validator:tolerance=0.05".parse().unwrap(),
///     ])
///     .use_dicomdir(false);
///
/// assert!(!options.use_dicomdir);
/// assert_eq!(options.filters.len(), 2);
/// assert!(options.is_sop_class_allowed("1.2.840.10008.5.1.4.1.1.2"));
/// assert!(!options.is_sop_class_allowed("1.2.840.10008.5.1.4.1.1.4"));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(default))]
pub struct ReadOptions {
    /// Allowed SOP class UIDs. If None, every SOP class is accepted.
    pub sop_classes: Option<HashSet<String>>,

    /// Filter chain, applied in order
    pub filters: Vec<FilterSpec>,

    /// Probe for a DICOMDIR when reading a folder
    pub use_dicomdir: bool,

    /// Enumerate sub-folders
    pub recursive: bool,

    /// Fail the read when no series survives filtering
    pub abort_on_empty: bool,

    pub notification: NotificationMode,

    pub empty_key_policy: EmptyKeyPolicy,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            sop_classes: None,
            filters: FilterSpec::default_chain(),
            use_dicomdir: true,
            recursive: true,
            abort_on_empty: false,
            notification: NotificationMode::Batch,
            empty_key_policy: EmptyKeyPolicy::Merge,
        }
    }
}

impl ReadOptions {
    /// Builder: Restrict accepted SOP classes
    pub fn with_sop_classes<I, S>(mut self, uids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sop_classes = Some(uids.into_iter().map(Into::into).collect());
        self
    }

    /// Builder: Replace the filter chain
    pub fn with_filters(mut self, filters: Vec<FilterSpec>) -> Self {
        self.filters = filters;
        self
    }

    /// Builder: Toggle DICOMDIR probing
    pub fn use_dicomdir(mut self, enabled: bool) -> Self {
        self.use_dicomdir = enabled;
        self
    }

    /// Builder: Toggle recursive folder enumeration
    pub fn recursive(mut self, enabled: bool) -> Self {
        self.recursive = enabled;
        self
    }

    /// Builder: Fail when nothing survives the pipeline
    ///
    /// # Example
    ///
    /// ```
    /// use seriesdb_core::ReadOptions;
    ///
    /// assert!(!ReadOptions::default().abort_on_empty);
    /// assert!(ReadOptions::default().abort_on_empty(true).abort_on_empty);
    /// ```
    pub fn abort_on_empty(mut self, enabled: bool) -> Self {
        self.abort_on_empty = enabled;
        self
    }

    /// Builder: Set the notification mode
    pub fn with_notification(mut self, mode: NotificationMode) -> Self {
        self.notification = mode;
        self
    }

    /// Builder: Set the empty identity key policy
    pub fn with_empty_key_policy(mut self, policy: EmptyKeyPolicy) -> Self {
        self.empty_key_policy = policy;
        self
    }

    /// Checks a SOP class UID against the allow-list
    pub fn is_sop_class_allowed(&self, uid: &str) -> bool {
        self.sop_classes
            .as_ref()
            .map(|allowed| allowed.contains(uid))
            .unwrap_or(true)
    }
}
