//! Per-read completeness report
//!
//! A read only fails as a whole when nothing could be scanned. Everything
//! that went wrong with a single file or series is recorded here instead,
//! so callers decide whether partial success is acceptable.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::extraction::DicomdirState;
use crate::filter::Outcome;
use crate::types::SeriesKind;

/// Recoverable condition met while reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub enum IssueKind {
    /// File could not be parsed as DICOM; skipped
    FileUnreadable,
    /// SOP class not in the allow-list; file excluded
    UnsupportedSopClass,
    /// Identifying tag missing, or series left empty
    MissingRequiredTag,
    /// SOPInstanceUID already ingested; file skipped
    DuplicateInstance,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IssueKind::FileUnreadable => "FileUnreadable",
            IssueKind::UnsupportedSopClass => "UnsupportedSOPClass",
            IssueKind::MissingRequiredTag => "MissingRequiredTag",
            IssueKind::DuplicateInstance => "DuplicateInstance",
        };
        write!(f, "{}", s)
    }
}

/// A file that was skipped or excluded
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct FileIssue {
    pub path: PathBuf,
    pub kind: IssueKind,
    pub message: String,
}

impl FileIssue {
    pub fn new(path: impl Into<PathBuf>, kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            message: message.into(),
        }
    }
}

/// Outcome of one filter on one series, as recorded
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
#[cfg_attr(feature = "json", serde(tag = "outcome", content = "reason"))]
pub enum FilterOutcome {
    Applied,
    NotApplicable,
    Rejected(String),
}

impl From<&Outcome> for FilterOutcome {
    fn from(outcome: &Outcome) -> Self {
        match outcome {
            Outcome::Applied(_) => FilterOutcome::Applied,
            Outcome::NotApplicable => FilterOutcome::NotApplicable,
            Outcome::Rejected(reason) => FilterOutcome::Rejected(reason.clone()),
        }
    }
}

impl fmt::Display for FilterOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterOutcome::Applied => write!(f, "applied"),
            FilterOutcome::NotApplicable => write!(f, "not applicable"),
            FilterOutcome::Rejected(reason) => write!(f, "rejected: {}", reason),
        }
    }
}

/// Final status of a series
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
#[cfg_attr(feature = "json", serde(tag = "status", rename_all = "snake_case"))]
pub enum SeriesStatus {
    /// Still being processed (only visible mid-read)
    Pending,
    /// Dropped before the pipeline
    Excluded { kind: IssueKind, message: String },
    /// Dropped by a validator
    Rejected { filter: String, reason: String },
    /// Converted to a typed series
    Converted { kind: SeriesKind },
    /// No converter matched; kept as a generic series
    Generic,
    /// Conversion failed; kept as a generic series
    Demoted { reason: String },
}

impl SeriesStatus {
    /// Whether the series is part of the output set
    pub fn is_in_output(&self) -> bool {
        matches!(
            self,
            SeriesStatus::Converted { .. } | SeriesStatus::Generic | SeriesStatus::Demoted { .. }
        )
    }

    /// Whether conversion to a typed series succeeded
    pub fn is_converted(&self) -> bool {
        matches!(self, SeriesStatus::Converted { .. })
    }
}

impl fmt::Display for SeriesStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesStatus::Pending => write!(f, "pending"),
            SeriesStatus::Excluded { kind, message } => write!(f, "excluded ({}): {}", kind, message),
            SeriesStatus::Rejected { filter, reason } => {
                write!(f, "rejected by {}: {}", filter, reason)
            }
            SeriesStatus::Converted { kind } => write!(f, "converted ({})", kind),
            SeriesStatus::Generic => write!(f, "generic"),
            SeriesStatus::Demoted { reason } => write!(f, "demoted to generic: {}", reason),
        }
    }
}

/// Per-series section of the report
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct SeriesReport {
    pub modality: String,
    pub instances: usize,
    /// `(filter_name, outcome)` in pipeline order
    pub filters: Vec<(String, FilterOutcome)>,
    pub status: SeriesStatus,
}

impl Default for SeriesReport {
    fn default() -> Self {
        Self {
            modality: String::new(),
            instances: 0,
            filters: Vec::new(),
            status: SeriesStatus::Pending,
        }
    }
}

/// Completeness report of one read
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct ReadReport {
    pub dicomdir: DicomdirState,
    /// Why DICOMDIR usage was abandoned, if it was
    pub dicomdir_fallback: Option<String>,
    pub files_scanned: usize,
    pub file_issues: Vec<FileIssue>,
    /// Keyed by SeriesInstanceUID
    pub series: BTreeMap<String, SeriesReport>,
}

impl ReadReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file_issue(&mut self, issue: FileIssue) {
        self.file_issues.push(issue);
    }

    /// Entry for a series, created on first use
    pub fn series_entry(&mut self, instance_uid: &str) -> &mut SeriesReport {
        self.series.entry(instance_uid.to_string()).or_default()
    }

    pub fn record_filter(&mut self, instance_uid: &str, filter: &str, outcome: FilterOutcome) {
        self.series_entry(instance_uid)
            .filters
            .push((filter.to_string(), outcome));
    }

    pub fn set_status(&mut self, instance_uid: &str, status: SeriesStatus) {
        self.series_entry(instance_uid).status = status;
    }

    pub fn status(&self, instance_uid: &str) -> Option<&SeriesStatus> {
        self.series.get(instance_uid).map(|s| &s.status)
    }

    /// File issues of a given kind
    pub fn issues_of(&self, kind: IssueKind) -> impl Iterator<Item = &FileIssue> {
        self.file_issues.iter().filter(move |i| i.kind == kind)
    }

    /// Number of series that made it into the output
    pub fn output_count(&self) -> usize {
        self.series.values().filter(|s| s.status.is_in_output()).count()
    }

    /// Every scanned series was converted and no file was skipped
    pub fn is_complete(&self) -> bool {
        self.file_issues.is_empty() && self.series.values().all(|s| s.status.is_converted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_filter_keeps_order() {
        let mut report = ReadReport::new();
        report.record_filter("1.2", "instance-number-sorter", FilterOutcome::Applied);
        report.record_filter("1.2", "slice-thickness-modifier", FilterOutcome::NotApplicable);

        let entry = &report.series["1.2"];
        assert_eq!(entry.filters[0].0, "instance-number-sorter");
        assert_eq!(entry.filters[1].1, FilterOutcome::NotApplicable);
        assert_eq!(entry.status, SeriesStatus::Pending);
    }

    #[test]
    fn test_output_count_and_completeness() {
        let mut report = ReadReport::new();
        report.set_status(
            "1",
            SeriesStatus::Converted {
                kind: SeriesKind::Image,
            },
        );
        assert!(report.is_complete());

        report.set_status(
            "2",
            SeriesStatus::Demoted {
                reason: "missing pixel data".into(),
            },
        );
        report.set_status(
            "3",
            SeriesStatus::Rejected {
                filter: "slice-spacing-validator".into(),
                reason: "irregular".into(),
            },
        );
        assert_eq!(report.output_count(), 2);
        assert!(!report.is_complete());
    }

    #[test]
    fn test_issue_kind_display() {
        assert_eq!(IssueKind::UnsupportedSopClass.to_string(), "UnsupportedSOPClass");
        let status = SeriesStatus::Excluded {
            kind: IssueKind::UnsupportedSopClass,
            message: "2 files excluded".into(),
        };
        assert_eq!(status.to_string(), "excluded (UnsupportedSOPClass): 2 files excluded");
    }
}
