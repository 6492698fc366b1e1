//! Filter pipeline over raw series
//!
//! Filters come in three kinds:
//! - [`FilterKind::Sorter`]: establishes the instance order
//! - [`FilterKind::Modifier`]: derives values into `computed_tags`
//! - [`FilterKind::Validator`]: rejects structurally inconsistent series
//!
//! A filter that does not fit a series answers [`Outcome::NotApplicable`];
//! this is a normal value, not an error.

mod modifier;
mod pipeline;
mod registry;
mod sorter;
mod validator;

use std::fmt;

use crate::types::DicomSeries;

pub use modifier::SliceThicknessModifier;
pub use pipeline::{FilterPipeline, PipelineOutput};
pub use registry::{FilterRegistry, FilterSpec};
pub use sorter::{ImagePositionSorter, InstanceNumberSorter};
pub use validator::{OrientationValidator, SliceSpacingValidator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Sorter,
    Modifier,
    Validator,
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FilterKind::Sorter => "sorter",
            FilterKind::Modifier => "modifier",
            FilterKind::Validator => "validator",
        };
        write!(f, "{}", s)
    }
}

/// Result of applying one filter to one series
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Filter ran; carries the updated series
    Applied(DicomSeries),
    /// Filter does not fit this series; series unchanged
    NotApplicable,
    /// Series is inconsistent and leaves the batch
    Rejected(String),
}

/// A named step of the pipeline
pub trait Filter {
    /// Registry name
    fn name(&self) -> &str;

    fn kind(&self) -> FilterKind;

    /// Cheap precondition; `apply` is only called when this holds
    fn can_apply(&self, series: &DicomSeries) -> bool;

    fn apply(&self, series: &DicomSeries) -> Outcome;
}
