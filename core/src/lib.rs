pub mod api;
pub mod cli;
pub mod convert;
pub mod error;
pub mod extraction;
pub mod filter;
pub mod notify;
pub mod report;
pub mod resolve;
pub mod types;
pub mod writer;

#[cfg(test)]
pub(crate) mod testing;

pub use api::SeriesSetReader;
pub use cli::report::TextReport;
pub use error::{IngestError, Result};
pub use filter::{Filter, FilterKind, FilterRegistry, FilterSpec, Outcome};
pub use notify::{
    CancelFlag, FileSupplier, NoObserver, NoProgress, ProgressSink, ReadObserver, ReadStage,
};
pub use report::{FileIssue, FilterOutcome, IssueKind, ReadReport, SeriesReport, SeriesStatus};
pub use types::*;
pub use writer::ImageSeriesWriter;
