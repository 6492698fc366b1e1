//! Collaborator seams of a read: progress and cancellation, stage and
//! completion notifications, incremental file delivery

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::report::ReadReport;
use crate::types::{MergeResult, SeriesSet, TypedSeries};

/// Receives progress and answers cancellation polls
///
/// Cancellation is cooperative: it is polled between files and between
/// pipeline stages, never in the middle of a filter.
pub trait ProgressSink {
    /// `fraction` runs from 0.0 to 1.0
    fn progress(&self, _fraction: f32, _message: &str) {}

    fn cancel_requested(&self) -> bool {
        false
    }
}

/// Sink that ignores progress and never cancels
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {}

/// Shared cancellation flag, clonable across threads
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl ProgressSink for CancelFlag {
    fn cancel_requested(&self) -> bool {
        self.is_cancelled()
    }
}

/// Stage of a read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStage {
    Scanning,
    Filtering,
    Converting,
    Merged,
}

impl ReadStage {
    /// Overall progress fraction when the stage starts
    pub fn fraction(&self) -> f32 {
        match self {
            ReadStage::Scanning => 0.0,
            ReadStage::Filtering => 0.3,
            ReadStage::Converting => 0.5,
            ReadStage::Merged => 1.0,
        }
    }
}

impl fmt::Display for ReadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReadStage::Scanning => "scanning",
            ReadStage::Filtering => "filtering",
            ReadStage::Converting => "converting",
            ReadStage::Merged => "merged",
        };
        write!(f, "{}", s)
    }
}

/// Observes a read
pub trait ReadObserver {
    fn stage_changed(&mut self, _stage: ReadStage) {}

    /// Called per merged series in progressive mode only
    fn series_merged(&mut self, _series: &TypedSeries, _result: MergeResult) {}

    /// Called exactly once per successful read in batch mode only
    fn batch_complete(&mut self, _series_set: &SeriesSet, _report: &ReadReport) {}
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoObserver;

impl ReadObserver for NoObserver {}

/// Delivers files in batches, e.g. a PACS puller streaming instances
pub trait FileSupplier {
    /// Next batch of files, `None` once exhausted
    fn next_batch(&mut self) -> Option<Vec<PathBuf>>;
}

impl<I> FileSupplier for I
where
    I: Iterator<Item = Vec<PathBuf>>,
{
    fn next_batch(&mut self) -> Option<Vec<PathBuf>> {
        self.next()
    }
}
