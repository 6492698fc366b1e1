//! Entity resolution and series grouping over scanned files

pub mod grouper;
pub mod registry;
pub mod session;

pub use grouper::{ExcludedFiles, GroupOutcome, SeriesGrouper};
pub use registry::EntityRegistry;
pub use session::ScanSession;
