use thiserror::Error;

/// Result type for series ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Error types for series ingestion operations
///
/// Only a handful of these abort a whole read: `ScanUnavailable`, `Cancelled`,
/// `NoSeriesSurvived` and the filter configuration errors. Everything else is
/// caught per file or per series and lands in the [`ReadReport`](crate::ReadReport).
#[derive(Error, Debug)]
pub enum IngestError {
    /// DICOM reading error
    #[error("DICOM error: {0}")]
    DicomError(String),

    /// Tag not found in DICOM file
    #[error("Tag not found: {0}")]
    TagNotFound(String),

    /// Invalid tag value
    #[error("Invalid tag value: {0}")]
    InvalidValue(String),

    /// Nothing could be scanned: missing folder, no files, or no readable file
    #[error("Scan unavailable: {0}")]
    ScanUnavailable(String),

    /// The caller requested cancellation
    #[error("Read cancelled")]
    Cancelled,

    /// Abort-on-empty policy tripped: every series was excluded or rejected
    #[error("No series survived the filter pipeline")]
    NoSeriesSurvived,

    /// Filter name not present in the registry
    #[error("Unknown filter: {0}")]
    UnknownFilter(String),

    /// Filter parameter could not be parsed
    #[error("Invalid parameter for filter '{filter}': {message}")]
    InvalidFilterParameter { filter: String, message: String },

    /// Typed series could not be assembled
    #[error("Conversion failed: {0}")]
    ConversionFailed(String),

    /// Series could not be written back to files
    #[error("Write error: {0}")]
    WriteError(String),

    /// I/O error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

// Helper conversions
impl From<String> for IngestError {
    fn from(s: String) -> Self {
        IngestError::ConversionFailed(s)
    }
}

impl From<&str> for IngestError {
    fn from(s: &str) -> Self {
        IngestError::ConversionFailed(s.to_string())
    }
}

// Convert dicom-object errors
impl From<dicom_object::ReadError> for IngestError {
    fn from(e: dicom_object::ReadError) -> Self {
        IngestError::DicomError(format!("{}", e))
    }
}

impl From<dicom_core::value::ConvertValueError> for IngestError {
    fn from(e: dicom_core::value::ConvertValueError) -> Self {
        IngestError::InvalidValue(format!("{}", e))
    }
}

impl IngestError {
    /// Whether this error aborts the whole read rather than a single file or series
    pub fn is_batch_fatal(&self) -> bool {
        matches!(
            self,
            IngestError::ScanUnavailable(_)
                | IngestError::Cancelled
                | IngestError::NoSeriesSurvived
                | IngestError::UnknownFilter(_)
                | IngestError::InvalidFilterParameter { .. }
        )
    }
}
