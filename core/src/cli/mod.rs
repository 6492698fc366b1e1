pub mod report;

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::error::Result;
use crate::filter::FilterSpec;
use crate::types::{EmptyKeyPolicy, ReadOptions};

/// Command-line arguments for seriesdb
#[derive(Parser, Debug)]
#[command(name = "seriesdb")]
#[command(about = "Read DICOM folders or files into typed series")]
#[command(version)]
pub struct Cli {
    /// One folder, or any number of DICOM files
    #[arg(value_name = "INPUT", required = true)]
    pub inputs: Vec<PathBuf>,

    /// Accept only this SOP class UID (repeatable)
    #[arg(long = "sop-class", value_name = "UID")]
    pub sop_classes: Vec<String>,

    /// Filter to run, as `name` or `name:key=value,...` (repeatable, ordered;
    /// replaces the default chain)
    #[arg(long = "filter", value_name = "SPEC")]
    pub filters: Vec<FilterSpec>,

    /// Ignore any DICOMDIR and scan the folder
    #[arg(long)]
    pub no_dicomdir: bool,

    /// Do not descend into sub-folders
    #[arg(long)]
    pub no_recursive: bool,

    /// Fail when no series survives the filters
    #[arg(long)]
    pub abort_on_empty: bool,

    /// Keep patients without identifying tags apart, one per series
    #[arg(long)]
    pub isolate_anonymous: bool,

    /// JSON file with read options; flags given here override it
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write every image series back to DICOM files under this folder
    #[arg(long, value_name = "DIR")]
    pub export: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    Text,
    /// JSON format
    Json,
}

impl Cli {
    /// Builds the read options: config file first, then flags on top
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub fn read_options(&self) -> Result<ReadOptions> {
        let mut options = match &self.config {
            Some(path) => load_config(path)?,
            None => ReadOptions::default(),
        };

        if !self.sop_classes.is_empty() {
            options = options.with_sop_classes(self.sop_classes.iter().cloned());
        }
        if !self.filters.is_empty() {
            options = options.with_filters(self.filters.clone());
        }
        if self.no_dicomdir {
            options = options.use_dicomdir(false);
        }
        if self.no_recursive {
            options = options.recursive(false);
        }
        if self.abort_on_empty {
            options = options.abort_on_empty(true);
        }
        if self.isolate_anonymous {
            options = options.with_empty_key_policy(EmptyKeyPolicy::Isolate);
        }
        Ok(options)
    }
}

#[cfg(feature = "json")]
fn load_config(path: &std::path::Path) -> Result<ReadOptions> {
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|e| {
        crate::error::IngestError::InvalidValue(format!("{}: {}", path.display(), e))
    })
}

#[cfg(not(feature = "json"))]
fn load_config(_path: &std::path::Path) -> Result<ReadOptions> {
    Err(crate::error::IngestError::InvalidValue(
        "--config requires the 'json' feature".to_string(),
    ))
}
