use log::{debug, info};
use std::path::PathBuf;

use crate::convert::{PayloadDecoder, SeriesConverter};
use crate::error::{IngestError, Result};
use crate::extraction::{resolve_folder, scan_files};
use crate::filter::{FilterPipeline, FilterRegistry};
use crate::notify::{FileSupplier, NoObserver, NoProgress, ProgressSink, ReadObserver, ReadStage};
use crate::report::ReadReport;
use crate::resolve::ScanSession;
use crate::types::{NotificationMode, ReadOptions, SeriesSet, TypedSeries};

/// Reads DICOM files into a [`SeriesSet`]
///
/// A read runs `Scanning → Filtering → Converting → Merged`. Entity
/// registries and raw series live only for the duration of one call; typed
/// series are moved into the caller's set.
///
/// # Example
///
/// ```no_run
/// use seriesdb_core::{ReadOptions, SeriesSetReader};
/// use std::path::PathBuf;
///
/// let reader = SeriesSetReader::new(ReadOptions::default().use_dicomdir(false));
/// let (series_set, report) = reader.read_all(&[PathBuf::from("/data/study")]).unwrap();
///
/// for series in &series_set {
///     println!("{} ({})", series.instance_uid(), series.kind());
/// }
/// println!("{} files skipped", report.file_issues.len());
/// ```
#[derive(Debug)]
pub struct SeriesSetReader {
    options: ReadOptions,
    filters: FilterRegistry,
    converter: SeriesConverter,
}

impl SeriesSetReader {
    pub fn new(options: ReadOptions) -> Self {
        Self {
            options,
            filters: FilterRegistry::default(),
            converter: SeriesConverter::default(),
        }
    }

    /// Builder: Use a registry with custom filters
    pub fn with_filter_registry(mut self, registry: FilterRegistry) -> Self {
        self.filters = registry;
        self
    }

    /// Builder: Use an external payload codec
    pub fn with_decoder(mut self, decoder: Box<dyn PayloadDecoder>) -> Self {
        self.converter = SeriesConverter::new(decoder);
        self
    }

    pub fn options(&self) -> &ReadOptions {
        &self.options
    }

    /// Reads into a new set, without observer or cancellation
    ///
    /// # Errors
    ///
    /// Same as [`read`](Self::read)
    pub fn read_all(&self, inputs: &[PathBuf]) -> Result<(SeriesSet, ReadReport)> {
        let mut series_set = SeriesSet::new();
        let report = self.read(inputs, &mut series_set, &mut NoObserver, &NoProgress)?;
        Ok((series_set, report))
    }

    /// Reads folders and/or files and merges the result into `dest`
    ///
    /// Folders are resolved through their DICOMDIR when enabled, else
    /// enumerated. Per-file and per-series problems end up in the returned
    /// report; only the conditions below fail the read.
    ///
    /// # Errors
    ///
    /// - `ScanUnavailable` if a folder cannot be opened or no file is readable
    /// - `UnknownFilter` / `InvalidFilterParameter` for a bad filter chain
    /// - `Cancelled` when the sink requests it; `dest` is then left untouched
    ///   in batch mode
    /// - `NoSeriesSurvived` under the abort-on-empty policy
    pub fn read(
        &self,
        inputs: &[PathBuf],
        dest: &mut SeriesSet,
        observer: &mut dyn ReadObserver,
        progress: &dyn ProgressSink,
    ) -> Result<ReadReport> {
        let pipeline = FilterPipeline::from_specs(&self.filters, &self.options.filters)?
            .abort_on_empty(self.options.abort_on_empty);
        let mut report = ReadReport::new();

        Self::enter(ReadStage::Scanning, observer, progress);
        let files = self.resolve_inputs(inputs, &mut report)?;
        if files.is_empty() {
            return Err(IngestError::ScanUnavailable("no file to scan".to_string()));
        }
        info!("Scanning {} files", files.len());

        let batch = scan_files(&files, &self.options, progress)?;
        if batch.readable() == 0 {
            return Err(IngestError::ScanUnavailable(format!(
                "none of the {} files is readable DICOM",
                files.len()
            )));
        }
        let mut session = ScanSession::new(self.options.empty_key_policy);
        session.ingest(batch, &mut report);

        let mut pending = Vec::new();
        self.process(&mut session, &pipeline, &mut report, dest, &mut pending, observer, progress)?;
        self.finish(pending, dest, &report, observer, progress);
        Ok(report)
    }

    /// Reads batches from a supplier until it is exhausted
    ///
    /// One session spans all batches: entities and series resolve the same
    /// way whichever batch their files arrive in, and each batch only
    /// re-processes the series it touched. A series updated by a later batch
    /// replaces its earlier version in `dest`.
    ///
    /// # Errors
    ///
    /// As [`read`](Self::read); `ScanUnavailable` only when no batch held a
    /// readable file, and abort-on-empty is checked once at the end
    pub fn read_incremental(
        &self,
        supplier: &mut dyn FileSupplier,
        dest: &mut SeriesSet,
        observer: &mut dyn ReadObserver,
        progress: &dyn ProgressSink,
    ) -> Result<ReadReport> {
        let pipeline = FilterPipeline::from_specs(&self.filters, &self.options.filters)?;
        let mut report = ReadReport::new();
        let mut session = ScanSession::new(self.options.empty_key_policy);
        let mut pending = Vec::new();

        while let Some(files) = supplier.next_batch() {
            Self::enter(ReadStage::Scanning, observer, progress);
            debug!("Incremental batch of {} files", files.len());
            let batch = scan_files(&files, &self.options, progress)?;
            session.ingest(batch, &mut report);
            self.process(&mut session, &pipeline, &mut report, dest, &mut pending, observer, progress)?;
        }

        if report.files_scanned == 0 {
            return Err(IngestError::ScanUnavailable(
                "supplier delivered no readable file".to_string(),
            ));
        }
        if self.options.abort_on_empty && report.output_count() == 0 {
            return Err(IngestError::NoSeriesSurvived);
        }
        self.finish(pending, dest, &report, observer, progress);
        Ok(report)
    }

    fn enter(stage: ReadStage, observer: &mut dyn ReadObserver, progress: &dyn ProgressSink) {
        debug!("Stage: {}", stage);
        observer.stage_changed(stage);
        progress.progress(stage.fraction(), &stage.to_string());
    }

    /// Lists the files behind each input, folders first resolved
    fn resolve_inputs(&self, inputs: &[PathBuf], report: &mut ReadReport) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for input in inputs {
            if input.is_dir() {
                let resolution =
                    resolve_folder(input, self.options.use_dicomdir, self.options.recursive)?;
                report.dicomdir = resolution.state;
                if resolution.fallback_reason.is_some() {
                    report.dicomdir_fallback = resolution.fallback_reason;
                }
                files.extend(resolution.files);
            } else {
                files.push(input.clone());
            }
        }
        files.sort();
        files.dedup();
        Ok(files)
    }

    /// Filters and converts the series touched since the last call
    ///
    /// In progressive mode each converted series is merged and announced
    /// right away; in batch mode it is held back in `pending`.
    #[allow(clippy::too_many_arguments)]
    fn process(
        &self,
        session: &mut ScanSession,
        pipeline: &FilterPipeline,
        report: &mut ReadReport,
        dest: &mut SeriesSet,
        pending: &mut Vec<TypedSeries>,
        observer: &mut dyn ReadObserver,
        progress: &dyn ProgressSink,
    ) -> Result<()> {
        let touched = session.take_touched(report);
        if progress.cancel_requested() {
            return Err(IngestError::Cancelled);
        }

        Self::enter(ReadStage::Filtering, observer, progress);
        let survivors = pipeline.run(touched, report, progress)?;
        if progress.cancel_requested() {
            return Err(IngestError::Cancelled);
        }

        Self::enter(ReadStage::Converting, observer, progress);
        let total = survivors.len().max(1) as f32;
        for (index, series) in survivors.into_iter().enumerate() {
            if progress.cancel_requested() {
                return Err(IngestError::Cancelled);
            }
            let uid = series.instance_uid.clone();
            let context = session.registry().context(&series);
            let (typed, status) = self.converter.convert(series, context);
            report.set_status(&uid, status);

            match self.options.notification {
                NotificationMode::Progressive => {
                    let result = dest.merge(typed);
                    if let Some(merged) = dest.get(&uid) {
                        observer.series_merged(merged, result);
                    }
                }
                NotificationMode::Batch => pending.push(typed),
            }
            progress.progress(
                ReadStage::Converting.fraction() + 0.5 * (index + 1) as f32 / total,
                &format!("Converted {}", uid),
            );
        }
        Ok(())
    }

    /// Merges held-back series and emits the completion notification
    fn finish(
        &self,
        pending: Vec<TypedSeries>,
        dest: &mut SeriesSet,
        report: &ReadReport,
        observer: &mut dyn ReadObserver,
        progress: &dyn ProgressSink,
    ) {
        for typed in pending {
            dest.merge(typed);
        }
        Self::enter(ReadStage::Merged, observer, progress);
        info!(
            "Read complete: {} series in output, {} file issues",
            report.output_count(),
            report.file_issues.len()
        );
        if self.options.notification == NotificationMode::Batch {
            observer.batch_complete(dest, report);
        }
    }
}
