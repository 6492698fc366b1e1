use log::{debug, info, warn};

use super::registry::{FilterRegistry, FilterSpec};
use super::{Filter, Outcome};
use crate::error::{IngestError, Result};
use crate::notify::{ProgressSink, ReadStage};
use crate::report::{FilterOutcome, ReadReport, SeriesStatus};
use crate::types::DicomSeries;

/// Series that survived the pipeline, in input order
pub type PipelineOutput = Vec<DicomSeries>;

/// Ordered chain of filters run over the whole series collection
pub struct FilterPipeline {
    filters: Vec<Box<dyn Filter>>,
    abort_on_empty: bool,
}

impl std::fmt::Debug for FilterPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterPipeline")
            .field("filters", &self.names())
            .field("abort_on_empty", &self.abort_on_empty)
            .finish()
    }
}

impl FilterPipeline {
    pub fn new(filters: Vec<Box<dyn Filter>>) -> Self {
        Self {
            filters,
            abort_on_empty: false,
        }
    }

    /// Builds the chain from named specs
    ///
    /// # Errors
    ///
    /// Returns `UnknownFilter` or `InvalidFilterParameter` for a bad spec
    pub fn from_specs(registry: &FilterRegistry, specs: &[FilterSpec]) -> Result<Self> {
        Ok(Self::new(registry.build_chain(specs)?))
    }

    /// Builder: Fail when no series survives
    pub fn abort_on_empty(mut self, enabled: bool) -> Self {
        self.abort_on_empty = enabled;
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Runs every filter, in order, over the surviving series
    ///
    /// Each `(filter, outcome)` pair is recorded in the report. Rejected
    /// series leave the batch. Cancellation is polled between filters; a
    /// filter always finishes the series it is working on.
    ///
    /// # Errors
    ///
    /// Returns `Cancelled` on request, or `NoSeriesSurvived` when the
    /// abort-on-empty policy is on and nothing is left
    pub fn run(
        &self,
        mut series: Vec<DicomSeries>,
        report: &mut ReadReport,
        progress: &dyn ProgressSink,
    ) -> Result<PipelineOutput> {
        let span = ReadStage::Converting.fraction() - ReadStage::Filtering.fraction();
        let steps = self.filters.len().max(1) as f32;

        for (step, filter) in self.filters.iter().enumerate() {
            if progress.cancel_requested() {
                return Err(IngestError::Cancelled);
            }
            debug!("Running filter {} ({})", filter.name(), filter.kind());

            let mut survivors = Vec::with_capacity(series.len());
            for current in series {
                let outcome = if filter.can_apply(&current) {
                    filter.apply(&current)
                } else {
                    Outcome::NotApplicable
                };
                report.record_filter(
                    &current.instance_uid,
                    filter.name(),
                    FilterOutcome::from(&outcome),
                );

                match outcome {
                    Outcome::Applied(updated) => survivors.push(updated),
                    Outcome::NotApplicable => {
                        debug!("{} not applicable to {}", filter.name(), current.instance_uid);
                        survivors.push(current);
                    }
                    Outcome::Rejected(reason) => {
                        warn!(
                            "{} rejected series {}: {}",
                            filter.name(),
                            current.instance_uid,
                            reason
                        );
                        report.set_status(
                            &current.instance_uid,
                            SeriesStatus::Rejected {
                                filter: filter.name().to_string(),
                                reason,
                            },
                        );
                    }
                }
            }
            series = survivors;

            progress.progress(
                ReadStage::Filtering.fraction() + span * (step + 1) as f32 / steps,
                &format!("Applied {}", filter.name()),
            );
        }

        info!("{} series survived {} filters", series.len(), self.filters.len());
        if self.abort_on_empty && series.is_empty() {
            return Err(IngestError::NoSeriesSurvived);
        }
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::SLICE_THICKNESS;
    use crate::filter::{FilterKind, InstanceNumberSorter, SliceSpacingValidator};
    use crate::notify::{CancelFlag, NoProgress};
    use crate::testing::{raw_instance, raw_series};

    fn volume(uid: &str, z: &[f64]) -> DicomSeries {
        // Instance numbers run backwards so sorting is observable
        let n = z.len() as i32;
        let instances = z
            .iter()
            .enumerate()
            .map(|(i, z)| raw_instance(&format!("{}.dcm", i), Some(n - i as i32), Some(*z)))
            .collect();
        raw_series(uid, instances)
    }

    #[test]
    fn test_default_chain_sorts_then_computes() {
        let pipeline =
            FilterPipeline::from_specs(&FilterRegistry::default(), &FilterSpec::default_chain())
                .unwrap();
        let mut report = ReadReport::new();
        let out = pipeline
            .run(vec![volume("1.1", &[1.6, 0.8, 0.0])], &mut report, &NoProgress)
            .unwrap();

        assert_eq!(out.len(), 1);
        let series = &out[0];
        assert!(series.is_ordered());
        assert_eq!(series.instances[0].instance_number, Some(1));
        assert!((series.computed_f64(SLICE_THICKNESS).unwrap() - 0.8).abs() < 1e-8);
        assert_eq!(
            report.series["1.1"].filters,
            vec![
                ("instance-number-sorter".to_string(), FilterOutcome::Applied),
                ("slice-thickness-modifier".to_string(), FilterOutcome::Applied),
            ]
        );
    }

    #[test]
    fn test_modifier_before_sorter_leaves_spacing_to_positions() {
        let specs: Vec<FilterSpec> = vec![
            "slice-thickness-modifier".parse().unwrap(),
            "instance-number-sorter".parse().unwrap(),
        ];
        let pipeline = FilterPipeline::from_specs(&FilterRegistry::default(), &specs).unwrap();
        let series = raw_series(
            "1.1",
            vec![
                raw_instance("a.dcm", Some(1), Some(0.0)),
                raw_instance("b.dcm", Some(3), Some(1.6)),
                raw_instance("c.dcm", Some(2), Some(0.8)),
            ],
        );
        let mut report = ReadReport::new();
        let out = pipeline.run(vec![series], &mut report, &NoProgress).unwrap();

        assert_eq!(
            report.series["1.1"].filters,
            vec![
                ("slice-thickness-modifier".to_string(), FilterOutcome::NotApplicable),
                ("instance-number-sorter".to_string(), FilterOutcome::Applied),
            ]
        );
        assert_eq!(out[0].computed(SLICE_THICKNESS), None);
        assert!((crate::convert::slice_spacing(&out[0]) - 0.8).abs() < 1e-8);
    }

    #[test]
    fn test_rejection_removes_only_that_series() {
        let pipeline = FilterPipeline::new(vec![
            Box::new(InstanceNumberSorter) as Box<dyn Filter>,
            Box::new(SliceSpacingValidator::default()),
        ]);
        let mut report = ReadReport::new();
        let out = pipeline
            .run(
                vec![volume("1.1", &[2.0, 1.0, 0.0]), volume("1.2", &[5.0, 1.0, 0.0])],
                &mut report,
                &NoProgress,
            )
            .unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].instance_uid, "1.1");
        assert!(matches!(
            report.status("1.2"),
            Some(SeriesStatus::Rejected { filter, .. }) if filter == "slice-spacing-validator"
        ));
    }

    #[test]
    fn test_not_applicable_is_soft() {
        let pipeline =
            FilterPipeline::from_specs(&FilterRegistry::default(), &FilterSpec::default_chain())
                .unwrap();
        let mut report = ReadReport::new();
        let single = raw_series("1.3", vec![raw_instance("a.dcm", Some(1), None)]);
        let out = pipeline.run(vec![single], &mut report, &NoProgress).unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(report.series["1.3"].filters[1].1, FilterOutcome::NotApplicable);
        assert_eq!(report.status("1.3"), Some(&SeriesStatus::Pending));
    }

    #[test]
    fn test_abort_on_empty_is_opt_in() {
        let rejecting = || {
            FilterPipeline::new(vec![
                Box::new(InstanceNumberSorter) as Box<dyn Filter>,
                Box::new(SliceSpacingValidator::default()),
            ])
        };
        let input = || vec![volume("1.2", &[5.0, 1.0, 0.0])];

        let out = rejecting()
            .run(input(), &mut ReadReport::new(), &NoProgress)
            .unwrap();
        assert!(out.is_empty());

        let err = rejecting()
            .abort_on_empty(true)
            .run(input(), &mut ReadReport::new(), &NoProgress)
            .unwrap_err();
        assert!(matches!(err, IngestError::NoSeriesSurvived));
    }

    #[test]
    fn test_cancel_between_filters() {
        let pipeline = FilterPipeline::new(vec![Box::new(InstanceNumberSorter) as Box<dyn Filter>]);
        let flag = CancelFlag::new();
        flag.cancel();
        let err = pipeline
            .run(vec![volume("1.1", &[0.0])], &mut ReadReport::new(), &flag)
            .unwrap_err();
        assert!(matches!(err, IngestError::Cancelled));
    }

    #[test]
    fn test_names_in_order() {
        let pipeline = FilterPipeline::new(vec![
            Box::new(SliceSpacingValidator::default()) as Box<dyn Filter>,
            Box::new(InstanceNumberSorter),
        ]);
        assert_eq!(pipeline.names(), vec!["slice-spacing-validator", "instance-number-sorter"]);
        assert_eq!(pipeline.filters[1].kind(), FilterKind::Sorter);
    }
}
