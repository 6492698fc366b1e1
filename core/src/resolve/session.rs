use log::{debug, info, warn};
use std::collections::{BTreeSet, HashSet};

use super::grouper::{GroupOutcome, SeriesGrouper};
use super::registry::EntityRegistry;
use crate::extraction::ScanBatch;
use crate::report::{FileIssue, IssueKind, ReadReport, SeriesStatus};
use crate::types::{DicomSeries, EmptyKeyPolicy};

/// Arena of one read: entity registries plus the raw series collection
///
/// A session may be fed several scan batches (incremental reads). Grouping is
/// idempotent across batches, and only the series a batch touched are handed
/// back for processing.
#[derive(Debug, Default)]
pub struct ScanSession {
    registry: EntityRegistry,
    grouper: SeriesGrouper,
    touched: BTreeSet<String>,
}

impl ScanSession {
    pub fn new(policy: EmptyKeyPolicy) -> Self {
        Self {
            registry: EntityRegistry::new(policy),
            grouper: SeriesGrouper::new(),
            touched: BTreeSet::new(),
        }
    }

    /// Resolves entities and groups one scan batch, recording issues
    ///
    /// Files delivered again by a later batch are neither counted nor reported twice.
    pub fn ingest(&mut self, batch: ScanBatch, report: &mut ReadReport) {
        // Files already noted by an earlier batch
        let mut repeated = HashSet::new();

        for scanned in &batch.unsupported {
            if !self.grouper.note_unsupported(scanned) {
                repeated.insert(scanned.path.clone());
                continue;
            }
            report.files_scanned += 1;
            if let Some(uid) = &scanned.series_instance_uid {
                // Series with accepted instances are unaffected by exclusions
                if self.grouper.get(uid).is_none() {
                    self.touched.insert(uid.clone());
                }
            }
        }
        for issue in batch.issues {
            if issue.kind == IssueKind::UnsupportedSopClass && repeated.contains(&issue.path) {
                continue;
            }
            report.add_file_issue(issue);
        }

        for scanned in &batch.accepted {
            let outcome = self.grouper.add(scanned, &mut self.registry);
            if outcome != GroupOutcome::AlreadyIngested {
                report.files_scanned += 1;
            }
            match outcome {
                GroupOutcome::Added(uid) => {
                    self.touched.insert(uid);
                }
                GroupOutcome::AlreadyIngested => {
                    debug!("Already ingested {}", scanned.path.display());
                }
                GroupOutcome::DuplicateInstance { first } => {
                    warn!(
                        "Skipping {}: SOPInstanceUID {} already read from {}",
                        scanned.path.display(),
                        scanned.sop_instance_uid,
                        first.display()
                    );
                    report.add_file_issue(FileIssue::new(
                        &scanned.path,
                        IssueKind::DuplicateInstance,
                        format!("same SOPInstanceUID as {}", first.display()),
                    ));
                }
                GroupOutcome::MissingSeriesUid => {
                    warn!("Skipping {}: no SeriesInstanceUID", scanned.path.display());
                    report.add_file_issue(FileIssue::new(
                        &scanned.path,
                        IssueKind::MissingRequiredTag,
                        "SeriesInstanceUID missing",
                    ));
                }
            }
        }

        info!(
            "Grouped {} series ({} patients, {} studies)",
            self.grouper.len(),
            self.registry.patients().len(),
            self.registry.studies().len()
        );
    }

    /// Takes the series touched since the last call, ordered by UID
    ///
    /// Series emptied by the allow-list are reported as excluded and not
    /// returned.
    pub fn take_touched(&mut self, report: &mut ReadReport) -> Vec<DicomSeries> {
        let touched = std::mem::take(&mut self.touched);
        let mut out = Vec::with_capacity(touched.len());

        for uid in touched {
            match self.grouper.get(&uid) {
                Some(series) if !series.is_empty() => {
                    let entry = report.series_entry(&uid);
                    entry.modality = series.modality.clone();
                    entry.instances = series.number_of_instances();
                    entry.filters.clear();
                    entry.status = SeriesStatus::Pending;
                    out.push(series.clone());
                }
                Some(_) => {
                    report.set_status(
                        &uid,
                        SeriesStatus::Excluded {
                            kind: IssueKind::MissingRequiredTag,
                            message: "series has no instance".to_string(),
                        },
                    );
                }
                None => {
                    if let Some(excluded) = self.grouper.excluded(&uid) {
                        debug!("Series {} emptied by the SOP class allow-list", uid);
                        let entry = report.series_entry(&uid);
                        entry.modality = excluded.modality.clone();
                        entry.instances = 0;
                        entry.status = SeriesStatus::Excluded {
                            kind: IssueKind::UnsupportedSopClass,
                            message: format!("{} files excluded", excluded.files),
                        };
                    }
                }
            }
        }
        out
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::ScannedInstance;
    use std::path::PathBuf;

    fn scanned(path: &str, series: &str, sop: &str) -> ScannedInstance {
        ScannedInstance {
            path: PathBuf::from(path),
            patient_id: "P1".into(),
            study_instance_uid: "1.1".into(),
            series_instance_uid: Some(series.into()),
            sop_instance_uid: sop.into(),
            modality: "CT".into(),
            number_of_frames: 1,
            ..Default::default()
        }
    }

    fn batch(accepted: Vec<ScannedInstance>, unsupported: Vec<ScannedInstance>) -> ScanBatch {
        ScanBatch {
            accepted,
            unsupported,
            issues: Vec::new(),
        }
    }

    #[test]
    fn test_take_touched_only_returns_new_work() {
        let mut session = ScanSession::default();
        let mut report = ReadReport::new();
        session.ingest(
            batch(vec![scanned("/a", "1.2.1", "9.1"), scanned("/b", "1.2.2", "9.2")], vec![]),
            &mut report,
        );
        assert_eq!(session.take_touched(&mut report).len(), 2);
        assert!(session.take_touched(&mut report).is_empty());

        session.ingest(
            batch(vec![scanned("/a", "1.2.1", "9.1"), scanned("/c", "1.2.2", "9.3")], vec![]),
            &mut report,
        );
        let touched = session.take_touched(&mut report);
        assert_eq!(touched.len(), 1);
        assert_eq!(touched[0].instance_uid, "1.2.2");
        assert_eq!(touched[0].number_of_instances(), 2);
        assert_eq!(report.files_scanned, 3);
    }

    #[test]
    fn test_duplicates_are_reported() {
        let mut session = ScanSession::default();
        let mut report = ReadReport::new();
        session.ingest(
            batch(vec![scanned("/a", "1.2.1", "9.1"), scanned("/b", "1.2.1", "9.1")], vec![]),
            &mut report,
        );
        assert_eq!(report.issues_of(IssueKind::DuplicateInstance).count(), 1);
        assert_eq!(session.take_touched(&mut report)[0].number_of_instances(), 1);
    }

    #[test]
    fn test_fully_unsupported_series_is_excluded() {
        let mut session = ScanSession::default();
        let mut report = ReadReport::new();
        session.ingest(
            batch(vec![], vec![scanned("/a", "1.2.1", "9.1"), scanned("/b", "1.2.1", "9.2")]),
            &mut report,
        );
        assert!(session.take_touched(&mut report).is_empty());
        assert_eq!(
            report.status("1.2.1"),
            Some(&SeriesStatus::Excluded {
                kind: IssueKind::UnsupportedSopClass,
                message: "2 files excluded".into(),
            })
        );
    }

    #[test]
    fn test_redelivered_unsupported_file_is_reported_once() {
        let mut session = ScanSession::default();
        let mut report = ReadReport::new();
        let excluded = || {
            let file = scanned("/mr", "1.2.9", "9.9");
            ScanBatch {
                issues: vec![FileIssue::new(&file.path, IssueKind::UnsupportedSopClass, "MR")],
                accepted: vec![],
                unsupported: vec![file],
            }
        };

        session.ingest(excluded(), &mut report);
        assert!(session.take_touched(&mut report).is_empty());
        session.ingest(excluded(), &mut report);
        assert!(session.take_touched(&mut report).is_empty());

        assert_eq!(report.files_scanned, 1);
        assert_eq!(report.issues_of(IssueKind::UnsupportedSopClass).count(), 1);
        assert_eq!(
            report.status("1.2.9"),
            Some(&SeriesStatus::Excluded {
                kind: IssueKind::UnsupportedSopClass,
                message: "1 files excluded".into(),
            })
        );
    }

    #[test]
    fn test_exclusion_does_not_touch_accepted_series() {
        let mut session = ScanSession::default();
        let mut report = ReadReport::new();
        session.ingest(batch(vec![scanned("/a", "1.2.1", "9.1")], vec![]), &mut report);
        assert_eq!(session.take_touched(&mut report).len(), 1);

        session.ingest(batch(vec![], vec![scanned("/b", "1.2.1", "9.2")]), &mut report);
        assert!(session.take_touched(&mut report).is_empty());
    }
}
