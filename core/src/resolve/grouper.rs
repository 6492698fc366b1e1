use log::debug;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;

use super::registry::EntityRegistry;
use crate::extraction::{
    ScannedInstance, COLUMNS, PIXEL_SPACING, ROWS, SLICE_THICKNESS,
};
use crate::types::{DecimalList, DicomSeries};

/// What happened to one scanned file when grouping it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupOutcome {
    /// Added to the series with this SeriesInstanceUID
    Added(String),
    /// Same path was grouped before; nothing changed
    AlreadyIngested,
    /// SOPInstanceUID already grouped from another file
    DuplicateInstance { first: PathBuf },
    /// No SeriesInstanceUID
    MissingSeriesUid,
}

/// Files of a series dropped by the SOP class allow-list
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExcludedFiles {
    pub modality: String,
    pub files: usize,
}

/// Clusters scanned files into raw series by SeriesInstanceUID
#[derive(Debug, Default)]
pub struct SeriesGrouper {
    series: BTreeMap<String, DicomSeries>,
    paths: HashSet<PathBuf>,
    sop_instances: HashMap<String, PathBuf>,
    excluded_paths: HashSet<PathBuf>,
    unsupported: BTreeMap<String, ExcludedFiles>,
}

impl SeriesGrouper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Groups one file, resolving its entities on first sight of the series
    pub fn add(&mut self, scanned: &ScannedInstance, registry: &mut EntityRegistry) -> GroupOutcome {
        if self.paths.contains(&scanned.path) {
            return GroupOutcome::AlreadyIngested;
        }
        let series_uid = match &scanned.series_instance_uid {
            Some(uid) => uid.clone(),
            None => return GroupOutcome::MissingSeriesUid,
        };
        if !scanned.sop_instance_uid.is_empty() {
            if let Some(first) = self.sop_instances.get(&scanned.sop_instance_uid) {
                return GroupOutcome::DuplicateInstance {
                    first: first.clone(),
                };
            }
            self.sop_instances
                .insert(scanned.sop_instance_uid.clone(), scanned.path.clone());
        }
        self.paths.insert(scanned.path.clone());

        let series = self.series.entry(series_uid.clone()).or_insert_with(|| {
            let (patient, study, equipment) = registry.resolve(scanned, &series_uid);
            debug!("New series {}", series_uid);
            new_series(&series_uid, scanned, patient, study, equipment)
        });
        series.instances.push(scanned.to_instance());
        if !scanned.sop_class_uid.is_empty() {
            series.sop_class_uids.insert(scanned.sop_class_uid.clone());
        }
        // A new instance invalidates any previous ordering
        series.ordered = false;

        GroupOutcome::Added(series_uid)
    }

    /// Remembers a file the allow-list excluded, so its series can be reported
    ///
    /// Returns false when the path was already noted.
    pub fn note_unsupported(&mut self, scanned: &ScannedInstance) -> bool {
        if self.paths.contains(&scanned.path) || !self.excluded_paths.insert(scanned.path.clone()) {
            return false;
        }
        if let Some(uid) = &scanned.series_instance_uid {
            let entry = self.unsupported.entry(uid.clone()).or_default();
            if entry.modality.is_empty() {
                entry.modality = scanned.modality.clone();
            }
            entry.files += 1;
        }
        true
    }

    /// Allow-list exclusions of a series that has no accepted instance
    pub fn excluded(&self, series_uid: &str) -> Option<&ExcludedFiles> {
        if self.series.contains_key(series_uid) {
            return None;
        }
        self.unsupported.get(series_uid)
    }

    pub fn get(&self, series_uid: &str) -> Option<&DicomSeries> {
        self.series.get(series_uid)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

fn new_series(
    uid: &str,
    scanned: &ScannedInstance,
    patient: crate::types::PatientId,
    study: crate::types::StudyId,
    equipment: crate::types::EquipmentId,
) -> DicomSeries {
    let mut series = DicomSeries::new(uid, patient, study, equipment);
    series.modality = scanned.modality.clone();
    series.description = scanned.series_description.clone();
    series.date = scanned.series_date.clone();
    series.time = scanned.series_time.clone();

    // Sparse tag cache from the first instance
    if let Some(spacing) = scanned.pixel_spacing {
        series
            .tags
            .insert(PIXEL_SPACING, DecimalList::new(spacing.to_vec()).to_string());
    }
    if let Some(thickness) = scanned.slice_thickness {
        series.tags.insert(SLICE_THICKNESS, thickness.to_string());
    }
    if let Some(rows) = scanned.rows {
        series.tags.insert(ROWS, rows.to_string());
    }
    if let Some(columns) = scanned.columns {
        series.tags.insert(COLUMNS, columns.to_string());
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanned(path: &str, series: Option<&str>, sop: &str, number: i32) -> ScannedInstance {
        ScannedInstance {
            path: PathBuf::from(path),
            patient_id: "P1".into(),
            study_instance_uid: "1.1".into(),
            series_instance_uid: series.map(String::from),
            sop_instance_uid: sop.into(),
            sop_class_uid: "1.2.840.10008.5.1.4.1.1.2".into(),
            modality: "CT".into(),
            instance_number: Some(number),
            number_of_frames: 1,
            pixel_spacing: Some([0.5, 0.5]),
            rows: Some(512),
            ..Default::default()
        }
    }

    #[test]
    fn test_groups_by_series_uid() {
        let mut registry = EntityRegistry::default();
        let mut grouper = SeriesGrouper::new();
        grouper.add(&scanned("/a/1.dcm", Some("1.2.1"), "9.1", 1), &mut registry);
        grouper.add(&scanned("/a/2.dcm", Some("1.2.2"), "9.2", 1), &mut registry);
        grouper.add(&scanned("/a/3.dcm", Some("1.2.1"), "9.3", 2), &mut registry);

        assert_eq!(grouper.len(), 2);
        let series = grouper.get("1.2.1").unwrap();
        assert_eq!(series.number_of_instances(), 2);
        assert_eq!(series.modality, "CT");
        assert_eq!(series.tag(PIXEL_SPACING), Some("0.5\\0.5"));
        assert_eq!(series.tag(ROWS), Some("512"));
        assert!(!series.is_multi_frame());
        assert_eq!(registry.patients().len(), 1);
    }

    #[test]
    fn test_regrouping_same_path_is_noop() {
        let mut registry = EntityRegistry::default();
        let mut grouper = SeriesGrouper::new();
        let file = scanned("/a/1.dcm", Some("1.2.1"), "9.1", 1);
        assert_eq!(grouper.add(&file, &mut registry), GroupOutcome::Added("1.2.1".into()));
        assert_eq!(grouper.add(&file, &mut registry), GroupOutcome::AlreadyIngested);
        assert_eq!(grouper.get("1.2.1").unwrap().number_of_instances(), 1);
    }

    #[test]
    fn test_duplicate_sop_instance_is_skipped() {
        let mut registry = EntityRegistry::default();
        let mut grouper = SeriesGrouper::new();
        grouper.add(&scanned("/a/1.dcm", Some("1.2.1"), "9.1", 1), &mut registry);
        let outcome = grouper.add(&scanned("/b/copy.dcm", Some("1.2.1"), "9.1", 1), &mut registry);
        assert_eq!(
            outcome,
            GroupOutcome::DuplicateInstance {
                first: PathBuf::from("/a/1.dcm")
            }
        );
        assert_eq!(grouper.get("1.2.1").unwrap().number_of_instances(), 1);
    }

    #[test]
    fn test_missing_series_uid() {
        let mut registry = EntityRegistry::default();
        let mut grouper = SeriesGrouper::new();
        let outcome = grouper.add(&scanned("/a/1.dcm", None, "9.1", 1), &mut registry);
        assert_eq!(outcome, GroupOutcome::MissingSeriesUid);
        assert!(grouper.is_empty());
    }

    #[test]
    fn test_unsupported_series_only_reported_when_empty() {
        let mut registry = EntityRegistry::default();
        let mut grouper = SeriesGrouper::new();
        grouper.note_unsupported(&scanned("/a/1.dcm", Some("1.2.1"), "9.1", 1));
        grouper.note_unsupported(&scanned("/a/2.dcm", Some("1.2.1"), "9.2", 2));
        grouper.note_unsupported(&scanned("/a/3.dcm", Some("1.2.2"), "9.3", 1));
        grouper.add(&scanned("/a/4.dcm", Some("1.2.2"), "9.4", 2), &mut registry);

        assert_eq!(grouper.excluded("1.2.1").map(|e| e.files), Some(2));
        assert!(grouper.excluded("1.2.2").is_none());
    }

    #[test]
    fn test_repeated_unsupported_file_counts_once() {
        let mut grouper = SeriesGrouper::new();
        let file = scanned("/a/1.dcm", Some("1.2.1"), "9.1", 1);
        assert!(grouper.note_unsupported(&file));
        assert!(!grouper.note_unsupported(&file));
        assert_eq!(grouper.excluded("1.2.1").map(|e| e.files), Some(1));
    }
}
