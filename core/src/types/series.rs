use dicom_core::Tag;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use super::entities::{EquipmentId, PatientId, StudyId};

/// One DICOM file of a series
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    /// Path to the DICOM file; the pixel/mesh payload is read from here on conversion
    pub path: PathBuf,

    pub sop_instance_uid: String,

    pub sop_class_uid: String,

    pub instance_number: Option<i32>,

    /// ImagePositionPatient
    pub position: Option<[f64; 3]>,

    /// ImageOrientationPatient
    pub orientation: Option<[f64; 6]>,

    pub number_of_frames: u32,
}

impl Instance {
    /// File name component, used as ordering tie-break
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
    }

    /// Slice normal from the orientation cosines (row × column)
    pub fn normal(&self) -> Option<[f64; 3]> {
        let o = self.orientation?;
        Some([
            o[1] * o[5] - o[2] * o[4],
            o[2] * o[3] - o[0] * o[5],
            o[0] * o[4] - o[1] * o[3],
        ])
    }

    /// Position along the slice normal, or raw Z without orientation
    pub fn slice_location(&self) -> Option<f64> {
        let p = self.position?;
        match self.normal() {
            Some(n) => Some(p[0] * n[0] + p[1] * n[1] + p[2] * n[2]),
            None => Some(p[2]),
        }
    }

    /// Compares by InstanceNumber ascending; missing or equal numbers fall back
    /// to the file name, lexicographic ascending
    ///
    /// Instances without a number sort after numbered ones.
    pub fn cmp_by_instance_number(&self, other: &Instance) -> Ordering {
        let by_number = match (self.instance_number, other.instance_number) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_number
            .then_with(|| self.file_name().cmp(other.file_name()))
            .then_with(|| self.path.cmp(&other.path))
    }
}

/// Raw series: instance files sharing one SeriesInstanceUID
///
/// Tags read from source files (`tags`) are kept apart from values derived by
/// filters (`computed_tags`).
#[derive(Debug, Clone, PartialEq)]
pub struct DicomSeries {
    pub instance_uid: String,

    pub modality: String,

    pub description: String,

    pub date: String,

    pub time: String,

    pub patient: PatientId,

    pub study: StudyId,

    pub equipment: EquipmentId,

    pub instances: Vec<Instance>,

    pub sop_class_uids: BTreeSet<String>,

    /// Sparse cache of tags read from the first instance
    pub tags: BTreeMap<Tag, String>,

    /// Values injected by filters
    pub computed_tags: BTreeMap<Tag, String>,

    /// Set once a sorter has established the instance order
    pub ordered: bool,
}

impl DicomSeries {
    pub fn new(
        instance_uid: impl Into<String>,
        patient: PatientId,
        study: StudyId,
        equipment: EquipmentId,
    ) -> Self {
        Self {
            instance_uid: instance_uid.into(),
            modality: String::new(),
            description: String::new(),
            date: String::new(),
            time: String::new(),
            patient,
            study,
            equipment,
            instances: Vec::new(),
            sop_class_uids: BTreeSet::new(),
            tags: BTreeMap::new(),
            computed_tags: BTreeMap::new(),
            ordered: false,
        }
    }

    pub fn number_of_instances(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Whether any instance holds more than one frame
    pub fn is_multi_frame(&self) -> bool {
        self.instances.iter().any(|i| i.number_of_frames > 1)
    }

    /// Total frame count across instances
    pub fn number_of_frames(&self) -> usize {
        self.instances
            .iter()
            .map(|i| i.number_of_frames.max(1) as usize)
            .sum()
    }

    /// Instance order is defined: sorted by a filter, or trivially ordered
    pub fn is_ordered(&self) -> bool {
        self.ordered || self.instances.len() <= 1
    }

    /// Value read from source files
    pub fn tag(&self, tag: Tag) -> Option<&str> {
        self.tags.get(&tag).map(String::as_str)
    }

    /// Value derived by a filter
    pub fn computed(&self, tag: Tag) -> Option<&str> {
        self.computed_tags.get(&tag).map(String::as_str)
    }

    pub fn computed_f64(&self, tag: Tag) -> Option<f64> {
        self.computed(tag).and_then(|v| v.trim().parse().ok())
    }

    pub fn set_computed(&mut self, tag: Tag, value: impl Into<String>) {
        self.computed_tags.insert(tag, value.into());
    }
}
