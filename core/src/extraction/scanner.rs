use dicom_object::{InMemDicomObject, OpenFileOptions};
use log::{debug, warn};
use std::path::{Path, PathBuf};

use super::tags::{
    get_decimal_array, get_decimal_values, get_int_value, get_string_value, get_u16_value,
    COLUMNS, IMAGE_ORIENTATION_PATIENT, IMAGE_POSITION_PATIENT, INSTANCE_NUMBER,
    INSTITUTION_NAME, MANUFACTURER, MODALITY, NUMBER_OF_FRAMES, PATIENT_BIRTH_DATE, PATIENT_ID,
    PATIENT_NAME, PATIENT_SEX, PIXEL_DATA, PIXEL_SPACING, ROWS, SERIES_DATE, SERIES_DESCRIPTION,
    SERIES_INSTANCE_UID, SERIES_TIME, SLICE_THICKNESS, SOP_CLASS_UID, SOP_INSTANCE_UID,
    STATION_NAME, STUDY_DATE, STUDY_DESCRIPTION, STUDY_INSTANCE_UID, STUDY_TIME,
};
use crate::error::{IngestError, Result};
use crate::notify::ProgressSink;
use crate::report::{FileIssue, IssueKind};
use crate::types::{Instance, ReadOptions, SopClass};

/// Tags extracted from one file, without decoding pixel data
///
/// String attributes default to empty when the tag is absent; identity
/// decisions on empty values are made by the resolver, not here.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScannedInstance {
    pub path: PathBuf,

    // Patient
    pub patient_id: String,
    pub patient_name: String,
    pub patient_birth_date: String,
    pub patient_sex: String,

    // Study
    pub study_instance_uid: String,
    pub study_date: String,
    pub study_time: String,
    pub study_description: String,

    // Series
    pub series_instance_uid: Option<String>,
    pub modality: String,
    pub series_date: String,
    pub series_time: String,
    pub series_description: String,

    // Equipment
    pub manufacturer: String,
    pub station_name: String,
    pub institution_name: String,

    // Instance
    pub sop_class_uid: String,
    pub sop_instance_uid: String,
    pub instance_number: Option<i32>,
    pub position: Option<[f64; 3]>,
    pub orientation: Option<[f64; 6]>,
    pub pixel_spacing: Option<[f64; 2]>,
    pub slice_thickness: Option<f64>,
    pub number_of_frames: u32,
    pub rows: Option<u16>,
    pub columns: Option<u16>,
}

impl ScannedInstance {
    /// Scans a file, stopping before PixelData
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed as DICOM
    pub fn from_file(path: &Path) -> Result<Self> {
        let obj = OpenFileOptions::new()
            .read_until(PIXEL_DATA)
            .open_file(path)?;
        let media_sop_class = obj.meta().media_storage_sop_class_uid().to_string();
        let mut scanned = Self::from_dicom(path.to_path_buf(), &obj);
        if scanned.sop_class_uid.is_empty() {
            scanned.sop_class_uid = media_sop_class
                .trim_matches(|c: char| c == '\0' || c.is_whitespace())
                .to_string();
        }
        Ok(scanned)
    }

    /// Extracts the tag set from an already-opened DICOM object
    pub fn from_dicom(path: PathBuf, dcm: &InMemDicomObject) -> Self {
        let text = |tag| get_string_value(dcm, tag).unwrap_or_default();

        Self {
            path,
            patient_id: text(PATIENT_ID),
            patient_name: text(PATIENT_NAME),
            patient_birth_date: text(PATIENT_BIRTH_DATE),
            patient_sex: text(PATIENT_SEX),
            study_instance_uid: text(STUDY_INSTANCE_UID),
            study_date: text(STUDY_DATE),
            study_time: text(STUDY_TIME),
            study_description: text(STUDY_DESCRIPTION),
            series_instance_uid: get_string_value(dcm, SERIES_INSTANCE_UID)
                .filter(|uid| !uid.is_empty()),
            modality: text(MODALITY),
            series_date: text(SERIES_DATE),
            series_time: text(SERIES_TIME),
            series_description: text(SERIES_DESCRIPTION),
            manufacturer: text(MANUFACTURER),
            station_name: text(STATION_NAME),
            institution_name: text(INSTITUTION_NAME),
            sop_class_uid: text(SOP_CLASS_UID),
            sop_instance_uid: text(SOP_INSTANCE_UID),
            instance_number: get_int_value(dcm, INSTANCE_NUMBER),
            position: get_decimal_array(dcm, IMAGE_POSITION_PATIENT),
            orientation: get_decimal_array(dcm, IMAGE_ORIENTATION_PATIENT),
            pixel_spacing: get_decimal_array(dcm, PIXEL_SPACING),
            slice_thickness: get_decimal_values(dcm, SLICE_THICKNESS)
                .and_then(|values| values.first().copied()),
            number_of_frames: get_int_value(dcm, NUMBER_OF_FRAMES)
                .filter(|n| *n > 0)
                .map(|n| n as u32)
                .unwrap_or(1),
            rows: get_u16_value(dcm, ROWS),
            columns: get_u16_value(dcm, COLUMNS),
        }
    }

    /// Whether this file is a DICOMDIR rather than an instance
    pub fn is_directory(&self) -> bool {
        SopClass::is_directory(&self.sop_class_uid)
    }

    /// Instance record kept by the series
    pub fn to_instance(&self) -> Instance {
        Instance {
            path: self.path.clone(),
            sop_instance_uid: self.sop_instance_uid.clone(),
            sop_class_uid: self.sop_class_uid.clone(),
            instance_number: self.instance_number,
            position: self.position,
            orientation: self.orientation,
            number_of_frames: self.number_of_frames,
        }
    }
}

/// Result of scanning a batch of files
#[derive(Debug, Default)]
pub struct ScanBatch {
    /// Files accepted for grouping
    pub accepted: Vec<ScannedInstance>,
    /// Readable files excluded by the SOP class allow-list
    pub unsupported: Vec<ScannedInstance>,
    /// Files skipped, with why
    pub issues: Vec<FileIssue>,
}

impl ScanBatch {
    /// Files that parsed as DICOM, whether accepted or excluded
    pub fn readable(&self) -> usize {
        self.accepted.len() + self.unsupported.len()
    }
}

/// Scans files one by one
///
/// Unreadable files are skipped and recorded, never fatal. Cancellation is
/// polled between files.
///
/// # Errors
///
/// Returns `Cancelled` if the sink requests cancellation
pub fn scan_files(
    paths: &[PathBuf],
    options: &ReadOptions,
    progress: &dyn ProgressSink,
) -> Result<ScanBatch> {
    let mut batch = ScanBatch::default();
    let total = paths.len().max(1) as f32;

    for (index, path) in paths.iter().enumerate() {
        if progress.cancel_requested() {
            return Err(IngestError::Cancelled);
        }

        match ScannedInstance::from_file(path) {
            Ok(scanned) if scanned.is_directory() => {
                debug!("Skipping DICOMDIR {}", path.display());
            }
            Ok(scanned) => {
                if options.is_sop_class_allowed(&scanned.sop_class_uid) {
                    debug!("Scanned {}", path.display());
                    batch.accepted.push(scanned);
                } else {
                    debug!(
                        "Excluding {}: SOP class {} not allowed",
                        path.display(),
                        SopClass::name_of(&scanned.sop_class_uid)
                    );
                    batch.issues.push(FileIssue::new(
                        path,
                        IssueKind::UnsupportedSopClass,
                        format!(
                            "SOP class {} not in allow-list",
                            SopClass::name_of(&scanned.sop_class_uid)
                        ),
                    ));
                    batch.unsupported.push(scanned);
                }
            }
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                batch
                    .issues
                    .push(FileIssue::new(path, IssueKind::FileUnreadable, e.to_string()));
            }
        }

        progress.progress(
            0.3 * (index + 1) as f32 / total,
            &format!("Scanned {}", path.display()),
        );
    }

    Ok(batch)
}
