use dicom_core::Tag;
use dicom_object::InMemDicomObject;

use crate::types::DecimalList;

// Series Identification Tags
pub const SOP_CLASS_UID: Tag = Tag(0x0008, 0x0016);
pub const SOP_INSTANCE_UID: Tag = Tag(0x0008, 0x0018);
pub const SERIES_INSTANCE_UID: Tag = Tag(0x0020, 0x000E);
pub const SERIES_DATE: Tag = Tag(0x0008, 0x0021);
pub const SERIES_TIME: Tag = Tag(0x0008, 0x0031);
pub const SERIES_DESCRIPTION: Tag = Tag(0x0008, 0x103E);
pub const MODALITY: Tag = Tag(0x0008, 0x0060);
pub const INSTANCE_NUMBER: Tag = Tag(0x0020, 0x0013);

// Study Tags
pub const STUDY_INSTANCE_UID: Tag = Tag(0x0020, 0x000D);
pub const STUDY_DATE: Tag = Tag(0x0008, 0x0020);
pub const STUDY_TIME: Tag = Tag(0x0008, 0x0030);
pub const STUDY_DESCRIPTION: Tag = Tag(0x0008, 0x1030);

// Patient Tags
pub const PATIENT_NAME: Tag = Tag(0x0010, 0x0010);
pub const PATIENT_ID: Tag = Tag(0x0010, 0x0020);
pub const PATIENT_BIRTH_DATE: Tag = Tag(0x0010, 0x0030);
pub const PATIENT_SEX: Tag = Tag(0x0010, 0x0040);

// Equipment Tags
pub const MANUFACTURER: Tag = Tag(0x0008, 0x0070);
pub const INSTITUTION_NAME: Tag = Tag(0x0008, 0x0080);
pub const STATION_NAME: Tag = Tag(0x0008, 0x1010);

// Image Geometry Tags
pub const IMAGE_POSITION_PATIENT: Tag = Tag(0x0020, 0x0032);
pub const IMAGE_ORIENTATION_PATIENT: Tag = Tag(0x0020, 0x0037);
pub const PIXEL_SPACING: Tag = Tag(0x0028, 0x0030);
pub const SLICE_THICKNESS: Tag = Tag(0x0018, 0x0050);
pub const NUMBER_OF_FRAMES: Tag = Tag(0x0028, 0x0008);
pub const ROWS: Tag = Tag(0x0028, 0x0010);
pub const COLUMNS: Tag = Tag(0x0028, 0x0011);

// Pixel Description Tags
pub const SAMPLES_PER_PIXEL: Tag = Tag(0x0028, 0x0002);
pub const BITS_ALLOCATED: Tag = Tag(0x0028, 0x0100);
pub const PIXEL_REPRESENTATION: Tag = Tag(0x0028, 0x0103);
pub const RESCALE_INTERCEPT: Tag = Tag(0x0028, 0x1052);
pub const RESCALE_SLOPE: Tag = Tag(0x0028, 0x1053);
pub const PIXEL_DATA: Tag = Tag(0x7FE0, 0x0010);

// Surface Segmentation Tags
pub const SURFACE_SEQUENCE: Tag = Tag(0x0066, 0x0002);
pub const SURFACE_NUMBER: Tag = Tag(0x0066, 0x0003);
pub const SURFACE_COMMENTS: Tag = Tag(0x0066, 0x0004);
pub const SURFACE_POINTS_SEQUENCE: Tag = Tag(0x0066, 0x0011);
pub const NUMBER_OF_SURFACE_POINTS: Tag = Tag(0x0066, 0x0015);
pub const POINT_COORDINATES_DATA: Tag = Tag(0x0066, 0x0016);

// DICOMDIR Tags
pub const DIRECTORY_RECORD_SEQUENCE: Tag = Tag(0x0004, 0x1220);
pub const DIRECTORY_RECORD_TYPE: Tag = Tag(0x0004, 0x1430);
pub const REFERENCED_FILE_ID: Tag = Tag(0x0004, 0x1500);

/// Helper to get string value from DICOM tag
///
/// Returns `None` if the tag is not present or cannot be converted to string.
/// Trailing NUL padding is stripped along with whitespace.
pub fn get_string_value(dcm: &InMemDicomObject, tag: Tag) -> Option<String> {
    dcm.element(tag)
        .ok()
        .and_then(|elem| elem.to_str().ok())
        .map(|s| s.trim_matches(|c: char| c == '\0' || c.is_whitespace()).to_string())
}

/// Helper to get integer value from DICOM tag
///
/// Returns `None` if the tag is not present or cannot be converted to i32
pub fn get_int_value(dcm: &InMemDicomObject, tag: Tag) -> Option<i32> {
    dcm.element(tag)
        .ok()
        .and_then(|elem| elem.to_int::<i32>().ok())
}

/// Helper to get u16 value from DICOM tag
///
/// Returns `None` if the tag is not present or cannot be converted to u16
pub fn get_u16_value(dcm: &InMemDicomObject, tag: Tag) -> Option<u16> {
    dcm.element(tag)
        .ok()
        .and_then(|elem| elem.to_int::<u16>().ok())
}

/// Helper to get a multi-valued decimal string (DS) as `f64`s
///
/// Tries the typed conversion first, then falls back to lenient text parsing
/// for values written with odd separators.
pub fn get_decimal_values(dcm: &InMemDicomObject, tag: Tag) -> Option<Vec<f64>> {
    let elem = dcm.element(tag).ok()?;
    if let Ok(values) = elem.to_multi_float64() {
        if !values.is_empty() {
            return Some(values);
        }
    }
    let text = elem.to_str().ok()?;
    DecimalList::parse(&text).ok().map(DecimalList::into_inner)
}

/// Helper to get a fixed-size decimal vector, e.g. a position (3) or orientation (6)
pub fn get_decimal_array<const N: usize>(dcm: &InMemDicomObject, tag: Tag) -> Option<[f64; N]> {
    let values = get_decimal_values(dcm, tag)?;
    values.get(..N)?.try_into().ok()
}
