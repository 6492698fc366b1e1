//! Writes image series back to Part-10 files

use dicom_core::value::PrimitiveValue;
use dicom_core::{DataElement, Tag, VR};
use dicom_dictionary_std::tags;
use dicom_object::meta::FileMetaTableBuilder;
use dicom_object::InMemDicomObject;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{IngestError, Result};
use crate::types::{ImageSeries, SECONDARY_CAPTURE_IMAGE_STORAGE};

/// Explicit VR Little Endian
pub const EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1";

/// Formats a decimal string value
pub(crate) fn ds(value: f64) -> String {
    let formatted = format!("{:.6}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "" | "-0" => "0".to_string(),
        s => s.to_string(),
    }
}

pub(crate) fn ds_multi(values: &[f64]) -> PrimitiveValue {
    PrimitiveValue::Strs(values.iter().map(|v| ds(*v)).collect::<Vec<_>>().into())
}

pub(crate) fn put_str(obj: &mut InMemDicomObject, tag: Tag, vr: VR, value: &str) {
    obj.put(DataElement::new(tag, vr, PrimitiveValue::from(value)));
}

/// Writes an [`ImageSeries`] as one file per slice
///
/// Files carry the patient, study and series identity, geometry and 16-bit
/// native pixel data, so a re-scan yields the same instance count, spacing
/// and origin. Voxels are already in modality units and are stored with an
/// identity rescale.
#[derive(Debug, Clone, Default)]
pub struct ImageSeriesWriter {
    /// Prefix of written file names
    prefix: Option<String>,
}

impl ImageSeriesWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: Set the file name prefix (default `IM`)
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Writes every slice under `folder`, creating it if needed
    ///
    /// # Errors
    ///
    /// Returns `WriteError` when voxel values do not fit 16 bits or a file
    /// cannot be written
    pub fn write(&self, series: &ImageSeries, folder: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(folder)?;
        let (slices, rows, columns) = series.dim();
        let (pixel_representation, to_word) = word_encoding(series)?;
        let normal = slice_normal(&series.orientation);
        let prefix = self.prefix.as_deref().unwrap_or("IM");

        let source = &series.source;
        let sop_class = if source.sop_class_uids.len() == 1 {
            source
                .sop_class_uids
                .iter()
                .next()
                .map(String::as_str)
                .unwrap_or(SECONDARY_CAPTURE_IMAGE_STORAGE)
        } else {
            SECONDARY_CAPTURE_IMAGE_STORAGE
        };
        let modality = if source.modality.is_empty() {
            "OT"
        } else {
            source.modality.as_str()
        };

        let mut paths = Vec::with_capacity(slices);
        for slice in 0..slices {
            // Source UIDs are only reused when slices map one to one
            let sop_instance_uid = match source.instances.get(slice) {
                Some(instance)
                    if slices == source.instances.len() && !instance.sop_instance_uid.is_empty() =>
                {
                    instance.sop_instance_uid.clone()
                }
                _ => format!("{}.{}", source.instance_uid, slice + 1),
            };
            let offset = series.spacing[2] * slice as f64;
            let position = [
                series.origin[0] + normal[0] * offset,
                series.origin[1] + normal[1] * offset,
                series.origin[2] + normal[2] * offset,
            ];

            let mut obj = InMemDicomObject::new_empty();
            let context = &series.context;
            put_str(&mut obj, tags::PATIENT_ID, VR::LO, &context.patient.key.patient_id);
            put_str(&mut obj, tags::PATIENT_NAME, VR::PN, &context.patient.key.name);
            put_str(&mut obj, tags::PATIENT_BIRTH_DATE, VR::DA, &context.patient.birth_date);
            put_str(&mut obj, tags::PATIENT_SEX, VR::CS, &context.patient.sex);
            put_str(&mut obj, tags::STUDY_INSTANCE_UID, VR::UI, &context.study.instance_uid);
            put_str(&mut obj, tags::STUDY_DATE, VR::DA, &context.study.date);
            put_str(&mut obj, tags::STUDY_TIME, VR::TM, &context.study.time);
            put_str(&mut obj, tags::STUDY_DESCRIPTION, VR::LO, &context.study.description);
            put_str(&mut obj, tags::MANUFACTURER, VR::LO, &context.equipment.key.manufacturer);
            put_str(&mut obj, tags::STATION_NAME, VR::SH, &context.equipment.key.station);
            put_str(&mut obj, tags::INSTITUTION_NAME, VR::LO, &context.equipment.key.institution);
            put_str(&mut obj, tags::SERIES_INSTANCE_UID, VR::UI, &source.instance_uid);
            put_str(&mut obj, tags::SERIES_DESCRIPTION, VR::LO, &source.description);
            put_str(&mut obj, tags::MODALITY, VR::CS, modality);
            put_str(&mut obj, tags::SOP_CLASS_UID, VR::UI, sop_class);
            put_str(&mut obj, tags::SOP_INSTANCE_UID, VR::UI, &sop_instance_uid);
            put_str(&mut obj, tags::INSTANCE_NUMBER, VR::IS, &(slice + 1).to_string());
            obj.put(DataElement::new(tags::IMAGE_POSITION_PATIENT, VR::DS, ds_multi(&position)));
            obj.put(DataElement::new(
                tags::IMAGE_ORIENTATION_PATIENT,
                VR::DS,
                ds_multi(&series.orientation),
            ));
            obj.put(DataElement::new(
                tags::PIXEL_SPACING,
                VR::DS,
                ds_multi(&series.spacing[..2]),
            ));
            put_str(&mut obj, tags::SLICE_THICKNESS, VR::DS, &ds(series.spacing[2]));
            obj.put(DataElement::new(tags::SAMPLES_PER_PIXEL, VR::US, PrimitiveValue::from(1_u16)));
            put_str(&mut obj, tags::PHOTOMETRIC_INTERPRETATION, VR::CS, "MONOCHROME2");
            obj.put(DataElement::new(tags::ROWS, VR::US, PrimitiveValue::from(rows as u16)));
            obj.put(DataElement::new(tags::COLUMNS, VR::US, PrimitiveValue::from(columns as u16)));
            obj.put(DataElement::new(tags::BITS_ALLOCATED, VR::US, PrimitiveValue::from(16_u16)));
            obj.put(DataElement::new(tags::BITS_STORED, VR::US, PrimitiveValue::from(16_u16)));
            obj.put(DataElement::new(tags::HIGH_BIT, VR::US, PrimitiveValue::from(15_u16)));
            obj.put(DataElement::new(
                tags::PIXEL_REPRESENTATION,
                VR::US,
                PrimitiveValue::from(pixel_representation),
            ));
            put_str(&mut obj, tags::RESCALE_INTERCEPT, VR::DS, "0");
            put_str(&mut obj, tags::RESCALE_SLOPE, VR::DS, "1");
            let words: Vec<u16> = series
                .volume
                .index_axis(ndarray::Axis(0), slice)
                .iter()
                .map(|v| to_word(*v))
                .collect();
            obj.put(DataElement::new(tags::PIXEL_DATA, VR::OW, PrimitiveValue::U16(words.into())));

            let file = obj
                .with_meta(
                    FileMetaTableBuilder::new()
                        .transfer_syntax(EXPLICIT_VR_LITTLE_ENDIAN)
                        .media_storage_sop_class_uid(sop_class)
                        .media_storage_sop_instance_uid(sop_instance_uid.as_str()),
                )
                .map_err(|e| IngestError::WriteError(e.to_string()))?;
            let path = folder.join(format!("{}{:05}.dcm", prefix, slice + 1));
            file.write_to_file(&path)
                .map_err(|e| IngestError::WriteError(format!("{}: {}", path.display(), e)))?;
            debug!("Wrote {}", path.display());
            paths.push(path);
        }

        info!("Wrote {} slices of {} to {}", paths.len(), source.instance_uid, folder.display());
        Ok(paths)
    }
}

/// Slice normal of an orientation (row cosines × column cosines)
fn slice_normal(o: &[f64; 6]) -> [f64; 3] {
    [
        o[1] * o[5] - o[2] * o[4],
        o[2] * o[3] - o[0] * o[5],
        o[0] * o[4] - o[1] * o[3],
    ]
}

fn unsigned_word(v: i32) -> u16 {
    v as u16
}

fn signed_word(v: i32) -> u16 {
    v as i16 as u16
}

/// PixelRepresentation and voxel-to-word mapping fitting the volume range
fn word_encoding(series: &ImageSeries) -> Result<(u16, fn(i32) -> u16)> {
    let min = series.volume.iter().copied().min().unwrap_or(0);
    let max = series.volume.iter().copied().max().unwrap_or(0);
    if min >= 0 && max <= u16::MAX as i32 {
        Ok((0, unsigned_word as fn(i32) -> u16))
    } else if min >= i16::MIN as i32 && max <= i16::MAX as i32 {
        Ok((1, signed_word as fn(i32) -> u16))
    } else {
        Err(IngestError::WriteError(format!(
            "voxel range {}..={} does not fit 16 bits",
            min, max
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{raw_series, test_context};
    use ndarray::Array3;
    use rstest::rstest;
    use tempfile::TempDir;

    fn image(volume: Array3<i32>) -> ImageSeries {
        ImageSeries {
            context: test_context(),
            source: raw_series("1.2.9", vec![]),
            volume,
            spacing: [0.5, 0.5, 2.0],
            origin: [-10.0, 4.0, 7.5],
            orientation: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
        }
    }

    #[rstest]
    #[case(0.8, "0.8")]
    #[case(2.0, "2")]
    #[case(-0.0, "0")]
    #[case(0.1 + 0.2, "0.3")]
    #[case(-12.345678, "-12.345678")]
    fn test_ds_formatting(#[case] value: f64, #[case] expected: &str) {
        assert_eq!(ds(value), expected);
    }

    #[test]
    fn test_writes_one_file_per_slice() {
        let temp_dir = TempDir::new().unwrap();
        let series = image(Array3::from_elem((3, 2, 2), 100));
        let paths = ImageSeriesWriter::new()
            .write(&series, &temp_dir.path().join("out"))
            .unwrap();
        assert_eq!(paths.len(), 3);
        assert!(paths.iter().all(|p| p.is_file()));
        assert!(paths[0].ends_with("IM00001.dcm"));
    }

    #[test]
    fn test_signed_voxels_use_signed_representation() {
        let series = image(Array3::from_elem((1, 1, 1), -1024));
        let (representation, to_word) = word_encoding(&series).unwrap();
        assert_eq!(representation, 1);
        assert_eq!(to_word(-1024) as i16, -1024);

        let series = image(Array3::from_elem((1, 1, 1), 70_000));
        assert!(matches!(word_encoding(&series), Err(IngestError::WriteError(_))));
    }

    #[test]
    fn test_modality_values_survive_a_rewrite() {
        let temp_dir = TempDir::new().unwrap();
        let volume = Array3::from_shape_vec((1, 2, 2), vec![-1024, -1, 0, 3071]).unwrap();
        let paths = ImageSeriesWriter::new()
            .write(&image(volume.clone()), temp_dir.path())
            .unwrap();

        let dcm = dicom_object::open_file(&paths[0]).unwrap();
        let frames = crate::convert::decode_frames(&dcm).unwrap();
        assert_eq!(frames[0], volume.index_axis(ndarray::Axis(0), 0));
    }
}
