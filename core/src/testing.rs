//! Fixtures shared by unit tests: synthetic DICOM files and raw series

use dicom_core::value::{DataSetSequence, PrimitiveValue};
use dicom_core::{DataElement, VR};
use dicom_object::meta::FileMetaTableBuilder;
use dicom_object::InMemDicomObject;
use std::path::{Path, PathBuf};

use crate::extraction::tags::*;
use crate::types::{
    DicomSeries, EquipmentId, EquipmentKey, GenericSeries, Instance, Patient, PatientId,
    PatientKey, SeriesContext, Study, StudyId, TypedSeries, CT_IMAGE_STORAGE,
    MEDIA_STORAGE_DIRECTORY_STORAGE, SURFACE_SEGMENTATION_STORAGE,
};
use crate::writer::{ds_multi, put_str, EXPLICIT_VR_LITTLE_ENDIAN};

enum Payload {
    Pixels(Option<Vec<u16>>),
    Surface(Vec<[f32; 3]>),
}

/// Builder for a single synthetic Part-10 file
pub struct TestInstance {
    series_uid: String,
    instance_number: i32,
    sop_class: String,
    modality: String,
    position: Option<[f64; 3]>,
    frames: u32,
    rescale: Option<(f64, f64)>,
    payload: Payload,
}

impl TestInstance {
    /// 2x2 CT slice of patient `PAT-1`
    pub fn ct(series_uid: &str, instance_number: i32) -> Self {
        Self {
            series_uid: series_uid.to_string(),
            instance_number,
            sop_class: CT_IMAGE_STORAGE.to_string(),
            modality: "CT".to_string(),
            position: None,
            frames: 1,
            rescale: None,
            payload: Payload::Pixels(None),
        }
    }

    /// Surface segmentation holding one surface labelled `liver`
    pub fn surface(series_uid: &str, points: &[[f32; 3]]) -> Self {
        Self {
            series_uid: series_uid.to_string(),
            instance_number: 1,
            sop_class: SURFACE_SEGMENTATION_STORAGE.to_string(),
            modality: "SEG".to_string(),
            position: None,
            frames: 1,
            rescale: None,
            payload: Payload::Surface(points.to_vec()),
        }
    }

    pub fn position(mut self, position: [f64; 3]) -> Self {
        self.position = Some(position);
        self
    }

    pub fn frames(mut self, frames: u32) -> Self {
        self.frames = frames;
        self
    }

    pub fn sop_class(mut self, uid: &str) -> Self {
        self.sop_class = uid.to_string();
        self
    }

    pub fn pixels(mut self, pixels: Vec<u16>) -> Self {
        self.payload = Payload::Pixels(Some(pixels));
        self
    }

    pub fn rescale(mut self, slope: f64, intercept: f64) -> Self {
        self.rescale = Some((slope, intercept));
        self
    }

    pub fn write_to(self, folder: &Path, name: &str) -> PathBuf {
        let sop_instance_uid = format!("{}.{}", self.series_uid, self.instance_number);
        let mut obj = InMemDicomObject::new_empty();
        put_str(&mut obj, PATIENT_ID, VR::LO, "PAT-1");
        put_str(&mut obj, PATIENT_NAME, VR::PN, "DOE^JANE");
        put_str(&mut obj, STUDY_INSTANCE_UID, VR::UI, "1.2.840.99.1");
        put_str(&mut obj, SERIES_INSTANCE_UID, VR::UI, &self.series_uid);
        put_str(&mut obj, MODALITY, VR::CS, &self.modality);
        put_str(&mut obj, MANUFACTURER, VR::LO, "ACME");
        put_str(&mut obj, SOP_CLASS_UID, VR::UI, &self.sop_class);
        put_str(&mut obj, SOP_INSTANCE_UID, VR::UI, &sop_instance_uid);
        put_str(&mut obj, INSTANCE_NUMBER, VR::IS, &self.instance_number.to_string());
        if let Some(position) = self.position {
            obj.put(DataElement::new(IMAGE_POSITION_PATIENT, VR::DS, ds_multi(&position)));
        }

        match self.payload {
            Payload::Pixels(pixels) => {
                let pixels = pixels.unwrap_or_else(|| vec![0; 4 * self.frames as usize]);
                put_str(&mut obj, NUMBER_OF_FRAMES, VR::IS, &self.frames.to_string());
                obj.put(DataElement::new(SAMPLES_PER_PIXEL, VR::US, PrimitiveValue::from(1_u16)));
                obj.put(DataElement::new(ROWS, VR::US, PrimitiveValue::from(2_u16)));
                obj.put(DataElement::new(COLUMNS, VR::US, PrimitiveValue::from(2_u16)));
                obj.put(DataElement::new(BITS_ALLOCATED, VR::US, PrimitiveValue::from(16_u16)));
                obj.put(DataElement::new(PIXEL_REPRESENTATION, VR::US, PrimitiveValue::from(0_u16)));
                if let Some((slope, intercept)) = self.rescale {
                    obj.put(DataElement::new(RESCALE_SLOPE, VR::DS, ds_multi(&[slope])));
                    obj.put(DataElement::new(RESCALE_INTERCEPT, VR::DS, ds_multi(&[intercept])));
                }
                obj.put(DataElement::new(PIXEL_DATA, VR::OW, PrimitiveValue::U16(pixels.into())));
            }
            Payload::Surface(points) => {
                let coordinates: Vec<f32> = points.iter().flatten().copied().collect();
                let points_item = InMemDicomObject::from_element_iter([
                    DataElement::new(
                        NUMBER_OF_SURFACE_POINTS,
                        VR::UL,
                        PrimitiveValue::from(points.len() as u32),
                    ),
                    DataElement::new(
                        POINT_COORDINATES_DATA,
                        VR::OF,
                        PrimitiveValue::F32(coordinates.into()),
                    ),
                ]);
                let surface_item = InMemDicomObject::from_element_iter([
                    DataElement::new(SURFACE_NUMBER, VR::UL, PrimitiveValue::from(1_u32)),
                    DataElement::new(SURFACE_COMMENTS, VR::LT, PrimitiveValue::from("liver")),
                    DataElement::new(
                        SURFACE_POINTS_SEQUENCE,
                        VR::SQ,
                        DataSetSequence::from(vec![points_item]),
                    ),
                ]);
                obj.put(DataElement::new(
                    SURFACE_SEQUENCE,
                    VR::SQ,
                    DataSetSequence::from(vec![surface_item]),
                ));
            }
        }

        let path = folder.join(name);
        obj.with_meta(
            FileMetaTableBuilder::new()
                .transfer_syntax(EXPLICIT_VR_LITTLE_ENDIAN)
                .media_storage_sop_class_uid(self.sop_class.as_str())
                .media_storage_sop_instance_uid(sop_instance_uid.as_str()),
        )
        .unwrap()
        .write_to_file(&path)
        .unwrap();
        path
    }
}

/// Writes a DICOMDIR under `folder`, one IMAGE record per path component list
pub fn write_dicomdir(folder: &Path, references: &[&[&str]]) {
    let records: Vec<InMemDicomObject> = references
        .iter()
        .map(|components| {
            InMemDicomObject::from_element_iter([
                DataElement::new(DIRECTORY_RECORD_TYPE, VR::CS, PrimitiveValue::from("IMAGE")),
                DataElement::new(
                    REFERENCED_FILE_ID,
                    VR::CS,
                    PrimitiveValue::Strs(
                        components.iter().map(|c| c.to_string()).collect::<Vec<_>>().into(),
                    ),
                ),
            ])
        })
        .collect();

    let mut obj = InMemDicomObject::new_empty();
    obj.put(DataElement::new(
        DIRECTORY_RECORD_SEQUENCE,
        VR::SQ,
        DataSetSequence::from(records),
    ));
    obj.with_meta(
        FileMetaTableBuilder::new()
            .transfer_syntax(EXPLICIT_VR_LITTLE_ENDIAN)
            .media_storage_sop_class_uid(MEDIA_STORAGE_DIRECTORY_STORAGE)
            .media_storage_sop_instance_uid("1.2.840.99.2"),
    )
    .unwrap()
    .write_to_file(folder.join("DICOMDIR"))
    .unwrap();
}

/// Instance that only exists in memory, under `/data`
pub fn raw_instance(name: &str, instance_number: Option<i32>, z: Option<f64>) -> Instance {
    Instance {
        path: PathBuf::from("/data").join(name),
        sop_instance_uid: format!("1.2.99.{}", name),
        sop_class_uid: CT_IMAGE_STORAGE.to_string(),
        instance_number,
        position: z.map(|z| [0.0, 0.0, z]),
        orientation: None,
        number_of_frames: 1,
    }
}

pub fn raw_series(uid: &str, instances: Vec<Instance>) -> DicomSeries {
    let mut series = DicomSeries::new(uid, PatientId(0), StudyId(0), EquipmentId(0));
    series.instances = instances;
    series
}

pub fn test_context() -> SeriesContext {
    SeriesContext {
        patient: Patient {
            key: PatientKey::new("PAT-1", "DOE^JANE"),
            birth_date: String::new(),
            sex: String::new(),
        },
        study: Study {
            instance_uid: "1.2.840.99.1".to_string(),
            patient: PatientId(0),
            date: String::new(),
            time: String::new(),
            description: String::new(),
        },
        equipment: crate::types::Equipment {
            key: EquipmentKey::new("ACME", "", ""),
        },
    }
}

pub fn generic_series(uid: &str, instances: usize) -> TypedSeries {
    let instances = (1..=instances)
        .map(|n| raw_instance(&format!("{}_{}.dcm", uid, n), Some(n as i32), None))
        .collect();
    TypedSeries::Generic(GenericSeries {
        context: test_context(),
        source: raw_series(uid, instances),
        failure: None,
    })
}
