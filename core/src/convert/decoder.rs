use dicom_core::value::PrimitiveValue;
use dicom_object::{open_file, InMemDicomObject};
use ndarray::{s, Array2, Array3};

use crate::error::{IngestError, Result};
use crate::extraction::tags::{
    get_decimal_values, get_int_value, get_string_value, get_u16_value, BITS_ALLOCATED, COLUMNS,
    NUMBER_OF_FRAMES, NUMBER_OF_SURFACE_POINTS, PIXEL_DATA, PIXEL_REPRESENTATION,
    POINT_COORDINATES_DATA, RESCALE_INTERCEPT, RESCALE_SLOPE, ROWS, SAMPLES_PER_PIXEL,
    SURFACE_COMMENTS, SURFACE_NUMBER, SURFACE_POINTS_SEQUENCE, SURFACE_SEQUENCE,
};
use crate::types::{Instance, Reconstruction};

/// Decodes the payload of sorted instances
///
/// This is the seam for external pixel/mesh codecs. Implementations receive
/// the instances in their final order.
pub trait PayloadDecoder {
    /// Stacks every frame into a (frames, rows, columns) volume
    fn decode_volume(&self, instances: &[Instance]) -> Result<Array3<i32>>;

    /// Reads the surfaces of model instances
    fn decode_mesh(&self, instances: &[Instance]) -> Result<Vec<Reconstruction>>;
}

/// Decoder for native (uncompressed) monochrome pixel data and surface point sets
#[derive(Debug, Clone, Copy, Default)]
pub struct NativePayloadDecoder;

impl NativePayloadDecoder {
    fn frames_of(instance: &Instance) -> Result<Vec<Array2<i32>>> {
        let dcm = open_file(&instance.path)?;
        decode_frames(&dcm).map_err(|e| {
            IngestError::ConversionFailed(format!("{}: {}", instance.file_name(), e))
        })
    }
}

impl PayloadDecoder for NativePayloadDecoder {
    fn decode_volume(&self, instances: &[Instance]) -> Result<Array3<i32>> {
        let mut frames = Vec::new();
        for instance in instances {
            frames.extend(Self::frames_of(instance)?);
        }
        build_volume(&frames)
    }

    fn decode_mesh(&self, instances: &[Instance]) -> Result<Vec<Reconstruction>> {
        let mut reconstructions = Vec::new();
        for instance in instances {
            let dcm = open_file(&instance.path)?;
            reconstructions.extend(decode_surfaces(&dcm).map_err(|e| {
                IngestError::ConversionFailed(format!("{}: {}", instance.file_name(), e))
            })?);
        }
        if reconstructions.is_empty() {
            return Err(IngestError::ConversionFailed(
                "no surface found in series".to_string(),
            ));
        }
        Ok(reconstructions)
    }
}

/// Decodes the native pixel data of one object into frames
///
/// Samples come out in modality units: each object's own RescaleSlope and
/// RescaleIntercept are applied, so instances rescaled differently stack
/// into one consistent volume.
pub fn decode_frames(dcm: &InMemDicomObject) -> Result<Vec<Array2<i32>>> {
    let rows = get_u16_value(dcm, ROWS)
        .ok_or_else(|| IngestError::TagNotFound("Rows".to_string()))? as usize;
    let columns = get_u16_value(dcm, COLUMNS)
        .ok_or_else(|| IngestError::TagNotFound("Columns".to_string()))? as usize;
    let samples = get_u16_value(dcm, SAMPLES_PER_PIXEL).unwrap_or(1);
    if samples != 1 {
        return Err(IngestError::ConversionFailed(format!(
            "{} samples per pixel, only monochrome is supported",
            samples
        )));
    }
    let bits = get_u16_value(dcm, BITS_ALLOCATED).unwrap_or(16);
    let signed = get_u16_value(dcm, PIXEL_REPRESENTATION).unwrap_or(0) == 1;
    let frames = get_int_value(dcm, NUMBER_OF_FRAMES)
        .filter(|n| *n > 0)
        .unwrap_or(1) as usize;

    let element = dcm
        .element(PIXEL_DATA)
        .map_err(|_| IngestError::TagNotFound("PixelData".to_string()))?;
    let value = element.value().primitive().ok_or_else(|| {
        IngestError::ConversionFailed("encapsulated pixel data is not supported".to_string())
    })?;
    let mut samples = native_samples(value, bits, signed)?;
    rescale(&mut samples, dcm);

    let frame_len = rows * columns;
    if frame_len == 0 || samples.len() < frame_len * frames {
        return Err(IngestError::ConversionFailed(format!(
            "pixel data holds {} samples, expected {}x{}x{}",
            samples.len(),
            frames,
            rows,
            columns
        )));
    }

    samples
        .chunks_exact(frame_len)
        .take(frames)
        .map(|chunk| {
            Array2::from_shape_vec((rows, columns), chunk.to_vec())
                .map_err(|e| IngestError::ConversionFailed(e.to_string()))
        })
        .collect()
}

/// Interprets a native pixel data value as signed samples
fn native_samples(value: &PrimitiveValue, bits: u16, signed: bool) -> Result<Vec<i32>> {
    let samples = match (bits, value) {
        (8, PrimitiveValue::U8(bytes)) if signed => {
            bytes.iter().map(|b| *b as i8 as i32).collect()
        }
        (8, PrimitiveValue::U8(bytes)) => bytes.iter().map(|b| *b as i32).collect(),
        (16, PrimitiveValue::U16(words)) if signed => {
            words.iter().map(|w| *w as i16 as i32).collect()
        }
        (16, PrimitiveValue::U16(words)) => words.iter().map(|w| *w as i32).collect(),
        (16, PrimitiveValue::I16(words)) => words.iter().map(|w| *w as i32).collect(),
        (16, PrimitiveValue::U8(bytes)) => bytes
            .chunks_exact(2)
            .map(|pair| {
                let word = u16::from_le_bytes([pair[0], pair[1]]);
                if signed {
                    word as i16 as i32
                } else {
                    word as i32
                }
            })
            .collect(),
        (bits, _) => {
            return Err(IngestError::ConversionFailed(format!(
                "unsupported pixel layout ({} bits allocated)",
                bits
            )))
        }
    };
    Ok(samples)
}

/// Maps stored values to modality values, rounded to the nearest integer
fn rescale(samples: &mut [i32], dcm: &InMemDicomObject) {
    let first = |tag| get_decimal_values(dcm, tag).and_then(|v| v.first().copied());
    let slope = first(RESCALE_SLOPE).filter(|s| *s != 0.0).unwrap_or(1.0);
    let intercept = first(RESCALE_INTERCEPT).unwrap_or(0.0);
    if slope == 1.0 && intercept == 0.0 {
        return;
    }
    for sample in samples.iter_mut() {
        *sample = (*sample as f64 * slope + intercept).round() as i32;
    }
}

/// Stacks frames into a volume; every frame must share its dimensions
pub fn build_volume(frames: &[Array2<i32>]) -> Result<Array3<i32>> {
    let first = frames
        .first()
        .ok_or_else(|| IngestError::ConversionFailed("no frame to stack".to_string()))?;
    let (rows, columns) = first.dim();
    if let Some(index) = frames.iter().position(|f| f.dim() != (rows, columns)) {
        return Err(IngestError::ConversionFailed(format!(
            "frame {} is {:?}, expected {:?}",
            index,
            frames[index].dim(),
            (rows, columns)
        )));
    }

    let mut volume = Array3::<i32>::zeros((frames.len(), rows, columns));
    for (i, frame) in frames.iter().enumerate() {
        volume.slice_mut(s![i, .., ..]).assign(frame);
    }
    Ok(volume)
}

/// Reads Surface Sequence items into reconstructions
pub fn decode_surfaces(dcm: &InMemDicomObject) -> Result<Vec<Reconstruction>> {
    let surfaces = dcm
        .element(SURFACE_SEQUENCE)
        .ok()
        .and_then(|elem| elem.items())
        .ok_or_else(|| IngestError::TagNotFound("SurfaceSequence".to_string()))?;

    let mut reconstructions = Vec::with_capacity(surfaces.len());
    for (index, surface) in surfaces.iter().enumerate() {
        let number = get_int_value(surface, SURFACE_NUMBER)
            .filter(|n| *n > 0)
            .map(|n| n as u32)
            .unwrap_or(index as u32 + 1);
        let label = get_string_value(surface, SURFACE_COMMENTS).unwrap_or_default();

        let points = surface
            .element(SURFACE_POINTS_SEQUENCE)
            .ok()
            .and_then(|elem| elem.items())
            .and_then(|items| items.first())
            .ok_or_else(|| {
                IngestError::TagNotFound(format!("SurfacePointsSequence of surface {}", number))
            })?;

        let coordinates = points
            .element(POINT_COORDINATES_DATA)
            .map_err(|_| IngestError::TagNotFound("PointCoordinatesData".to_string()))?
            .to_multi_float32()?;
        if coordinates.len() % 3 != 0 {
            return Err(IngestError::InvalidValue(format!(
                "{} coordinates do not form 3-D points",
                coordinates.len()
            )));
        }
        if let Some(expected) = get_int_value(points, NUMBER_OF_SURFACE_POINTS) {
            if expected as usize != coordinates.len() / 3 {
                return Err(IngestError::InvalidValue(format!(
                    "surface {} declares {} points, holds {}",
                    number,
                    expected,
                    coordinates.len() / 3
                )));
            }
        }

        reconstructions.push(Reconstruction {
            number,
            label,
            points: coordinates
                .chunks_exact(3)
                .map(|p| [p[0], p[1], p[2]])
                .collect(),
        });
    }
    Ok(reconstructions)
}
