use log::debug;

use super::decoder::PayloadDecoder;
use crate::error::{IngestError, Result};
use crate::extraction::{PIXEL_SPACING, SLICE_THICKNESS};
use crate::types::{DecimalList, DicomSeries, ImageSeries, SeriesContext};

const IDENTITY_ORIENTATION: [f64; 6] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0];

/// In-plane spacing (row, column) from the tag cache, 1 mm when absent
fn pixel_spacing(series: &DicomSeries) -> [f64; 2] {
    series
        .tag(PIXEL_SPACING)
        .and_then(|raw| DecimalList::parse(raw).ok())
        .and_then(|list| match list.values() {
            [row, column, ..] => Some([*row, *column]),
            _ => None,
        })
        .unwrap_or([1.0, 1.0])
}

/// Distance between slices
///
/// Prefers the computed SliceThickness, then the distance between the first
/// two positions, then the SliceThickness tag, else 1 mm.
pub fn slice_spacing(series: &DicomSeries) -> f64 {
    let from_positions = || {
        let first = series.instances.first()?.slice_location()?;
        let second = series.instances.get(1)?.slice_location()?;
        Some((second - first).abs()).filter(|d| *d > 0.0)
    };
    series
        .computed_f64(SLICE_THICKNESS)
        .filter(|d| *d > 0.0)
        .or_else(from_positions)
        .or_else(|| {
            series
                .tag(SLICE_THICKNESS)
                .and_then(|raw| raw.trim().parse::<f64>().ok())
                .filter(|d| *d > 0.0)
        })
        .unwrap_or(1.0)
}

/// Assembles a volume by stacking the sorted instance payloads
///
/// # Errors
///
/// Returns `ConversionFailed` if the order is undefined or the payload cannot
/// be decoded into consistent frames
pub fn convert_image(
    series: &DicomSeries,
    context: SeriesContext,
    decoder: &dyn PayloadDecoder,
) -> Result<ImageSeries> {
    if !series.is_ordered() {
        return Err(IngestError::ConversionFailed(
            "instance order undefined, no sorter applied".to_string(),
        ));
    }

    let volume = decoder.decode_volume(&series.instances)?;
    let expected = series.number_of_frames();
    if volume.dim().0 != expected {
        return Err(IngestError::ConversionFailed(format!(
            "decoded {} frames, expected {}",
            volume.dim().0,
            expected
        )));
    }

    let [row, column] = pixel_spacing(series);
    let first = series.instances.first();
    let origin = first.and_then(|i| i.position).unwrap_or([0.0; 3]);
    let orientation = first
        .and_then(|i| i.orientation)
        .unwrap_or(IDENTITY_ORIENTATION);
    let spacing = [row, column, slice_spacing(series)];

    debug!(
        "Assembled volume {:?} for {} (spacing {:?})",
        volume.dim(),
        series.instance_uid,
        spacing
    );

    Ok(ImageSeries {
        context,
        source: series.clone(),
        volume,
        spacing,
        origin,
        orientation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{raw_instance, raw_series};

    #[test]
    fn test_slice_spacing_precedence() {
        let mut series = raw_series(
            "1.2",
            vec![
                raw_instance("a.dcm", Some(1), Some(0.0)),
                raw_instance("b.dcm", Some(2), Some(2.5)),
            ],
        );
        series.tags.insert(SLICE_THICKNESS, "3.0".into());
        assert_eq!(slice_spacing(&series), 2.5);

        series.set_computed(SLICE_THICKNESS, "0.8");
        assert_eq!(slice_spacing(&series), 0.8);

        let mut flat = raw_series("1.3", vec![raw_instance("a.dcm", Some(1), None)]);
        assert_eq!(slice_spacing(&flat), 1.0);
        flat.tags.insert(SLICE_THICKNESS, "3.0".into());
        assert_eq!(slice_spacing(&flat), 3.0);
    }

    #[test]
    fn test_pixel_spacing_from_tag_cache() {
        let mut series = raw_series("1.2", vec![]);
        assert_eq!(pixel_spacing(&series), [1.0, 1.0]);
        series.tags.insert(PIXEL_SPACING, "0.5\\0.25".into());
        assert_eq!(pixel_spacing(&series), [0.5, 0.25]);
    }
}
