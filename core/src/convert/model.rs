use log::debug;

use super::decoder::PayloadDecoder;
use crate::error::Result;
use crate::types::{DicomSeries, ModelSeries, SeriesContext};

/// Assembles a structured model from surface segmentation instances
///
/// # Errors
///
/// Returns the decoder's error when no surface can be read
pub fn convert_model(
    series: &DicomSeries,
    context: SeriesContext,
    decoder: &dyn PayloadDecoder,
) -> Result<ModelSeries> {
    let mut reconstructions = decoder.decode_mesh(&series.instances)?;
    reconstructions.sort_by_key(|r| r.number);
    debug!(
        "Assembled model with {} surfaces for {}",
        reconstructions.len(),
        series.instance_uid
    );
    Ok(ModelSeries {
        context,
        source: series.clone(),
        reconstructions,
    })
}
