//! Conversion of raw series into typed series

mod decoder;
mod image;
mod model;

use log::{debug, warn};

use crate::report::SeriesStatus;
use crate::types::{
    DicomSeries, GenericSeries, SeriesContext, SeriesKind, SopClass, SopKind, TypedSeries,
};

pub use decoder::{build_volume, decode_frames, decode_surfaces, NativePayloadDecoder, PayloadDecoder};
pub use image::{convert_image, slice_spacing};
pub use model::convert_model;

/// Picks a converter per series from its SOP classes and modality
///
/// A failed conversion demotes the series to [`GenericSeries`]; nothing is
/// dropped here.
pub struct SeriesConverter {
    decoder: Box<dyn PayloadDecoder>,
}

impl Default for SeriesConverter {
    fn default() -> Self {
        Self::new(Box::new(NativePayloadDecoder))
    }
}

impl std::fmt::Debug for SeriesConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeriesConverter").finish_non_exhaustive()
    }
}

impl SeriesConverter {
    pub fn new(decoder: Box<dyn PayloadDecoder>) -> Self {
        Self { decoder }
    }

    /// Converter kind a series maps to
    pub fn target_kind(series: &DicomSeries) -> SeriesKind {
        let uids = series.sop_class_uids.iter().map(String::as_str);
        match SopClass::classify(uids, &series.modality) {
            Some(SopKind::Image) => SeriesKind::Image,
            Some(SopKind::Model) => SeriesKind::Model,
            Some(SopKind::Other) | None => SeriesKind::Generic,
        }
    }

    /// Converts one series, returning it with its final status
    pub fn convert(&self, series: DicomSeries, context: SeriesContext) -> (TypedSeries, SeriesStatus) {
        let kind = Self::target_kind(&series);
        let converted = match kind {
            SeriesKind::Image => {
                convert_image(&series, context.clone(), self.decoder.as_ref()).map(TypedSeries::Image)
            }
            SeriesKind::Model => {
                convert_model(&series, context.clone(), self.decoder.as_ref()).map(TypedSeries::Model)
            }
            SeriesKind::Generic => {
                debug!("No converter for series {}, keeping it generic", series.instance_uid);
                return (
                    TypedSeries::Generic(GenericSeries {
                        context,
                        source: series,
                        failure: None,
                    }),
                    SeriesStatus::Generic,
                );
            }
        };

        match converted {
            Ok(typed) => (typed, SeriesStatus::Converted { kind }),
            Err(e) => {
                let reason = e.to_string();
                warn!("Demoting series {} to generic: {}", series.instance_uid, reason);
                (
                    TypedSeries::Generic(GenericSeries {
                        context,
                        source: series,
                        failure: Some(reason.clone()),
                    }),
                    SeriesStatus::Demoted { reason },
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{IngestError, Result};
    use crate::testing::{raw_instance, raw_series, test_context};
    use crate::types::{Instance, Reconstruction, CT_IMAGE_STORAGE, SURFACE_SEGMENTATION_STORAGE};
    use ndarray::Array3;

    /// Decoder returning fixed payloads without touching files
    struct FakeDecoder;

    impl PayloadDecoder for FakeDecoder {
        fn decode_volume(&self, instances: &[Instance]) -> Result<Array3<i32>> {
            Ok(Array3::zeros((instances.len(), 4, 4)))
        }

        fn decode_mesh(&self, _instances: &[Instance]) -> Result<Vec<Reconstruction>> {
            Err(IngestError::ConversionFailed("mesh codec unavailable".into()))
        }
    }

    fn ct_series(ordered: bool) -> DicomSeries {
        let mut series = raw_series(
            "1.2",
            vec![
                raw_instance("a.dcm", Some(1), Some(0.0)),
                raw_instance("b.dcm", Some(2), Some(1.25)),
            ],
        );
        series.modality = "CT".into();
        series.sop_class_uids.insert(CT_IMAGE_STORAGE.into());
        series.ordered = ordered;
        series
    }

    #[test]
    fn test_image_series_conversion() {
        let converter = SeriesConverter::new(Box::new(FakeDecoder));
        let (typed, status) = converter.convert(ct_series(true), test_context());
        assert_eq!(status, SeriesStatus::Converted { kind: SeriesKind::Image });
        let image = typed.as_image().unwrap();
        assert_eq!(image.dim(), (2, 4, 4));
        assert_eq!(image.spacing, [1.0, 1.0, 1.25]);
        assert_eq!(image.origin, [0.0, 0.0, 0.0]);
        assert_eq!(typed.instance_uid(), "1.2");
    }

    #[test]
    fn test_unordered_series_is_demoted() {
        let converter = SeriesConverter::new(Box::new(FakeDecoder));
        let (typed, status) = converter.convert(ct_series(false), test_context());
        assert_eq!(typed.kind(), SeriesKind::Generic);
        assert!(matches!(status, SeriesStatus::Demoted { .. }));
        assert_eq!(typed.source().number_of_instances(), 2);
    }

    #[test]
    fn test_failed_model_is_demoted_not_dropped() {
        let mut series = raw_series("1.3", vec![raw_instance("seg.dcm", Some(1), None)]);
        series.modality = "SEG".into();
        series.sop_class_uids.insert(SURFACE_SEGMENTATION_STORAGE.into());

        let converter = SeriesConverter::new(Box::new(FakeDecoder));
        let (typed, status) = converter.convert(series, test_context());
        match typed {
            TypedSeries::Generic(generic) => {
                assert!(generic.failure.unwrap().contains("mesh codec unavailable"))
            }
            other => panic!("expected generic, got {:?}", other.kind()),
        }
        assert!(matches!(status, SeriesStatus::Demoted { .. }));
    }

    #[test]
    fn test_unknown_content_stays_generic() {
        let mut series = raw_series("1.4", vec![raw_instance("sr.dcm", Some(1), None)]);
        series.modality = "SR".into();
        series.sop_class_uids.insert("1.2.840.10008.5.1.4.1.1.88.11".into());

        let (typed, status) = SeriesConverter::default().convert(series, test_context());
        assert_eq!(typed.kind(), SeriesKind::Generic);
        assert_eq!(status, SeriesStatus::Generic);
    }
}
