use log::debug;

use super::{Filter, FilterKind, Outcome};
use crate::extraction::SLICE_THICKNESS;
use crate::types::DicomSeries;

/// Minimum distance for two slices to count as distinct
const MIN_SLICE_DISTANCE: f64 = 1e-6;

/// Derives SliceThickness from the distance between the first two slices
///
/// Only sorted 3-D series qualify: at least two positioned instances a
/// non-zero distance apart, in an order a sorter established. The value is
/// stored in `computed_tags`; the SliceThickness read from the files is left
/// untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct SliceThicknessModifier;

impl SliceThicknessModifier {
    pub const NAME: &'static str = "slice-thickness-modifier";

    fn distance(series: &DicomSeries) -> Option<f64> {
        if !series.is_ordered() {
            return None;
        }
        let first = series.instances.first()?.slice_location()?;
        let second = series.instances.get(1)?.slice_location()?;
        let distance = (second - first).abs();
        (distance > MIN_SLICE_DISTANCE).then_some(distance)
    }
}

impl Filter for SliceThicknessModifier {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn kind(&self) -> FilterKind {
        FilterKind::Modifier
    }

    fn can_apply(&self, series: &DicomSeries) -> bool {
        Self::distance(series).is_some()
    }

    fn apply(&self, series: &DicomSeries) -> Outcome {
        let distance = match Self::distance(series) {
            Some(distance) => distance,
            None => return Outcome::NotApplicable,
        };
        debug!(
            "Computed SliceThickness {} for {}",
            distance, series.instance_uid
        );
        let mut modified = series.clone();
        modified.set_computed(SLICE_THICKNESS, distance.to_string());
        Outcome::Applied(modified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{raw_instance, raw_series};
    use rstest::rstest;

    #[test]
    fn test_thickness_from_first_two_slices() {
        let mut series = raw_series(
            "1.2",
            vec![
                raw_instance("a.dcm", Some(1), Some(0.0)),
                raw_instance("b.dcm", Some(2), Some(0.8)),
            ],
        );
        series.ordered = true;
        let outcome = SliceThicknessModifier.apply(&series);
        let modified = match outcome {
            Outcome::Applied(modified) => modified,
            other => panic!("expected Applied, got {:?}", other),
        };
        let thickness = modified.computed_f64(SLICE_THICKNESS).unwrap();
        assert!((thickness - 0.8).abs() < 1e-8);
        assert_eq!(modified.tag(SLICE_THICKNESS), None);
    }

    #[rstest]
    #[case(vec![raw_instance("a.dcm", Some(1), Some(0.0))])]
    #[case(vec![
        raw_instance("a.dcm", Some(1), Some(1.5)),
        raw_instance("b.dcm", Some(2), Some(1.5)),
    ])]
    #[case(vec![
        raw_instance("a.dcm", Some(1), None),
        raw_instance("b.dcm", Some(2), Some(1.0)),
    ])]
    fn test_not_applicable_on_2d(#[case] instances: Vec<crate::types::Instance>) {
        let mut series = raw_series("1.2", instances);
        series.ordered = true;
        let before = series.clone();
        assert!(!SliceThicknessModifier.can_apply(&series));
        assert_eq!(SliceThicknessModifier.apply(&series), Outcome::NotApplicable);
        assert_eq!(series, before);
        assert!(series.computed_tags.is_empty());
    }

    #[test]
    fn test_unsorted_series_is_not_measured() {
        let series = raw_series(
            "1.2",
            vec![
                raw_instance("a.dcm", Some(1), Some(0.0)),
                raw_instance("b.dcm", Some(3), Some(1.6)),
                raw_instance("c.dcm", Some(2), Some(0.8)),
            ],
        );
        assert!(!SliceThicknessModifier.can_apply(&series));
        assert_eq!(SliceThicknessModifier.apply(&series), Outcome::NotApplicable);
    }
}
