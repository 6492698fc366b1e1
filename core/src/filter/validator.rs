use super::{Filter, FilterKind, Outcome};
use crate::types::DicomSeries;

/// Rejects series whose slices are not evenly spaced along one direction
///
/// Checks the instances in their current order: locations must be strictly
/// monotonic and every step must match the first within `tolerance` mm.
#[derive(Debug, Clone, Copy)]
pub struct SliceSpacingValidator {
    pub tolerance: f64,
}

impl SliceSpacingValidator {
    pub const NAME: &'static str = "slice-spacing-validator";
    pub const DEFAULT_TOLERANCE: f64 = 0.01;

    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    fn locations(series: &DicomSeries) -> Option<Vec<f64>> {
        series.instances.iter().map(|i| i.slice_location()).collect()
    }
}

impl Default for SliceSpacingValidator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TOLERANCE)
    }
}

impl Filter for SliceSpacingValidator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn kind(&self) -> FilterKind {
        FilterKind::Validator
    }

    fn can_apply(&self, series: &DicomSeries) -> bool {
        series.number_of_instances() >= 3 && Self::locations(series).is_some()
    }

    fn apply(&self, series: &DicomSeries) -> Outcome {
        let locations = match Self::locations(series) {
            Some(locations) if locations.len() >= 3 => locations,
            _ => return Outcome::NotApplicable,
        };

        let steps: Vec<f64> = locations.windows(2).map(|w| w[1] - w[0]).collect();
        let first = steps[0];
        if first.abs() <= f64::EPSILON {
            return Outcome::Rejected("first two slices share a location".to_string());
        }
        for (index, step) in steps.iter().enumerate() {
            if step.signum() != first.signum() || step.abs() <= f64::EPSILON {
                return Outcome::Rejected(format!(
                    "slice locations not monotonic at instance {}",
                    index + 1
                ));
            }
            if (step - first).abs() > self.tolerance {
                return Outcome::Rejected(format!(
                    "irregular spacing at instance {}: {:.4} mm instead of {:.4} mm",
                    index + 1,
                    step.abs(),
                    first.abs()
                ));
            }
        }
        Outcome::Applied(series.clone())
    }
}

/// Rejects series whose instances disagree on ImageOrientationPatient
#[derive(Debug, Clone, Copy)]
pub struct OrientationValidator {
    pub tolerance: f64,
}

impl OrientationValidator {
    pub const NAME: &'static str = "orientation-validator";
    pub const DEFAULT_TOLERANCE: f64 = 1e-4;

    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }
}

impl Default for OrientationValidator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TOLERANCE)
    }
}

impl Filter for OrientationValidator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn kind(&self) -> FilterKind {
        FilterKind::Validator
    }

    fn can_apply(&self, series: &DicomSeries) -> bool {
        series.number_of_instances() >= 2
            && series.instances.iter().any(|i| i.orientation.is_some())
    }

    fn apply(&self, series: &DicomSeries) -> Outcome {
        let reference = match series.instances.iter().find_map(|i| i.orientation) {
            Some(reference) => reference,
            None => return Outcome::NotApplicable,
        };

        for instance in &series.instances {
            let orientation = match instance.orientation {
                Some(orientation) => orientation,
                None => {
                    return Outcome::Rejected(format!(
                        "{} has no ImageOrientationPatient",
                        instance.file_name()
                    ))
                }
            };
            let differs = orientation
                .iter()
                .zip(reference.iter())
                .any(|(a, b)| (a - b).abs() > self.tolerance);
            if differs {
                return Outcome::Rejected(format!(
                    "{} has orientation {:?}, expected {:?}",
                    instance.file_name(),
                    orientation,
                    reference
                ));
            }
        }
        Outcome::Applied(series.clone())
    }
}
