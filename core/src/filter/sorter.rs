use log::debug;
use std::cmp::Ordering;

use super::{Filter, FilterKind, Outcome};
use crate::extraction::SLICE_THICKNESS;
use crate::types::DicomSeries;

/// Marks a reordered series as sorted
///
/// Values computed from the previous order are dropped.
fn settle(series: &mut DicomSeries) {
    series.ordered = true;
    if series.computed_tags.remove(&SLICE_THICKNESS).is_some() {
        debug!("Dropped stale SliceThickness of {}", series.instance_uid);
    }
}

/// Orders instances by InstanceNumber ascending, ties broken by file name
#[derive(Debug, Clone, Copy, Default)]
pub struct InstanceNumberSorter;

impl InstanceNumberSorter {
    pub const NAME: &'static str = "instance-number-sorter";
}

impl Filter for InstanceNumberSorter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn kind(&self) -> FilterKind {
        FilterKind::Sorter
    }

    fn can_apply(&self, series: &DicomSeries) -> bool {
        !series.is_empty()
    }

    fn apply(&self, series: &DicomSeries) -> Outcome {
        let mut sorted = series.clone();
        sorted
            .instances
            .sort_by(|a, b| a.cmp_by_instance_number(b));
        settle(&mut sorted);
        debug!(
            "Sorted {} instances of {} by InstanceNumber",
            sorted.number_of_instances(),
            sorted.instance_uid
        );
        Outcome::Applied(sorted)
    }
}

/// Orders instances along the slice normal using ImagePositionPatient
///
/// Falls back to the raw Z coordinate when orientation is missing. Equal
/// locations keep the InstanceNumber order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImagePositionSorter;

impl ImagePositionSorter {
    pub const NAME: &'static str = "image-position-sorter";
}

impl Filter for ImagePositionSorter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn kind(&self) -> FilterKind {
        FilterKind::Sorter
    }

    fn can_apply(&self, series: &DicomSeries) -> bool {
        !series.is_empty() && series.instances.iter().all(|i| i.position.is_some())
    }

    fn apply(&self, series: &DicomSeries) -> Outcome {
        let mut sorted = series.clone();
        let mut keyed = Vec::with_capacity(sorted.instances.len());
        for instance in sorted.instances.drain(..) {
            match instance.slice_location() {
                Some(location) => keyed.push((location, instance)),
                None => return Outcome::NotApplicable,
            }
        }
        keyed.sort_by(|(za, a), (zb, b)| {
            za.partial_cmp(zb)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.cmp_by_instance_number(b))
        });
        sorted.instances = keyed.into_iter().map(|(_, instance)| instance).collect();
        settle(&mut sorted);
        Outcome::Applied(sorted)
    }
}
