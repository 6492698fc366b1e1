use ndarray::Array3;
use std::fmt;

use super::entities::{Equipment, Patient, Study};
use super::series::DicomSeries;

/// Snapshot of the entities a series hangs off
///
/// The scan registries are dropped when a read returns, so typed series carry
/// their own copy.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesContext {
    pub patient: Patient,
    pub study: Study,
    pub equipment: Equipment,
}

/// 3-D image volume assembled from sorted instances
#[derive(Debug, Clone)]
pub struct ImageSeries {
    pub context: SeriesContext,

    /// Raw series this volume was built from
    pub source: DicomSeries,

    /// Voxels indexed (slice, row, column)
    pub volume: Array3<i32>,

    /// (row spacing, column spacing, slice spacing) in mm
    pub spacing: [f64; 3],

    /// Position of the first voxel of the first slice
    pub origin: [f64; 3],

    pub orientation: [f64; 6],
}

impl ImageSeries {
    /// (slices, rows, columns)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.volume.dim()
    }
}

/// One surface of a structured model
#[derive(Debug, Clone, PartialEq)]
pub struct Reconstruction {
    pub number: u32,
    pub label: String,
    pub points: Vec<[f32; 3]>,
}

/// Structured model assembled from surface segmentation instances
#[derive(Debug, Clone)]
pub struct ModelSeries {
    pub context: SeriesContext,
    pub source: DicomSeries,
    pub reconstructions: Vec<Reconstruction>,
}

/// Series kept in raw form: no converter matched, or conversion failed
#[derive(Debug, Clone)]
pub struct GenericSeries {
    pub context: SeriesContext,
    pub source: DicomSeries,
    /// Why conversion was abandoned, if it was attempted
    pub failure: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
#[cfg_attr(feature = "json", serde(rename_all = "lowercase"))]
pub enum SeriesKind {
    Image,
    Model,
    Generic,
}

impl fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SeriesKind::Image => "image",
            SeriesKind::Model => "model",
            SeriesKind::Generic => "generic",
        };
        write!(f, "{}", s)
    }
}

/// Output of conversion
#[derive(Debug, Clone)]
pub enum TypedSeries {
    Image(ImageSeries),
    Model(ModelSeries),
    Generic(GenericSeries),
}

impl TypedSeries {
    pub fn kind(&self) -> SeriesKind {
        match self {
            TypedSeries::Image(_) => SeriesKind::Image,
            TypedSeries::Model(_) => SeriesKind::Model,
            TypedSeries::Generic(_) => SeriesKind::Generic,
        }
    }

    /// Provenance: the raw series this one was produced from
    pub fn source(&self) -> &DicomSeries {
        match self {
            TypedSeries::Image(s) => &s.source,
            TypedSeries::Model(s) => &s.source,
            TypedSeries::Generic(s) => &s.source,
        }
    }

    pub fn context(&self) -> &SeriesContext {
        match self {
            TypedSeries::Image(s) => &s.context,
            TypedSeries::Model(s) => &s.context,
            TypedSeries::Generic(s) => &s.context,
        }
    }

    /// SeriesInstanceUID, the series identity
    pub fn instance_uid(&self) -> &str {
        &self.source().instance_uid
    }

    pub fn as_image(&self) -> Option<&ImageSeries> {
        match self {
            TypedSeries::Image(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_model(&self) -> Option<&ModelSeries> {
        match self {
            TypedSeries::Model(s) => Some(s),
            _ => None,
        }
    }
}
