//! Core type definitions for series ingestion
//!
//! This module provides the data model shared by every stage:
//! - [`Patient`], [`Study`], [`Equipment`]: deduplicated entities and their keys
//! - [`Instance`], [`DicomSeries`]: raw, pre-conversion series
//! - [`TypedSeries`]: converted output ([`ImageSeries`], [`ModelSeries`], [`GenericSeries`])
//! - [`SeriesSet`]: destination collection
//! - [`SopClass`]: storage SOP class catalog
//! - [`ReadOptions`]: configuration of a read

mod decimal;
mod entities;
mod options;
mod series;
mod series_set;
mod sop_class;
mod typed;

pub use decimal::DecimalList;
pub use entities::{
    normalize, normalize_person_name, Equipment, EquipmentId, EquipmentKey, Patient, PatientId,
    PatientKey, Study, StudyId,
};
pub use options::{EmptyKeyPolicy, NotificationMode, ReadOptions};
pub use series::{DicomSeries, Instance};
pub use series_set::{MergeResult, SeriesSet};
pub use sop_class::{
    SopClass, SopKind, CT_IMAGE_STORAGE, MEDIA_STORAGE_DIRECTORY_STORAGE, MR_IMAGE_STORAGE,
    SECONDARY_CAPTURE_IMAGE_STORAGE, SOP_CLASSES, SURFACE_SEGMENTATION_STORAGE,
};
pub use typed::{
    GenericSeries, ImageSeries, ModelSeries, Reconstruction, SeriesContext, SeriesKind,
    TypedSeries,
};
