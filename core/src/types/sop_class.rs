use std::fmt;

/// Broad category of a storage SOP class, used to pick a converter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "lowercase"))]
pub enum SopKind {
    /// Pixel-bearing instances that stack into a volume
    Image,
    /// Structured geometric content (surface segmentation)
    Model,
    /// Known but not converted (DICOMDIR, spectroscopy, ...)
    Other,
}

impl fmt::Display for SopKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SopKind::Image => "image",
            SopKind::Model => "model",
            SopKind::Other => "other",
        };
        write!(f, "{}", s)
    }
}

/// Entry of the storage SOP class catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SopClass {
    pub uid: &'static str,
    pub name: &'static str,
    pub kind: SopKind,
    pub multi_frame: bool,
}

pub const MEDIA_STORAGE_DIRECTORY_STORAGE: &str = "1.2.840.10008.1.3.10";
pub const CT_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.2";
pub const MR_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.4";
pub const SECONDARY_CAPTURE_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.7";
pub const SURFACE_SEGMENTATION_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.66.5";

const fn entry(uid: &'static str, name: &'static str, kind: SopKind, multi_frame: bool) -> SopClass {
    SopClass {
        uid,
        name,
        kind,
        multi_frame,
    }
}

/// Storage SOP classes this crate knows about (DICOM PS3.4 B.5)
pub const SOP_CLASSES: &[SopClass] = &[
    entry(MEDIA_STORAGE_DIRECTORY_STORAGE, "Media Storage Directory Storage", SopKind::Other, false),
    entry("1.2.840.10008.5.1.4.1.1.1", "Computed Radiography Image Storage", SopKind::Image, false),
    entry("1.2.840.10008.5.1.4.1.1.1.1", "Digital X-Ray Image Storage - For Presentation", SopKind::Image, false),
    entry("1.2.840.10008.5.1.4.1.1.1.1.1", "Digital X-Ray Image Storage - For Processing", SopKind::Image, false),
    entry("1.2.840.10008.5.1.4.1.1.1.2", "Digital Mammography X-Ray Image Storage - For Presentation", SopKind::Image, false),
    entry("1.2.840.10008.5.1.4.1.1.1.2.1", "Digital Mammography X-Ray Image Storage - For Processing", SopKind::Image, false),
    entry("1.2.840.10008.5.1.4.1.1.1.3", "Digital Intra-Oral X-Ray Image Storage - For Presentation", SopKind::Image, false),
    entry(CT_IMAGE_STORAGE, "CT Image Storage", SopKind::Image, false),
    entry("1.2.840.10008.5.1.4.1.1.2.1", "Enhanced CT Image Storage", SopKind::Image, true),
    entry("1.2.840.10008.5.1.4.1.1.2.2", "Legacy Converted Enhanced CT Image Storage", SopKind::Image, true),
    entry("1.2.840.10008.5.1.4.1.1.3.1", "Ultrasound Multi-frame Image Storage", SopKind::Image, true),
    entry(MR_IMAGE_STORAGE, "MR Image Storage", SopKind::Image, false),
    entry("1.2.840.10008.5.1.4.1.1.4.1", "Enhanced MR Image Storage", SopKind::Image, true),
    entry("1.2.840.10008.5.1.4.1.1.4.2", "MR Spectroscopy Storage", SopKind::Other, false),
    entry("1.2.840.10008.5.1.4.1.1.4.3", "Enhanced MR Color Image Storage", SopKind::Image, true),
    entry("1.2.840.10008.5.1.4.1.1.6.1", "Ultrasound Image Storage", SopKind::Image, false),
    entry("1.2.840.10008.5.1.4.1.1.6.2", "Enhanced US Volume Storage", SopKind::Image, true),
    entry(SECONDARY_CAPTURE_IMAGE_STORAGE, "Secondary Capture Image Storage", SopKind::Image, false),
    entry("1.2.840.10008.5.1.4.1.1.7.1", "Multi-frame Single Bit Secondary Capture Image Storage", SopKind::Image, true),
    entry("1.2.840.10008.5.1.4.1.1.7.2", "Multi-frame Grayscale Byte Secondary Capture Image Storage", SopKind::Image, true),
    entry("1.2.840.10008.5.1.4.1.1.7.3", "Multi-frame Grayscale Word Secondary Capture Image Storage", SopKind::Image, true),
    entry("1.2.840.10008.5.1.4.1.1.7.4", "Multi-frame True Color Secondary Capture Image Storage", SopKind::Image, true),
    entry("1.2.840.10008.5.1.4.1.1.12.1", "X-Ray Angiographic Image Storage", SopKind::Image, true),
    entry("1.2.840.10008.5.1.4.1.1.12.2", "X-Ray Radiofluoroscopic Image Storage", SopKind::Image, true),
    entry("1.2.840.10008.5.1.4.1.1.20", "Nuclear Medicine Image Storage", SopKind::Image, true),
    entry("1.2.840.10008.5.1.4.1.1.66.4", "Segmentation Storage", SopKind::Image, true),
    entry(SURFACE_SEGMENTATION_STORAGE, "Surface Segmentation Storage", SopKind::Model, false),
    entry("1.2.840.10008.5.1.4.1.1.128", "Positron Emission Tomography Image Storage", SopKind::Image, false),
    entry("1.2.840.10008.5.1.4.1.1.130", "Enhanced PET Image Storage", SopKind::Image, true),
    entry("1.2.840.10008.5.1.4.1.1.481.1", "RT Image Storage", SopKind::Image, false),
];

/// Modalities whose instances carry pixel data when the SOP class is unknown
const IMAGE_MODALITIES: &[&str] = &[
    "CT", "MR", "PT", "NM", "US", "CR", "DX", "MG", "IO", "XA", "RF", "OT", "SC", "RTIMAGE",
];

impl SopClass {
    /// Looks up a SOP class by UID
    pub fn lookup(uid: &str) -> Option<&'static SopClass> {
        SOP_CLASSES.iter().find(|sop| sop.uid == uid)
    }

    /// Returns the human-readable name, or the UID itself when unknown
    pub fn name_of(uid: &str) -> &str {
        Self::lookup(uid).map(|sop| sop.name).unwrap_or(uid)
    }

    /// Classifies a series from its SOP class UIDs, falling back on modality
    pub fn classify<'a>(uids: impl IntoIterator<Item = &'a str>, modality: &str) -> Option<SopKind> {
        let mut kind = None;
        for uid in uids {
            match Self::lookup(uid).map(|sop| sop.kind) {
                Some(found) if kind.is_none() => kind = Some(found),
                // Mixed series are not converted
                Some(found) if kind != Some(found) => return Some(SopKind::Other),
                _ => {}
            }
        }
        kind.or_else(|| {
            let modality = modality.to_uppercase();
            if IMAGE_MODALITIES.contains(&modality.as_str()) {
                Some(SopKind::Image)
            } else {
                None
            }
        })
    }

    /// Whether the UID designates a DICOMDIR rather than an instance
    pub fn is_directory(uid: &str) -> bool {
        uid == MEDIA_STORAGE_DIRECTORY_STORAGE
    }
}

impl fmt::Display for SopClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.uid)
    }
}
