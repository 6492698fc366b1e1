pub mod dicomdir;
pub mod files;
pub mod scanner;
pub mod tags;

pub use dicomdir::{probe_dicomdir, resolve_folder, DicomdirState, FolderResolution};
pub use files::{collect_dicom_files, is_dicom_file};
pub use scanner::{scan_files, ScanBatch, ScannedInstance};
pub use tags::*;
