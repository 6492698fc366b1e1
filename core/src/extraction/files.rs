use log::{debug, warn};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Lists candidate DICOM files under a folder
///
/// A file qualifies when it has a `.dcm`/`.dicom` extension (any case) or,
/// lacking an extension, carries the Part 10 header. `DICOMDIR` index files
/// are left out: they are handled by the DICOMDIR probe. The result is
/// sorted so repeated scans visit files in the same order.
pub fn collect_dicom_files(folder: &Path, recursive: bool) -> std::io::Result<Vec<PathBuf>> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();

    for entry in WalkDir::new(folder).max_depth(max_depth).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                // The root itself failing is fatal; anything below is skipped
                if e.depth() == 0 {
                    return Err(e
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("cannot walk folder")));
                }
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        let path = entry.path();
        if !entry.file_type().is_file() || is_dicomdir_name(path) {
            continue;
        }

        match path.extension() {
            Some(ext) => {
                if ext.eq_ignore_ascii_case("dcm") || ext.eq_ignore_ascii_case("dicom") {
                    files.push(path.to_path_buf());
                }
            }
            None => {
                if is_dicom_file(path) {
                    debug!("Found extensionless DICOM file: {}", path.display());
                    files.push(path.to_path_buf());
                }
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Whether the file name is `DICOMDIR` (any case)
pub fn is_dicomdir_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.eq_ignore_ascii_case("DICOMDIR"))
}

/// Checks if a file has a DICOM header
///
/// DICOM Part 10 files have:
/// - 128-byte preamble
/// - 4-byte "DICM" magic string at offset 128
pub fn is_dicom_file(path: &Path) -> bool {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return false,
    };

    // Read first 132 bytes (128-byte preamble + 4-byte "DICM" magic)
    let mut buffer = [0u8; 132];
    match file.read_exact(&mut buffer) {
        Ok(()) => &buffer[128..132] == b"DICM",
        Err(_) => false,
    }
}
