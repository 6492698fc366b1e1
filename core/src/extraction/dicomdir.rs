use dicom_object::open_file;
use log::{debug, info, warn};
use std::fmt;
use std::path::{Path, PathBuf};

use super::files::collect_dicom_files;
use super::tags::{DIRECTORY_RECORD_SEQUENCE, REFERENCED_FILE_ID};
use crate::error::{IngestError, Result};

/// DICOMDIR usage for a folder read
///
/// ```text
/// NoDicomdir                      (toggle off)
/// Probing ──ok──────────────────▶ UseDicomdir
///         └─absent/unreadable/──▶ FallbackFullScan
///           dangling reference
/// ```
///
/// A probe either yields the complete DICOMDIR file list or falls back to a
/// full scan; the two sources are never mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub enum DicomdirState {
    #[default]
    NoDicomdir,
    Probing,
    UseDicomdir,
    FallbackFullScan,
}

impl DicomdirState {
    /// Initial state for a folder read
    pub fn start(use_dicomdir: bool) -> Self {
        if use_dicomdir {
            DicomdirState::Probing
        } else {
            DicomdirState::NoDicomdir
        }
    }

    /// Transition on the probe result; only `Probing` moves
    pub fn on_probe<T, E>(self, probe: &std::result::Result<T, E>) -> Self {
        match (self, probe) {
            (DicomdirState::Probing, Ok(_)) => DicomdirState::UseDicomdir,
            (DicomdirState::Probing, Err(_)) => DicomdirState::FallbackFullScan,
            (state, _) => state,
        }
    }
}

impl fmt::Display for DicomdirState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DicomdirState::NoDicomdir => "no DICOMDIR",
            DicomdirState::Probing => "probing DICOMDIR",
            DicomdirState::UseDicomdir => "using DICOMDIR",
            DicomdirState::FallbackFullScan => "DICOMDIR fallback to full scan",
        };
        write!(f, "{}", s)
    }
}

/// Files to scan for a folder, and how they were found
#[derive(Debug, Clone, PartialEq)]
pub struct FolderResolution {
    pub state: DicomdirState,
    pub files: Vec<PathBuf>,
    pub fallback_reason: Option<String>,
}

/// Resolves the files to scan under a folder
///
/// # Errors
///
/// Returns `ScanUnavailable` if the folder cannot be opened
pub fn resolve_folder(folder: &Path, use_dicomdir: bool, recursive: bool) -> Result<FolderResolution> {
    if !folder.is_dir() {
        return Err(IngestError::ScanUnavailable(format!(
            "{} is not an existing folder",
            folder.display()
        )));
    }

    let mut state = DicomdirState::start(use_dicomdir);
    let mut fallback_reason = None;

    if state == DicomdirState::Probing {
        let probe = probe_dicomdir(folder);
        state = state.on_probe(&probe);
        match probe {
            Ok(files) => {
                info!("Using DICOMDIR of {} ({} files)", folder.display(), files.len());
                return Ok(FolderResolution {
                    state,
                    files,
                    fallback_reason,
                });
            }
            Err(reason) => {
                debug!("DICOMDIR not usable in {}: {}", folder.display(), reason);
                fallback_reason = Some(reason);
            }
        }
    }

    let files = collect_dicom_files(folder, recursive).map_err(|e| {
        IngestError::ScanUnavailable(format!("cannot read {}: {}", folder.display(), e))
    })?;

    Ok(FolderResolution {
        state,
        files,
        fallback_reason,
    })
}

/// Locates a DICOMDIR file directly under the folder
fn find_dicomdir(folder: &Path) -> Option<PathBuf> {
    std::fs::read_dir(folder)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .find(|path| path.is_file() && super::files::is_dicomdir_name(path))
}

/// Reads a DICOMDIR and returns every referenced file
///
/// Fails when the DICOMDIR is absent, unreadable, references nothing, or
/// references a file that does not exist.
pub fn probe_dicomdir(folder: &Path) -> std::result::Result<Vec<PathBuf>, String> {
    let dicomdir = find_dicomdir(folder).ok_or_else(|| "no DICOMDIR file".to_string())?;
    let obj = open_file(&dicomdir).map_err(|e| format!("unreadable DICOMDIR: {}", e))?;

    let records = obj
        .element(DIRECTORY_RECORD_SEQUENCE)
        .ok()
        .and_then(|elem| elem.items())
        .ok_or_else(|| "DICOMDIR has no directory records".to_string())?;

    let mut files = Vec::new();
    for record in records {
        let components = match record
            .element(REFERENCED_FILE_ID)
            .ok()
            .and_then(|elem| elem.to_multi_str().ok())
        {
            Some(components) => components,
            // Patient, study and series records reference no file
            None => continue,
        };

        let mut path = folder.to_path_buf();
        for component in components.iter() {
            let component = component.trim_matches(|c: char| c == '\0' || c.is_whitespace());
            if !component.is_empty() {
                path.push(component);
            }
        }

        if !path.is_file() {
            warn!("DICOMDIR references missing file {}", path.display());
            return Err(format!("referenced file {} is missing", path.display()));
        }
        files.push(path);
    }

    if files.is_empty() {
        return Err("DICOMDIR references no file".to_string());
    }

    files.sort();
    files.dedup();
    Ok(files)
}
