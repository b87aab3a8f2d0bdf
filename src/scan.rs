use std::path::PathBuf;
use walkdir::WalkDir;

use crate::core::LibraryData;
use crate::error::{ReconcileError, Result};

/// A game folder found under a library root, prior to reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateGame {
    pub name: String,
    pub path: PathBuf,
}

/// List candidate game folders directly under a library root.
///
/// Each first-level directory is one candidate; its folder name is the search
/// query seed. Hidden entries and plain files are skipped.
pub fn scan_library(library: &LibraryData) -> Result<Vec<CandidateGame>> {
    if !library.path.is_dir() {
        return Err(ReconcileError::Other(format!(
            "Library path is not a directory: {}",
            library.path.display()
        )));
    }

    let mut candidates = Vec::new();
    for entry in WalkDir::new(&library.path).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| ReconcileError::Other(e.to_string()))?;
        if !entry.file_type().is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }

        candidates.push(CandidateGame {
            name,
            path: entry.into_path(),
        });
    }

    candidates.sort_by(|a, b| a.name.cmp(&b.name));
    tracing::debug!(
        "Found {} candidate(s) under {}",
        candidates.len(),
        library.path.display()
    );
    Ok(candidates)
}
