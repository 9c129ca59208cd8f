//! Data directory resolution and tabular file discovery
//!
//! Candidate directories are tried in priority order and the first one that
//! exists is used. Only its top level is scanned; sensor exports are dropped
//! there flat.

use crate::constants::TABULAR_EXTENSIONS;
use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// File discovery over an ordered list of candidate directories
#[derive(Debug, Clone)]
pub struct FileDiscovery {
    candidates: Vec<PathBuf>,
}

impl FileDiscovery {
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    /// First candidate directory that exists
    pub fn resolve_data_dir(&self) -> Option<PathBuf> {
        let found = self.candidates.iter().find(|dir| dir.is_dir()).cloned();
        if let Some(dir) = &found {
            debug!("Using data directory: {}", dir.display());
        }
        found
    }

    /// List `.csv`/`.tsv` files directly inside `dir`, sorted by file name
    pub fn discover_tabular_files(dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(std::io::Error::from)?;
            // follows symlinks; dangling links are skipped
            if entry.path().is_file() && is_tabular_file(entry.path()) {
                files.push(entry.into_path());
            }
        }

        debug!("Found {} tabular files in {}", files.len(), dir.display());
        Ok(files)
    }
}

/// Check if a path has a tabular extension (case-insensitive)
fn is_tabular_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            TABULAR_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}
