//! Dataset loading
//!
//! Resolves the data directory, parses every tabular file in it, runs each
//! row through field inference and assembles the result into a
//! [`ReadingCache`]. Files that cannot be read are skipped and reported in
//! [`LoadStats`]; a missing data directory yields an empty cache.

pub mod cache;
pub mod discovery;
pub mod parser;

#[cfg(test)]
pub mod tests;

pub use self::cache::ReadingCache;
pub use self::discovery::FileDiscovery;
pub use self::parser::{detect_delimiter, parse_rows, read_rows};

use crate::config::IngestConfig;
use crate::error::{ReplayError, Result};
use crate::models::{LoadStats, NormalizedReading};
use crate::normalize::FieldInference;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// A loaded cache together with what happened while building it
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub cache: ReadingCache,
    pub stats: LoadStats,
}

/// Loads sensor exports from the first existing candidate directory
#[derive(Debug, Clone)]
pub struct DatasetLoader {
    discovery: FileDiscovery,
    inference: FieldInference,
    sort_by_timestamp: bool,
}

impl DatasetLoader {
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self {
            discovery: FileDiscovery::new(candidates),
            inference: FieldInference::default(),
            sort_by_timestamp: true,
        }
    }

    pub fn from_config(config: &IngestConfig) -> Self {
        Self::new(config.data_dirs.clone()).with_sort_by_timestamp(config.sort_by_timestamp)
    }

    pub fn with_sort_by_timestamp(mut self, sort: bool) -> Self {
        self.sort_by_timestamp = sort;
        self
    }

    pub fn with_inference(mut self, inference: FieldInference) -> Self {
        self.inference = inference;
        self
    }

    pub fn candidates(&self) -> &[PathBuf] {
        self.discovery.candidates()
    }

    /// Load using the current time as the ingestion instant
    pub fn load(&self) -> LoadOutcome {
        self.load_at(Utc::now())
    }

    /// Run a load on the blocking pool
    pub async fn load_async(&self) -> Result<LoadOutcome> {
        let loader = self.clone();
        let outcome = tokio::task::spawn_blocking(move || loader.load()).await?;
        Ok(outcome)
    }

    /// Load with a fixed ingestion instant for rows without a timestamp column
    pub fn load_at(&self, ingested_at: DateTime<Utc>) -> LoadOutcome {
        let start_time = Instant::now();
        let mut stats = LoadStats::default();

        let Some(data_dir) = self.discovery.resolve_data_dir() else {
            let error = ReplayError::NoDataDirectory {
                checked: self.discovery.candidates().to_vec(),
            };
            warn!("{}", error);
            stats.warning = Some(error.to_string());
            return Self::finish(Vec::new(), stats, false, start_time);
        };
        stats.data_dir = Some(data_dir.clone());

        let files = match FileDiscovery::discover_tabular_files(&data_dir) {
            Ok(files) => files,
            Err(e) => {
                warn!("Could not list {}: {}", data_dir.display(), e);
                stats.warning = Some(e.to_string());
                return Self::finish(Vec::new(), stats, false, start_time);
            }
        };
        stats.files_discovered = files.len();

        if files.is_empty() {
            warn!("No .csv or .tsv files in {}", data_dir.display());
        }

        let mut readings = Vec::new();
        for path in &files {
            match self.load_file(path, ingested_at) {
                Ok(file_readings) => {
                    info!("Loaded {} rows from {}", file_readings.len(), display_name(path));
                    stats.files_loaded += 1;
                    readings.extend(file_readings);
                }
                Err(e) => {
                    warn!("Skipping {}: {}", display_name(path), e);
                    stats.add_failure(path.clone(), e.to_string());
                }
            }
        }

        Self::finish(readings, stats, self.sort_by_timestamp, start_time)
    }

    /// Parse and normalize a single file
    pub fn load_file(
        &self,
        path: &Path,
        ingested_at: DateTime<Utc>,
    ) -> Result<Vec<NormalizedReading>> {
        let rows = read_rows(path)?;
        debug!("Parsed {} rows from {}", rows.len(), path.display());

        Ok(rows
            .iter()
            .map(|row| self.inference.map_row(row, ingested_at))
            .collect())
    }

    fn finish(
        readings: Vec<NormalizedReading>,
        mut stats: LoadStats,
        sort_by_timestamp: bool,
        start_time: Instant,
    ) -> LoadOutcome {
        let cache = ReadingCache::assemble(readings, sort_by_timestamp);
        for reading in &cache {
            stats.record_reading(reading);
        }
        stats.load_time_ms = start_time.elapsed().as_millis();

        info!(
            "Cache size = {} ({} air, {} water)",
            cache.len(),
            stats.air_rows,
            stats.water_rows
        );

        LoadOutcome { cache, stats }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
