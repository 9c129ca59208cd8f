//! Error handling for sensor ingestion and replay.
//!
//! Per-cell and per-file problems are recovered where they happen; the
//! variants here describe what is left over once recovery has been applied:
//! failed files, missing configuration and invalid replay requests.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing failed for file: {path} - {source}")]
    CsvParsing {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("No data directory found. Checked: {}", format_paths(.checked))]
    NoDataDirectory { checked: Vec<PathBuf> },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("no data in cache")]
    NoData,

    #[error("stream disabled")]
    StreamDisabled,

    #[error("Background task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

impl ReplayError {
    /// Short machine-readable code for API clients.
    pub fn reason_code(&self) -> &'static str {
        match self {
            ReplayError::Io(_) => "io",
            ReplayError::CsvParsing { .. } => "csv_parsing",
            ReplayError::NoDataDirectory { .. } => "no_data_directory",
            ReplayError::Configuration { .. } => "configuration",
            ReplayError::NoData => "no_data",
            ReplayError::StreamDisabled => "stream_disabled",
            ReplayError::TaskFailed(_) => "task_failed",
        }
    }
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, ReplayError>;
