//! Sensor Replay Library
//!
//! Ingests sensor exports of unknown schema (air quality, water quality,
//! soil), normalizes every row into a fixed reading shape and replays the
//! result to clients at a controlled rate.
//!
//! This library provides tools for:
//! - Canonicalizing arbitrary column headers and coercing messy cell values
//! - Inferring which column holds which measurement by token scoring
//! - Classifying rows as air or water data and synthesizing proxy values
//! - Loading a directory of `.csv`/`.tsv` files into an ordered cache
//! - Streaming the cache over server-sent events with start/stop control

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod loader;
pub mod models;
pub mod normalize;
pub mod replay;
pub mod server;

pub use config::Config;
pub use error::{ReplayError, Result};
pub use loader::{DatasetLoader, LoadOutcome, ReadingCache};
pub use models::{DatasetKind, Field, NormalizedReading, Provenance};
pub use normalize::FieldInference;
pub use replay::{ReplayController, ReplayStatus, StreamSession};
