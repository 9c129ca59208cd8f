//! Configuration management and validation.
//!
//! Settings are layered: built-in defaults, then environment variables, then
//! command-line flags applied by the binary through the `with_*` builders.

use crate::constants::{
    APP_DATA_DIR_NAME, DEFAULT_CHANNEL_CAPACITY, DEFAULT_DATA_DIRS, DEFAULT_HOST,
    DEFAULT_INTERVAL_MS, DEFAULT_KEEP_ALIVE_SECS, DEFAULT_PORT, DEFAULT_ROUTE_PREFIX, ENV_CORS_ORIGIN,
    ENV_DATA_DIR, ENV_HOST, ENV_INTERVAL_MS, ENV_PORT, MIN_INTERVAL_MS,
};
use crate::error::{ReplayError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,

    /// Port to bind; 0 picks an ephemeral port
    pub port: u16,

    /// Allowed CORS origin; any origin when unset
    pub cors_origin: Option<String>,

    /// Path the replay routes are nested under
    pub route_prefix: String,

    /// Interval between keep-alive comments on idle streams
    pub keep_alive_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            cors_origin: None,
            route_prefix: DEFAULT_ROUTE_PREFIX.to_string(),
            keep_alive_secs: DEFAULT_KEEP_ALIVE_SECS,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }
}

/// Dataset ingestion settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Candidate data directories; the first existing one is used
    pub data_dirs: Vec<PathBuf>,

    /// Order readings by source timestamp after loading
    pub sort_by_timestamp: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            data_dirs: default_data_dirs(),
            sort_by_timestamp: true,
        }
    }
}

/// Built-in candidate directories, project-relative first
pub fn default_data_dirs() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = DEFAULT_DATA_DIRS.iter().map(PathBuf::from).collect();
    if let Some(data_dir) = dirs::data_dir() {
        dirs.push(data_dir.join(APP_DATA_DIR_NAME).join("data"));
    }
    dirs
}

/// Replay timing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    pub default_interval_ms: u64,

    /// Floor applied to every requested interval
    pub min_interval_ms: u64,

    /// Readings buffered per session before it waits on the client
    pub channel_capacity: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            default_interval_ms: DEFAULT_INTERVAL_MS,
            min_interval_ms: MIN_INTERVAL_MS,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl ReplayConfig {
    pub fn with_default_interval_ms(mut self, interval_ms: u64) -> Self {
        self.default_interval_ms = interval_ms;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }
}

/// Global configuration for the replay service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub ingest: IngestConfig,
    pub replay: ReplayConfig,
}

impl Config {
    /// Defaults overlaid with the process environment
    pub fn from_env() -> Self {
        Self::default().apply_env(|key| std::env::var(key).ok())
    }

    /// Overlay values from an environment lookup; invalid values are ignored
    pub fn apply_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(port) = lookup(ENV_PORT) {
            match port.trim().parse() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!("Ignoring invalid {}: {:?}", ENV_PORT, port),
            }
        }
        if let Some(host) = lookup(ENV_HOST) {
            self.server.host = host.trim().to_string();
        }
        if let Some(origin) = lookup(ENV_CORS_ORIGIN) {
            self.server.cors_origin = Some(origin.trim().to_string());
        }
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.ingest.data_dirs.insert(0, PathBuf::from(dir));
        }
        if let Some(interval) = lookup(ENV_INTERVAL_MS) {
            match interval.trim().parse() {
                Ok(ms) => self.replay.default_interval_ms = ms,
                Err(_) => warn!("Ignoring invalid {}: {:?}", ENV_INTERVAL_MS, interval),
            }
        }

        debug!("Configuration after environment overlay: {:?}", self);
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.server.port = port;
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.server.host = host.into();
        self
    }

    pub fn with_cors_origin(mut self, origin: impl Into<String>) -> Self {
        self.server.cors_origin = Some(origin.into());
        self
    }

    /// Replace the candidate data directories
    pub fn with_data_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.ingest.data_dirs = dirs;
        self
    }

    pub fn with_interval_ms(mut self, interval_ms: u64) -> Self {
        self.replay.default_interval_ms = interval_ms;
        self
    }

    /// Keep readings in file order instead of sorting by timestamp
    pub fn without_timestamp_sort(mut self) -> Self {
        self.ingest.sort_by_timestamp = false;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(config_error("server host must not be empty"));
        }
        if !self.server.route_prefix.starts_with('/') {
            return Err(config_error(format!(
                "route prefix must start with '/': {}",
                self.server.route_prefix
            )));
        }
        if self.ingest.data_dirs.is_empty() {
            return Err(config_error("at least one data directory is required"));
        }
        if self.replay.min_interval_ms == 0 {
            return Err(config_error("minimum interval must be positive"));
        }
        if self.replay.channel_capacity == 0 {
            return Err(config_error("channel capacity must be positive"));
        }
        if self.replay.default_interval_ms < self.replay.min_interval_ms {
            warn!(
                "Default interval {}ms is below the {}ms floor and will be raised",
                self.replay.default_interval_ms, self.replay.min_interval_ms
            );
        }
        Ok(())
    }
}

fn config_error(message: impl Into<String>) -> ReplayError {
    ReplayError::Configuration {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.server.bind_address(), "0.0.0.0:4000");
        assert_eq!(config.server.route_prefix, "/api/realtime");
        assert!(config.server.cors_origin.is_none());
        assert_eq!(config.replay.default_interval_ms, 2000);
        assert_eq!(config.replay.min_interval_ms, 250);
        assert!(config.ingest.sort_by_timestamp);
        assert_eq!(config.ingest.data_dirs[0], PathBuf::from("ml/artifacts/data"));
        assert_eq!(config.ingest.data_dirs[3], PathBuf::from("backend/ml/data"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_environment_overlay() {
        let config = Config::default().apply_env(env(&[
            ("PORT", "8080"),
            ("HOST", "127.0.0.1"),
            ("CORS_ORIGIN", "http://localhost:5173"),
            ("SENSOR_REPLAY_DATA_DIR", "/srv/sensors"),
            ("SENSOR_REPLAY_INTERVAL_MS", "500"),
        ]));

        assert_eq!(config.server.bind_address(), "127.0.0.1:8080");
        assert_eq!(config.server.cors_origin.as_deref(), Some("http://localhost:5173"));
        assert_eq!(config.ingest.data_dirs[0], PathBuf::from("/srv/sensors"));
        assert_eq!(config.ingest.data_dirs[1], PathBuf::from("ml/artifacts/data"));
        assert_eq!(config.replay.default_interval_ms, 500);
    }

    #[test]
    fn test_invalid_environment_values_are_ignored() {
        let config = Config::default().apply_env(env(&[
            ("PORT", "eighty"),
            ("SENSOR_REPLAY_INTERVAL_MS", "-5"),
            ("HOST", "   "),
        ]));

        assert_eq!(config.server.port, 4000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.replay.default_interval_ms, 2000);
    }

    #[test]
    fn test_builders_override_environment() {
        let config = Config::default()
            .apply_env(env(&[("PORT", "8080")]))
            .with_port(9000)
            .with_host("localhost")
            .with_data_dirs(vec![PathBuf::from("fixtures")])
            .with_interval_ms(750)
            .without_timestamp_sort();

        assert_eq!(config.server.bind_address(), "localhost:9000");
        assert_eq!(config.ingest.data_dirs, vec![PathBuf::from("fixtures")]);
        assert_eq!(config.replay.default_interval_ms, 750);
        assert!(!config.ingest.sort_by_timestamp);
    }

    #[test]
    fn test_validation_errors() {
        let config = Config::default().with_data_dirs(Vec::new());
        match config.validate().unwrap_err() {
            ReplayError::Configuration { message } => assert!(message.contains("data directory")),
            _ => panic!("Expected Configuration error"),
        }

        let mut config = Config::default();
        config.server.route_prefix = "api".to_string();
        assert!(config.validate().is_err());

        let config = Config {
            replay: ReplayConfig::default().with_channel_capacity(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
