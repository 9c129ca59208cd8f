//! Application constants for the sensor replay service
//!
//! Scoring weights, measurement meaning tables, column aliases and the
//! default values used by configuration.

// =============================================================================
// Data Directories and File Patterns
// =============================================================================

/// Candidate data directories, relative to the working directory, in priority order
pub const DEFAULT_DATA_DIRS: &[&str] = &[
    "ml/artifacts/data",
    "ml/data",
    "backend/ml/artifacts/data",
    "backend/ml/data",
];

/// Application directory name under the user data directory
pub const APP_DATA_DIR_NAME: &str = "sensor-replay";

/// Tabular file extensions picked up by the loader (compared case-insensitively)
pub const TABULAR_EXTENSIONS: &[&str] = &["csv", "tsv"];

/// Delimiters considered during detection; earlier entries win ties
pub const CANDIDATE_DELIMITERS: &[u8] = b",;\t";

// =============================================================================
// Replay Defaults
// =============================================================================

/// Default interval between streamed readings
pub const DEFAULT_INTERVAL_MS: u64 = 2000;

/// Lowest interval a client or operator may request
pub const MIN_INTERVAL_MS: u64 = 250;

/// Buffered events per stream session before the session waits on the client
pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// Server-sent event name carried by every streamed reading
pub const READING_EVENT: &str = "reading";

// =============================================================================
// Server Defaults
// =============================================================================

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_ROUTE_PREFIX: &str = "/api/realtime";

/// Seconds between SSE keep-alive comments on idle streams
pub const DEFAULT_KEEP_ALIVE_SECS: u64 = 15;

// =============================================================================
// Environment Variables
// =============================================================================

pub const ENV_PORT: &str = "PORT";
pub const ENV_HOST: &str = "HOST";
pub const ENV_CORS_ORIGIN: &str = "CORS_ORIGIN";

/// Directory tried before the built-in candidates
pub const ENV_DATA_DIR: &str = "SENSOR_REPLAY_DATA_DIR";
pub const ENV_INTERVAL_MS: &str = "SENSOR_REPLAY_INTERVAL_MS";

// =============================================================================
// Column Aliases
// =============================================================================

/// Canonical column names that may carry the reading timestamp, in lookup order
pub const TIMESTAMP_ALIASES: &[&str] = &["timestamp", "ts", "time", "date_time", "datetime", "date"];

/// Literal keys taken directly as air temperature when scoring found nothing
pub const AIR_TEMPERATURE_KEYS: &[&str] = &["t", "temperature"];

/// Literal keys taken directly as relative humidity when scoring found nothing
pub const HUMIDITY_KEYS: &[&str] = &["rh", "humidity"];

/// Water datasets: organic carbon stands in for soil moisture
pub const ORGANIC_CARBON_KEY: &str = "organic_carbon";

/// Water datasets: hardness stands in for soil temperature
pub const HARDNESS_KEY: &str = "hardness";

// =============================================================================
// Field Scoring
// =============================================================================

/// Weights used when scoring a column key against a token set
pub mod scores {
    /// Key equals the underscore-joined token set
    pub const EXACT_MATCH: i32 = 100;

    /// Wanted token present verbatim among the key's tokens
    pub const VERBATIM_TOKEN: i32 = 15;

    /// Wanted token is a prefix of one of the key's tokens
    pub const PREFIX_TOKEN: i32 = 8;

    pub const TEMPERATURE_BONUS: i32 = 10;
    pub const HUMIDITY_BONUS: i32 = 10;
    pub const PM_BONUS: i32 = 5;
    pub const MOISTURE_BONUS: i32 = 10;
    pub const PH_BONUS: i32 = 20;
    pub const TURBIDITY_BONUS: i32 = 15;

    /// Confidence assigned to literal-key fallbacks
    pub const FALLBACK: i32 = 50;

    /// Confidence assigned to proxies derived from humidity
    pub const HUMIDITY_PROXY: i32 = 25;

    /// Confidence assigned to organic-carbon moisture stand-ins
    pub const ORGANIC_CARBON_PROXY: i32 = 20;

    /// Confidence assigned to soil temperature stand-ins
    pub const SOIL_TEMPERATURE_PROXY: i32 = 10;

    /// Sentinel for a field no column could satisfy
    pub const UNMATCHED: i32 = -1;
}

// =============================================================================
// Measurement Meanings
// =============================================================================

/// Token sets identifying each target measurement, alternatives in order
pub mod meanings {
    pub const PM25: &[&[&str]] = &[&["pm", "2", "5"], &["pm25"]];
    pub const PM10: &[&[&str]] = &[&["pm", "10"], &["pm10"]];
    pub const AIR_TEMPERATURE: &[&[&str]] = &[&["air", "temp"], &["temperature"], &["temp"], &["t"]];
    pub const HUMIDITY: &[&[&str]] = &[&["humidity"], &["rh"]];
    pub const PH: &[&[&str]] = &[&["ph"]];
    pub const TURBIDITY: &[&[&str]] = &[&["turbidity"], &["ntu"]];
    pub const SOIL_MOISTURE: &[&[&str]] = &[&["soil", "moisture"], &["moisture"], &["vwc"]];
    pub const SOIL_TEMPERATURE: &[&[&str]] = &[&["soil", "temp"], &["soil", "temperature"]];

    /// Column-name probe that marks air-quality exports (e.g. `CO(GT)`)
    pub const AIR_PROBE: &[&str] = &["co", "gt"];

    /// Column-name probe that marks water-quality exports
    pub const WATER_PROBE: &[&str] = &["conductivity"];
}

// =============================================================================
// Proxy Synthesis
// =============================================================================

/// Relative humidity scale used to derive a 0..1 soil moisture proxy
pub const HUMIDITY_SCALE_MAX: f64 = 100.0;

/// Organic carbon scale used to derive a 0..1 soil moisture stand-in
pub const ORGANIC_CARBON_SCALE_MAX: f64 = 20.0;

/// Soil temperature proxy is air temperature minus this offset (°C)
pub const SOIL_TEMPERATURE_OFFSET: f64 = 5.0;
