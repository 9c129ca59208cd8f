//! Core data structures for sensor ingestion and replay.
//!
//! The dynamic, string-keyed row shape lives only in [`CanonicalRow`]; once a
//! row has been through field inference it becomes a [`NormalizedReading`]
//! and nothing downstream looks at column names again.

use crate::constants::meanings;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// A single raw cell as read from a tabular file
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Missing,
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

/// One row keyed by canonical column name, in first-seen column order.
///
/// When two source columns canonicalize to the same key the later value
/// replaces the earlier one but keeps its position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalRow {
    entries: Vec<(String, CellValue)>,
}

impl CanonicalRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<CellValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<CellValue>> FromIterator<(K, V)> for CanonicalRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = CanonicalRow::new();
        for (key, value) in iter {
            row.insert(key, value);
        }
        row
    }
}

/// Target measurements, declared in match priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Pm25,
    Pm10,
    AirTemperature,
    Humidity,
    Ph,
    Turbidity,
    SoilMoisture,
    SoilTemperature,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::Pm25,
        Field::Pm10,
        Field::AirTemperature,
        Field::Humidity,
        Field::Ph,
        Field::Turbidity,
        Field::SoilMoisture,
        Field::SoilTemperature,
    ];

    /// Alternative token sets that identify this measurement
    pub fn meaning(&self) -> &'static [&'static [&'static str]] {
        match self {
            Field::Pm25 => meanings::PM25,
            Field::Pm10 => meanings::PM10,
            Field::AirTemperature => meanings::AIR_TEMPERATURE,
            Field::Humidity => meanings::HUMIDITY,
            Field::Ph => meanings::PH,
            Field::Turbidity => meanings::TURBIDITY,
            Field::SoilMoisture => meanings::SOIL_MOISTURE,
            Field::SoilTemperature => meanings::SOIL_TEMPERATURE,
        }
    }

    /// Dotted path of the field in the serialized reading
    pub fn path(&self) -> &'static str {
        match self {
            Field::Pm25 => "air.pm25",
            Field::Pm10 => "air.pm10",
            Field::AirTemperature => "air.temp",
            Field::Humidity => "air.humidity",
            Field::Ph => "water.ph",
            Field::Turbidity => "water.turbidity",
            Field::SoilMoisture => "soil.moisture",
            Field::SoilTemperature => "soil.temp",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Where a field value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Column selected by token scoring
    Measured,
    /// Column taken by literal name after scoring found nothing
    Fallback,
    /// Value synthesized from a related measurement
    Proxy,
}

/// Result of matching one measurement against a row
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMatch {
    pub key: Option<String>,
    pub value: Option<f64>,
    pub score: i32,
    pub provenance: Provenance,
}

impl FieldMatch {
    pub fn unmatched() -> Self {
        Self {
            key: None,
            value: None,
            score: crate::constants::scores::UNMATCHED,
            provenance: Provenance::Measured,
        }
    }

    pub fn new(key: impl Into<String>, value: f64, score: i32, provenance: Provenance) -> Self {
        Self {
            key: Some(key.into()),
            value: Some(value),
            score,
            provenance,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.value.is_some()
    }
}

/// Row classification derived from which measurements were found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Air,
    Water,
}

/// Whether the timestamp was read from the row or stamped at ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampSource {
    Column,
    Ingestion,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AirReading {
    pub pm25: Option<f64>,
    pub pm10: Option<f64>,
    #[serde(rename = "temp")]
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WaterReading {
    pub ph: Option<f64>,
    pub turbidity: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoilReading {
    pub moisture: Option<f64>,
    #[serde(rename = "temp")]
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingMeta {
    pub dataset_kind: DatasetKind,
    pub is_air: bool,
    pub timestamp_source: TimestampSource,
    /// Provenance of every non-null field, keyed by dotted field path
    pub provenance: BTreeMap<String, Provenance>,
}

/// The canonical output unit streamed to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedReading {
    #[serde(rename = "ts", serialize_with = "serialize_iso_millis")]
    pub timestamp: DateTime<Utc>,
    pub air: AirReading,
    pub water: WaterReading,
    pub soil: SoilReading,
    #[serde(rename = "_meta")]
    pub meta: ReadingMeta,
}

impl NormalizedReading {
    pub fn dataset_kind(&self) -> DatasetKind {
        self.meta.dataset_kind
    }

    pub fn has_source_timestamp(&self) -> bool {
        self.meta.timestamp_source == TimestampSource::Column
    }

    /// Value of one measurement
    pub fn value(&self, field: Field) -> Option<f64> {
        match field {
            Field::Pm25 => self.air.pm25,
            Field::Pm10 => self.air.pm10,
            Field::AirTemperature => self.air.temperature,
            Field::Humidity => self.air.humidity,
            Field::Ph => self.water.ph,
            Field::Turbidity => self.water.turbidity,
            Field::SoilMoisture => self.soil.moisture,
            Field::SoilTemperature => self.soil.temperature,
        }
    }

    pub fn provenance(&self, field: Field) -> Option<Provenance> {
        self.meta.provenance.get(field.path()).copied()
    }
}

/// ISO-8601 with millisecond precision and a `Z` suffix
fn serialize_iso_millis<S: Serializer>(
    timestamp: &DateTime<Utc>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// A file the loader gave up on
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Loading statistics
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadStats {
    pub data_dir: Option<PathBuf>,
    /// Set when loading fell back to an empty cache without a per-file failure
    pub warning: Option<String>,
    pub files_discovered: usize,
    pub files_loaded: usize,
    pub files_failed: usize,
    pub total_rows: usize,
    pub air_rows: usize,
    pub water_rows: usize,
    pub failures: Vec<FileFailure>,
    pub load_time_ms: u128,
}

impl LoadStats {
    /// Record a skipped file
    pub fn add_failure(&mut self, path: PathBuf, reason: String) {
        self.files_failed += 1;
        self.failures.push(FileFailure { path, reason });
    }

    /// Count a loaded reading by dataset kind
    pub fn record_reading(&mut self, reading: &NormalizedReading) {
        self.total_rows += 1;
        match reading.dataset_kind() {
            DatasetKind::Air => self.air_rows += 1,
            DatasetKind::Water => self.water_rows += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_canonical_row_collision_keeps_position() {
        let row: CanonicalRow = [("ph", "7.0"), ("temp", "20"), ("ph", "7.4")]
            .into_iter()
            .collect();

        assert_eq!(row.len(), 2);
        assert_eq!(row.keys().collect::<Vec<_>>(), vec!["ph", "temp"]);
        assert_eq!(row.get("ph"), Some(&CellValue::Text("7.4".to_string())));
    }

    #[test]
    fn test_reading_wire_format() {
        let reading = NormalizedReading {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 10, 18, 0, 0).unwrap(),
            air: AirReading {
                temperature: Some(23.5),
                ..Default::default()
            },
            water: WaterReading::default(),
            soil: SoilReading {
                temperature: Some(18.5),
                ..Default::default()
            },
            meta: ReadingMeta {
                dataset_kind: DatasetKind::Air,
                is_air: true,
                timestamp_source: TimestampSource::Column,
                provenance: BTreeMap::from([
                    ("air.temp".to_string(), Provenance::Measured),
                    ("soil.temp".to_string(), Provenance::Proxy),
                ]),
            },
        };

        let json = serde_json::to_value(&reading).unwrap();

        assert_eq!(json["ts"], "2024-03-10T18:00:00.000Z");
        assert_eq!(json["air"]["temp"], 23.5);
        assert!(json["air"]["pm25"].is_null());
        assert!(json["water"]["ph"].is_null());
        assert_eq!(json["soil"]["temp"], 18.5);
        assert_eq!(json["_meta"]["datasetKind"], "air");
        assert_eq!(json["_meta"]["timestampSource"], "column");
        assert_eq!(json["_meta"]["provenance"]["soil.temp"], "proxy");

        let back: NormalizedReading = serde_json::from_value(json).unwrap();
        assert_eq!(back, reading);
    }

    #[test]
    fn test_field_paths_follow_priority_order() {
        let paths: Vec<_> = Field::ALL.iter().map(Field::path).collect();
        assert_eq!(paths[0], "air.pm25");
        assert_eq!(paths[7], "soil.temp");
        assert!(Field::AirTemperature < Field::SoilTemperature);
    }
}
