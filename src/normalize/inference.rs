//! Field inference for rows of unknown schema
//!
//! Every canonical column key is scored against the token sets that
//! describe each target measurement. The best-scoring parseable column wins
//! the measurement, the row is classified as an air or water dataset, and
//! measurements that are still missing are filled from literal fallback
//! columns or synthesized from related measurements.
//!
//! A source column feeds at most one measurement. When two measurements
//! want the same column the higher score takes it; ties go to the
//! measurement declared first in [`Field::ALL`].

use super::canonical::tokenize;
use super::coerce::coerce;
use super::timestamp::extract_timestamp;
use crate::constants::{
    AIR_TEMPERATURE_KEYS, HARDNESS_KEY, HUMIDITY_KEYS, HUMIDITY_SCALE_MAX, ORGANIC_CARBON_KEY,
    ORGANIC_CARBON_SCALE_MAX, SOIL_TEMPERATURE_OFFSET, meanings, scores,
};
use crate::models::{
    AirReading, CanonicalRow, DatasetKind, Field, FieldMatch, NormalizedReading, Provenance,
    ReadingMeta, SoilReading, WaterReading,
};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use tracing::trace;

/// Alternative token sets for one measurement
pub type MeaningSpec = &'static [&'static [&'static str]];

/// One match per target field
pub type FieldMatches = BTreeMap<Field, FieldMatch>;

/// Outcome of inference for one row, before it is flattened into a reading
#[derive(Debug, Clone, PartialEq)]
pub struct RowInference {
    pub matches: FieldMatches,
    pub air_score: i32,
    pub water_score: i32,
    pub kind: DatasetKind,
}

impl RowInference {
    pub fn value(&self, field: Field) -> Option<f64> {
        self.matches.get(&field).and_then(|m| m.value)
    }
}

/// Score a canonical key against one token set
pub fn score_key(key: &str, wanted: &[&str]) -> i32 {
    let tokens = tokenize(key);
    if tokens.is_empty() || wanted.is_empty() {
        return 0;
    }

    if key == wanted.join("_") {
        return scores::EXACT_MATCH;
    }

    let has = |name: &str| tokens.iter().any(|t| t == name);
    let wants = |name: &str| wanted.contains(&name);

    let mut score = 0;
    for want in wanted {
        if has(*want) {
            score += scores::VERBATIM_TOKEN;
        } else if tokens.iter().any(|t| t.starts_with(*want)) {
            score += scores::PREFIX_TOKEN;
        }
    }

    if wants("temperature") && (has("t") || has("temp")) {
        score += scores::TEMPERATURE_BONUS;
    }
    if wants("humidity") && (has("rh") || has("humidity")) {
        score += scores::HUMIDITY_BONUS;
    }
    if wants("pm") && has("pm") {
        score += scores::PM_BONUS;
    }
    if wants("moisture") && (has("vwc") || has("moisture")) {
        score += scores::MOISTURE_BONUS;
    }
    if wants("ph") && has("ph") {
        score += scores::PH_BONUS;
    }
    if wants("turbidity") && (has("ntu") || has("turbidity")) {
        score += scores::TURBIDITY_BONUS;
    }

    score
}

/// Best parseable column for a measurement, considering every column
pub fn pick_by_meaning(row: &CanonicalRow, meaning: &[&[&str]]) -> FieldMatch {
    best_unclaimed(row, meaning, &HashSet::new())
}

fn best_unclaimed(row: &CanonicalRow, meaning: &[&[&str]], claimed: &HashSet<String>) -> FieldMatch {
    let mut best = FieldMatch::unmatched();

    for (key, cell) in row.iter() {
        if claimed.contains(key) {
            continue;
        }
        for tokens in meaning {
            let score = score_key(key, tokens);
            if score > 0 && score > best.score {
                // a high-scoring column that does not parse gives way to a lower one that does
                if let Some(value) = coerce(cell) {
                    best = FieldMatch::new(key, value, score, Provenance::Measured);
                }
            }
        }
    }

    best
}

/// Field inference engine configured with one meaning per target field
#[derive(Debug, Clone)]
pub struct FieldInference {
    meanings: Vec<(Field, MeaningSpec)>,
}

impl Default for FieldInference {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldInference {
    pub fn new() -> Self {
        Self {
            meanings: Field::ALL.iter().map(|f| (*f, f.meaning())).collect(),
        }
    }

    /// Replace the token sets used for one field
    pub fn with_meaning(mut self, field: Field, meaning: MeaningSpec) -> Self {
        match self.meanings.iter_mut().find(|(f, _)| *f == field) {
            Some(entry) => entry.1 = meaning,
            None => self.meanings.push((field, meaning)),
        }
        self
    }

    /// Assign columns to fields, highest score first
    pub fn match_fields(&self, row: &CanonicalRow) -> FieldMatches {
        let mut claimed = HashSet::new();
        let mut pending = self.meanings.clone();
        let mut matches = FieldMatches::new();

        loop {
            let mut winner: Option<(usize, FieldMatch)> = None;
            for (index, (_, meaning)) in pending.iter().enumerate() {
                let candidate = best_unclaimed(row, meaning, &claimed);
                if !candidate.is_matched() {
                    continue;
                }
                if winner
                    .as_ref()
                    .is_none_or(|(_, best)| candidate.score > best.score)
                {
                    winner = Some((index, candidate));
                }
            }

            let Some((index, found)) = winner else {
                break;
            };
            if let Some(key) = &found.key {
                claimed.insert(key.clone());
            }
            let (field, _) = pending.remove(index);
            matches.insert(field, found);
        }

        for (field, _) in pending {
            matches.insert(field, FieldMatch::unmatched());
        }

        matches
    }

    /// Match, classify and fill gaps for one row
    pub fn infer(&self, row: &CanonicalRow) -> RowInference {
        let mut matches = self.match_fields(row);
        let (kind, air_score, water_score) = classify(row, &matches);
        apply_fallbacks(row, kind, &mut matches);

        RowInference {
            matches,
            air_score,
            water_score,
            kind,
        }
    }

    /// Turn one canonical row into a typed reading
    pub fn map_row(&self, row: &CanonicalRow, ingested_at: DateTime<Utc>) -> NormalizedReading {
        let (timestamp, timestamp_source) = extract_timestamp(row, ingested_at);
        let inference = self.infer(row);

        trace!(
            "Row classified {:?} (air {}, water {})",
            inference.kind, inference.air_score, inference.water_score
        );

        let provenance = inference
            .matches
            .iter()
            .filter(|(_, m)| m.is_matched())
            .map(|(field, m)| (field.path().to_string(), m.provenance))
            .collect();

        NormalizedReading {
            timestamp,
            air: AirReading {
                pm25: inference.value(Field::Pm25),
                pm10: inference.value(Field::Pm10),
                temperature: inference.value(Field::AirTemperature),
                humidity: inference.value(Field::Humidity),
            },
            water: WaterReading {
                ph: inference.value(Field::Ph),
                turbidity: inference.value(Field::Turbidity),
            },
            soil: SoilReading {
                moisture: inference.value(Field::SoilMoisture),
                temperature: inference.value(Field::SoilTemperature),
            },
            meta: ReadingMeta {
                dataset_kind: inference.kind,
                is_air: inference.kind == DatasetKind::Air,
                timestamp_source,
                provenance,
            },
        }
    }
}

fn match_score(matches: &FieldMatches, field: Field) -> i32 {
    matches
        .get(&field)
        .map_or(scores::UNMATCHED, |m| m.score)
}

fn match_value(matches: &FieldMatches, field: Field) -> Option<f64> {
    matches.get(&field).and_then(|m| m.value)
}

/// Classify a row as air or water; ties, including rows with nothing
/// recognizable, are classified as air
pub fn classify(row: &CanonicalRow, matches: &FieldMatches) -> (DatasetKind, i32, i32) {
    let blob = row.keys().collect::<Vec<_>>().join("_");

    let air_score = match_score(matches, Field::AirTemperature)
        .max(match_score(matches, Field::Humidity))
        .max(score_key(&blob, meanings::AIR_PROBE));
    let water_score = match_score(matches, Field::Ph)
        .max(match_score(matches, Field::Turbidity))
        .max(score_key(&blob, meanings::WATER_PROBE));

    let kind = if air_score >= water_score {
        DatasetKind::Air
    } else {
        DatasetKind::Water
    };

    (kind, air_score, water_score)
}

/// Fill still-unmatched fields from literal columns or related measurements
pub fn apply_fallbacks(row: &CanonicalRow, kind: DatasetKind, matches: &mut FieldMatches) {
    let unmatched = |matches: &FieldMatches, field| match_value(matches, field).is_none();

    match kind {
        DatasetKind::Air => {
            if unmatched(matches, Field::AirTemperature) {
                if let Some(found) = literal_match(row, AIR_TEMPERATURE_KEYS, scores::FALLBACK) {
                    matches.insert(Field::AirTemperature, found);
                }
            }
            if unmatched(matches, Field::Humidity) {
                if let Some(found) = literal_match(row, HUMIDITY_KEYS, scores::FALLBACK) {
                    matches.insert(Field::Humidity, found);
                }
            }
            if unmatched(matches, Field::SoilMoisture) {
                if let Some(humidity) = match_value(matches, Field::Humidity) {
                    matches.insert(
                        Field::SoilMoisture,
                        FieldMatch::new(
                            "rh_proxy",
                            normalize_unit(humidity, HUMIDITY_SCALE_MAX),
                            scores::HUMIDITY_PROXY,
                            Provenance::Proxy,
                        ),
                    );
                }
            }
            if unmatched(matches, Field::SoilTemperature) {
                if let Some(air_temperature) = match_value(matches, Field::AirTemperature) {
                    matches.insert(
                        Field::SoilTemperature,
                        FieldMatch::new(
                            "soil_temp_proxy",
                            air_temperature - SOIL_TEMPERATURE_OFFSET,
                            scores::SOIL_TEMPERATURE_PROXY,
                            Provenance::Proxy,
                        ),
                    );
                }
            }
        }
        DatasetKind::Water => {
            if unmatched(matches, Field::SoilMoisture) {
                if let Some(mut found) =
                    literal_match(row, &[ORGANIC_CARBON_KEY], scores::ORGANIC_CARBON_PROXY)
                {
                    found.value = found
                        .value
                        .map(|v| normalize_unit(v, ORGANIC_CARBON_SCALE_MAX));
                    found.provenance = Provenance::Proxy;
                    matches.insert(Field::SoilMoisture, found);
                }
            }
            if unmatched(matches, Field::SoilTemperature) {
                if let Some(mut found) =
                    literal_match(row, &[HARDNESS_KEY], scores::SOIL_TEMPERATURE_PROXY)
                {
                    found.provenance = Provenance::Proxy;
                    matches.insert(Field::SoilTemperature, found);
                }
            }
        }
    }
}

/// First column whose key is one of `keys`, taken without scoring
fn literal_match(row: &CanonicalRow, keys: &[&str], score: i32) -> Option<FieldMatch> {
    row.iter()
        .find(|(key, _)| keys.contains(key))
        .map(|(key, cell)| FieldMatch {
            key: Some(key.to_string()),
            value: coerce(cell),
            score,
            provenance: Provenance::Fallback,
        })
}

/// Scale into 0..=1
fn normalize_unit(value: f64, max: f64) -> f64 {
    (value / max).clamp(0.0, 1.0)
}
