//! Replay tests on tokio's paused clock


use crate::config::ReplayConfig;
use crate::loader::ReadingCache;
use crate::models::{
    AirReading, DatasetKind, NormalizedReading, ReadingMeta, SoilReading, TimestampSource,
    WaterReading,
};
use crate::replay::ReplayController;
use chrono::{TimeZone, Utc};

/// Reading whose `air.pm25` carries its position in the cache
pub fn reading(index: usize) -> NormalizedReading {
    NormalizedReading {
        timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
            + chrono::Duration::minutes(index as i64),
        air: AirReading {
            pm25: Some(index as f64),
            ..Default::default()
        },
        water: WaterReading::default(),
        soil: SoilReading::default(),
        meta: ReadingMeta {
            dataset_kind: DatasetKind::Air,
            is_air: true,
            timestamp_source: TimestampSource::Column,
            provenance: Default::default(),
        },
    }
}

pub fn sample_cache(len: usize) -> ReadingCache {
    ReadingCache::new((0..len).map(reading).collect())
}

pub fn controller(len: usize) -> ReplayController {
    ReplayController::new(sample_cache(len), ReplayConfig::default())
}

pub fn position(reading: &NormalizedReading) -> usize {
    reading.air.pm25.unwrap() as usize
}
