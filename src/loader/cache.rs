//! Immutable, cheaply cloneable store of normalized readings

use crate::models::NormalizedReading;
use std::ops::Index;
use std::sync::Arc;

/// Ordered readings shared between the controller and replay sessions.
///
/// Cloning shares the underlying buffer, so a session keeps replaying the
/// snapshot it started with even if a reload swaps the controller's cache.
#[derive(Debug, Clone, Default)]
pub struct ReadingCache {
    readings: Arc<[NormalizedReading]>,
}

impl ReadingCache {
    /// Keep readings in the given order
    pub fn new(readings: Vec<NormalizedReading>) -> Self {
        Self {
            readings: readings.into(),
        }
    }

    /// Build a cache, optionally ordering by source timestamp.
    ///
    /// Rows with a timestamp column come first in ascending time order (ties
    /// keep load order); rows stamped at ingestion follow in load order.
    pub fn assemble(readings: Vec<NormalizedReading>, sort_by_timestamp: bool) -> Self {
        if !sort_by_timestamp {
            return Self::new(readings);
        }

        let (mut stamped, unstamped): (Vec<_>, Vec<_>) = readings
            .into_iter()
            .partition(NormalizedReading::has_source_timestamp);
        stamped.sort_by_key(|r| r.timestamp);
        stamped.extend(unstamped);
        Self::new(stamped)
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&NormalizedReading> {
        self.readings.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NormalizedReading> {
        self.readings.iter()
    }

    pub fn as_slice(&self) -> &[NormalizedReading] {
        &self.readings
    }
}

impl Index<usize> for ReadingCache {
    type Output = NormalizedReading;

    fn index(&self, index: usize) -> &Self::Output {
        &self.readings[index]
    }
}

impl<'a> IntoIterator for &'a ReadingCache {
    type Item = &'a NormalizedReading;
    type IntoIter = std::slice::Iter<'a, NormalizedReading>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
