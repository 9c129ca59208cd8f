//! Replay controller
//!
//! Owns the reading cache and the process-wide replay switch. Handlers get
//! the controller injected through router state; nothing here is global.
//!
//! The enabled flag and default interval are atomics shared with every
//! running [`StreamSession`], which re-reads the flag on each tick. The cache
//! is swapped wholesale on reload; sessions keep the snapshot they opened
//! with.

pub mod session;

#[cfg(test)]
pub mod tests;

pub use self::session::{SessionEnd, SessionOptions, StreamSession};

use crate::config::ReplayConfig;
use crate::error::{ReplayError, Result};
use crate::loader::{DatasetLoader, ReadingCache};
use crate::models::NormalizedReading;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::info;

/// State shared between the controller and its sessions
#[derive(Debug)]
pub struct ReplayState {
    enabled: AtomicBool,
    interval_ms: AtomicU64,
}

impl ReplayState {
    fn new(interval_ms: u64) -> Self {
        Self {
            enabled: AtomicBool::new(false),
            interval_ms: AtomicU64::new(interval_ms),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms.load(Ordering::SeqCst)
    }
}

/// Snapshot reported by `status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayStatus {
    pub enabled: bool,
    pub interval_ms: u64,
    pub cache_size: usize,
}

/// Result of a reload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReloadSummary {
    pub cache_size: usize,
    pub files_loaded: usize,
    pub files_failed: usize,
    pub data_dir: Option<PathBuf>,
    pub warning: Option<String>,
}

#[derive(Debug)]
pub struct ReplayController {
    config: ReplayConfig,
    state: Arc<ReplayState>,
    cache: RwLock<ReadingCache>,
    poll_cursor: AtomicUsize,
    next_session_id: AtomicU64,
    loader: Option<DatasetLoader>,
}

impl ReplayController {
    /// Create a disabled controller over an already loaded cache
    pub fn new(cache: ReadingCache, config: ReplayConfig) -> Self {
        let default_interval = config.default_interval_ms.max(config.min_interval_ms);
        Self {
            state: Arc::new(ReplayState::new(default_interval)),
            config,
            cache: RwLock::new(cache),
            poll_cursor: AtomicUsize::new(0),
            next_session_id: AtomicU64::new(1),
            loader: None,
        }
    }

    /// Loader used by [`ReplayController::reload`]
    pub fn with_loader(mut self, loader: DatasetLoader) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn state(&self) -> Arc<ReplayState> {
        Arc::clone(&self.state)
    }

    pub fn is_enabled(&self) -> bool {
        self.state.is_enabled()
    }

    pub async fn cache(&self) -> ReadingCache {
        self.cache.read().await.clone()
    }

    pub async fn status(&self) -> ReplayStatus {
        ReplayStatus {
            enabled: self.state.is_enabled(),
            interval_ms: self.state.interval_ms(),
            cache_size: self.cache.read().await.len(),
        }
    }

    /// Enable replay, adopting `requested_interval_ms` when it is a finite
    /// number at or above the floor. Returns the effective interval.
    pub fn start(&self, requested_interval_ms: Option<f64>) -> u64 {
        let floor = self.config.min_interval_ms as f64;
        if let Some(ms) = requested_interval_ms.filter(|ms| ms.is_finite() && *ms >= floor) {
            self.state.interval_ms.store(ms as u64, Ordering::SeqCst);
        }
        self.state.enabled.store(true, Ordering::SeqCst);

        let interval_ms = self.state.interval_ms();
        info!("Replay enabled, interval {}ms", interval_ms);
        interval_ms
    }

    /// Disable replay; open sessions end on their next tick
    pub fn stop(&self) {
        self.state.enabled.store(false, Ordering::SeqCst);
        info!("Replay disabled");
    }

    /// Interval for a session, never below the floor
    pub fn effective_interval(&self, requested_interval_ms: Option<u64>) -> Duration {
        let ms = requested_interval_ms
            .unwrap_or_else(|| self.state.interval_ms())
            .max(self.config.min_interval_ms);
        Duration::from_millis(ms)
    }

    /// Open a push session over the current cache
    pub async fn open_stream(
        &self,
        requested_interval_ms: Option<u64>,
        looping: bool,
    ) -> Result<StreamSession> {
        let cache = self.cache().await;
        if cache.is_empty() {
            return Err(ReplayError::NoData);
        }
        if !self.state.is_enabled() {
            return Err(ReplayError::StreamDisabled);
        }

        let options = SessionOptions {
            interval: self.effective_interval(requested_interval_ms),
            looping,
            channel_capacity: self.config.channel_capacity,
        };
        let id = self.next_session_id.fetch_add(1, Ordering::SeqCst);

        Ok(StreamSession::spawn(id, cache, self.state(), options))
    }

    /// Next reading from the shared polling cursor, wrapping at the end
    pub async fn next_reading(&self) -> Result<NormalizedReading> {
        let cache = self.cache.read().await;
        let len = cache.len();
        if len == 0 {
            return Err(ReplayError::NoData);
        }

        let previous = match self.poll_cursor.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| {
            Some((c % len + 1) % len)
        }) {
            Ok(previous) | Err(previous) => previous,
        };

        cache.get(previous % len).cloned().ok_or(ReplayError::NoData)
    }

    /// Swap in a new cache and reset the polling cursor
    pub async fn replace_cache(&self, cache: ReadingCache) {
        let size = cache.len();
        *self.cache.write().await = cache;
        self.poll_cursor.store(0, Ordering::SeqCst);
        info!("Cache replaced, {} readings", size);
    }

    /// Re-run the loader off the async threads and replace the cache
    pub async fn reload(&self) -> Result<ReloadSummary> {
        let loader = self.loader.as_ref().ok_or_else(|| ReplayError::Configuration {
            message: "no dataset loader configured".to_string(),
        })?;

        let outcome = loader.load_async().await?;
        let summary = ReloadSummary {
            cache_size: outcome.cache.len(),
            files_loaded: outcome.stats.files_loaded,
            files_failed: outcome.stats.files_failed,
            data_dir: outcome.stats.data_dir,
            warning: outcome.stats.warning,
        };

        self.replace_cache(outcome.cache).await;
        Ok(summary)
    }
}
