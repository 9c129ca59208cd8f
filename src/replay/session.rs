//! Per-connection stream sessions
//!
//! Each session is one tokio task with its own cursor and ticker. Readings
//! are pushed over a bounded channel; the transport layer only ever sees the
//! receiving end, so the scheduling is testable without a socket.

use super::ReplayState;
use crate::loader::ReadingCache;
use crate::models::NormalizedReading;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::debug;

/// Why a session stopped emitting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Non-looping session reached the end of the cache
    Completed,
    /// Replay was disabled globally
    Disabled,
    /// The receiving side went away
    Disconnected,
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEnd::Completed => write!(f, "end of cache"),
            SessionEnd::Disabled => write!(f, "replay disabled"),
            SessionEnd::Disconnected => write!(f, "client disconnected"),
        }
    }
}

/// Parameters for one session
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub interval: Duration,
    pub looping: bool,
    pub channel_capacity: usize,
}

/// A running replay session
#[derive(Debug)]
pub struct StreamSession {
    id: u64,
    interval: Duration,
    state: Arc<ReplayState>,
    events: mpsc::Receiver<NormalizedReading>,
    handle: JoinHandle<SessionEnd>,
    finished: bool,
}

impl StreamSession {
    pub(crate) fn spawn(
        id: u64,
        cache: ReadingCache,
        state: Arc<ReplayState>,
        options: SessionOptions,
    ) -> Self {
        let (tx, events) = mpsc::channel(options.channel_capacity.max(1));

        debug!(
            "Stream session {} opened: {} readings every {:?}, loop={}",
            id,
            cache.len(),
            options.interval,
            options.looping
        );

        let task_state = Arc::clone(&state);
        let handle = tokio::spawn(async move {
            let end = run_session(cache, task_state, options, tx).await;
            debug!("Stream session {} closed: {}", id, end);
            end
        });

        Self {
            id,
            interval: options.interval,
            state,
            events,
            handle,
            finished: false,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Effective emission interval after the floor was applied
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait for the next emitted reading; `None` once the session has ended.
    ///
    /// Readings still queued when replay is disabled are discarded.
    pub async fn next_reading(&mut self) -> Option<NormalizedReading> {
        if self.finished {
            return None;
        }

        let reading = match self.events.recv().await {
            Some(reading) if self.state.is_enabled() => Some(reading),
            _ => None,
        };
        if reading.is_none() {
            self.finished = true;
            self.events.close();
        }
        reading
    }

    /// Disconnect (if still running) and wait for the task to finish
    pub async fn close(self) -> crate::Result<SessionEnd> {
        drop(self.events);
        Ok(self.handle.await?)
    }
}

async fn run_session(
    cache: ReadingCache,
    state: Arc<ReplayState>,
    options: SessionOptions,
    tx: mpsc::Sender<NormalizedReading>,
) -> SessionEnd {
    let mut ticker = interval(options.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut cursor = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tx.closed() => return closed_reason(&state),
        }

        if !state.is_enabled() {
            return SessionEnd::Disabled;
        }

        // wait for room before checking the switch again, so a slow client
        // never receives a reading produced after a stop
        let Ok(permit) = tx.reserve().await else {
            return closed_reason(&state);
        };
        if !state.is_enabled() {
            return SessionEnd::Disabled;
        }

        let Some(reading) = cache.get(cursor) else {
            return SessionEnd::Completed;
        };
        permit.send(reading.clone());

        cursor += 1;
        if cursor >= cache.len() {
            if !options.looping {
                return SessionEnd::Completed;
            }
            cursor = 0;
        }
    }
}

/// The receiver closes itself once it sees replay disabled
fn closed_reason(state: &ReplayState) -> SessionEnd {
    if state.is_enabled() {
        SessionEnd::Disconnected
    } else {
        SessionEnd::Disabled
    }
}
