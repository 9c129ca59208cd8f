//! Request handlers for the replay API

use super::{AppState, error::ApiError};
use crate::constants::READING_EVENT;
use crate::models::NormalizedReading;
use crate::replay::{ReloadSummary, ReplayStatus};
use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::Uri,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// Successful response body: `ok: true` plus the payload's fields
#[derive(Debug, Serialize)]
pub struct Ack<T> {
    ok: bool,
    #[serde(flatten)]
    body: T,
}

impl<T> Ack<T> {
    fn new(body: T) -> Json<Self> {
        Json(Self { ok: true, body })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    enabled: bool,
    interval_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct StopResponse {
    enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct NextResponse {
    reading: NormalizedReading,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    uptime_secs: u64,
}

pub async fn status_handler(State(state): State<AppState>) -> Json<Ack<ReplayStatus>> {
    Ack::new(state.controller.status().await)
}

/// Body is optional and read leniently: `intervalMs` may be a number or a
/// numeric string; anything else leaves the interval unchanged.
pub async fn start_handler(State(state): State<AppState>, body: Bytes) -> Json<Ack<StartResponse>> {
    let interval_ms = state.controller.start(requested_interval(&body));
    Ack::new(StartResponse {
        enabled: true,
        interval_ms,
    })
}

pub async fn stop_handler(State(state): State<AppState>) -> Json<Ack<StopResponse>> {
    state.controller.stop();
    Ack::new(StopResponse { enabled: false })
}

pub async fn stream_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let interval_ms = params.get("intervalMs").and_then(|v| query_interval(v));
    let looping = params.get("loop").map(|v| v.trim()) != Some("0");

    let session = state.controller.open_stream(interval_ms, looping).await?;

    // dropping the response drops the session, which ends its task
    let readings = stream::unfold(session, |mut session| async move {
        let reading = session.next_reading().await?;
        let event = Event::default().event(READING_EVENT).json_data(&reading);
        Some((event, session))
    });

    Ok(Sse::new(readings).keep_alive(KeepAlive::new().interval(state.keep_alive)))
}

pub async fn next_handler(State(state): State<AppState>) -> Result<Json<Ack<NextResponse>>, ApiError> {
    let reading = state.controller.next_reading().await?;
    Ok(Ack::new(NextResponse { reading }))
}

pub async fn reload_handler(State(state): State<AppState>) -> Result<Json<Ack<ReloadSummary>>, ApiError> {
    let summary = state.controller.reload().await?;
    Ok(Ack::new(summary))
}

pub async fn health_handler(State(state): State<AppState>) -> Json<Ack<HealthResponse>> {
    Ack::new(HealthResponse {
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

pub async fn root_handler(State(state): State<AppState>) -> String {
    format!(
        "sensor-replay {}: GET {}/status for replay state",
        env!("CARGO_PKG_VERSION"),
        state.route_prefix
    )
}

pub async fn fallback_handler(uri: Uri) -> ApiError {
    ApiError::NotFound {
        path: uri.path().to_string(),
    }
}

/// `intervalMs` from a start body
fn requested_interval(body: &[u8]) -> Option<f64> {
    let value: Value = serde_json::from_slice(body).ok()?;
    match value.get("intervalMs")? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `intervalMs` from a query string; non-numeric values mean "use the default"
fn query_interval(raw: &str) -> Option<u64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|ms| ms.is_finite())
        .map(|ms| ms.max(0.0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requested_interval() {
        assert_eq!(requested_interval(br#"{"intervalMs": 500}"#), Some(500.0));
        assert_eq!(requested_interval(br#"{"intervalMs": "750"}"#), Some(750.0));
        assert_eq!(requested_interval(br#"{"intervalMs": "fast"}"#), None);
        assert_eq!(requested_interval(br#"{"intervalMs": null}"#), None);
        assert_eq!(requested_interval(br#"{}"#), None);
        assert_eq!(requested_interval(b""), None);
        assert_eq!(requested_interval(b"not json"), None);
    }

    #[test]
    fn test_query_interval() {
        assert_eq!(query_interval("1000"), Some(1000));
        assert_eq!(query_interval(" 300.9 "), Some(300));
        assert_eq!(query_interval("-20"), Some(0));
        assert_eq!(query_interval("abc"), None);
        assert_eq!(query_interval(""), None);
        assert_eq!(query_interval("NaN"), None);
    }

    #[test]
    fn test_ack_flattens_payload() {
        let Json(ack) = Ack::new(StartResponse {
            enabled: true,
            interval_ms: 500,
        });
        let json = serde_json::to_value(&ack).unwrap();

        assert_eq!(json, serde_json::json!({"ok": true, "enabled": true, "intervalMs": 500}));
    }
}
