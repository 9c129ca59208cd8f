//! Integration tests for the replay HTTP API
//!
//! Each test binds the router on an ephemeral port and drives it with a real
//! HTTP client, the way the dashboard does.

use reqwest::StatusCode;
use sensor_replay::config::{ReplayConfig, ServerConfig};
use sensor_replay::loader::DatasetLoader;
use sensor_replay::replay::ReplayController;
use sensor_replay::server;
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;

const AIR_EXPORT: &str = "timestamp;PM2.5;Temp(°C)\n\
                          2024-01-01T00:01:00Z;20;21,0\n\
                          2024-01-01T00:00:00Z;10;20,5\n";

/// Start a server over `data_dir` and return its base URL
async fn spawn_app(data_dir: &Path) -> String {
    let loader = DatasetLoader::new(vec![data_dir.to_path_buf()]);
    let outcome = loader.load();
    let controller = Arc::new(
        ReplayController::new(outcome.cache, ReplayConfig::default()).with_loader(loader),
    );
    let app = server::router(controller, &ServerConfig::default());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(server::serve(listener, app, std::future::pending()));

    format!("http://{address}")
}

async fn app_with_data() -> (TempDir, String) {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("air.csv"), AIR_EXPORT).unwrap();
    let base = spawn_app(temp_dir.path()).await;
    (temp_dir, base)
}

async fn get_json(url: &str) -> (StatusCode, Value) {
    let response = reqwest::get(url).await.unwrap();
    let status = response.status();
    (status, response.json().await.unwrap())
}

async fn post_json(url: &str, body: Option<Value>) -> (StatusCode, Value) {
    let client = reqwest::Client::new();
    let request = match body {
        Some(body) => client.post(url).json(&body),
        None => client.post(url),
    };
    let response = request.send().await.unwrap();
    let status = response.status();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn test_status_reports_cache_and_switch() {
    let (_dir, base) = app_with_data().await;

    let (status, body) = get_json(&format!("{base}/api/realtime/status")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"ok": true, "enabled": false, "intervalMs": 2000, "cacheSize": 2})
    );
}

#[tokio::test]
async fn test_stream_on_empty_cache_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let base = spawn_app(&temp_dir.path().join("missing")).await;

    post_json(&format!("{base}/api/realtime/start"), None).await;
    let (status, body) = get_json(&format!("{base}/api/realtime/stream")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"], "no data in cache");
    assert_eq!(body["reason"], "no_data");

    let (status, _) = get_json(&format!("{base}/api/realtime/next")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stream_while_disabled_is_conflict() {
    let (_dir, base) = app_with_data().await;

    let (status, body) = get_json(&format!("{base}/api/realtime/stream")).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "stream disabled");
    assert_eq!(body["reason"], "stream_disabled");
}

#[tokio::test]
async fn test_start_and_stop() {
    let (_dir, base) = app_with_data().await;

    let (status, body) = post_json(
        &format!("{base}/api/realtime/start"),
        Some(json!({"intervalMs": 500})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true, "enabled": true, "intervalMs": 500}));

    // below the floor: ignored
    let (_, body) = post_json(
        &format!("{base}/api/realtime/start"),
        Some(json!({"intervalMs": 100})),
    )
    .await;
    assert_eq!(body["intervalMs"], 500);

    let (_, body) = post_json(&format!("{base}/api/realtime/start"), None).await;
    assert_eq!(body["intervalMs"], 500);

    let (status, body) = post_json(&format!("{base}/api/realtime/stop"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true, "enabled": false}));

    let (_, body) = get_json(&format!("{base}/api/realtime/status")).await;
    assert_eq!(body["enabled"], false);
    assert_eq!(body["intervalMs"], 500);
}

#[tokio::test]
async fn test_stream_emits_readings_in_time_order() {
    let (_dir, base) = app_with_data().await;
    post_json(&format!("{base}/api/realtime/start"), None).await;

    let response = reqwest::get(format!("{base}/api/realtime/stream?intervalMs=250&loop=0"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream")
    );

    // a non-looping stream ends after the last reading
    let text = response.text().await.unwrap();
    assert_eq!(text.matches("event: reading").count(), 2);

    let readings: Vec<Value> = text
        .lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .map(|data| serde_json::from_str(data).unwrap())
        .collect();

    assert_eq!(readings.len(), 2);
    assert_eq!(readings[0]["ts"], "2024-01-01T00:00:00.000Z");
    assert_eq!(readings[0]["air"]["pm25"], 10.0);
    assert_eq!(readings[0]["air"]["temp"], 20.5);
    assert_eq!(readings[0]["soil"]["temp"], 15.5);
    assert_eq!(readings[0]["_meta"]["datasetKind"], "air");
    assert_eq!(readings[0]["_meta"]["provenance"]["soil.temp"], "proxy");
    assert_eq!(readings[1]["air"]["pm25"], 20.0);
}

#[tokio::test]
async fn test_next_wraps_around() {
    let (_dir, base) = app_with_data().await;

    let mut seen = Vec::new();
    for _ in 0..3 {
        let (status, body) = get_json(&format!("{base}/api/realtime/next")).await;
        assert_eq!(status, StatusCode::OK);
        seen.push(body["reading"]["air"]["pm25"].as_f64().unwrap());
    }

    assert_eq!(seen, vec![10.0, 20.0, 10.0]);
}

#[tokio::test]
async fn test_reload_picks_up_new_files() {
    let (dir, base) = app_with_data().await;
    fs::write(dir.path().join("water.tsv"), "pH\tTurbidity\n7.1\t2\n").unwrap();

    let (status, body) = post_json(&format!("{base}/api/realtime/reload"), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["cacheSize"], 3);
    assert_eq!(body["filesLoaded"], 2);
    assert_eq!(body["filesFailed"], 0);

    let (_, body) = get_json(&format!("{base}/api/realtime/status")).await;
    assert_eq!(body["cacheSize"], 3);
}

#[tokio::test]
async fn test_health_root_and_fallback() {
    let (_dir, base) = app_with_data().await;

    let (status, body) = get_json(&format!("{base}/healthz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert!(body["uptimeSecs"].is_u64());

    let banner = reqwest::get(format!("{base}/")).await.unwrap().text().await.unwrap();
    assert!(banner.contains("/api/realtime/status"));

    let (status, body) = get_json(&format!("{base}/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not found");
    assert_eq!(body["path"], "/nope");
}
