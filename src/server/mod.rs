//! HTTP surface of the replay service
//!
//! Replay routes are nested under the configured prefix (`/api/realtime` by
//! default); `/` and `/healthz` sit at the root. Every handler receives the
//! shared [`ReplayController`] through [`AppState`].

pub mod error;
pub mod routes;

pub use self::error::ApiError;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::replay::ReplayController;
use axum::{
    Router,
    http::{HeaderValue, Method, header::CONTENT_TYPE},
    routing::{get, post},
};
use routes::{
    fallback_handler, health_handler, next_handler, reload_handler, root_handler, start_handler,
    status_handler, stop_handler, stream_handler,
};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<ReplayController>,
    pub started_at: Instant,
    pub keep_alive: Duration,
    pub route_prefix: String,
}

pub fn router(controller: Arc<ReplayController>, config: &ServerConfig) -> Router {
    let state = AppState {
        controller,
        started_at: Instant::now(),
        keep_alive: config.keep_alive(),
        route_prefix: config.route_prefix.trim_end_matches('/').to_string(),
    };

    let api = Router::new()
        .route("/status", get(status_handler))
        .route("/start", post(start_handler))
        .route("/stop", post(stop_handler))
        .route("/stream", get(stream_handler))
        .route("/next", get(next_handler))
        .route("/reload", post(reload_handler));

    let app = Router::new()
        .route("/", get(root_handler))
        .route("/healthz", get(health_handler));

    let app = if state.route_prefix.is_empty() {
        app.merge(api)
    } else {
        app.nest(&state.route_prefix, api)
    };

    app.fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(config))
        .with_state(state)
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    match config.cors_origin.as_deref().map(str::trim) {
        None | Some("*") => cors.allow_origin(Any),
        Some(origin) => match HeaderValue::from_str(origin) {
            Ok(origin) => cors.allow_origin(origin),
            Err(_) => {
                warn!("Invalid CORS origin {:?}, allowing any origin", origin);
                cors.allow_origin(Any)
            }
        },
    }
}

/// Serve until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(address) = listener.local_addr() {
        info!("Server running on {address}");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server shut down");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received SIGTERM, shutting down");
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
