use crate::error::ReplayError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("not found")]
    NotFound { path: String },

    #[error(transparent)]
    Replay(#[from] ReplayError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    ok: bool,
    error: String,
    reason: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Replay(ReplayError::NoData) => StatusCode::NOT_FOUND,
            ApiError::Replay(ReplayError::StreamDisabled) => StatusCode::CONFLICT,
            ApiError::Replay(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            ApiError::NotFound { .. } => "not_found",
            ApiError::Replay(e) => e.reason_code(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            debug!("Request rejected ({}): {}", status, self);
        }

        let body = ErrorBody {
            ok: false,
            error: self.to_string(),
            reason: self.reason(),
            path: match self {
                ApiError::NotFound { path } => Some(path),
                ApiError::Replay(_) => None,
            },
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::from(ReplayError::NoData).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(ReplayError::StreamDisabled).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(ReplayError::Configuration {
                message: "x".to_string()
            })
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::NotFound {
                path: "/nope".to_string()
            }
            .status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_reason_codes() {
        assert_eq!(ApiError::from(ReplayError::NoData).reason(), "no_data");
        assert_eq!(
            ApiError::from(ReplayError::StreamDisabled).reason(),
            "stream_disabled"
        );
        assert_eq!(ApiError::from(ReplayError::StreamDisabled).to_string(), "stream disabled");
    }
}
