//! Error types for the grounded RAG pipeline

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Citation key was never allocated in this cycle
    #[error("Unknown citation key: {0}")]
    UnknownCitationKey(String),

    /// Grounding structure in a model response could not be read
    #[error("Malformed grounding metadata: {0}")]
    MalformedGroundingMetadata(String),

    /// The external generation service failed
    #[error("Upstream generation failed: {0}")]
    UpstreamGeneration(String),

    /// Credential or token exchange error
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Pipeline stage invoked out of order
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    /// Invalid request from the caller
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an upstream generation error
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::UpstreamGeneration(message.into())
    }

    /// Create a malformed grounding metadata error
    pub fn malformed_grounding(message: impl Into<String>) -> Self {
        Self::MalformedGroundingMetadata(message.into())
    }

    /// Create a pipeline error
    pub fn pipeline(message: impl Into<String>) -> Self {
        Self::Pipeline(message.into())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            Error::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error", msg.clone()),
            Error::UnknownCitationKey(key) => (
                StatusCode::NOT_FOUND,
                "unknown_citation_key",
                format!("Unknown citation key: {}", key),
            ),
            Error::MalformedGroundingMetadata(msg) => (
                StatusCode::BAD_GATEWAY,
                "malformed_grounding",
                msg.clone(),
            ),
            Error::UpstreamGeneration(msg) => {
                (StatusCode::BAD_GATEWAY, "upstream_generation_error", msg.clone())
            }
            Error::Auth(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "auth_error", msg.clone()),
            Error::Pipeline(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "pipeline_error", msg.clone())
            }
            Error::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            Error::Io(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "io_error",
                err.to_string(),
            ),
            Error::Json(err) => (StatusCode::BAD_REQUEST, "json_error", err.to_string()),
            Error::Http(err) => (StatusCode::BAD_GATEWAY, "http_error", err.to_string()),
            Error::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg.clone())
            }
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_maps_to_bad_gateway() {
        let response = Error::upstream("timeout").into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_invalid_request_maps_to_bad_request() {
        let response = Error::InvalidRequest("empty question".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
