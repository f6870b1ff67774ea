//! HTTP server for the grounded RAG service

pub mod routes;
pub mod state;

use axum::{routing::get, Router};
use std::net::SocketAddr;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::RagConfig;
use crate::error::{Error, Result};
use state::AppState;

/// Grounded RAG HTTP server
pub struct RagServer {
    config: RagConfig,
    state: AppState,
}

impl RagServer {
    /// Create a new server with the Gemini provider from `config`
    pub async fn new(config: RagConfig) -> Result<Self> {
        let state = AppState::new(config.clone()).await?;
        Ok(Self { config, state })
    }

    /// Create a server around prepared state
    pub fn with_state(config: RagConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let router = Router::new()
            .route("/health", get(health_check))
            .route("/ready", get(readiness))
            .nest("/api", routes::api_routes())
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http());

        if self.config.server.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            router.layer(cors)
        } else {
            router
        }
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        let router = self.build_router();

        tracing::info!("Starting grounded RAG server on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> String {
        self.config.address()
    }
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Readiness check endpoint: the provider must answer its health check
async fn readiness(state: axum::extract::State<AppState>) -> axum::http::StatusCode {
    if state.refresh_readiness().await {
        axum::http::StatusCode::OK
    } else {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::llm::MockLlmProvider;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    fn server(provider: MockLlmProvider) -> RagServer {
        let config = RagConfig::default();
        let state = AppState::with_provider(config.clone(), Arc::new(provider));
        RagServer::with_state(config, state)
    }

    async fn ready_status(provider: MockLlmProvider) -> StatusCode {
        server(provider)
            .build_router()
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_health() {
        let response = server(MockLlmProvider::new())
            .build_router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_ready_when_provider_is_healthy() {
        let mut provider = MockLlmProvider::new();
        provider.expect_health_check().times(1).returning(|| Ok(true));
        assert_eq!(ready_status(provider).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_not_ready_when_provider_check_fails() {
        let mut provider = MockLlmProvider::new();
        provider.expect_name().return_const("mock".to_string());
        provider
            .expect_health_check()
            .returning(|| Err(Error::Auth("invalid_grant".to_string())));
        assert_eq!(ready_status(provider).await, StatusCode::SERVICE_UNAVAILABLE);

        let mut provider = MockLlmProvider::new();
        provider.expect_health_check().returning(|| Ok(false));
        assert_eq!(ready_status(provider).await, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_state_requires_gcp_config() {
        let err = AppState::new(RagConfig::default()).await.err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }
}
