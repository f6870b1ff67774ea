//! API routes for the grounded RAG server

pub mod query;

use axum::{
    routing::{get, post},
    Router,
};
use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Query
        .route("/query", post(query::query_rag))
        // Info
        .route("/info", get(info))
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "grounded-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Grounded document search with verifiable inline citations",
        "endpoints": {
            "POST /api/query": "Answer a question with [source] citations",
            "GET /api/info": "Service description",
            "GET /health": "Liveness",
            "GET /ready": "Readiness"
        },
        "features": {
            "grounded_answers": "Answers come from the Vertex AI Search data store only",
            "stable_citations": "Sources are masked as citation keys between passes and resolved afterwards",
            "visible_failures": "Citations that cannot be resolved stay in the answer verbatim"
        }
    }))
}
