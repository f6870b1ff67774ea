//! Query endpoint with grounded, cited answers

use axum::{extract::State, Json};
use chrono::Utc;
use std::time::Instant;

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{QueryRequest, QueryResponse};

/// POST /api/query - Answer a question with resolved citations
pub async fn query_rag(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    let start = Instant::now();
    request.validate()?;

    let outcome = state
        .new_cycle()
        .run(state.llm_provider().as_ref(), &request.question)
        .await?;

    let response = QueryResponse {
        cycle_id: outcome.cycle_id,
        answer: outcome.answer.text,
        sources: outcome.sources,
        resolved_markers: outcome.resolved_markers,
        unresolved_markers: outcome.unresolved_markers,
        grounding_references: request
            .include_references
            .then_some(outcome.grounding_references),
        processing_time_ms: start.elapsed().as_millis() as u64,
        completed_at: Utc::now(),
    };

    if !response.fully_cited() {
        tracing::warn!(
            cycle_id = %response.cycle_id,
            "Answer returned with {} unresolved citation(s)",
            response.unresolved_markers.len()
        );
    }

    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RagConfig;
    use crate::error::Error;
    use crate::providers::llm::MockLlmProvider;
    use crate::types::{DraftResponse, GroundingReference};
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(provider: MockLlmProvider) -> Router {
        let state = AppState::with_provider(RagConfig::default(), Arc::new(provider));
        Router::new()
            .nest("/api", crate::server::routes::api_routes())
            .with_state(state)
    }

    fn provider_returning(initial: DraftResponse, formatted: DraftResponse) -> MockLlmProvider {
        let mut provider = MockLlmProvider::new();
        provider.expect_name().return_const("mock".to_string());
        provider.expect_model().return_const("mock-model".to_string());
        provider
            .expect_search_and_answer()
            .returning(move |_| Ok(initial.clone()));
        provider
            .expect_format_citations()
            .returning(move |_| Ok(formatted.clone()));
        provider
    }

    fn post_query(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/query")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_query_returns_cited_answer() {
        let provider = provider_returning(
            DraftResponse::with_references(
                "Draft",
                vec![GroundingReference::new("gs://bucket/doc1.pdf", 0).with_title("doc1")],
            ),
            DraftResponse::new("See [[uri_1]] for details."),
        );

        let response = app(provider)
            .oneshot(post_query(
                r#"{"question": "Where are the details?", "include_references": true}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["answer"], "See [gs://bucket/doc1.pdf] for details.");
        assert_eq!(body["sources"][0]["key"], "uri_1");
        assert_eq!(body["sources"][0]["uri"], "gs://bucket/doc1.pdf");
        assert_eq!(body["sources"][0]["title"], "doc1");
        assert_eq!(body["resolved_markers"], 1);
        assert!(body.get("unresolved_markers").is_none());
        assert_eq!(body["grounding_references"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_query_rejects_blank_question() {
        let mut provider = MockLlmProvider::new();
        provider.expect_search_and_answer().never();

        let response = app(provider).oneshot(post_query(r#"{"question": "  "}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_bad_gateway() {
        let mut provider = MockLlmProvider::new();
        provider.expect_name().return_const("mock".to_string());
        provider.expect_model().return_const("mock-model".to_string());
        provider
            .expect_search_and_answer()
            .returning(|_| Err(Error::upstream("quota exceeded")));

        let response = app(provider)
            .oneshot(post_query(r#"{"question": "anything?"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["type"], "upstream_generation_error");
    }

    #[tokio::test]
    async fn test_unresolved_markers_are_reported_not_failed() {
        let provider = provider_returning(
            DraftResponse::new("Draft"),
            DraftResponse::new("See [[uri_1]] for details."),
        );

        let response = app(provider)
            .oneshot(post_query(r#"{"question": "details?"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["answer"], "See [[uri_1]] for details.");
        assert_eq!(body["unresolved_markers"][0], "uri_1");
        assert!(body.get("grounding_references").is_none());
    }
}
