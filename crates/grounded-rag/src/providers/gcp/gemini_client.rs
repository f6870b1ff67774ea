//! Gemini client for both generation passes via Vertex AI
//!
//! The search pass attaches the Vertex AI Search data store as a retrieval
//! tool and returns the grounding metadata untouched. The formatting pass
//! sends no tools.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use super::auth::GcpAuth;
use crate::citation::GroundingExtractor;
use crate::config::{GcpConfig, LlmConfig};
use crate::error::{Error, Result};
use crate::generation::PromptBuilder;
use crate::providers::llm::LlmProvider;
use crate::types::{DraftResponse, FormattingContext};

/// Gemini client via Vertex AI
pub struct GeminiClient {
    auth: Arc<GcpAuth>,
    http: reqwest::Client,
    location: String,
    data_store_id: String,
    search_model: String,
    formatting_model: String,
    llm: LlmConfig,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(auth: Arc<GcpAuth>, gcp: &GcpConfig, llm: &LlmConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(llm.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            auth,
            http,
            location: gcp.location.clone(),
            data_store_id: gcp.data_store_id.clone(),
            search_model: gcp.search_model.clone(),
            formatting_model: gcp.formatting_model.clone(),
            llm: llm.clone(),
        })
    }

    /// Get the API endpoint URL for `model`
    fn endpoint(&self, model: &str) -> String {
        let host = if self.location == "global" {
            "aiplatform.googleapis.com".to_string()
        } else {
            format!("{}-aiplatform.googleapis.com", self.location)
        };
        format!(
            "https://{}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
            host,
            self.auth.project_id(),
            self.location,
            model
        )
    }

    fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            temperature: self.llm.temperature,
            max_output_tokens: self.llm.max_output_tokens,
            top_p: self.llm.top_p,
        }
    }

    /// Send one `generateContent` call with retry and exponential backoff
    async fn generate(&self, model: &str, request: &GenerateRequest) -> Result<DraftResponse> {
        let url = self.endpoint(model);
        let mut last_error = None;

        for attempt in 0..=self.llm.max_retries {
            match self.try_generate(&url, request).await {
                Ok(body) => return parse_generate_response(body),
                Err(CallError::Permanent(e)) => return Err(e),
                Err(CallError::Transient(e)) => {
                    if attempt < self.llm.max_retries {
                        let delay = backoff_delay(attempt);
                        tracing::warn!(
                            "Gemini request failed (attempt {}/{}): {}; retrying in {:?}",
                            attempt + 1,
                            self.llm.max_retries + 1,
                            e,
                            delay
                        );
                        sleep(delay).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::upstream("Gemini request failed")))
    }

    async fn try_generate(
        &self,
        url: &str,
        request: &GenerateRequest,
    ) -> std::result::Result<Value, CallError> {
        let bearer = self.auth.bearer().await.map_err(CallError::Permanent)?;

        let response = self
            .http
            .post(url)
            .header(reqwest::header::AUTHORIZATION, bearer)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                CallError::Transient(Error::upstream(format!("Gemini request failed: {}", e)))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = Error::upstream(format!("Gemini generation failed ({}): {}", status, body));
            return Err(if status.is_server_error() || status.as_u16() == 429 {
                CallError::Transient(err)
            } else {
                CallError::Permanent(err)
            });
        }

        response.json::<Value>().await.map_err(|e| {
            CallError::Permanent(Error::upstream(format!(
                "Failed to parse Gemini response: {}",
                e
            )))
        })
    }
}

/// Upper bound on the wait between two attempts
const MAX_BACKOFF_SECS: u64 = 60;

/// 1s, 2s, 4s, ... capped at `MAX_BACKOFF_SECS`
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(2u64.saturating_pow(attempt).min(MAX_BACKOFF_SECS))
}

enum CallError {
    /// Worth another attempt (transport error, 429, 5xx)
    Transient(Error),
    Permanent(Error),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    system_instruction: SystemInstruction,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct Tool {
    retrieval: Retrieval,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Retrieval {
    vertex_ai_search: VertexAiSearch,
}

#[derive(Debug, Serialize)]
struct VertexAiSearch {
    datastore: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    top_p: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateRequest {
    fn new(system: &str, user_text: String, tools: Vec<Tool>, config: GenerationConfig) -> Self {
        Self {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part { text: user_text }],
            }],
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: system.to_string(),
                }],
            },
            tools,
            generation_config: config,
        }
    }
}

fn search_tool(data_store_id: &str) -> Tool {
    Tool {
        retrieval: Retrieval {
            vertex_ai_search: VertexAiSearch {
                datastore: data_store_id.to_string(),
            },
        },
    }
}

/// First candidate's text parts joined, plus its raw grounding metadata
fn parse_generate_response(body: Value) -> Result<DraftResponse> {
    let grounding_metadata = GroundingExtractor::candidate_metadata(&body).cloned();

    let response: GenerateResponse = serde_json::from_value(body)
        .map_err(|e| Error::upstream(format!("Unexpected Gemini response shape: {}", e)))?;

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::upstream("No candidates in Gemini response"))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(Error::upstream("No text in Gemini response"));
    }

    Ok(DraftResponse::with_metadata(text, grounding_metadata))
}

#[async_trait]
impl LlmProvider for GeminiClient {
    async fn search_and_answer(&self, question: &str) -> Result<DraftResponse> {
        let request = GenerateRequest::new(
            PromptBuilder::search_instruction(),
            question.to_string(),
            vec![search_tool(&self.data_store_id)],
            self.generation_config(),
        );
        self.generate(&self.search_model, &request).await
    }

    async fn format_citations(&self, context: &FormattingContext) -> Result<DraftResponse> {
        let request = GenerateRequest::new(
            PromptBuilder::formatting_instruction(),
            PromptBuilder::build_formatting_prompt(context),
            Vec::new(),
            self.generation_config(),
        );
        self.generate(&self.formatting_model, &request).await
    }

    async fn health_check(&self) -> Result<bool> {
        self.auth.get_token().await.map(|_| true)
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.search_model
    }
}
