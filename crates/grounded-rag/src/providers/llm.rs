//! LLM provider trait for the two generation passes

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{DraftResponse, FormattingContext};

/// Trait for grounded answer generation
///
/// Implementations:
/// - `GeminiClient`: Google Vertex AI (Gemini with Vertex AI Search grounding)
///
/// Implementations own their retry policy. Errors they return are surfaced
/// to the caller unchanged; the pipeline never retries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// First pass: answer `question` with corpus search enabled
    async fn search_and_answer(&self, question: &str) -> Result<DraftResponse>;

    /// Second pass: rewrite the draft with `[[key]]` markers
    async fn format_citations(&self, context: &FormattingContext) -> Result<DraftResponse>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
