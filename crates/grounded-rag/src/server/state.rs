//! Application state for the grounded RAG server

use parking_lot::RwLock;
use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::pipeline::PipelineOrchestrator;
use crate::providers::{
    gcp::{GcpAuth, GeminiClient},
    LlmProvider,
};

/// Shared application state
///
/// Holds only immutable, shareable handles. Each request builds its own
/// [`PipelineOrchestrator`] and therefore its own citation registry.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// LLM provider (Gemini)
    llm_provider: Arc<dyn LlmProvider>,
    /// Outcome of the last provider health check
    ready: RwLock<bool>,
}

impl AppState {
    /// Create state with the provider described by `config`
    pub async fn new(config: RagConfig) -> Result<Self> {
        let gcp_config = config.gcp.as_ref().ok_or_else(|| {
            Error::Config("gcp config is missing; set [gcp] in the config file".to_string())
        })?;

        tracing::info!("Initializing Gemini provider (project: {})", gcp_config.project_id);

        let auth = Arc::new(GcpAuth::from_service_account(
            &gcp_config.service_account_key_path,
            gcp_config.project_id.clone(),
        )?);
        let llm = Arc::new(GeminiClient::new(auth, gcp_config, &config.llm)?);

        tracing::info!("  - Search model: {}", gcp_config.search_model);
        tracing::info!("  - Formatting model: {}", gcp_config.formatting_model);
        tracing::info!("  - Data store: {}", gcp_config.data_store_id);

        Ok(Self::with_provider(config, llm))
    }

    /// Create state around an existing provider
    pub fn with_provider(config: RagConfig, llm_provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                llm_provider,
                ready: RwLock::new(false),
            }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Get the LLM provider
    pub fn llm_provider(&self) -> &Arc<dyn LlmProvider> {
        &self.inner.llm_provider
    }

    /// Fresh orchestrator for one query cycle
    pub fn new_cycle(&self) -> PipelineOrchestrator {
        PipelineOrchestrator::new(&self.inner.config.citation)
    }

    /// Result of the last readiness check
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    /// Ask the provider whether it can serve queries and remember the answer
    pub async fn refresh_readiness(&self) -> bool {
        let ready = match self.inner.llm_provider.health_check().await {
            Ok(healthy) => healthy,
            Err(e) => {
                tracing::warn!(
                    "Health check of {} failed: {}",
                    self.inner.llm_provider.name(),
                    e
                );
                false
            }
        };

        let was_ready = std::mem::replace(&mut *self.inner.ready.write(), ready);
        if was_ready != ready {
            tracing::info!("Readiness changed: {} -> {}", was_ready, ready);
        }
        ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::llm::MockLlmProvider;

    fn state(provider: MockLlmProvider) -> AppState {
        AppState::with_provider(RagConfig::default(), Arc::new(provider))
    }

    #[tokio::test]
    async fn test_not_ready_before_first_check() {
        assert!(!state(MockLlmProvider::new()).is_ready());
    }

    #[tokio::test]
    async fn test_readiness_follows_health_check() {
        let mut provider = MockLlmProvider::new();
        provider.expect_health_check().times(1).returning(|| Ok(true));
        let state = state(provider);

        assert!(state.refresh_readiness().await);
        assert!(state.is_ready());
    }

    #[tokio::test]
    async fn test_failed_health_check_is_not_ready() {
        let mut provider = MockLlmProvider::new();
        provider.expect_name().return_const("mock".to_string());
        provider
            .expect_health_check()
            .times(1)
            .returning(|| Err(Error::Auth("token exchange failed".to_string())));
        let state = state(provider);

        assert!(!state.refresh_readiness().await);
        assert!(!state.is_ready());
    }
}
