//! Two-pass grounded answer pipeline
//!
//! ```text
//! AwaitingInitialResponse
//!     --(search draft)--> AwaitingFormattedResponse
//!     --(formatted draft)--> Done
//! ```
//!
//! One orchestrator serves exactly one cycle. It owns the cycle's citation
//! registry, so concurrent cycles never share keys.

use std::time::Instant;
use uuid::Uuid;

use super::hooks::{CycleContext, HookPoints};
use crate::config::CitationConfig;
use crate::error::{Error, Result};
use crate::providers::LlmProvider;
use crate::types::{
    DraftResponse, FinalResponse, FormattingContext, GroundingReference, SourceEntry,
};

/// Pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    AwaitingInitialResponse,
    AwaitingFormattedResponse,
    Done,
}

/// Everything a finished cycle produced
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub cycle_id: Uuid,
    pub answer: FinalResponse,
    /// Registry export, in key order
    pub sources: Vec<SourceEntry>,
    pub resolved_markers: usize,
    pub unresolved_markers: Vec<String>,
    /// References from the search pass, original locations
    pub grounding_references: Vec<GroundingReference>,
}

/// Sequences the search pass and the citation formatting pass
pub struct PipelineOrchestrator {
    cycle_id: Uuid,
    stage: PipelineStage,
    context: CycleContext,
    hooks: HookPoints,
}

impl PipelineOrchestrator {
    /// New cycle with the standard hooks for `config`
    pub fn new(config: &CitationConfig) -> Self {
        Self::with_hooks(config, HookPoints::standard(config.style))
    }

    /// New cycle with custom hooks
    pub fn with_hooks(config: &CitationConfig, hooks: HookPoints) -> Self {
        Self {
            cycle_id: Uuid::new_v4(),
            stage: PipelineStage::AwaitingInitialResponse,
            context: CycleContext::new(config.key_prefix.clone()),
            hooks,
        }
    }

    pub fn cycle_id(&self) -> Uuid {
        self.cycle_id
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn context(&self) -> &CycleContext {
        &self.context
    }

    /// Transition 1: register the search pass's grounding and prepare the
    /// formatting pass input. No rewriting happens here.
    pub fn on_initial_response(&mut self, mut draft: DraftResponse) -> Result<FormattingContext> {
        self.expect_stage(PipelineStage::AwaitingInitialResponse)?;

        self.hooks.run_after_initial(&mut self.context, &mut draft)?;

        let formatting = self
            .context
            .formatting
            .clone()
            .unwrap_or_else(|| FormattingContext {
                draft_text: draft.text.clone(),
                ..Default::default()
            });

        tracing::info!(
            cycle_id = %self.cycle_id,
            "Search pass grounded by {} reference(s), {} citation key(s)",
            self.context.references.len(),
            self.context.registry().map(|r| r.len()).unwrap_or(0)
        );

        self.stage = PipelineStage::AwaitingFormattedResponse;
        Ok(formatting)
    }

    /// Transition 2: resolve markers in the formatting pass output
    pub fn on_formatted_response(&mut self, mut draft: DraftResponse) -> Result<CycleOutcome> {
        self.expect_stage(PipelineStage::AwaitingFormattedResponse)?;

        self.hooks.run_after_formatted(&mut self.context, &mut draft)?;

        let (resolved_markers, unresolved_markers) = match self.context.rewrite.take() {
            Some(report) => (report.resolved, report.unresolved),
            None => (0, Vec::new()),
        };

        let sources = self.sources();
        self.stage = PipelineStage::Done;

        tracing::info!(
            cycle_id = %self.cycle_id,
            "Cycle done: {} marker(s) resolved, {} unresolved, {} source(s)",
            resolved_markers,
            unresolved_markers.len(),
            sources.len()
        );

        Ok(CycleOutcome {
            cycle_id: self.cycle_id,
            answer: FinalResponse::new(draft.text),
            sources,
            resolved_markers,
            unresolved_markers,
            grounding_references: std::mem::take(&mut self.context.references),
        })
    }

    /// Run both passes against `provider`
    ///
    /// Provider errors are returned as-is; nothing is retried here.
    pub async fn run(mut self, provider: &dyn LlmProvider, question: &str) -> Result<CycleOutcome> {
        let start = Instant::now();
        tracing::info!(
            cycle_id = %self.cycle_id,
            "Query via {} ({}): \"{}\"",
            provider.name(),
            provider.model(),
            question
        );

        let initial = provider.search_and_answer(question).await?;
        let formatting = self.on_initial_response(initial)?;

        let formatted = provider.format_citations(&formatting).await?;
        let outcome = self.on_formatted_response(formatted)?;

        tracing::info!(
            cycle_id = %outcome.cycle_id,
            "Cycle completed in {}ms",
            start.elapsed().as_millis()
        );
        Ok(outcome)
    }

    fn sources(&self) -> Vec<SourceEntry> {
        self.context
            .registry()
            .map(|registry| {
                registry
                    .export_mapping()
                    .into_iter()
                    .map(|(key, uri)| SourceEntry {
                        title: self.context.title_for(&uri).map(str::to_string),
                        key,
                        uri,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn expect_stage(&self, expected: PipelineStage) -> Result<()> {
        if self.stage != expected {
            return Err(Error::pipeline(format!(
                "expected stage {:?}, pipeline is at {:?}",
                expected, self.stage
            )));
        }
        Ok(())
    }
}
