//! Interception points for raw model output
//!
//! Each generation pass has one hook point. Hooks see the cycle context
//! mutably and may rewrite the draft before the orchestrator moves on.

use std::collections::HashMap;
use std::sync::Arc;

use crate::citation::{
    CitationRewriter, CitationStyle, GroundingExtractor, RewriteReport, UriRegistry,
};
use crate::error::Result;
use crate::types::{DraftResponse, FormattingContext, GroundingReference, MaskedChunk};

/// State shared by the hooks of one cycle
#[derive(Debug, Default)]
pub struct CycleContext {
    key_prefix: String,
    registry: Option<UriRegistry>,
    /// Titles by source URI, first one seen wins
    titles: HashMap<String, String>,
    /// References from the search pass, with original locations
    pub references: Vec<GroundingReference>,
    /// Input prepared for the formatting pass
    pub formatting: Option<FormattingContext>,
    /// Outcome of the marker rewrite
    pub rewrite: Option<RewriteReport>,
}

impl CycleContext {
    pub fn new(key_prefix: impl Into<String>) -> Self {
        Self {
            key_prefix: key_prefix.into(),
            ..Default::default()
        }
    }

    /// Registry for this cycle, created on first use
    pub fn registry_mut(&mut self) -> &mut UriRegistry {
        let prefix = &self.key_prefix;
        self.registry
            .get_or_insert_with(|| UriRegistry::with_prefix(prefix.clone()))
    }

    /// Registry, if anything was registered yet
    pub fn registry(&self) -> Option<&UriRegistry> {
        self.registry.as_ref()
    }

    /// Register references and remember their titles; returns keys parallel to the input
    pub fn register_references(&mut self, references: &[GroundingReference]) -> Vec<String> {
        for reference in references {
            if let Some(title) = &reference.title {
                self.titles
                    .entry(reference.source_uri().to_string())
                    .or_insert_with(|| title.clone());
            }
        }
        if references.is_empty() {
            return Vec::new();
        }
        self.registry_mut().register_all(references)
    }

    pub fn title_for(&self, source_uri: &str) -> Option<&str> {
        self.titles.get(source_uri).map(|t| t.as_str())
    }
}

/// Interceptor for the raw output of a generation pass
pub trait ResponseHook: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Inspect or rewrite `response` before it leaves the pass
    fn after_model(&self, context: &mut CycleContext, response: &mut DraftResponse) -> Result<()>;
}

/// After the search pass: register grounding references and mask their
/// locations for the formatting pass
#[derive(Debug, Default)]
pub struct GroundingMaskHook;

impl ResponseHook for GroundingMaskHook {
    fn name(&self) -> &str {
        "grounding_mask"
    }

    fn after_model(&self, context: &mut CycleContext, response: &mut DraftResponse) -> Result<()> {
        let references = GroundingExtractor::extract(response);

        for reference in &references {
            tracing::debug!(
                "Grounding chunk {} original URI: {}",
                reference.ordinal + 1,
                reference.source_uri()
            );
        }

        let keys = context.register_references(&references);

        let chunks = references
            .iter()
            .zip(&keys)
            .map(|(reference, key)| MaskedChunk {
                key: key.clone(),
                snippet: reference.raw_snippet.clone(),
                title: reference.title.clone(),
            })
            .collect();

        let allowed_keys = context
            .registry()
            .map(|r| r.keys().map(str::to_string).collect())
            .unwrap_or_default();

        // The draft may quote locations in prose; only keys go forward
        let draft_text = match context.registry() {
            Some(registry) => registry.mask_locations(&response.text),
            None => response.text.clone(),
        };

        context.formatting = Some(FormattingContext {
            draft_text,
            chunks,
            allowed_keys,
        });

        // Raw locations stay in the cycle context only
        response.grounding_metadata = None;
        response.grounding_references = references.clone();
        context.references = references;

        Ok(())
    }
}

/// After the formatting pass: resolve `[[key]]` markers
#[derive(Debug, Default)]
pub struct CitationRewriteHook {
    rewriter: CitationRewriter,
}

impl CitationRewriteHook {
    pub fn new(style: CitationStyle) -> Self {
        Self {
            rewriter: CitationRewriter::new(style),
        }
    }
}

impl ResponseHook for CitationRewriteHook {
    fn name(&self) -> &str {
        "citation_rewrite"
    }

    fn after_model(&self, context: &mut CycleContext, response: &mut DraftResponse) -> Result<()> {
        // Late references still get keys after the ones from the search pass
        let late = GroundingExtractor::extract(response);
        if !late.is_empty() {
            tracing::debug!("Formatting pass returned {} grounding references", late.len());
            context.register_references(&late);
        }

        let empty = UriRegistry::new();
        let registry = context.registry().unwrap_or(&empty);
        let report = self.rewriter.rewrite(&response.text, registry);

        if !report.unresolved.is_empty() {
            tracing::warn!(
                "{} citation marker(s) left unresolved: {}",
                report.unresolved.len(),
                report.unresolved.join(", ")
            );
        }

        response.text = report.text.clone();
        context.rewrite = Some(report);
        Ok(())
    }
}

/// Hooks registered for each pass, run in registration order
#[derive(Clone)]
pub struct HookPoints {
    after_initial: Vec<Arc<dyn ResponseHook>>,
    after_formatted: Vec<Arc<dyn ResponseHook>>,
}

impl HookPoints {
    /// No hooks at all
    pub fn empty() -> Self {
        Self {
            after_initial: Vec::new(),
            after_formatted: Vec::new(),
        }
    }

    /// Grounding mask after the search pass, marker rewrite after the formatting pass
    pub fn standard(style: CitationStyle) -> Self {
        Self {
            after_initial: vec![Arc::new(GroundingMaskHook)],
            after_formatted: vec![Arc::new(CitationRewriteHook::new(style))],
        }
    }

    pub fn after_initial(mut self, hook: Arc<dyn ResponseHook>) -> Self {
        self.after_initial.push(hook);
        self
    }

    pub fn after_formatted(mut self, hook: Arc<dyn ResponseHook>) -> Self {
        self.after_formatted.push(hook);
        self
    }

    pub(crate) fn run_after_initial(
        &self,
        context: &mut CycleContext,
        response: &mut DraftResponse,
    ) -> Result<()> {
        Self::run(&self.after_initial, context, response)
    }

    pub(crate) fn run_after_formatted(
        &self,
        context: &mut CycleContext,
        response: &mut DraftResponse,
    ) -> Result<()> {
        Self::run(&self.after_formatted, context, response)
    }

    fn run(
        hooks: &[Arc<dyn ResponseHook>],
        context: &mut CycleContext,
        response: &mut DraftResponse,
    ) -> Result<()> {
        for hook in hooks {
            tracing::trace!("Running hook {}", hook.name());
            hook.after_model(context, response)?;
        }
        Ok(())
    }
}

impl Default for HookPoints {
    fn default() -> Self {
        Self::standard(CitationStyle::default())
    }
}
