//! Query cycle orchestration and model output hooks

pub mod hooks;
pub mod orchestrator;

pub use hooks::{CitationRewriteHook, CycleContext, GroundingMaskHook, HookPoints, ResponseHook};
pub use orchestrator::{CycleOutcome, PipelineOrchestrator, PipelineStage};
