//! Provider abstractions for the external generation service
//!
//! The pipeline only talks to [`LlmProvider`]; the GCP implementation lives
//! in [`gcp`].

pub mod gcp;
pub mod llm;

pub use llm::LlmProvider;
