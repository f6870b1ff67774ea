//! grounded-rag: document search answers with verifiable inline citations
//!
//! Retrieval and generation are delegated to Vertex AI (a Vertex AI Search
//! data store and Gemini). This crate owns the citation pipeline between the
//! two generation passes: grounding references from the search pass are
//! registered under short per-cycle keys, the formatting pass cites those
//! keys as `[[uri_N]]`, and the markers are resolved back to the original
//! source locations.

pub mod citation;
pub mod config;
pub mod error;
pub mod generation;
pub mod pipeline;
pub mod providers;
pub mod server;
pub mod types;

pub use citation::{CitationRewriter, CitationStyle, GroundingExtractor, UriRegistry};
pub use config::RagConfig;
pub use error::{Error, Result};
pub use pipeline::{CycleOutcome, PipelineOrchestrator};
pub use types::{
    grounding::{DraftResponse, FinalResponse, GroundingReference},
    query::QueryRequest,
    response::{QueryResponse, SourceEntry},
};
