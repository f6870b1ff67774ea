//! Core types for the grounded RAG pipeline

pub mod grounding;
pub mod query;
pub mod response;

pub use grounding::{
    DraftResponse, FinalResponse, FormattingContext, GroundingReference, MaskedChunk,
};
pub use query::QueryRequest;
pub use response::{QueryResponse, SourceEntry};
