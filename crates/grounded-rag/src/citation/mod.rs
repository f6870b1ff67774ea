//! Citation integrity: grounding extraction, key registry and marker rewriting

pub mod extractor;
pub mod registry;
pub mod rewriter;

pub use extractor::GroundingExtractor;
pub use registry::UriRegistry;
pub use rewriter::{find_markers, CitationRewriter, CitationStyle, RewriteReport};
