//! Response types for grounded queries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::grounding::GroundingReference;

/// One cited source, as allocated by the cycle's registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    /// Citation key (e.g. `uri_1`)
    pub key: String,
    /// Original source location
    pub uri: String,
    /// Document title (if the index returned one)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Response from a grounded query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Cycle identifier, for correlating logs
    pub cycle_id: Uuid,
    /// Final answer with rendered citations
    pub answer: String,
    /// Sources in citation key order
    pub sources: Vec<SourceEntry>,
    /// Markers that were resolved to a source
    pub resolved_markers: usize,
    /// Marker keys left verbatim because they were never allocated
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unresolved_markers: Vec<String>,
    /// Raw grounding references from the search pass (if requested)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grounding_references: Option<Vec<GroundingReference>>,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
    pub completed_at: DateTime<Utc>,
}

impl QueryResponse {
    /// Whether every marker in the answer was resolved
    pub fn fully_cited(&self) -> bool {
        self.unresolved_markers.is_empty()
    }
}
