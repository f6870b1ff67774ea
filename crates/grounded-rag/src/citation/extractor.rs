//! Grounding reference extraction from model responses
//!
//! Reads the Vertex AI `groundingMetadata` object:
//!
//! ```json
//! {
//!   "groundingChunks": [
//!     { "retrievedContext": { "uri": "gs://bucket/doc.pdf", "title": "doc", "text": "..." } },
//!     { "web": { "uri": "https://example.com", "title": "example" } }
//!   ]
//! }
//! ```
//!
//! A missing or unreadable structure yields zero references, never an error
//! for the cycle.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::types::{DraftResponse, GroundingReference};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadataWire {
    #[serde(default)]
    grounding_chunks: Option<Vec<GroundingChunkWire>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingChunkWire {
    #[serde(default)]
    retrieved_context: Option<ContextWire>,
    #[serde(default)]
    web: Option<ContextWire>,
}

#[derive(Debug, Deserialize)]
struct ContextWire {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

impl GroundingChunkWire {
    fn into_reference(self, ordinal: usize) -> Option<GroundingReference> {
        let retrieved = self
            .retrieved_context
            .filter(|c| c.uri.as_deref().is_some_and(|u| !u.is_empty()));
        let context = retrieved.or(self.web)?;
        let uri = context.uri.filter(|u| !u.is_empty())?;

        let mut reference = GroundingReference::new(uri, ordinal);
        if let Some(text) = context.text.filter(|t| !t.trim().is_empty()) {
            reference = reference.with_snippet(text);
        }
        if let Some(title) = context.title.filter(|t| !t.trim().is_empty()) {
            reference = reference.with_title(title);
        }
        Some(reference)
    }
}

/// Pure extraction of grounding references
pub struct GroundingExtractor;

impl GroundingExtractor {
    /// References for a draft: parsed from its raw metadata when present,
    /// otherwise the references the provider already attached
    pub fn extract(draft: &DraftResponse) -> Vec<GroundingReference> {
        match &draft.grounding_metadata {
            Some(metadata) => Self::extract_metadata(metadata),
            None => draft.grounding_references.clone(),
        }
    }

    /// Parse a `groundingMetadata` object, absorbing malformed input
    pub fn extract_metadata(metadata: &Value) -> Vec<GroundingReference> {
        match Self::try_extract_metadata(metadata) {
            Ok(references) => references,
            Err(e) => {
                tracing::warn!("{}; treating response as ungrounded", e);
                Vec::new()
            }
        }
    }

    /// Parse a `groundingMetadata` object
    ///
    /// Chunks without a usable URI carry no traceable location and are
    /// skipped without consuming an ordinal. Duplicate URIs are kept.
    pub fn try_extract_metadata(metadata: &Value) -> Result<Vec<GroundingReference>> {
        if metadata.is_null() {
            return Ok(Vec::new());
        }

        let wire: GroundingMetadataWire = serde_json::from_value(metadata.clone())
            .map_err(|e| Error::malformed_grounding(e.to_string()))?;

        let references = wire
            .grounding_chunks
            .unwrap_or_default()
            .into_iter()
            .filter_map(|chunk| chunk.into_reference(0))
            .enumerate()
            .map(|(ordinal, mut reference)| {
                reference.ordinal = ordinal;
                reference
            })
            .collect::<Vec<_>>();

        tracing::debug!("Extracted {} grounding references", references.len());
        Ok(references)
    }

    /// First candidate's `groundingMetadata`, if present
    pub fn candidate_metadata(body: &Value) -> Option<&Value> {
        body.get("candidates")?
            .as_array()?
            .first()?
            .get("groundingMetadata")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extracts_retrieved_context_in_order() {
        let metadata = json!({
            "groundingChunks": [
                {
                    "retrievedContext": {
                        "uri": "gs://manuals/pump.pdf",
                        "title": "pump",
                        "text": "Max pressure is 6 bar."
                    }
                },
                { "retrievedContext": { "uri": "gs://manuals/valve.pdf", "title": "valve" } }
            ]
        });

        let refs = GroundingExtractor::extract_metadata(&metadata);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].source_uri(), "gs://manuals/pump.pdf");
        assert_eq!(refs[0].raw_snippet.as_deref(), Some("Max pressure is 6 bar."));
        assert_eq!(refs[0].title.as_deref(), Some("pump"));
        assert_eq!(refs[0].ordinal, 0);
        assert_eq!(refs[1].source_uri(), "gs://manuals/valve.pdf");
        assert!(refs[1].raw_snippet.is_none());
        assert_eq!(refs[1].ordinal, 1);
    }

    #[test]
    fn test_web_chunks_and_missing_uris() {
        let metadata = json!({
            "groundingChunks": [
                { "retrievedContext": { "text": "no location" } },
                { "web": { "uri": "https://example.com/spec", "title": "spec" } },
                {}
            ]
        });

        let refs = GroundingExtractor::extract_metadata(&metadata);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].source_uri(), "https://example.com/spec");
        assert_eq!(refs[0].ordinal, 0);
    }

    #[test]
    fn test_duplicates_preserved_with_distinct_ordinals() {
        let metadata = json!({
            "groundingChunks": [
                { "retrievedContext": { "uri": "gs://b/doc1.pdf" } },
                { "retrievedContext": { "uri": "gs://b/doc1.pdf" } }
            ]
        });

        let refs = GroundingExtractor::extract_metadata(&metadata);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].source_uri(), refs[1].source_uri());
        assert_ne!(refs[0].ordinal, refs[1].ordinal);
    }

    #[test]
    fn test_absent_and_empty_structures() {
        assert!(GroundingExtractor::extract_metadata(&Value::Null).is_empty());
        assert!(GroundingExtractor::extract_metadata(&json!({})).is_empty());
        assert!(GroundingExtractor::extract_metadata(&json!({ "groundingChunks": [] })).is_empty());
        assert!(GroundingExtractor::extract(&DraftResponse::new("plain answer")).is_empty());
    }

    #[test]
    fn test_malformed_structure_is_zero_references() {
        let metadata = json!({ "groundingChunks": "not a list" });
        assert!(matches!(
            GroundingExtractor::try_extract_metadata(&metadata),
            Err(Error::MalformedGroundingMetadata(_))
        ));
        assert!(GroundingExtractor::extract_metadata(&metadata).is_empty());
        assert!(GroundingExtractor::extract_metadata(&json!([1, 2, 3])).is_empty());
    }

    #[test]
    fn test_extract_from_response_body() {
        let body = json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Answer." }] },
                "groundingMetadata": {
                    "groundingChunks": [
                        { "retrievedContext": { "uri": "gs://b/a.pdf" } }
                    ]
                }
            }]
        });
        let metadata = GroundingExtractor::candidate_metadata(&body).unwrap();
        let refs = GroundingExtractor::extract_metadata(metadata);
        assert_eq!(refs.len(), 1);
        assert!(GroundingExtractor::candidate_metadata(&json!({ "candidates": [] })).is_none());
        assert!(GroundingExtractor::candidate_metadata(&json!({})).is_none());
    }

    #[test]
    fn test_draft_metadata_takes_precedence() {
        let draft = DraftResponse {
            text: "Answer".to_string(),
            grounding_references: vec![GroundingReference::new("stale", 0)],
            grounding_metadata: Some(json!({
                "groundingChunks": [{ "retrievedContext": { "uri": "gs://b/fresh.pdf" } }]
            })),
        };
        let refs = GroundingExtractor::extract(&draft);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].source_uri(), "gs://b/fresh.pdf");
    }
}
