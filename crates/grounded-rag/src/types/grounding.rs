//! Grounding types shared by both generation passes

use serde::{Deserialize, Serialize};

/// One source location cited by a generation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingReference {
    source_uri: String,
    /// Text excerpt returned by the search index
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_snippet: Option<String>,
    /// Document title, if the index provided one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Order of appearance in the response (0-based)
    pub ordinal: usize,
}

impl GroundingReference {
    /// Create a reference to a source location
    pub fn new(source_uri: impl Into<String>, ordinal: usize) -> Self {
        Self {
            source_uri: source_uri.into(),
            raw_snippet: None,
            title: None,
            ordinal,
        }
    }

    /// Attach a snippet
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.raw_snippet = Some(snippet.into());
        self
    }

    /// Attach a title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// The recorded source location. Read-only once recorded.
    pub fn source_uri(&self) -> &str {
        &self.source_uri
    }
}

/// Raw output of a generation pass
///
/// Providers either fill `grounding_references` directly or hand over the
/// untouched `grounding_metadata` object and let
/// [`GroundingExtractor`](crate::citation::GroundingExtractor) parse it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DraftResponse {
    /// Generated text, may contain `[[key]]` markers
    pub text: String,
    /// References in order of appearance
    #[serde(default)]
    pub grounding_references: Vec<GroundingReference>,
    /// Provider grounding structure, as returned on the wire
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grounding_metadata: Option<serde_json::Value>,
}

impl DraftResponse {
    /// Draft with text only
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Draft with text and grounding references
    pub fn with_references(text: impl Into<String>, references: Vec<GroundingReference>) -> Self {
        Self {
            text: text.into(),
            grounding_references: references,
            grounding_metadata: None,
        }
    }

    /// Draft with text and the provider's raw grounding structure
    pub fn with_metadata(text: impl Into<String>, metadata: Option<serde_json::Value>) -> Self {
        Self {
            text: text.into(),
            grounding_references: Vec::new(),
            grounding_metadata: metadata,
        }
    }
}

/// Terminal answer text with every resolvable marker rendered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalResponse {
    pub text: String,
}

impl FinalResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// What the second pass is allowed to see about one grounding chunk:
/// its citation key and snippet, never the raw location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskedChunk {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Input handed to the citation formatting pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattingContext {
    /// Draft answer from the search pass
    pub draft_text: String,
    /// Grounding chunks with masked locations, in order of appearance
    pub chunks: Vec<MaskedChunk>,
    /// Keys the formatting pass may cite
    pub allowed_keys: Vec<String>,
}
