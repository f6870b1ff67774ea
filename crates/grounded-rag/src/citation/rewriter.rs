//! Marker resolution for the formatted answer
//!
//! Replaces `[[<key>]]` markers with the registry's source location. Markers
//! whose key was never allocated stay in the text verbatim so a hallucinated
//! citation is visible in the output instead of silently disappearing.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use super::registry::UriRegistry;

/// `[[` + one or more ASCII alphanumerics/underscores + `]]`
pub const MARKER_PATTERN: &str = r"\[\[([A-Za-z0-9_]+)\]\]";

fn marker_regex() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(MARKER_PATTERN).expect("Invalid regex"))
}

/// How a resolved marker is displayed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationStyle {
    /// `[gs://bucket/doc.pdf]`
    #[default]
    Bracketed,
    /// `[gs://bucket/doc.pdf](gs://bucket/doc.pdf)`
    MarkdownLink,
}

impl CitationStyle {
    /// Render a source location
    pub fn render(&self, source_uri: &str) -> String {
        match self {
            CitationStyle::Bracketed => format!("[{}]", source_uri),
            CitationStyle::MarkdownLink => format!("[{}]({})", source_uri, source_uri),
        }
    }
}

/// Result of one rewrite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteReport {
    pub text: String,
    /// Number of markers replaced
    pub resolved: usize,
    /// Keys left verbatim, in order of appearance (repeats kept)
    pub unresolved: Vec<String>,
}

/// Single-pass marker rewriter
#[derive(Debug, Clone, Copy, Default)]
pub struct CitationRewriter {
    style: CitationStyle,
}

impl CitationRewriter {
    pub fn new(style: CitationStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> CitationStyle {
        self.style
    }

    /// Rewrite every resolvable marker in `text`
    pub fn rewrite(&self, text: &str, registry: &UriRegistry) -> RewriteReport {
        let mut resolved = 0usize;
        let mut unresolved = Vec::new();

        // replace_all scans once, left to right; replacements are never rescanned
        let rewritten = marker_regex().replace_all(text, |caps: &Captures| {
            let key = &caps[1];
            match registry.resolve(key) {
                Ok(uri) => {
                    resolved += 1;
                    self.style.render(uri)
                }
                Err(e) => {
                    tracing::warn!("{}; leaving marker verbatim", e);
                    unresolved.push(key.to_string());
                    caps[0].to_string()
                }
            }
        });

        RewriteReport {
            text: rewritten.into_owned(),
            resolved,
            unresolved,
        }
    }
}

/// Keys of every marker in `text`, in order of appearance
pub fn find_markers(text: &str) -> Vec<&str> {
    marker_regex()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}
