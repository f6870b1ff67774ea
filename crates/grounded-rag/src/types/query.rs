//! Query request types

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Query request for grounded search
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The question to answer
    pub question: String,

    /// Include the raw grounding references in the response (default: false)
    #[serde(default)]
    pub include_references: bool,
}

impl QueryRequest {
    /// Create a new query
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }

    /// Include grounding references in the response
    pub fn with_references(mut self) -> Self {
        self.include_references = true;
        self
    }

    /// Reject blank questions
    pub fn validate(&self) -> Result<()> {
        if self.question.trim().is_empty() {
            return Err(Error::InvalidRequest("question must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_question_rejected() {
        assert!(QueryRequest::new("   ").validate().is_err());
        assert!(QueryRequest::new("What is the torque spec?").validate().is_ok());
    }

    #[test]
    fn test_deserialize_defaults() {
        let request: QueryRequest =
            serde_json::from_str(r#"{"question": "How do I reset the unit?"}"#).unwrap();
        assert_eq!(request.question, "How do I reset the unit?");
        assert!(!request.include_references);
    }
}
