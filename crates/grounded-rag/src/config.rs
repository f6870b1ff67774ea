//! Configuration for the grounded RAG service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::citation::CitationStyle;
use crate::error::{Error, Result};

/// Environment variable holding the path of the TOML config file
pub const CONFIG_PATH_ENV: &str = "GROUNDED_RAG_CONFIG";
/// Environment override for the bind host
pub const HOST_ENV: &str = "GROUNDED_RAG_HOST";
/// Environment override for the bind port
pub const PORT_ENV: &str = "GROUNDED_RAG_PORT";

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Generation call settings
    #[serde(default)]
    pub llm: LlmConfig,
    /// GCP configuration (Vertex AI Search + Gemini)
    #[serde(default)]
    pub gcp: Option<GcpConfig>,
    /// Citation rendering
    #[serde(default)]
    pub citation: CitationConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)
            .map_err(|e| Error::Config(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the file named by `GROUNDED_RAG_CONFIG` (defaults if unset),
    /// then apply host/port overrides from the environment
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::load(path)?,
            _ => Self::default(),
        };

        if let Ok(host) = std::env::var(HOST_ENV) {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var(PORT_ENV) {
            config.server.port = port
                .parse()
                .map_err(|e| Error::Config(format!("Invalid {}: {}", PORT_ENV, e)))?;
        }

        Ok(config)
    }

    /// Check required fields
    pub fn validate(&self) -> Result<()> {
        if let Some(gcp) = &self.gcp {
            if gcp.project_id.trim().is_empty() {
                return Err(Error::Config("gcp.project_id must not be empty".to_string()));
            }
            if gcp.data_store_id.trim().is_empty() {
                return Err(Error::Config("gcp.data_store_id must not be empty".to_string()));
            }
        }
        if self.citation.key_prefix.is_empty()
            || !self
                .citation
                .key_prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(Error::Config(format!(
                "citation.key_prefix must be non-empty and alphanumeric/underscore: {:?}",
                self.citation.key_prefix
            )));
        }
        Ok(())
    }

    /// Server bind address
    pub fn address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
        }
    }
}

/// Generation call configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
    /// Temperature for generation
    pub temperature: f32,
    /// Maximum output tokens per pass
    pub max_output_tokens: u32,
    /// Nucleus sampling
    pub top_p: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            max_retries: 2,
            temperature: 0.1, // grounded answers
            max_output_tokens: 2048,
            top_p: 0.85,
        }
    }
}

/// Google Cloud Platform configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcpConfig {
    /// Path to service account JSON key file
    pub service_account_key_path: PathBuf,
    /// GCP project ID
    pub project_id: String,
    /// GCP region (e.g., "us-central1")
    pub location: String,
    /// Vertex AI Search data store
    /// e.g., "projects/{p}/locations/{l}/collections/{c}/dataStores/{d}"
    pub data_store_id: String,
    /// Model for the search pass (default: "gemini-2.5-flash")
    #[serde(default = "default_model")]
    pub search_model: String,
    /// Model for the citation formatting pass (default: "gemini-2.5-flash")
    #[serde(default = "default_model")]
    pub formatting_model: String,
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

/// Citation rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitationConfig {
    /// Display form for resolved markers
    #[serde(default)]
    pub style: CitationStyle,
    /// Prefix of synthetic citation keys (`<prefix>_<n>`)
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

fn default_key_prefix() -> String {
    "uri".to_string()
}

impl Default for CitationConfig {
    fn default() -> Self {
        Self {
            style: CitationStyle::default(),
            key_prefix: default_key_prefix(),
        }
    }
}
