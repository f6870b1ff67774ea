//! Google Cloud Platform provider implementations
//!
//! - Gemini on Vertex AI for both generation passes
//! - Vertex AI Search data store as the grounding source of the search pass

mod auth;
mod gemini_client;

pub use auth::GcpAuth;
pub use gemini_client::GeminiClient;
