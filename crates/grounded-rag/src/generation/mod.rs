//! Prompt construction for the generation passes

pub mod prompt;

pub use prompt::PromptBuilder;
