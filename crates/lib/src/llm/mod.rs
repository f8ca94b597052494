//! Fallback language model abstraction and Gemini client.
//!
//! The router calls the fallback model when no keyword intent matches.

mod gemini;

pub use gemini::{GeminiClient, LlmError};

use async_trait::async_trait;

/// Text-generation collaborator used for the general fallback path.
#[async_trait]
pub trait FallbackModel: Send + Sync {
    /// Generate a reply for the prompt text.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}
