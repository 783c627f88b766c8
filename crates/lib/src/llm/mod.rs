//! Completion abstraction and OpenAI client.
//!
//! The relay only needs "text in, reply out"; [`CompletionBackend`] is that seam.

mod openai;

use async_trait::async_trait;

pub use openai::{OpenAiClient, UpstreamError};

/// Produces one reply for one user utterance.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, text: &str) -> Result<String, UpstreamError>;
}
