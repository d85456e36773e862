//! # LLM Gateway
//!
//! Chat-completion access for every stage of the pipeline.
//!
//! ```text
//! Stage → LlmClient (validation + retry) → dyn ChatGateway → Groq HTTP API
//! ```
//!
//! [`ChatGateway`] is the seam between the pipeline and the network: the
//! server injects a [`GroqGateway`], tests inject a scripted one.

pub mod client;
pub mod groq;
pub mod retry;
pub mod stream;

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::models::{ChatCompletion, ChatRequest};

pub use client::LlmClient;
pub use groq::{GroqConfig, GroqGateway};
pub use retry::{is_retryable, RetryPolicy, RetryState};

/// One attempt against the provider. Implementations never retry.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Single blocking completion.
    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, GatewayError>;

    /// Streaming completion; returns the concatenated content.
    async fn stream(
        &self,
        request: &ChatRequest,
        on_token: &mut (dyn for<'t> FnMut(&'t str) + Send),
    ) -> Result<String, GatewayError>;
}
