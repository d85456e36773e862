//! # LLM Client
//!
//! The single entry point stages use to talk to the model. Wraps a shared
//! [`ChatGateway`] with request validation and the retry loop.

use std::sync::Arc;
use std::time::Instant;

use super::retry::{RetryPolicy, RetryState};
use super::ChatGateway;
use crate::error::GatewayError;
use crate::models::{ChatCompletion, ChatRequest};

/// Cheap-to-clone handle built once at startup and passed to every run.
#[derive(Clone)]
pub struct LlmClient {
    gateway: Arc<dyn ChatGateway>,
    retry: RetryPolicy,
}

impl LlmClient {
    pub fn new(gateway: Arc<dyn ChatGateway>) -> Self {
        Self {
            gateway,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Blocking completion with retry on transient failures.
    pub async fn call(&self, request: &ChatRequest) -> Result<ChatCompletion, GatewayError> {
        validate(request)?;
        let mut state = RetryState::new(self.retry);

        loop {
            let attempt = state.begin();
            let started = Instant::now();
            match self.gateway.complete(request).await {
                Ok(completion) => {
                    tracing::debug!(
                        model = %request.model,
                        attempt,
                        duration_ms = started.elapsed().as_millis() as u64,
                        tokens = ?completion.total_tokens,
                        "LLM completion received"
                    );
                    return Ok(completion);
                }
                Err(err) => {
                    tracing::error!(
                        model = %request.model,
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        kind = ?err.kind,
                        "LLM completion failed: {err}"
                    );
                    state.on_failure(err).await?;
                }
            }
        }
    }

    /// Streaming completion. `on_token` sees every fragment in arrival order.
    ///
    /// A failure mid-stream counts as one failed attempt; the next attempt
    /// starts a fresh stream, so fragments of the failed attempt may already
    /// have been delivered.
    pub async fn call_streaming<F>(
        &self,
        request: &ChatRequest,
        mut on_token: F,
    ) -> Result<String, GatewayError>
    where
        F: FnMut(&str) + Send,
    {
        validate(request)?;
        let mut state = RetryState::new(self.retry);

        loop {
            let attempt = state.begin();
            let started = Instant::now();
            match self.gateway.stream(request, &mut on_token).await {
                Ok(content) => {
                    tracing::debug!(
                        model = %request.model,
                        attempt,
                        duration_ms = started.elapsed().as_millis() as u64,
                        chars = content.len(),
                        "LLM stream finished"
                    );
                    return Ok(content);
                }
                Err(err) => {
                    tracing::error!(
                        model = %request.model,
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        kind = ?err.kind,
                        "LLM stream failed: {err}"
                    );
                    state.on_failure(err).await?;
                }
            }
        }
    }
}

fn validate(request: &ChatRequest) -> Result<(), GatewayError> {
    if request.messages.is_empty() {
        return Err(GatewayError::config(
            "Request must contain at least one message",
        ));
    }
    if request.model.trim().is_empty() {
        return Err(GatewayError::config("Request must name a model"));
    }
    Ok(())
}
