//! # Retry Policy
//!
//! Exponential backoff for transient gateway failures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, GatewayError};

/// Whether a failure of this kind is worth another attempt.
pub fn is_retryable(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::RateLimited
            | ErrorKind::Network
            | ErrorKind::Timeout
            | ErrorKind::Server(500 | 502 | 503 | 504)
    )
}

/// How many times to try and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubles every attempt
    #[serde(with = "millis")]
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Backoff after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

/// Attempt bookkeeping for one gateway invocation.
#[derive(Debug)]
pub struct RetryState {
    policy: RetryPolicy,
    attempt: u32,
}

impl RetryState {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy, attempt: 0 }
    }

    /// Start the next attempt and return its number.
    pub fn begin(&mut self) -> u32 {
        self.attempt += 1;
        self.attempt
    }

    /// Decide what to do after a failed attempt.
    ///
    /// Sleeps and returns `Ok(())` when another attempt should run,
    /// otherwise hands the error back. Nothing sleeps after the final attempt.
    pub async fn on_failure(&mut self, err: GatewayError) -> Result<(), GatewayError> {
        if !is_retryable(err.kind) || self.attempt >= self.policy.max_attempts {
            return Err(err);
        }
        let delay = self.policy.delay_for(self.attempt);
        tracing::info!(
            attempt = self.attempt,
            delay_ms = delay.as_millis() as u64,
            "Retrying LLM request"
        );
        tokio::time::sleep(delay).await;
        Ok(())
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
