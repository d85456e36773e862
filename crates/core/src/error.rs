//! # Error Taxonomy
//!
//! Errors raised by the gateway, the stage agents and the orchestrator.
//! Gateway failures carry a structural [`ErrorKind`] assigned where the
//! failure happened; retry decisions never inspect message text.

use std::time::Duration;

use thiserror::Error;

use crate::swarm::pipeline::PipelineStage;

/// Where and how a gateway call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing API key, empty message list, bad client setup
    Config,
    /// HTTP 429
    RateLimited,
    /// Connection refused, DNS failure, broken stream
    Network,
    /// Request exceeded the HTTP client timeout
    Timeout,
    /// HTTP 5xx
    Server(u16),
    /// HTTP 401 / 403
    Auth,
    /// Any other non-success HTTP status
    InvalidRequest(u16),
    /// Provider replied with a body we could not decode
    Decode,
}

/// A failed call to the LLM provider.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct GatewayError {
    pub kind: ErrorKind,
    pub message: String,
}

impl GatewayError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }
}

/// Model output that could not be parsed as JSON.
#[derive(Debug, Clone, Error)]
#[error("Failed to parse JSON: {message}. Text: {preview}...")]
pub struct JsonParseError {
    pub message: String,
    /// First 100 characters of the offending text
    pub preview: String,
}

/// Failure of a single stage agent.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("LLM request failed: {0}")]
    Transport(GatewayError),

    #[error("malformed model response: {0}")]
    MalformedResponse(String),

    #[error("invalid stage output: {0}")]
    Validation(String),
}

impl From<GatewayError> for StageError {
    fn from(err: GatewayError) -> Self {
        match err.kind {
            ErrorKind::Config => StageError::Config(err.message),
            _ => StageError::Transport(err),
        }
    }
}

impl From<JsonParseError> for StageError {
    fn from(err: JsonParseError) -> Self {
        StageError::MalformedResponse(err.to_string())
    }
}

/// Failure of a whole pipeline run. Each variant maps to one terminal
/// `error` event.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{}: {}", .stage.failure_label(), .source)]
    Stage {
        stage: PipelineStage,
        #[source]
        source: StageError,
    },

    #[error(
        "Code generation stage failed: Critical files missing: {}. Cannot proceed with website generation.",
        .files.join(", ")
    )]
    CriticalFilesMissing { files: Vec<String> },

    #[error("Request timeout - generation took longer than {} seconds", .0.as_secs())]
    Timeout(Duration),

    #[error("run cancelled: client disconnected")]
    Cancelled,
}

impl PipelineError {
    pub fn stage_failed(stage: PipelineStage, source: StageError) -> Self {
        PipelineError::Stage { stage, source }
    }

    /// Stage named in the terminal error frame.
    pub fn stage(&self) -> PipelineStage {
        match self {
            PipelineError::Stage { stage, .. } => *stage,
            PipelineError::CriticalFilesMissing { .. } => PipelineStage::Generating,
            PipelineError::InvalidRequest(_)
            | PipelineError::Timeout(_)
            | PipelineError::Cancelled => PipelineStage::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_gateway_error_maps_to_config_stage_error() {
        let err: StageError = GatewayError::config("GROQ_API_KEY is not set").into();
        assert!(matches!(err, StageError::Config(_)));

        let err: StageError = GatewayError::new(ErrorKind::RateLimited, "429").into();
        assert!(matches!(err, StageError::Transport(_)));
    }

    #[test]
    fn test_pipeline_error_messages() {
        let err = PipelineError::stage_failed(
            PipelineStage::Planning,
            StageError::Validation("missing appType".into()),
        );
        assert_eq!(
            err.to_string(),
            "Planning stage failed: invalid stage output: missing appType"
        );
        assert_eq!(err.stage(), PipelineStage::Planning);

        let err = PipelineError::CriticalFilesMissing {
            files: vec!["package.json".into(), "src/App.jsx".into()],
        };
        assert!(err.to_string().contains("package.json, src/App.jsx"));
        assert_eq!(err.stage(), PipelineStage::Generating);

        let err = PipelineError::Timeout(Duration::from_secs(120));
        assert_eq!(
            err.to_string(),
            "Request timeout - generation took longer than 120 seconds"
        );
    }

    #[test]
    fn test_json_parse_error_message() {
        let err = JsonParseError {
            message: "expected value at line 1 column 1".into(),
            preview: "not json".into(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to parse JSON: expected value at line 1 column 1. Text: not json..."
        );
    }
}
