//! # Sitesmith Models
//!
//! Centralized LLM configuration and chat types for the Sitesmith system.
//! Every stage builds a [`ChatRequest`] from a [`ModelConfig`] and a list of
//! [`ChatMessage`]s; the gateway turns it into a chat-completion call.

use serde::{Deserialize, Serialize};

use crate::swarm::pipeline::PipelineStage;

/// Default hosted model used when nothing else is configured.
pub const DEFAULT_MODEL: &str = "openai/gpt-oss-120b";

/// Role of a chat message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message in a conversation.
///
/// Conversation history supplied by clients uses the same shape, and its
/// insertion order is the chat order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Configuration for one LLM invocation
///
/// Used throughout the pipeline to pick the model and sampling parameters
/// for a stage. See [`ModelConfig::for_stage`] for the per-stage defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelConfig {
    /// Model name (e.g., "openai/gpt-oss-120b")
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum completion tokens
    pub max_tokens: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.3,
            max_tokens: 4096,
        }
    }
}

impl ModelConfig {
    /// Create a new model config with default sampling
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    /// Sampling defaults for a stage of the pipeline.
    ///
    /// Structural (JSON) stages run cool, the design stage runs warm, and
    /// multi-file code stages get a larger completion budget.
    pub fn for_stage(stage: PipelineStage, model: impl Into<String>) -> Self {
        let (temperature, max_tokens) = match stage {
            PipelineStage::Architecture | PipelineStage::Planning => (0.3, 4096),
            PipelineStage::Designing => (0.7, 4096),
            PipelineStage::Generating => (0.2, 8192),
            PipelineStage::Reviewing => (0.3, 8192),
            PipelineStage::Fixing => (0.2, 8192),
            PipelineStage::Backend => (0.2, 8192),
            PipelineStage::Complete | PipelineStage::Failed => (0.2, 4096),
        };
        Self {
            model: model.into(),
            temperature,
            max_tokens,
        }
    }

    /// Override the completion budget
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Build a request for the given messages
    pub fn request(&self, messages: Vec<ChatMessage>) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

/// A chat-completion request as sent to the gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ChatRequest {
    /// Content of the first system message, if any
    pub fn system_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
    }

    /// Content of the last user message, if any
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

/// A completed (non-streaming) chat response.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatCompletion {
    /// Assistant message content
    pub content: String,
    /// Total tokens reported by the provider
    pub total_tokens: Option<u64>,
}
