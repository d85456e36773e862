//! # Sitesmith Skills
//!
//! Stage agents of the generation pipeline. Each skill turns the artifacts
//! of earlier stages into a prompt, calls the model through the shared
//! [`LlmClient`] and returns a typed record.
//!
//! ## Skill Categories
//!
//! **JSON stages** (blocking call, parsed and validated):
//! - `ArchitectureSkill` - project file structure
//! - `PlanningSkill` - component or website plan
//! - `DesignSkill` - design system
//! - `QualitySkill` - review report
//!
//! **Code stages** (streaming call, raw source):
//! - `CodeSkill` - simple, component and per-file generation
//! - `FixSkill` - repairs from a review report
//! - `BackendSkill` - optional backend files

pub mod json;
pub mod prompts;

// Artifact Registry (typed stage records)
pub mod artifact_registry;

// JSON stages
pub mod architecture_skill;
pub mod design_skill;
pub mod planning_skill;
pub mod quality_skill;

// Code stages
pub mod backend_skill;
pub mod code_skill;
pub mod fix_skill;

use std::sync::Arc;
use std::time::Instant;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;

use crate::error::StageError;
use crate::gateway::LlmClient;
use crate::models::{ChatMessage, ModelConfig};

// Re-exports for convenience
pub use architecture_skill::ArchitectureSkill;
pub use artifact_registry::{
    ArchitectureSpec, ComponentPlan, ComponentReview, DesignSystem, FileArtifact, FileSet,
    ManifestEntry, PlanningSpec, QualityReport, Template, WebsitePlan, WebsiteReview,
};
pub use backend_skill::{BackendKind, BackendOptions, BackendPlan, BackendSkill};
pub use code_skill::CodeSkill;
pub use design_skill::DesignSkill;
pub use fix_skill::FixSkill;
pub use planning_skill::PlanningSkill;
pub use quality_skill::QualitySkill;

/// A record a JSON stage can produce.
pub trait StageOutput: DeserializeOwned + JsonSchema {
    /// Top-level keys whose absence makes the reply malformed.
    const REQUIRED_KEYS: &'static [&'static str];
}

/// What every stage call needs: the model client and the client-supplied
/// conversation history.
#[derive(Clone)]
pub struct StageContext {
    pub llm: LlmClient,
    pub history: Arc<[ChatMessage]>,
}

impl StageContext {
    pub fn new(llm: LlmClient, history: Vec<ChatMessage>) -> Self {
        Self {
            llm,
            history: history.into(),
        }
    }

    /// System messages first, then history in order, then the user turn.
    pub(crate) fn messages(&self, system: Vec<String>, user: String) -> Vec<ChatMessage> {
        let mut messages: Vec<ChatMessage> = system.into_iter().map(ChatMessage::system).collect();
        messages.extend(self.history.iter().cloned());
        messages.push(ChatMessage::user(user));
        messages
    }

    /// Blocking call whose reply must be a JSON object of type `T`.
    ///
    /// Not JSON or missing required keys is a `MalformedResponse`; JSON of
    /// the wrong shape is a `Validation` error. Neither is retried.
    pub(crate) async fn request_json<T: StageOutput>(
        &self,
        stage: &str,
        prompt: &str,
        user: String,
        config: &ModelConfig,
    ) -> Result<T, StageError> {
        let system = format!("{prompt}\n\n## Output JSON Schema\n\n{}", schema_for::<T>());
        let request = config.request(self.messages(vec![system], user));

        let started = Instant::now();
        let completion = self.llm.call(&request).await?;
        tracing::info!(
            stage,
            duration_ms = started.elapsed().as_millis() as u64,
            tokens = ?completion.total_tokens,
            "Stage response received"
        );

        if completion.content.trim().is_empty() {
            return Err(StageError::MalformedResponse(
                "No content received from the model".to_string(),
            ));
        }

        let value = json::parse_json(&completion.content)?;
        let Some(object) = value.as_object() else {
            return Err(StageError::MalformedResponse(
                "Expected a JSON object".to_string(),
            ));
        };
        let missing: Vec<&str> = T::REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|key| !object.contains_key(*key))
            .collect();
        if !missing.is_empty() {
            return Err(StageError::MalformedResponse(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        serde_json::from_value(value).map_err(|e| StageError::Validation(e.to_string()))
    }

    /// Streaming call returning raw source. Every fragment goes to
    /// `on_chunk`; the result is unwrapped from a surrounding code fence.
    pub(crate) async fn request_code<F>(
        &self,
        stage: &str,
        system: Vec<String>,
        user: String,
        config: &ModelConfig,
        on_chunk: F,
    ) -> Result<String, StageError>
    where
        F: FnMut(&str) + Send,
    {
        let request = config.request(self.messages(system, user));

        let started = Instant::now();
        let content = self.llm.call_streaming(&request, on_chunk).await?;
        tracing::info!(
            stage,
            duration_ms = started.elapsed().as_millis() as u64,
            chars = content.len(),
            "Stage stream finished"
        );

        let code = json::strip_code_block(&content);
        if code.is_empty() {
            return Err(StageError::Validation(
                "Model generated empty code".to_string(),
            ));
        }
        Ok(code)
    }
}

fn schema_for<T: JsonSchema>() -> String {
    serde_json::to_string_pretty(&schemars::schema_for!(T)).unwrap_or_default()
}

/// Pretty JSON for prompt context.
pub(crate) fn pretty<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}
