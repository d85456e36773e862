//! # Architecture Skill
//!
//! Decides the project file structure of a website run: pages, layouts,
//! components, config, routing and entry files.

use super::artifact_registry::{ArchitectureSpec, Template};
use super::{prompts, StageContext};
use crate::error::StageError;
use crate::models::ModelConfig;

pub struct ArchitectureSkill;

impl ArchitectureSkill {
    pub async fn run(
        ctx: &StageContext,
        prompt: &str,
        template: Template,
        config: &ModelConfig,
    ) -> Result<ArchitectureSpec, StageError> {
        let user = format!(
            "{prompt}\n\nTarget template: {template}\n\nPlease create a complete project structure for this website."
        );

        let spec: ArchitectureSpec = ctx
            .request_json("architecture", prompts::ARCHITECTURE, user, config)
            .await?;
        spec.validate()?;

        for warning in spec.warnings() {
            tracing::warn!(stage = "architecture", "{warning}");
        }
        tracing::info!(
            project = %spec.project_name,
            pages = spec.file_structure.pages.len(),
            components = spec.file_structure.components.len(),
            "Architecture planned"
        );

        Ok(spec)
    }
}
