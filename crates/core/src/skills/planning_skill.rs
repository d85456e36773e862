//! # Planning Skill
//!
//! Produces the technical plan: a [`ComponentPlan`] for component runs or a
//! [`WebsitePlan`] constrained by the architecture for website runs.

use super::artifact_registry::{ArchitectureSpec, ComponentPlan, WebsitePlan};
use super::{pretty, prompts, StageContext};
use crate::error::StageError;
use crate::models::ModelConfig;

pub struct PlanningSkill;

impl PlanningSkill {
    pub async fn plan_component(
        ctx: &StageContext,
        prompt: &str,
        config: &ModelConfig,
    ) -> Result<ComponentPlan, StageError> {
        let plan: ComponentPlan = ctx
            .request_json("planning", prompts::PLANNING_COMPONENT, prompt.to_string(), config)
            .await?;
        tracing::info!(
            app_type = ?plan.app_type,
            complexity = ?plan.complexity,
            "Component plan ready"
        );
        Ok(plan)
    }

    pub async fn plan_website(
        ctx: &StageContext,
        prompt: &str,
        architecture: &ArchitectureSpec,
        config: &ModelConfig,
    ) -> Result<WebsitePlan, StageError> {
        let user = format!(
            "{prompt}\n\n## Architecture Specification\n{}\n\nPlan every page listed in the architecture.",
            pretty(architecture)
        );
        let plan: WebsitePlan = ctx
            .request_json("planning", prompts::PLANNING_WEBSITE, user, config)
            .await?;

        if let Some((index, _)) = plan
            .pages
            .iter()
            .enumerate()
            .find(|(_, page)| page.name.trim().is_empty())
        {
            return Err(StageError::Validation(format!(
                "Page at index {index} is missing a name"
            )));
        }
        tracing::info!(
            app_type = ?plan.app_type,
            pages = plan.pages.len(),
            "Website plan ready"
        );
        Ok(plan)
    }
}
