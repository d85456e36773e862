//! # Design Skill
//!
//! Creates the design system (colors, fonts, spacing and, for websites,
//! layout, breakpoints and component styles).

use super::artifact_registry::{ArchitectureSpec, ComponentPlan, DesignSystem, WebsitePlan};
use super::{pretty, prompts, StageContext};
use crate::error::StageError;
use crate::models::ModelConfig;

pub struct DesignSkill;

impl DesignSkill {
    pub async fn design_component(
        ctx: &StageContext,
        plan: &ComponentPlan,
        config: &ModelConfig,
    ) -> Result<DesignSystem, StageError> {
        let user = format!(
            "Technical Specification:\n{}\n\nBased on this technical specification, create a cohesive design system.",
            pretty(plan)
        );
        let design: DesignSystem = ctx
            .request_json("designing", prompts::DESIGN, user, config)
            .await?;
        design.validate()?;
        Ok(design)
    }

    pub async fn design_website(
        ctx: &StageContext,
        architecture: &ArchitectureSpec,
        plan: &WebsitePlan,
        config: &ModelConfig,
    ) -> Result<DesignSystem, StageError> {
        let user = format!(
            "Architecture Specification:\n{}\n\nPlanning Specification:\n{}\n\n\
             Based on these specifications, create a comprehensive design system for the entire \
             website with component-specific styling guidelines, layout system, breakpoints, and \
             global styles.",
            pretty(architecture),
            pretty(plan)
        );
        let design: DesignSystem = ctx
            .request_json("designing", prompts::DESIGN, user, config)
            .await?;
        design.validate_website()?;
        tracing::info!(style = %design.style, "Design system ready");
        Ok(design)
    }
}
