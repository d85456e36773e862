//! # Quality Skill
//!
//! Reviews generated code. Component runs review one source string; website
//! runs review every file together so cross-file problems (imports,
//! routing, dependencies) can be reported.

use super::artifact_registry::{ArchitectureSpec, ComponentReview, FileSet, WebsiteReview};
use super::{pretty, prompts, StageContext};
use crate::error::StageError;
use crate::models::ModelConfig;

pub struct QualitySkill;

impl QualitySkill {
    pub async fn review_component(
        ctx: &StageContext,
        code: &str,
        config: &ModelConfig,
    ) -> Result<ComponentReview, StageError> {
        if code.trim().is_empty() {
            return Err(StageError::Validation("Code to review is empty".to_string()));
        }
        let user = format!("Please review the following React component code:\n\n{code}");
        let review: ComponentReview = ctx
            .request_json("reviewing", prompts::QUALITY, user, config)
            .await?;
        tracing::info!(
            issues = review.issues.len(),
            needs_revision = review.needs_revision,
            quality = %review.overall_quality,
            "Component review finished"
        );
        Ok(review)
    }

    pub async fn review_website(
        ctx: &StageContext,
        files: &FileSet,
        architecture: &ArchitectureSpec,
        config: &ModelConfig,
    ) -> Result<WebsiteReview, StageError> {
        if files.is_empty() {
            return Err(StageError::Validation("Files to review cannot be empty".to_string()));
        }

        let mut user = String::from("Please review the following multi-file React website project:\n\n");
        user.push_str(&format!(
            "## Architecture Specification:\n{}\n\n## Files to Review:\n\n",
            pretty(architecture)
        ));
        for (path, content) in files.iter() {
            user.push_str(&format!("### File: {path}\n```\n{content}\n```\n\n"));
        }
        user.push_str(
            "\nCheck each file for bugs, performance, accessibility, UX and security issues, \
             and check across files that imports resolve, routing matches the pages and \
             package.json lists every dependency.",
        );

        let mut review: WebsiteReview = ctx
            .request_json("reviewing", prompts::QUALITY, user, config)
            .await?;

        let dropped = review.normalize();
        if !dropped.is_empty() {
            tracing::warn!(
                paths = ?dropped,
                "Review flagged files without any issue; ignoring them"
            );
        }
        tracing::info!(
            files_with_issues = review.files_with_issues.len(),
            total_issues = review.total_issues(),
            needs_revision = review.needs_revision,
            quality = %review.overall_quality,
            "Website review finished"
        );
        Ok(review)
    }
}
