//! # Fix Skill
//!
//! Rewrites code flagged by the quality stage. Website fixes work one file
//! at a time and see the files named by the cross-file issues as
//! read-only context.

use std::fmt::Write as _;

use super::artifact_registry::{ArchitectureSpec, ComponentReview};
use super::{pretty, prompts, StageContext};
use crate::error::StageError;
use crate::models::ModelConfig;
use crate::swarm::fix_plan::FixTarget;

pub struct FixSkill;

impl FixSkill {
    pub async fn fix_component<F>(
        ctx: &StageContext,
        code: &str,
        review: &ComponentReview,
        config: &ModelConfig,
        on_chunk: F,
    ) -> Result<String, StageError>
    where
        F: FnMut(&str) + Send,
    {
        let context = format!(
            "Original Code:\n```jsx\n{code}\n```\n\nQuality Review Report:\n{}",
            pretty(review)
        );
        ctx.request_code(
            "fixing",
            vec![prompts::FIX.to_string(), context],
            "Please fix all the issues identified in the quality review report while preserving \
             the original functionality and design."
                .to_string(),
            config,
            on_chunk,
        )
        .await
    }

    pub async fn fix_file<F>(
        ctx: &StageContext,
        target: &FixTarget,
        architecture: &ArchitectureSpec,
        config: &ModelConfig,
        on_chunk: F,
    ) -> Result<String, StageError>
    where
        F: FnMut(&str) + Send,
    {
        ctx.request_code(
            "fixing",
            vec![prompts::FIX.to_string(), fix_context(target, architecture)],
            "Please fix all the issues identified in the quality review report. Pay special \
             attention to cross-file issues like import paths, routing configuration, and \
             component references. Ensure consistency with other files in the project."
                .to_string(),
            config,
            on_chunk,
        )
        .await
    }
}

fn fix_context(target: &FixTarget, architecture: &ArchitectureSpec) -> String {
    let mut context = format!(
        "File to Fix: {}\n\nOriginal Code:\n```jsx\n{}\n```\n\n",
        target.path, target.original
    );
    if !target.issues.is_empty() {
        let _ = write!(context, "File-Specific Issues:\n{}\n\n", pretty(&target.issues));
    }
    if !target.cross_file_issues.is_empty() {
        let _ = write!(
            context,
            "Cross-File Issues Affecting This File:\n{}\n\n",
            pretty(&target.cross_file_issues)
        );
    }
    if !target.related.is_empty() {
        context.push_str("Related Files (for cross-file fixes):\n");
        for file in &target.related {
            let _ = write!(context, "\n{}:\n```jsx\n{}\n```\n", file.path, file.content);
        }
        context.push('\n');
    }
    let _ = write!(context, "Architecture Context:\n{}\n", pretty(architecture));
    context
}
