//! # Code Skill
//!
//! Streams source code from the model: one-shot components, planned
//! components, and single files of a website.

use super::artifact_registry::{
    ArchitectureSpec, ComponentPlan, DesignSystem, FileCategory, ManifestEntry, WebsitePlan,
};
use super::{pretty, prompts, StageContext};
use crate::error::StageError;
use crate::models::ModelConfig;

/// Context shared by every file of one website run, rendered once.
#[derive(Debug, Clone)]
pub struct FileBrief {
    pub prompt: String,
    context: String,
}

impl FileBrief {
    pub fn new(
        prompt: &str,
        architecture: &ArchitectureSpec,
        plan: &WebsitePlan,
        design: &DesignSystem,
        manifest: &[ManifestEntry],
    ) -> Self {
        let file_list: Vec<String> = manifest
            .iter()
            .map(|entry| format!("- {} ({})", entry.path, entry.name))
            .collect();
        let context = format!(
            "## Architecture Specification\n{}\n\n## Planning Specification\n{}\n\n\
             ## Design System\n{}\n\n## Project Files\n{}",
            pretty(architecture),
            pretty(plan),
            pretty(design),
            file_list.join("\n")
        );
        Self {
            prompt: prompt.to_string(),
            context,
        }
    }
}

fn describe(entry: &ManifestEntry) -> String {
    let kind = match entry.category {
        FileCategory::Config => "config file",
        FileCategory::Entry => "entry file",
        FileCategory::Routing => "routing file",
        FileCategory::Layout => "layout component",
        FileCategory::Component => "shared component",
        FileCategory::Page => "page component",
    };
    match &entry.route {
        Some(route) => format!("{kind} {} served at {route}", entry.name),
        None => format!("{kind} {}", entry.name),
    }
}

pub struct CodeSkill;

impl CodeSkill {
    /// Single-shot component straight from the prompt.
    pub async fn generate_simple<F>(
        ctx: &StageContext,
        prompt: &str,
        config: &ModelConfig,
        on_chunk: F,
    ) -> Result<String, StageError>
    where
        F: FnMut(&str) + Send,
    {
        ctx.request_code(
            "generating",
            vec![prompts::CODE_SIMPLE.to_string()],
            prompt.to_string(),
            config,
            on_chunk,
        )
        .await
    }

    /// Component implementing a plan with a design system.
    pub async fn generate_component<F>(
        ctx: &StageContext,
        prompt: &str,
        plan: &ComponentPlan,
        design: &DesignSystem,
        config: &ModelConfig,
        on_chunk: F,
    ) -> Result<String, StageError>
    where
        F: FnMut(&str) + Send,
    {
        let context = format!(
            "Technical Specification:\n{}\n\nDesign System:\n{}",
            pretty(plan),
            pretty(design)
        );
        ctx.request_code(
            "generating",
            vec![prompts::CODE_COMPONENT.to_string(), context],
            prompt.to_string(),
            config,
            on_chunk,
        )
        .await
    }

    /// One file of a website.
    pub async fn generate_file<F>(
        ctx: &StageContext,
        brief: &FileBrief,
        entry: &ManifestEntry,
        config: &ModelConfig,
        on_chunk: F,
    ) -> Result<String, StageError>
    where
        F: FnMut(&str) + Send,
    {
        let user = format!(
            "{}\n\nWrite the file `{}`: the {}.",
            brief.prompt,
            entry.path,
            describe(entry)
        );
        ctx.request_code(
            "generating",
            vec![prompts::CODE_FILE.to_string(), brief.context.clone()],
            user,
            config,
            on_chunk,
        )
        .await
        .map_err(|err| match err {
            StageError::Validation(_) => {
                StageError::Validation(format!("Model generated empty code for {}", entry.path))
            }
            other => other,
        })
    }
}
