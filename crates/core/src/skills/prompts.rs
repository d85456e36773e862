//! Default system prompts bundled at compile time.
//!
//! Every prompt opens with a `# <Agent>` heading; [`heading`] recovers it
//! from a system message, which is how logs and test gateways tell stages
//! apart.

/// Architecture - project file structure
pub const ARCHITECTURE: &str = include_str!("defaults/architecture.md");

/// Planning - single component plan
pub const PLANNING_COMPONENT: &str = include_str!("defaults/planning_component.md");

/// Planning - multi-page website plan
pub const PLANNING_WEBSITE: &str = include_str!("defaults/planning_website.md");

/// Design - design system tokens
pub const DESIGN: &str = include_str!("defaults/design.md");

/// Simple one-shot component generation
pub const CODE_SIMPLE: &str = include_str!("defaults/code_simple.md");

/// Component code from plan and design
pub const CODE_COMPONENT: &str = include_str!("defaults/code_component.md");

/// One file of a website
pub const CODE_FILE: &str = include_str!("defaults/code_file.md");

/// Quality review (component and website)
pub const QUALITY: &str = include_str!("defaults/quality.md");

/// Fix from a review report
pub const FIX: &str = include_str!("defaults/fix.md");

/// Backend file generation
pub const BACKEND: &str = include_str!("defaults/backend.md");

/// All default prompts with their slugs
pub fn all_defaults() -> Vec<(&'static str, &'static str)> {
    vec![
        ("architecture", ARCHITECTURE),
        ("planning_component", PLANNING_COMPONENT),
        ("planning_website", PLANNING_WEBSITE),
        ("design", DESIGN),
        ("code_simple", CODE_SIMPLE),
        ("code_component", CODE_COMPONENT),
        ("code_file", CODE_FILE),
        ("quality", QUALITY),
        ("fix", FIX),
        ("backend", BACKEND),
    ]
}

/// The `# Heading` line a prompt starts with, without the marker.
pub fn heading(prompt: &str) -> Option<&str> {
    prompt
        .lines()
        .next()
        .and_then(|line| line.strip_prefix("# "))
        .map(str::trim)
}
