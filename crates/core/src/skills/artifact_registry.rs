//! # Artifact Registry
//!
//! Typed records passed from one stage to the next. Each record is created
//! by the stage that produces it, read-only afterwards, and lives for a
//! single run.
//!
//! JSON stages deserialize straight into these types and then run the
//! shape checks in `validate()`; a record that passes is safe for every
//! downstream stage to rely on.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::StageOutput;
use crate::error::StageError;

fn invalid(message: impl Into<String>) -> StageError {
    StageError::Validation(message.into())
}

fn missing_keys<'a>(object: &Map<String, Value>, keys: &[&'a str]) -> Vec<&'a str> {
    keys.iter()
        .copied()
        .filter(|key| !object.contains_key(*key))
        .collect()
}

// ============================================================================
// Templates
// ============================================================================

/// Project template the generated website targets.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum Template {
    #[default]
    #[serde(rename = "vite-react")]
    ViteReact,
    #[serde(rename = "nextjs")]
    NextJs,
    #[serde(rename = "vite-react-ts")]
    ViteReactTs,
}

impl Template {
    pub const ALL: [Template; 3] = [Template::ViteReact, Template::NextJs, Template::ViteReactTs];

    pub fn as_str(&self) -> &'static str {
        match self {
            Template::ViteReact => "vite-react",
            Template::NextJs => "nextjs",
            Template::ViteReactTs => "vite-react-ts",
        }
    }

    /// Extension expected on React source files.
    pub fn source_extension(&self) -> &'static str {
        match self {
            Template::ViteReactTs => ".tsx",
            Template::ViteReact | Template::NextJs => ".jsx",
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Template {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Template::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = Template::ALL.iter().map(Template::as_str).collect();
                format!("Invalid template: {s}. Must be one of: {}", valid.join(", "))
            })
    }
}

// ============================================================================
// Architecture Stage
// ============================================================================

/// A non-page file in the project structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FileEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: String,
}

/// A routed page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PageEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub route: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FileStructure {
    pub pages: Vec<PageEntry>,
    pub layouts: Vec<FileEntry>,
    pub components: Vec<FileEntry>,
    pub config: Vec<FileEntry>,
    pub routing: Vec<FileEntry>,
    pub entry: Vec<FileEntry>,
}

/// Kind of file in the manifest, in generation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Config,
    Entry,
    Routing,
    Layout,
    Component,
    Page,
}

/// One file the generation stage must produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub path: String,
    pub name: String,
    pub category: FileCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
}

/// Project structure produced by the architecture stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArchitectureSpec {
    pub project_name: String,
    pub template: Template,
    pub file_structure: FileStructure,
    pub dependencies: Vec<String>,
    /// Feature flags; every value must be a boolean
    pub features: Map<String, Value>,
}

const REQUIRED_FEATURES: [&str; 5] = [
    "routing",
    "stateManagement",
    "apiIntegration",
    "authentication",
    "forms",
];

impl StageOutput for ArchitectureSpec {
    const REQUIRED_KEYS: &'static [&'static str] = &[
        "projectName",
        "template",
        "fileStructure",
        "dependencies",
        "features",
    ];
}

impl ArchitectureSpec {
    pub fn validate(&self) -> Result<(), StageError> {
        if self.project_name.trim().is_empty() {
            return Err(invalid("projectName must be a non-empty string"));
        }

        let fs = &self.file_structure;
        if fs.pages.is_empty() {
            return Err(invalid("fileStructure.pages must contain at least one page"));
        }
        if let Some(page) = fs
            .pages
            .iter()
            .find(|p| p.name.is_empty() || p.path.is_empty() || p.route.is_empty())
        {
            return Err(invalid(format!(
                "Invalid page object: {}. Must have name, path, and route",
                page.path
            )));
        }
        if fs.layouts.is_empty() {
            return Err(invalid(
                "fileStructure.layouts must contain at least one layout",
            ));
        }
        for (group, files) in [
            ("layouts", &fs.layouts),
            ("components", &fs.components),
            ("config", &fs.config),
            ("routing", &fs.routing),
            ("entry", &fs.entry),
        ] {
            if let Some(file) = files.iter().find(|f| f.name.is_empty() || f.path.is_empty()) {
                return Err(invalid(format!(
                    "Invalid file object in {group}: name={:?} path={:?}. Must have name and path",
                    file.name, file.path
                )));
            }
        }

        let missing_deps: Vec<&str> = ["react", "react-dom"]
            .into_iter()
            .filter(|dep| !self.dependencies.iter().any(|d| d == dep))
            .collect();
        if !missing_deps.is_empty() {
            return Err(invalid(format!(
                "Missing required dependencies: {}",
                missing_deps.join(", ")
            )));
        }

        let missing_features = missing_keys(&self.features, &REQUIRED_FEATURES);
        if !missing_features.is_empty() {
            return Err(invalid(format!(
                "Missing required features: {}",
                missing_features.join(", ")
            )));
        }
        if let Some((name, _)) = self.features.iter().find(|(_, v)| !v.is_boolean()) {
            return Err(invalid(format!("Feature {name} must be a boolean")));
        }

        Ok(())
    }

    /// Non-fatal findings: React sources whose extension does not match
    /// the template.
    pub fn warnings(&self) -> Vec<String> {
        let fs = &self.file_structure;
        let expected = self.template.source_extension();
        let sources = fs
            .pages
            .iter()
            .map(|p| p.path.as_str())
            .chain(fs.layouts.iter().map(|f| f.path.as_str()))
            .chain(fs.components.iter().map(|f| f.path.as_str()))
            .chain(fs.routing.iter().map(|f| f.path.as_str()))
            .chain(
                fs.entry
                    .iter()
                    .map(|f| f.path.as_str())
                    .filter(|p| p.contains("src/")),
            );

        sources
            .filter(|path| path.contains(".js") && !path.ends_with(expected))
            .map(|path| {
                format!(
                    "File {path} should use {expected} extension for template {}",
                    self.template
                )
            })
            .collect()
    }

    /// Every file to generate: config, entry, routing, layouts, components,
    /// pages. A path listed twice is generated once.
    pub fn manifest(&self) -> Vec<ManifestEntry> {
        let fs = &self.file_structure;
        let mut seen = HashSet::new();
        let mut manifest = Vec::new();

        let groups = [
            (FileCategory::Config, &fs.config),
            (FileCategory::Entry, &fs.entry),
            (FileCategory::Routing, &fs.routing),
            (FileCategory::Layout, &fs.layouts),
            (FileCategory::Component, &fs.components),
        ];
        for (category, files) in groups {
            for file in files {
                if seen.insert(file.path.clone()) {
                    manifest.push(ManifestEntry {
                        path: file.path.clone(),
                        name: file.name.clone(),
                        category,
                        route: None,
                    });
                }
            }
        }
        for page in &fs.pages {
            if seen.insert(page.path.clone()) {
                manifest.push(ManifestEntry {
                    path: page.path.clone(),
                    name: page.name.clone(),
                    category: FileCategory::Page,
                    route: Some(page.route.clone()),
                });
            }
        }
        manifest
    }
}

// ============================================================================
// Planning Stage
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ComponentAppType {
    Dashboard,
    Landing,
    Form,
    Tool,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Medium,
    Complex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DesignStyle {
    Modern,
    Minimal,
    Playful,
    Elegant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum WebsiteAppType {
    MultiPageWebsite,
    WebApp,
    Portfolio,
    Blog,
    Ecommerce,
    Other,
}

/// Technical plan for a single component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentPlan {
    pub app_type: ComponentAppType,
    pub components: Vec<Value>,
    pub features: Vec<Value>,
    pub complexity: Complexity,
    pub design_style: DesignStyle,
    /// Anything else the model chose to include
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StageOutput for ComponentPlan {
    const REQUIRED_KEYS: &'static [&'static str] = &[
        "appType",
        "components",
        "features",
        "complexity",
        "designStyle",
    ];
}

/// One page of a website plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PagePlan {
    pub name: String,
    pub purpose: String,
    pub components: Vec<Value>,
    pub features: Vec<Value>,
}

impl PagePlan {
    /// Lower-cased feature descriptions, for keyword matching.
    pub fn feature_text(&self) -> Vec<String> {
        self.features
            .iter()
            .map(|f| match f {
                Value::String(s) => s.to_lowercase(),
                other => other.to_string().to_lowercase(),
            })
            .collect()
    }
}

/// Technical plan for a multi-page website.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebsitePlan {
    pub app_type: WebsiteAppType,
    pub pages: Vec<PagePlan>,
    pub shared_components: Vec<Value>,
    pub routing: Map<String, Value>,
    pub design_style: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StageOutput for WebsitePlan {
    const REQUIRED_KEYS: &'static [&'static str] = &[
        "appType",
        "pages",
        "sharedComponents",
        "routing",
        "designStyle",
    ];
}

/// Output of the planning stage; the variant follows the run kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PlanningSpec {
    Component(ComponentPlan),
    Website(WebsitePlan),
}

// ============================================================================
// Design Stage
// ============================================================================

/// Design tokens shared by every generated file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DesignSystem {
    pub colors: Map<String, Value>,
    pub fonts: Map<String, Value>,
    /// Array or object of spacing tokens
    pub spacing: Value,
    pub style: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakpoints: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typography: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effects: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StageOutput for DesignSystem {
    const REQUIRED_KEYS: &'static [&'static str] = &["colors", "fonts", "spacing", "style"];
}

fn require_group(
    group: &Option<Map<String, Value>>,
    label: &str,
    keys: &[&str],
) -> Result<(), StageError> {
    let Some(object) = group else {
        return Err(invalid(format!(
            "{label} are required for multi-page websites and must be an object"
        )));
    };
    let missing = missing_keys(object, keys);
    if !missing.is_empty() {
        return Err(invalid(format!("Missing required {label}: {}", missing.join(", "))));
    }
    Ok(())
}

impl DesignSystem {
    /// Checks shared by component and website runs.
    pub fn validate(&self) -> Result<(), StageError> {
        let missing = missing_keys(&self.colors, &["primary", "secondary", "accent", "bg", "text"]);
        if !missing.is_empty() {
            return Err(invalid(format!("Missing required colors: {}", missing.join(", "))));
        }
        let missing = missing_keys(&self.fonts, &["heading", "body"]);
        if !missing.is_empty() {
            return Err(invalid(format!("Missing required fonts: {}", missing.join(", "))));
        }
        if !(self.spacing.is_array() || self.spacing.is_object()) {
            return Err(invalid("spacing must be an array or object"));
        }
        if self.style.trim().is_empty() {
            return Err(invalid("style must be a non-empty string"));
        }
        Ok(())
    }

    /// Website runs additionally need breakpoints, component styles,
    /// layout and typography.
    pub fn validate_website(&self) -> Result<(), StageError> {
        self.validate()?;
        require_group(&self.breakpoints, "breakpoints", &["sm", "md", "lg"])?;
        require_group(&self.components, "component styles", &["navbar", "footer", "button"])?;
        require_group(
            &self.layout,
            "layout properties",
            &["maxWidth", "containerPadding", "sectionSpacing"],
        )?;
        require_group(&self.typography, "typography styles", &["h1", "h2", "body"])?;
        if let Some(effects) = &self.effects {
            if !effects.is_object() {
                return Err(invalid("effects must be an object"));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Generated Files
// ============================================================================

/// A generated source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileArtifact {
    pub path: String,
    pub content: String,
}

impl FileArtifact {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Ordered set of generated files with unique paths.
///
/// Writing an existing path replaces its content and keeps the position of
/// the first write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    files: IndexMap<String, String>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; returns the previous content.
    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) -> Option<String> {
        self.files.insert(path.into(), content.into())
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }

    /// Append every file of `other`, replacing on path collision.
    pub fn extend(&mut self, other: FileSet) {
        self.files.extend(other.files);
    }

    pub fn to_artifacts(&self) -> Vec<FileArtifact> {
        self.iter().map(|(p, c)| FileArtifact::new(p, c)).collect()
    }
}

impl FromIterator<FileArtifact> for FileSet {
    fn from_iter<I: IntoIterator<Item = FileArtifact>>(iter: I) -> Self {
        let mut set = FileSet::new();
        for file in iter {
            set.insert(file.path, file.content);
        }
        set
    }
}

impl Serialize for FileSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.to_artifacts())
    }
}

// ============================================================================
// Quality Stage
// ============================================================================

/// A problem found by the reviewer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Issue {
    /// bug, performance, a11y, ux or security
    #[serde(rename = "type", default)]
    pub kind: String,
    /// critical, high, medium or low
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
}

/// An issue spanning several files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CrossFileIssue {
    #[serde(flatten)]
    pub issue: Issue,
    #[serde(default)]
    pub affected_files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentReview {
    pub issues: Vec<Issue>,
    pub needs_revision: bool,
    pub overall_quality: String,
}

impl StageOutput for ComponentReview {
    const REQUIRED_KEYS: &'static [&'static str] = &["issues", "needsRevision", "overallQuality"];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebsiteReview {
    pub file_issues: BTreeMap<String, Vec<Issue>>,
    pub cross_file_issues: Vec<CrossFileIssue>,
    pub files_with_issues: Vec<String>,
    pub needs_revision: bool,
    pub overall_quality: String,
}

impl StageOutput for WebsiteReview {
    const REQUIRED_KEYS: &'static [&'static str] = &[
        "fileIssues",
        "crossFileIssues",
        "filesWithIssues",
        "needsRevision",
        "overallQuality",
    ];
}

impl WebsiteReview {
    /// Enforce that every flagged path has at least one issue pointing at
    /// it, and that no path is flagged twice. Returns the dropped paths.
    pub fn normalize(&mut self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut dropped = Vec::new();
        let file_issues = &self.file_issues;
        let cross = &self.cross_file_issues;

        self.files_with_issues.retain(|path| {
            if !seen.insert(path.clone()) {
                return false;
            }
            let referenced = file_issues.contains_key(path)
                || cross.iter().any(|c| c.affected_files.contains(path));
            if !referenced {
                dropped.push(path.clone());
            }
            referenced
        });
        dropped
    }

    pub fn total_issues(&self) -> usize {
        self.file_issues.values().map(Vec::len).sum::<usize>() + self.cross_file_issues.len()
    }

    /// Compact review frame payload.
    pub fn summary(&self) -> Value {
        serde_json::json!({
            "filesWithIssues": self.files_with_issues,
            "totalIssues": self.total_issues(),
            "needsRevision": self.needs_revision,
            "overallQuality": self.overall_quality,
        })
    }
}

/// Output of the quality stage; the variant follows the run kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QualityReport {
    Component(ComponentReview),
    Website(WebsiteReview),
}

impl QualityReport {
    pub fn needs_revision(&self) -> bool {
        match self {
            QualityReport::Component(r) => r.needs_revision,
            QualityReport::Website(r) => r.needs_revision,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixtures;

    #[test]
    fn test_template_parsing() {
        assert_eq!("nextjs".parse::<Template>().unwrap(), Template::NextJs);
        let err = "angular".parse::<Template>().unwrap_err();
        assert_eq!(
            err,
            "Invalid template: angular. Must be one of: vite-react, nextjs, vite-react-ts"
        );
    }

    #[test]
    fn test_architecture_fixture_validates() {
        let spec: ArchitectureSpec = serde_json::from_value(fixtures::architecture()).unwrap();
        spec.validate().unwrap();
        assert!(spec.warnings().is_empty());
    }

    #[test]
    fn test_manifest_order_and_dedup() {
        let mut value = fixtures::architecture();
        // Same path listed as a component and a layout
        value["fileStructure"]["components"]
            .as_array_mut()
            .unwrap()
            .push(serde_json::json!({"name": "MainLayout", "path": "src/layouts/MainLayout.jsx"}));
        let spec: ArchitectureSpec = serde_json::from_value(value).unwrap();

        let manifest = spec.manifest();
        let paths: Vec<&str> = manifest.iter().map(|m| m.path.as_str()).collect();
        let unique: HashSet<&str> = paths.iter().copied().collect();

        assert_eq!(paths.len(), unique.len());
        assert_eq!(manifest[0].category, FileCategory::Config);
        assert_eq!(manifest.last().unwrap().category, FileCategory::Page);
        assert_eq!(manifest.last().unwrap().route.as_deref(), Some("/about"));
    }

    #[test]
    fn test_architecture_requires_react_dom() {
        let mut value = fixtures::architecture();
        value["dependencies"] = serde_json::json!(["react"]);
        let spec: ArchitectureSpec = serde_json::from_value(value).unwrap();
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("react-dom"));
    }

    #[test]
    fn test_non_boolean_feature_rejected() {
        let mut value = fixtures::architecture();
        value["features"]["forms"] = serde_json::json!("yes");
        let spec: ArchitectureSpec = serde_json::from_value(value).unwrap();
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_extension_mismatch_is_warning() {
        let mut value = fixtures::architecture();
        value["template"] = serde_json::json!("vite-react-ts");
        let spec: ArchitectureSpec = serde_json::from_value(value).unwrap();
        spec.validate().unwrap();
        assert!(!spec.warnings().is_empty());
    }

    #[test]
    fn test_component_plan_rejects_unknown_app_type() {
        let mut value = fixtures::component_plan();
        value["appType"] = serde_json::json!("spaceship");
        assert!(serde_json::from_value::<ComponentPlan>(value).is_err());
    }

    #[test]
    fn test_design_website_requirements() {
        let design: DesignSystem = serde_json::from_value(fixtures::design()).unwrap();
        design.validate().unwrap();
        design.validate_website().unwrap();

        let mut value = fixtures::design();
        value.as_object_mut().unwrap().remove("breakpoints");
        let design: DesignSystem = serde_json::from_value(value).unwrap();
        design.validate().unwrap();
        let err = design.validate_website().unwrap_err();
        assert!(err.to_string().contains("breakpoints"));
    }

    #[test]
    fn test_file_set_replaces_in_place() {
        let mut files = FileSet::new();
        files.insert("a.jsx", "one");
        files.insert("b.jsx", "two");
        assert_eq!(files.insert("a.jsx", "three"), Some("one".to_string()));

        let paths: Vec<&str> = files.paths().collect();
        assert_eq!(paths, vec!["a.jsx", "b.jsx"]);
        assert_eq!(files.get("a.jsx"), Some("three"));

        let json = serde_json::to_value(&files).unwrap();
        assert_eq!(json[0]["path"], "a.jsx");
        assert_eq!(json[0]["content"], "three");
    }

    #[test]
    fn test_review_normalization() {
        let mut review: WebsiteReview = serde_json::from_value(serde_json::json!({
            "fileIssues": {"a.jsx": [{"type": "bug", "severity": "high", "description": "x"}]},
            "crossFileIssues": [{
                "type": "bug", "severity": "high", "description": "bad import",
                "affectedFiles": ["b.jsx", "c.jsx"]
            }],
            "filesWithIssues": ["a.jsx", "b.jsx", "a.jsx", "ghost.jsx"],
            "needsRevision": true,
            "overallQuality": "fair"
        }))
        .unwrap();

        let dropped = review.normalize();

        assert_eq!(review.files_with_issues, vec!["a.jsx", "b.jsx"]);
        assert_eq!(dropped, vec!["ghost.jsx"]);
        assert_eq!(review.total_issues(), 2);
        assert_eq!(review.summary()["totalIssues"], 2);
    }
}
