//! # Backend Skill
//!
//! Optional last stage of a website run: derives API routes and data models
//! from the website plan and generates a backend for the chosen kind.
//!
//! A file that fails to generate is skipped and reported; the backend stage
//! never fails the run.

use serde::{Deserialize, Serialize};

use super::artifact_registry::{ArchitectureSpec, FileSet, WebsitePlan};
use super::{pretty, prompts, StageContext};
use crate::error::StageError;
use crate::models::ModelConfig;

/// Which backend to generate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    #[default]
    Express,
    NextjsApi,
    Supabase,
    Firebase,
}

fn default_database() -> String {
    "mongodb".to_string()
}

fn default_true() -> bool {
    true
}

/// Backend switches supplied with a website request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendOptions {
    #[serde(default)]
    pub backend_type: BackendKind,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_true")]
    pub authentication: bool,
    #[serde(default)]
    pub file_upload: bool,
    #[serde(default)]
    pub email_service: bool,
    #[serde(default)]
    pub payment_integration: bool,
    #[serde(default)]
    pub realtime: bool,
    #[serde(default)]
    pub caching: bool,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            backend_type: BackendKind::default(),
            database: default_database(),
            authentication: true,
            file_upload: false,
            email_service: false,
            payment_integration: false,
            realtime: false,
            caching: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiRoute {
    pub name: String,
    pub path: String,
    pub methods: Vec<&'static str>,
    pub protected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelField {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataModel {
    pub name: String,
    pub fields: Vec<ModelField>,
}

/// One backend file to generate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendFile {
    pub path: String,
    pub purpose: String,
}

impl BackendFile {
    fn new(path: impl Into<String>, purpose: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            purpose: purpose.into(),
        }
    }
}

/// Everything the backend generator needs, derived from the website plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendPlan {
    #[serde(rename = "type")]
    pub kind: BackendKind,
    pub database: String,
    pub authentication: bool,
    pub routes: Vec<ApiRoute>,
    pub models: Vec<DataModel>,
    pub options: BackendOptions,
}

fn mentions(features: &[String], keywords: &[&str]) -> bool {
    features
        .iter()
        .any(|f| keywords.iter().any(|k| f.contains(k)))
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lower-case route segment: runs of anything but ASCII letters and digits
/// become a single `-`, with none at either end.
fn slug(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// `about-us` -> `AboutUs`
fn model_name(slug: &str) -> String {
    slug.split('-').map(capitalize).collect()
}

impl BackendPlan {
    /// Data pages (features mentioning list, crud or data) get a CRUD route;
    /// list and crud pages also get a model. `users` and `User` always exist.
    pub fn from_planning(plan: &WebsitePlan, options: &BackendOptions) -> Self {
        let mut routes: Vec<ApiRoute> = Vec::new();
        let mut models = vec![DataModel {
            name: "User".to_string(),
            fields: vec![
                ModelField { name: "email", kind: "string", required: true },
                ModelField { name: "password", kind: "string", required: true },
                ModelField { name: "name", kind: "string", required: true },
                ModelField { name: "role", kind: "string", required: false },
            ],
        }];

        for page in &plan.pages {
            let features = page.feature_text();
            let page_slug = slug(&page.name);
            if page_slug.is_empty() {
                continue;
            }
            if mentions(&features, &["list", "crud", "data"]) {
                let name = page_slug.clone();
                if !routes.iter().any(|r| r.name == name) {
                    routes.push(ApiRoute {
                        path: name.clone(),
                        name,
                        methods: vec!["GET", "POST", "PUT", "DELETE"],
                        protected: true,
                    });
                }
            }
            if mentions(&features, &["list", "crud"]) {
                let name = model_name(&page_slug);
                if !models.iter().any(|m| m.name == name) {
                    models.push(DataModel {
                        name,
                        fields: vec![
                            ModelField { name: "title", kind: "string", required: true },
                            ModelField { name: "description", kind: "string", required: false },
                            ModelField { name: "userId", kind: "string", required: true },
                        ],
                    });
                }
            }
        }

        if !routes.iter().any(|r| r.name == "users") {
            routes.push(ApiRoute {
                name: "users".to_string(),
                path: "users".to_string(),
                methods: vec!["GET", "PUT"],
                protected: true,
            });
        }

        Self {
            kind: options.backend_type,
            database: options.database.clone(),
            authentication: options.authentication,
            routes,
            models,
            options: options.clone(),
        }
    }

    /// Files to generate for the backend kind.
    pub fn manifest(&self) -> Vec<BackendFile> {
        match self.kind {
            BackendKind::Express => {
                let mut files = vec![
                    BackendFile::new("backend/package.json", "npm manifest for the API server"),
                    BackendFile::new("backend/server.js", "Express app with middleware and route mounting"),
                ];
                if !self.database.is_empty() {
                    files.push(BackendFile::new(
                        "backend/config/database.js",
                        format!("{} connection setup", self.database),
                    ));
                }
                for route in &self.routes {
                    files.push(BackendFile::new(
                        format!("backend/routes/{}.js", route.name),
                        format!("{} handlers for /api/{}", route.methods.join("/"), route.path),
                    ));
                }
                for model in &self.models {
                    files.push(BackendFile::new(
                        format!("backend/models/{}.js", model.name),
                        format!("{} data model", model.name),
                    ));
                }
                if self.authentication {
                    files.push(BackendFile::new(
                        "backend/middleware/auth.js",
                        "JWT authentication middleware",
                    ));
                }
                files.push(BackendFile::new(
                    "backend/middleware/errorHandler.js",
                    "error handling middleware",
                ));
                files.push(BackendFile::new("backend/.env.example", "environment variable template"));
                files.push(BackendFile::new("backend/README.md", "setup and API documentation"));
                files
            }
            BackendKind::NextjsApi => self
                .routes
                .iter()
                .map(|route| {
                    BackendFile::new(
                        format!("app/api/{}/route.ts", route.path),
                        format!("Next.js route handlers for /api/{}", route.path),
                    )
                })
                .collect(),
            BackendKind::Supabase => vec![
                BackendFile::new("lib/supabase.ts", "Supabase client setup"),
                BackendFile::new(".env.local.example", "Supabase environment variables"),
            ],
            BackendKind::Firebase => vec![
                BackendFile::new("lib/firebase.ts", "Firebase app, auth and Firestore setup"),
                BackendFile::new(".env.local.example", "Firebase environment variables"),
            ],
        }
    }
}

/// Result of the backend stage.
#[derive(Debug, Default)]
pub struct BackendOutput {
    pub files: FileSet,
    /// Files that could not be generated, with the reason
    pub failures: Vec<(String, StageError)>,
}

pub struct BackendSkill;

impl BackendSkill {
    pub async fn run<F>(
        ctx: &StageContext,
        plan: &BackendPlan,
        architecture: &ArchitectureSpec,
        config: &ModelConfig,
        mut on_chunk: F,
    ) -> BackendOutput
    where
        F: FnMut(&str) + Send,
    {
        let context = format!(
            "## Backend Specification\n{}\n\n## Frontend Architecture\n{}",
            pretty(plan),
            pretty(architecture)
        );
        let mut output = BackendOutput::default();

        for file in plan.manifest() {
            let user = format!("Write the file `{}`: {}.", file.path, file.purpose);
            let result = ctx
                .request_code(
                    "backend",
                    vec![prompts::BACKEND.to_string(), context.clone()],
                    user,
                    config,
                    &mut on_chunk,
                )
                .await;
            match result {
                Ok(code) => {
                    output.files.insert(file.path, code);
                }
                Err(err) => {
                    tracing::warn!(path = %file.path, "Backend file generation failed: {err}");
                    output.failures.push((file.path, err));
                }
            }
        }

        tracing::info!(
            kind = ?plan.kind,
            files = output.files.len(),
            failures = output.failures.len(),
            "Backend generation finished"
        );
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, GatewayError};
    use crate::gateway::LlmClient;
    use crate::test_support::{fixtures, ScriptedGateway};

    fn website_plan() -> WebsitePlan {
        serde_json::from_value(fixtures::website_plan()).unwrap()
    }

    #[test]
    fn test_routes_and_models_from_plan() {
        let plan = BackendPlan::from_planning(&website_plan(), &BackendOptions::default());

        let routes: Vec<&str> = plan.routes.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(routes, vec!["menu", "users"]);

        let models: Vec<&str> = plan.models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(models, vec!["User", "Menu"]);
    }

    #[test]
    fn test_express_manifest() {
        let plan = BackendPlan::from_planning(&website_plan(), &BackendOptions::default());
        let paths: Vec<String> = plan.manifest().into_iter().map(|f| f.path).collect();

        assert!(paths.contains(&"backend/server.js".to_string()));
        assert!(paths.contains(&"backend/routes/menu.js".to_string()));
        assert!(paths.contains(&"backend/models/User.js".to_string()));
        assert!(paths.contains(&"backend/middleware/auth.js".to_string()));
    }

    #[test]
    fn test_page_names_become_slugs() {
        let mut plan = website_plan();
        plan.pages[0].name = "About Us".to_string();
        plan.pages[1].name = "  Orders & Returns!".to_string();
        plan.pages[1].features = vec![serde_json::Value::String("order data".to_string())];

        let plan = BackendPlan::from_planning(&plan, &BackendOptions::default());
        let routes: Vec<&str> = plan.routes.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(routes, vec!["about-us", "orders-returns", "users"]);
        assert_eq!(plan.models[1].name, "AboutUs");

        let paths: Vec<String> = plan.manifest().into_iter().map(|f| f.path).collect();
        assert!(paths.contains(&"backend/routes/about-us.js".to_string()));
        assert!(paths.contains(&"backend/models/AboutUs.js".to_string()));
        assert!(!paths.iter().any(|p| p.contains(' ')));
    }

    #[test]
    fn test_nextjs_api_manifest() {
        let options = BackendOptions {
            backend_type: BackendKind::NextjsApi,
            ..BackendOptions::default()
        };
        let plan = BackendPlan::from_planning(&website_plan(), &options);
        let paths: Vec<String> = plan.manifest().into_iter().map(|f| f.path).collect();
        assert_eq!(paths, vec!["app/api/menu/route.ts", "app/api/users/route.ts"]);
    }

    #[test]
    fn test_options_defaults_from_json() {
        let options: BackendOptions =
            serde_json::from_value(serde_json::json!({"backendType": "supabase"})).unwrap();
        assert_eq!(options.backend_type, BackendKind::Supabase);
        assert_eq!(options.database, "mongodb");
        assert!(options.authentication);
    }

    #[tokio::test]
    async fn test_failed_file_is_skipped() {
        let options = BackendOptions {
            backend_type: BackendKind::Supabase,
            ..BackendOptions::default()
        };
        let plan = BackendPlan::from_planning(&website_plan(), &options);
        let gateway = ScriptedGateway::sequence(vec![
            Err(GatewayError::new(ErrorKind::Auth, "denied")),
            Ok("SUPABASE_URL=".to_string()),
        ]);
        let ctx = StageContext::new(LlmClient::new(gateway), vec![]);
        let architecture = serde_json::from_value(fixtures::architecture()).unwrap();

        let output = BackendSkill::run(&ctx, &plan, &architecture, &ModelConfig::default(), |_| {}).await;

        assert_eq!(output.files.len(), 1);
        assert!(output.files.contains(".env.local.example"));
        assert_eq!(output.failures.len(), 1);
        assert_eq!(output.failures[0].0, "lib/supabase.ts");
    }
}
