//! In-memory gateway and stage fixtures shared by the unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{ErrorKind, GatewayError};
use crate::gateway::ChatGateway;
use crate::models::{ChatCompletion, ChatRequest};

type Responder = Box<dyn Fn(&ChatRequest) -> Result<String, GatewayError> + Send + Sync>;

enum Script {
    Sequence(Mutex<VecDeque<Result<String, GatewayError>>>),
    Responder(Responder),
}

/// Gateway that answers from a script and records every request.
pub struct ScriptedGateway {
    script: Script,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedGateway {
    /// Replies in order, one per attempt.
    pub fn sequence(replies: Vec<Result<String, GatewayError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Script::Sequence(Mutex::new(replies.into())),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Replies computed from the request.
    pub fn responder<F>(respond: F) -> Arc<Self>
    where
        F: Fn(&ChatRequest) -> Result<String, GatewayError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            script: Script::Responder(Box::new(respond)),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn next(&self, request: &ChatRequest) -> Result<String, GatewayError> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.script {
            Script::Sequence(replies) => replies.lock().unwrap().pop_front().unwrap_or_else(|| {
                Err(GatewayError::new(
                    ErrorKind::InvalidRequest(400),
                    "script exhausted",
                ))
            }),
            Script::Responder(respond) => respond(request),
        }
    }
}

#[async_trait]
impl ChatGateway for ScriptedGateway {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, GatewayError> {
        let content = self.next(request)?;
        Ok(ChatCompletion {
            content,
            total_tokens: Some(42),
        })
    }

    async fn stream(
        &self,
        request: &ChatRequest,
        on_token: &mut (dyn for<'t> FnMut(&'t str) + Send),
    ) -> Result<String, GatewayError> {
        let content = self.next(request)?;
        let chars: Vec<char> = content.chars().collect();
        for piece in chars.chunks(8) {
            let piece: String = piece.iter().collect();
            on_token(&piece);
            tokio::task::yield_now().await;
        }
        Ok(content)
    }
}

pub mod fixtures {
    use serde_json::{json, Value};

    use crate::error::{ErrorKind, GatewayError};
    use crate::models::ChatRequest;
    use crate::skills::prompts;

    pub fn architecture() -> Value {
        json!({
            "projectName": "bakery-site",
            "template": "vite-react",
            "fileStructure": {
                "config": [{"name": "package.json", "path": "package.json"}],
                "entry": [
                    {"name": "App", "path": "src/App.jsx"},
                    {"name": "main", "path": "src/main.jsx"},
                    {"name": "index", "path": "index.html"}
                ],
                "routing": [{"name": "routes", "path": "src/routes.jsx"}],
                "layouts": [{"name": "MainLayout", "path": "src/layouts/MainLayout.jsx"}],
                "components": [
                    {"name": "Navbar", "path": "src/components/Navbar.jsx"},
                    {"name": "Footer", "path": "src/components/Footer.jsx"}
                ],
                "pages": [
                    {"name": "Home", "path": "src/pages/Home.jsx", "route": "/"},
                    {"name": "About", "path": "src/pages/About.jsx", "route": "/about"}
                ]
            },
            "dependencies": ["react", "react-dom", "react-router-dom"],
            "features": {
                "routing": true,
                "stateManagement": false,
                "apiIntegration": false,
                "authentication": false,
                "forms": true
            }
        })
    }

    pub fn component_plan() -> Value {
        json!({
            "appType": "tool",
            "components": [
                {"name": "Timer", "purpose": "countdown display"},
                {"name": "Controls", "purpose": "start, pause and reset"}
            ],
            "features": ["25 minute sessions", "short breaks"],
            "complexity": "simple",
            "designStyle": "minimal",
            "interactions": ["click to start", "keyboard shortcuts"]
        })
    }

    pub fn website_plan() -> Value {
        json!({
            "appType": "multi-page-website",
            "pages": [
                {
                    "name": "Menu",
                    "purpose": "Show the breads and pastries",
                    "components": ["MenuGrid"],
                    "features": ["Menu list with prices"]
                },
                {
                    "name": "About",
                    "purpose": "Tell the bakery story",
                    "components": ["Story"],
                    "features": ["team photos"]
                }
            ],
            "sharedComponents": ["Navbar", "Footer"],
            "routing": {"library": "react-router-dom"},
            "designStyle": "warm"
        })
    }

    pub fn design() -> Value {
        json!({
            "colors": {
                "primary": "#8B4513",
                "secondary": "#F5DEB3",
                "accent": "#D2691E",
                "bg": "#FFF8F0",
                "text": "#2B1B0E"
            },
            "fonts": {"heading": "Playfair Display", "body": "Inter"},
            "spacing": ["4px", "8px", "16px", "32px"],
            "style": "warm and rustic",
            "breakpoints": {"sm": "640px", "md": "768px", "lg": "1024px"},
            "components": {
                "navbar": {"height": "64px"},
                "footer": {"padding": "32px"},
                "button": {"radius": "8px"}
            },
            "layout": {"maxWidth": "1200px", "containerPadding": "16px", "sectionSpacing": "64px"},
            "typography": {"h1": "3rem", "h2": "2rem", "body": "1rem"}
        })
    }

    pub fn component_review(needs_revision: bool) -> Value {
        json!({
            "issues": [{
                "type": "a11y",
                "severity": "medium",
                "description": "Start button has no accessible label",
                "fix": "Add aria-label"
            }],
            "needsRevision": needs_revision,
            "overallQuality": if needs_revision { "fair" } else { "good" }
        })
    }

    /// A website review flagging `flagged`, each with one file issue.
    pub fn website_review(flagged: &[&str]) -> Value {
        let file_issues: serde_json::Map<String, Value> = flagged
            .iter()
            .map(|path| {
                (
                    path.to_string(),
                    json!([{"type": "bug", "severity": "high", "description": "Broken import"}]),
                )
            })
            .collect();
        json!({
            "fileIssues": file_issues,
            "crossFileIssues": [],
            "filesWithIssues": flagged,
            "needsRevision": !flagged.is_empty(),
            "overallQuality": if flagged.is_empty() { "excellent" } else { "fair" }
        })
    }

    fn backticked(text: &str) -> &str {
        text.split('`').nth(1).unwrap_or_default()
    }

    /// Answers every agent of a run; routed by the system prompt heading.
    /// Code agents reply with a comment naming the file they were asked for.
    pub fn responder(
        quality: Value,
    ) -> impl Fn(&ChatRequest) -> Result<String, GatewayError> + Send + Sync + 'static {
        move |request: &ChatRequest| {
            let heading = request
                .system_prompt()
                .and_then(prompts::heading)
                .unwrap_or_default();
            let user = request.last_user_message().unwrap_or_default();
            let reply = match heading {
                "Architecture Agent" => architecture().to_string(),
                "Website Planning Agent" => website_plan().to_string(),
                "Planning Agent" => component_plan().to_string(),
                "Design Agent" => design().to_string(),
                "Quality Agent" => quality.to_string(),
                "File Code Agent" => format!("// {}", backticked(user)),
                "Backend Agent" => format!("// backend {}", backticked(user)),
                "Fix Agent" => {
                    let target = request.messages[1]
                        .content
                        .lines()
                        .next()
                        .and_then(|line| line.strip_prefix("File to Fix: "))
                        .unwrap_or("component");
                    format!("// fixed {target}")
                }
                "Simple Generator" | "Component Code Agent" => {
                    "const App = () => <main>Hello</main>;".to_string()
                }
                other => {
                    return Err(GatewayError::new(
                        ErrorKind::InvalidRequest(400),
                        format!("unexpected agent {other}"),
                    ))
                }
            };
            Ok(reply)
        }
    }

    /// Website run responder with the given review.
    pub fn website_responder(
        review: Value,
    ) -> impl Fn(&ChatRequest) -> Result<String, GatewayError> + Send + Sync + 'static {
        responder(review)
    }
}
