//! End-to-end tests: a real server on an ephemeral port, a scripted model.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use sitesmith_core::error::{ErrorKind, GatewayError};
use sitesmith_core::gateway::{ChatGateway, LlmClient, RetryPolicy};
use sitesmith_core::models::{ChatCompletion, ChatRequest};
use sitesmith_core::skills::prompts;
use sitesmith_core::swarm::{Coordinator, CoordinatorConfig};
use sitesmith_server::{router, AppState};

/// Answers each agent by the heading of its system prompt.
struct FakeModel;

impl FakeModel {
    fn reply(request: &ChatRequest) -> Result<String, GatewayError> {
        let heading = request
            .system_prompt()
            .and_then(prompts::heading)
            .unwrap_or_default();
        let user = request.last_user_message().unwrap_or_default();
        let reply = match heading {
            "Architecture Agent" => json!({
                "projectName": "bakery-site",
                "template": "vite-react",
                "fileStructure": {
                    "config": [{"name": "package.json", "path": "package.json"}],
                    "entry": [
                        {"name": "App", "path": "src/App.jsx"},
                        {"name": "main", "path": "src/main.jsx"},
                        {"name": "index", "path": "index.html"}
                    ],
                    "routing": [],
                    "layouts": [{"name": "MainLayout", "path": "src/layouts/MainLayout.jsx"}],
                    "components": [{"name": "Navbar", "path": "src/components/Navbar.jsx"}],
                    "pages": [{"name": "Home", "path": "src/pages/Home.jsx", "route": "/"}]
                },
                "dependencies": ["react", "react-dom"],
                "features": {
                    "routing": false,
                    "stateManagement": false,
                    "apiIntegration": false,
                    "authentication": false,
                    "forms": false
                }
            })
            .to_string(),
            "Website Planning Agent" => json!({
                "appType": "multi-page-website",
                "pages": [{
                    "name": "Home",
                    "purpose": "Welcome visitors",
                    "components": ["Hero"],
                    "features": ["Opening hours"]
                }],
                "sharedComponents": ["Navbar"],
                "routing": {"library": "react-router-dom"},
                "designStyle": "warm"
            })
            .to_string(),
            "Planning Agent" => json!({
                "appType": "tool",
                "components": [{"name": "Timer", "purpose": "countdown display"}],
                "features": ["25 minute sessions"],
                "complexity": "simple",
                "designStyle": "minimal",
                "interactions": ["click to start"]
            })
            .to_string(),
            "Design Agent" => json!({
                "colors": {
                    "primary": "#8B4513",
                    "secondary": "#F5DEB3",
                    "accent": "#D2691E",
                    "bg": "#FFF8F0",
                    "text": "#2B1B0E"
                },
                "fonts": {"heading": "Playfair Display", "body": "Inter"},
                "spacing": ["4px", "8px", "16px"],
                "style": "warm",
                "breakpoints": {"sm": "640px", "md": "768px", "lg": "1024px"},
                "components": {
                    "navbar": {"height": "64px"},
                    "footer": {"padding": "32px"},
                    "button": {"radius": "8px"}
                },
                "layout": {"maxWidth": "1200px", "containerPadding": "16px", "sectionSpacing": "64px"},
                "typography": {"h1": "3rem", "h2": "2rem", "body": "1rem"}
            })
            .to_string(),
            "Quality Agent" => json!({
                "issues": [],
                "needsRevision": false,
                "overallQuality": "good"
            })
            .to_string(),
            "File Code Agent" => format!("// {}", user.split('`').nth(1).unwrap_or_default()),
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

#[async_trait]
impl ChatGateway for FakeModel {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, GatewayError> {
        Ok(ChatCompletion {
            content: Self::reply(request)?,
            total_tokens: None,
        })
    }

    async fn stream(
        &self,
        request: &ChatRequest,
        on_token: &mut (dyn for<'t> FnMut(&'t str) + Send),
    ) -> Result<String, GatewayError> {
        let content = Self::reply(request)?;
        for word in content.split_inclusive(' ') {
            on_token(word);
        }
        Ok(content)
    }
}

/// Answers like [`FakeModel`] after a delay, counting calls.
struct SlowModel {
    delay: Duration,
    calls: AtomicUsize,
}

impl SlowModel {
    fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn reply(&self, request: &ChatRequest) -> Result<String, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        FakeModel::reply(request)
    }
}

#[async_trait]
impl ChatGateway for SlowModel {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, GatewayError> {
        Ok(ChatCompletion {
            content: self.reply(request).await?,
            total_tokens: None,
        })
    }

    async fn stream(
        &self,
        request: &ChatRequest,
        on_token: &mut (dyn for<'t> FnMut(&'t str) + Send),
    ) -> Result<String, GatewayError> {
        let content = self.reply(request).await?;
        on_token(&content);
        Ok(content)
    }
}

async fn spawn_server_with(gateway: Arc<dyn ChatGateway>, config: CoordinatorConfig) -> String {
    let llm = LlmClient::new(gateway).with_retry(RetryPolicy::default().with_max_attempts(1));
    let state = Arc::new(AppState::new(Coordinator::new(llm, config)));
    let app = router(state, None, false);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn test_config() -> CoordinatorConfig {
    CoordinatorConfig {
        model: "openai/gpt-oss-120b".to_string(),
        ..CoordinatorConfig::default()
    }
}

async fn spawn_server() -> String {
    spawn_server_with(Arc::new(FakeModel), test_config()).await
}

/// POST `body` and collect the JSON of every `data:` frame.
async fn frames(base: &str, path: &str, body: Value) -> Vec<Value> {
    let response = reqwest::Client::new()
        .post(format!("{base}{path}"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/event-stream"));

    let text = response.text().await.unwrap();
    text.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| serde_json::from_str(data.trim()).unwrap())
        .collect()
}

#[tokio::test]
async fn test_health() {
    let base = spawn_server().await;
    let body: Value = reqwest::get(format!("{base}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({"status": "ok", "model": "gpt-oss-120b"}));
}

#[tokio::test]
async fn test_invalid_requests_rejected_before_streaming() {
    let base = spawn_server().await;
    let client = reqwest::Client::new();
    let cases = [
        ("/generate-simple", json!({"prompt": ""}), "Prompt is required and must be a non-empty string"),
        ("/generate-advanced", json!({"prompt": "x", "conversationHistory": {}}), "conversationHistory must be an array"),
        (
            "/generate-website",
            json!({"prompt": "x", "template": "svelte"}),
            "Invalid template: svelte. Must be one of: vite-react, nextjs, vite-react-ts",
        ),
    ];

    for (path, body, message) in cases {
        let response = client.post(format!("{base}{path}")).json(&body).send().await.unwrap();
        assert_eq!(response.status(), 400, "{path}");
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], message);
    }
}

#[tokio::test]
async fn test_simple_stream() {
    let base = spawn_server().await;
    let frames = frames(&base, "/generate-simple", json!({"prompt": "a hello page"})).await;

    let streamed: String = frames
        .iter()
        .filter_map(|f| f["chunk"].as_str())
        .collect();
    assert_eq!(streamed, "const App = () => <main>Hello</main>;");

    let last = frames.last().unwrap();
    assert_eq!(last["stage"], "complete");
    assert_eq!(last["progress"], 100);
    assert_eq!(last["code"], "const App = () => <main>Hello</main>;");
}

#[tokio::test]
async fn test_advanced_reports_review() {
    let base = spawn_server().await;
    let frames = frames(&base, "/generate-advanced", json!({"prompt": "a pomodoro timer"})).await;

    assert!(frames.iter().any(|f| f["stage"] == "planning"));
    assert!(frames.iter().any(|f| f.get("review").is_some()));
    assert!(!frames.iter().any(|f| f["stage"] == "fixing"));
    assert_eq!(frames.last().unwrap()["stage"], "complete");
}

#[tokio::test]
async fn test_website_without_qa() {
    let base = spawn_server().await;
    let frames = frames(
        &base,
        "/generate-website",
        json!({"prompt": "a bakery website", "enableQA": false}),
    )
    .await;

    let stages: Vec<&str> = frames.iter().filter_map(|f| f["stage"].as_str()).collect();
    assert!(stages.contains(&"architecture"));
    assert!(!stages.contains(&"reviewing"));

    let progress: Vec<u64> = frames.iter().filter_map(|f| f["progress"].as_u64()).collect();
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));

    let last = frames.last().unwrap();
    assert_eq!(last["stage"], "complete");
    assert_eq!(last["backendIncluded"], false);
    assert_eq!(file_content(last, "package.json"), Some("// package.json"));
    assert_eq!(file_content(last, "src/pages/Home.jsx"), Some("// src/pages/Home.jsx"));
    assert_eq!(last["files"].as_array().unwrap().len(), 7);
}

/// Content of `path` in a complete frame's `files` list.
fn file_content<'a>(frame: &'a Value, path: &str) -> Option<&'a str> {
    frame["files"]
        .as_array()?
        .iter()
        .find(|file| file["path"] == path)
        .and_then(|file| file["content"].as_str())
}

#[tokio::test]
async fn test_disconnect_stops_generation() {
    let model = SlowModel::new(Duration::from_millis(200));
    let base = spawn_server_with(model.clone(), test_config()).await;

    let mut response = reqwest::Client::new()
        .post(format!("{base}/generate-website"))
        .json(&json!({"prompt": "a bakery website", "enableQA": false}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let first = response.chunk().await.unwrap().unwrap();
    assert!(String::from_utf8_lossy(&first).contains("architecture"));
    drop(response);

    // Let the server notice the closed connection, then watch for new calls
    tokio::time::sleep(Duration::from_millis(1000)).await;
    let settled = model.calls();
    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert_eq!(model.calls(), settled);
    // A full run makes 3 stage calls plus one per file
    assert!(settled < 10, "run kept going after disconnect: {settled} calls");
}

#[tokio::test]
async fn test_run_deadline_sends_error_frame() {
    let model = SlowModel::new(Duration::from_secs(3));
    let config = CoordinatorConfig {
        website_timeout_secs: 1,
        ..test_config()
    };
    let base = spawn_server_with(model, config).await;

    let frames = frames(&base, "/generate-website", json!({"prompt": "a bakery website"})).await;

    let last = frames.last().unwrap();
    assert_eq!(
        last["error"],
        "Request timeout - generation took longer than 1 seconds"
    );
    assert_eq!(last["stage"], "pipeline");
    assert!(!frames.iter().any(|f| f["stage"] == "complete"));
}
