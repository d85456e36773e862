//! # Generation API
//!
//! The three generation endpoints. Bodies are validated before the
//! response switches to SSE, so a bad request gets a plain 400.

use axum::{
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

use sitesmith_core::models::ChatMessage;
use sitesmith_core::skills::{BackendOptions, Template};
use sitesmith_core::swarm::{PipelineRequest, RunKind};

use super::ApiError;
use crate::sse::stream_run;
use crate::SharedState;

fn default_true() -> bool {
    true
}

/// Body accepted by every generation endpoint. Each endpoint reads the
/// fields it needs.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    /// What to build
    #[schema(example = "A landing page for a neighbourhood bakery")]
    pub prompt: String,
    /// Earlier turns as `{role, content}`, oldest first
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub conversation_history: Vec<ChatMessage>,
    /// Model override (simple runs)
    #[serde(default)]
    pub model: Option<String>,
    /// Run quality review and fixes (component and website runs)
    #[serde(default = "default_true", rename = "enableQA")]
    pub enable_qa: bool,
    /// vite-react, nextjs or vite-react-ts (website runs)
    #[serde(default)]
    pub template: Option<String>,
    /// Also generate a backend (website runs); backendType, database,
    /// authentication, fileUpload, emailService, paymentIntegration,
    /// realtime and caching configure it
    #[serde(default)]
    pub include_backend: bool,
    #[serde(flatten)]
    #[schema(ignore)]
    pub extra: Map<String, Value>,
}

impl GenerateRequest {
    /// Parse and validate a raw body.
    pub fn parse(body: &[u8]) -> Result<Self, ApiError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {e}")))?;
        let Value::Object(fields) = &value else {
            return Err(ApiError::bad_request("Request body must be a JSON object"));
        };

        match fields.get("prompt") {
            Some(Value::String(prompt)) if !prompt.trim().is_empty() => {}
            _ => {
                return Err(ApiError::bad_request(
                    "Prompt is required and must be a non-empty string",
                ))
            }
        }
        match fields.get("conversationHistory") {
            None | Some(Value::Array(_)) => {}
            Some(_) => {
                return Err(ApiError::bad_request(
                    "conversationHistory must be an array",
                ))
            }
        }

        serde_json::from_value(value).map_err(|e| ApiError::bad_request(e.to_string()))
    }

    pub fn into_pipeline(self, kind: RunKind) -> Result<PipelineRequest, ApiError> {
        let template = match (&kind, self.template.as_deref()) {
            (RunKind::Website, Some(name)) => {
                name.parse::<Template>().map_err(ApiError::bad_request)?
            }
            _ => Template::default(),
        };

        let backend = if kind == RunKind::Website && self.include_backend {
            let options: BackendOptions = serde_json::from_value(Value::Object(self.extra.clone()))
                .map_err(|e| ApiError::bad_request(format!("Invalid backend options: {e}")))?;
            Some(options)
        } else {
            None
        };

        Ok(PipelineRequest {
            prompt: self.prompt,
            template,
            history: self.conversation_history,
            enable_qa: kind == RunKind::Simple || self.enable_qa,
            model: if kind == RunKind::Simple { self.model } else { None },
            backend,
            options: self.extra,
        })
    }
}

pub fn generate_routes() -> Router<SharedState> {
    Router::new()
        .route("/generate-simple", post(generate_simple))
        .route("/generate-advanced", post(generate_advanced))
        .route("/generate-website", post(generate_website))
}

fn start(state: SharedState, kind: RunKind, body: &[u8]) -> Response {
    let request = match GenerateRequest::parse(body).and_then(|r| r.into_pipeline(kind)) {
        Ok(request) => request,
        Err(err) => {
            tracing::warn!(?kind, "Rejected request: {}", err.message);
            return err.into_response();
        }
    };
    tracing::info!(
        ?kind,
        prompt_chars = request.prompt.chars().count(),
        history = request.history.len(),
        enable_qa = request.enable_qa,
        backend = request.backend.is_some(),
        "Starting generation"
    );
    stream_run(state, kind, request).into_response()
}

/// Single streamed component
#[utoipa::path(
    post,
    path = "/generate-simple",
    tag = "generate",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "SSE stream of {chunk} frames ending in {stage: complete, code}", content_type = "text/event-stream"),
        (status = 400, description = "Invalid request", body = super::ErrorResponse)
    )
)]
pub async fn generate_simple(State(state): State<SharedState>, body: Bytes) -> Response {
    start(state, RunKind::Simple, &body)
}

/// Planned, designed and reviewed component
#[utoipa::path(
    post,
    path = "/generate-advanced",
    tag = "generate",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "SSE stream of stage, chunk and review frames ending in {stage: complete, code}", content_type = "text/event-stream"),
        (status = 400, description = "Invalid request", body = super::ErrorResponse)
    )
)]
pub async fn generate_advanced(State(state): State<SharedState>, body: Bytes) -> Response {
    start(state, RunKind::Component, &body)
}

/// Multi-file website, optionally with a backend
#[utoipa::path(
    post,
    path = "/generate-website",
    tag = "generate",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "SSE stream of stage and per-file frames ending in {stage: complete, files}", content_type = "text/event-stream"),
        (status = 400, description = "Invalid request", body = super::ErrorResponse)
    )
)]
pub async fn generate_website(State(state): State<SharedState>, body: Bytes) -> Response {
    start(state, RunKind::Website, &body)
}
