//! # HTTP API
//!
//! Health check, OpenAPI document and the generation endpoints.

pub mod generate;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::SharedState;

/// A request rejected before any generation started.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    /// Configured model, without its provider prefix
    #[schema(example = "gpt-oss-120b")]
    pub model: String,
}

// === OpenAPI Definition ===

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Sitesmith API",
        version = "1.0.0",
        description = "Multi-stage website and component generation over server-sent events"
    ),
    paths(
        health,
        generate::generate_simple,
        generate::generate_advanced,
        generate::generate_website
    ),
    components(schemas(HealthResponse, ErrorResponse, generate::GenerateRequest)),
    tags(
        (name = "health", description = "Liveness"),
        (name = "generate", description = "Streamed generation runs")
    )
)]
pub struct ApiDoc;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        .route("/health", get(health))
        .route("/openapi.json", get(serve_openapi))
        .merge(generate::generate_routes())
}

/// Liveness check
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let model = state.model.rsplit('/').next().unwrap_or(&state.model);
    Json(HealthResponse {
        status: "ok".to_string(),
        model: model.to_string(),
    })
}

async fn serve_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
