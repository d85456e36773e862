//! # Sitesmith Server
//!
//! HTTP surface for the generation pipeline: request validation, SSE
//! streaming of run events, CORS and request tracing.

pub mod api;
pub mod config;
pub mod sse;

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use sitesmith_core::swarm::Coordinator;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state
pub struct AppState {
    pub coordinator: Coordinator,
    /// Model reported by the health check
    pub model: String,
}

impl AppState {
    pub fn new(coordinator: Coordinator) -> Self {
        let model = coordinator.config().model.clone();
        Self { coordinator, model }
    }
}

pub type SharedState = Arc<AppState>;

/// Cross-origin policy: the configured frontend only (with credentials),
/// nothing cross-origin in production, anything in development.
pub fn cors_layer(frontend_url: Option<&str>, production: bool) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    match frontend_url.and_then(|url| HeaderValue::from_str(url.trim_end_matches('/')).ok()) {
        Some(origin) => base
            .allow_origin(AllowOrigin::exact(origin))
            .allow_credentials(true),
        None if production => base,
        None => base.allow_origin(Any),
    }
}

pub fn router(state: SharedState, frontend_url: Option<&str>, production: bool) -> Router {
    api::api_routes()
        .layer(cors_layer(frontend_url, production))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
