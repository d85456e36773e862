//! # Sitesmith Core
//!
//! Everything behind the HTTP surface: the model gateway, the stage
//! agents and the pipeline that chains them.
//!
//! ## Architecture
//!
//! - `gateway/` - Groq chat-completion client with retry and streaming
//! - `skills/` - Stage agents (architecture, planning, design, code, quality, fix, backend)
//! - `swarm/` - Pipeline state machine, file fan-out and event stream
//! - `models` - Chat messages and per-stage sampling settings
//! - `error` - Error types shared by all layers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sitesmith_core::gateway::{GroqConfig, GroqGateway, LlmClient};
//! use sitesmith_core::swarm::{channel, Coordinator, CoordinatorConfig, PipelineRequest, RunKind};
//!
//! let gateway = GroqGateway::new(GroqConfig::new(api_key))?;
//! let coordinator = Coordinator::new(LlmClient::new(Arc::new(gateway)), CoordinatorConfig::default());
//! let (mut sink, mut events) = channel();
//! coordinator.execute(RunKind::Website, PipelineRequest::new("A bakery website"), &mut sink).await?;
//! ```

pub mod error;
pub mod gateway;
pub mod models;
pub mod skills;
pub mod swarm;

#[cfg(test)]
mod test_support;
