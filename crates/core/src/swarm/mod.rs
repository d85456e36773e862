//! # Swarm Orchestration
//!
//! Drives the stage agents for one generation run.
//!
//! ## Pipeline Flow
//!
//! ```text
//! Request → Architecture → Planning → Design → Code (fan-out) → Quality → Fix → Backend
//! ```
//!
//! Progress leaves the coordinator as [`PipelineEvent`]s through an
//! [`EventSink`]; the transport decides how to deliver them.

pub mod coordinator;
pub mod events;
pub mod fanout;
pub mod fix_plan;
pub mod pipeline;

pub use coordinator::{Coordinator, CoordinatorConfig, PipelineRequest, DEFAULT_CRITICAL_FILES};
pub use events::{channel, CompletionPayload, EventSink, FileError, PipelineEvent};
pub use fanout::{FanOut, FanOutReport};
pub use fix_plan::{plan_fixes, FixTarget};
pub use pipeline::{Pipeline, PipelineStage, RunKind};
