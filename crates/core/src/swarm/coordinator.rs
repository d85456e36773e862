//! # Swarm Coordinator
//!
//! Runs one generation request through the stage agents and reports every
//! step as a [`PipelineEvent`].
//!
//! ```text
//! simple:    generating ─────────────────────────────────────────► complete
//! component: planning → designing → generating → [reviewing → fixing] → complete
//! website:   architecture → planning → designing → generating (fan-out)
//!            → [reviewing → fixing] → [backend] → complete
//! ```
//!
//! The whole run sits under a wall-clock ceiling. Whatever happens, the
//! sink receives exactly one terminal event unless the client is gone.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{PipelineError, StageError};
use crate::gateway::LlmClient;
use crate::models::{ChatMessage, ModelConfig, DEFAULT_MODEL};
use crate::skills::artifact_registry::{ArchitectureSpec, FileSet, Template, WebsiteReview};
use crate::skills::backend_skill::{BackendOptions, BackendPlan, BackendSkill};
use crate::skills::code_skill::{CodeSkill, FileBrief};
use crate::skills::{
    ArchitectureSkill, DesignSkill, FixSkill, PlanningSkill, QualitySkill, StageContext,
};

use super::events::{CompletionPayload, EventSink, PipelineEvent};
use super::fanout::FanOut;
use super::fix_plan::plan_fixes;
use super::pipeline::{Pipeline, PipelineStage, RunKind};

/// Files whose failure aborts a website run.
pub const DEFAULT_CRITICAL_FILES: &[&str] = &[
    "package.json",
    "index.html",
    "src/main.jsx",
    "src/main.tsx",
    "src/App.jsx",
    "src/App.tsx",
];

/// Configuration for the coordinator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Model used by every stage without an override
    pub model: String,
    /// Per-stage model overrides
    #[serde(default)]
    pub stage_models: HashMap<PipelineStage, String>,
    /// Concurrent file generations in a website run (default: 1)
    pub file_concurrency: usize,
    pub critical_files: Vec<String>,
    /// Ceiling for simple and component runs
    pub component_timeout_secs: u64,
    /// Ceiling for website runs
    pub website_timeout_secs: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            stage_models: HashMap::new(),
            file_concurrency: 1,
            critical_files: DEFAULT_CRITICAL_FILES.iter().map(|s| s.to_string()).collect(),
            component_timeout_secs: 60,
            website_timeout_secs: 120,
        }
    }
}

impl CoordinatorConfig {
    pub fn timeout(&self, kind: RunKind) -> Duration {
        match kind {
            RunKind::Simple | RunKind::Component => Duration::from_secs(self.component_timeout_secs),
            RunKind::Website => Duration::from_secs(self.website_timeout_secs),
        }
    }
}

fn default_true() -> bool {
    true
}

/// One accepted generation request. Moved into the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRequest {
    pub prompt: String,
    #[serde(default)]
    pub template: Template,
    /// Earlier turns, oldest first
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    #[serde(default = "default_true")]
    pub enable_qa: bool,
    /// Model for every stage of this run
    #[serde(default)]
    pub model: Option<String>,
    /// Present when a backend should be generated
    #[serde(default)]
    pub backend: Option<BackendOptions>,
    /// Client fields the pipeline does not interpret
    #[serde(default)]
    pub options: Map<String, Value>,
}

impl PipelineRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            template: Template::default(),
            history: Vec::new(),
            enable_qa: true,
            model: None,
            backend: None,
            options: Map::new(),
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.prompt.trim().is_empty() {
            return Err(PipelineError::InvalidRequest(
                "Prompt is required and must be a non-empty string".to_string(),
            ));
        }
        Ok(())
    }
}

fn failed(stage: PipelineStage) -> impl FnOnce(StageError) -> PipelineError {
    move |source| PipelineError::stage_failed(stage, source)
}

/// The swarm coordinator
pub struct Coordinator {
    llm: LlmClient,
    config: CoordinatorConfig,
}

impl Coordinator {
    pub fn new(llm: LlmClient, config: CoordinatorConfig) -> Self {
        Self { llm, config }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Get model config for a stage: request override, then per-stage
    /// override, then the global model.
    fn model_config(&self, kind: RunKind, stage: PipelineStage, request: &PipelineRequest) -> ModelConfig {
        let model = request
            .model
            .as_ref()
            .or_else(|| self.config.stage_models.get(&stage))
            .unwrap_or(&self.config.model);
        let config = ModelConfig::for_stage(stage, model.clone());

        // Single-component code fits in a smaller budget than website files
        match (kind, stage) {
            (RunKind::Simple, _)
            | (RunKind::Component, PipelineStage::Generating | PipelineStage::Fixing) => {
                config.with_max_tokens(4096)
            }
            _ => config,
        }
    }

    /// Run `request` to completion, reporting to `sink`.
    ///
    /// Emits `Complete` on success and `Error` on any failure except a
    /// client disconnect, where nobody is listening.
    #[tracing::instrument(
        skip(self, request, sink),
        fields(prompt_preview = %request.prompt.chars().take(50).collect::<String>())
    )]
    pub async fn execute(
        &self,
        kind: RunKind,
        request: PipelineRequest,
        sink: &mut EventSink,
    ) -> Result<(), PipelineError> {
        let started = Instant::now();
        let limit = self.config.timeout(kind);
        let mut pipeline = Pipeline::new(kind);

        let outcome = match request.validate() {
            Ok(()) => {
                match tokio::time::timeout(limit, self.run(&mut pipeline, &request, sink)).await {
                    Ok(result) => result,
                    Err(_) => Err(PipelineError::Timeout(limit)),
                }
            }
            Err(err) => Err(err),
        };

        match outcome {
            Ok(payload) => {
                tracing::info!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    stages = ?pipeline.visited(),
                    "Generation complete"
                );
                sink.emit(PipelineEvent::Complete(payload));
                Ok(())
            }
            Err(PipelineError::Cancelled) => {
                pipeline.fail();
                tracing::warn!("Client disconnected; run abandoned");
                Err(PipelineError::Cancelled)
            }
            Err(err) => {
                pipeline.fail();
                tracing::error!(stage = %err.stage(), "Generation failed: {err}");
                sink.emit(PipelineEvent::Error {
                    stage: err.stage(),
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        pipeline: &mut Pipeline,
        request: &PipelineRequest,
        sink: &mut EventSink,
    ) -> Result<CompletionPayload, PipelineError> {
        let ctx = StageContext::new(self.llm.clone(), request.history.clone());
        match pipeline.kind() {
            RunKind::Simple => self.run_simple(&ctx, pipeline, request, sink).await,
            RunKind::Component => self.run_component(&ctx, pipeline, request, sink).await,
            RunKind::Website => self.run_website(&ctx, pipeline, request, sink).await,
        }
    }

    async fn run_simple(
        &self,
        ctx: &StageContext,
        pipeline: &mut Pipeline,
        request: &PipelineRequest,
        sink: &mut EventSink,
    ) -> Result<CompletionPayload, PipelineError> {
        // Simple runs report chunks only
        advance(pipeline, sink, PipelineStage::Generating, None, false)?;
        let config = self.model_config(RunKind::Simple, PipelineStage::Generating, request);
        let code = CodeSkill::generate_simple(ctx, &request.prompt, &config, |chunk| {
            sink.chunk(chunk);
        })
        .await
        .map_err(failed(PipelineStage::Generating))?;

        advance(pipeline, sink, PipelineStage::Complete, None, false)?;
        Ok(CompletionPayload::Code(code))
    }

    async fn run_component(
        &self,
        ctx: &StageContext,
        pipeline: &mut Pipeline,
        request: &PipelineRequest,
        sink: &mut EventSink,
    ) -> Result<CompletionPayload, PipelineError> {
        let kind = RunKind::Component;

        // Stage 1: Planning
        advance(pipeline, sink, PipelineStage::Planning, None, true)?;
        let plan = PlanningSkill::plan_component(
            ctx,
            &request.prompt,
            &self.model_config(kind, PipelineStage::Planning, request),
        )
        .await
        .map_err(failed(PipelineStage::Planning))?;

        // Stage 2: Designing
        advance(pipeline, sink, PipelineStage::Designing, None, true)?;
        let design = DesignSkill::design_component(
            ctx,
            &plan,
            &self.model_config(kind, PipelineStage::Designing, request),
        )
        .await
        .map_err(failed(PipelineStage::Designing))?;

        // Stage 3: Generating
        advance(pipeline, sink, PipelineStage::Generating, None, true)?;
        let mut code = CodeSkill::generate_component(
            ctx,
            &request.prompt,
            &plan,
            &design,
            &self.model_config(kind, PipelineStage::Generating, request),
            |chunk| {
                sink.chunk(chunk);
            },
        )
        .await
        .map_err(failed(PipelineStage::Generating))?;

        if request.enable_qa {
            // Stage 4: Reviewing
            advance(pipeline, sink, PipelineStage::Reviewing, None, true)?;
            let review = QualitySkill::review_component(
                ctx,
                &code,
                &self.model_config(kind, PipelineStage::Reviewing, request),
            )
            .await
            .map_err(failed(PipelineStage::Reviewing))?;
            let report = serde_json::to_value(&review).unwrap_or_default();
            if !sink.emit(PipelineEvent::Review(report)) {
                return Err(PipelineError::Cancelled);
            }

            // Stage 5: Fixing
            if review.needs_revision {
                advance(pipeline, sink, PipelineStage::Fixing, None, true)?;
                code = FixSkill::fix_component(
                    ctx,
                    &code,
                    &review,
                    &self.model_config(kind, PipelineStage::Fixing, request),
                    |chunk| {
                        sink.chunk(chunk);
                    },
                )
                .await
                .map_err(failed(PipelineStage::Fixing))?;
            }
        }

        advance(pipeline, sink, PipelineStage::Complete, None, false)?;
        Ok(CompletionPayload::Code(code))
    }

    async fn run_website(
        &self,
        ctx: &StageContext,
        pipeline: &mut Pipeline,
        request: &PipelineRequest,
        sink: &mut EventSink,
    ) -> Result<CompletionPayload, PipelineError> {
        let kind = RunKind::Website;

        // Stage 1: Architecture
        advance(
            pipeline,
            sink,
            PipelineStage::Architecture,
            Some("Planning project architecture..."),
            true,
        )?;
        let architecture = ArchitectureSkill::run(
            ctx,
            &request.prompt,
            request.template,
            &self.model_config(kind, PipelineStage::Architecture, request),
        )
        .await
        .map_err(failed(PipelineStage::Architecture))?;

        // Stage 2: Planning
        advance(
            pipeline,
            sink,
            PipelineStage::Planning,
            Some("Creating technical specifications..."),
            true,
        )?;
        let plan = PlanningSkill::plan_website(
            ctx,
            &request.prompt,
            &architecture,
            &self.model_config(kind, PipelineStage::Planning, request),
        )
        .await
        .map_err(failed(PipelineStage::Planning))?;

        // Stage 3: Designing
        advance(
            pipeline,
            sink,
            PipelineStage::Designing,
            Some("Creating design system..."),
            true,
        )?;
        let design = DesignSkill::design_website(
            ctx,
            &architecture,
            &plan,
            &self.model_config(kind, PipelineStage::Designing, request),
        )
        .await
        .map_err(failed(PipelineStage::Designing))?;

        // Stage 4: Generating (fan-out)
        advance(
            pipeline,
            sink,
            PipelineStage::Generating,
            Some("Generating website files..."),
            true,
        )?;
        let manifest = architecture.manifest();
        let brief = Arc::new(FileBrief::new(
            &request.prompt,
            &architecture,
            &plan,
            &design,
            &manifest,
        ));
        let fan_out = FanOut {
            concurrency: self.config.file_concurrency,
            band: kind.generating_band(),
            critical_files: self.config.critical_files.clone(),
        };
        let report = fan_out
            .run(
                ctx,
                brief,
                &manifest,
                &self.model_config(kind, PipelineStage::Generating, request),
                sink,
            )
            .await?;
        let mut files = report.files;

        if request.enable_qa {
            // Stage 5: Reviewing
            advance(
                pipeline,
                sink,
                PipelineStage::Reviewing,
                Some("Reviewing code quality..."),
                true,
            )?;
            let review = QualitySkill::review_website(
                ctx,
                &files,
                &architecture,
                &self.model_config(kind, PipelineStage::Reviewing, request),
            )
            .await
            .map_err(failed(PipelineStage::Reviewing))?;
            if !sink.emit(PipelineEvent::Review(review.summary())) {
                return Err(PipelineError::Cancelled);
            }

            // Stage 6: Fixing
            if review.needs_revision && !review.files_with_issues.is_empty() {
                advance(
                    pipeline,
                    sink,
                    PipelineStage::Fixing,
                    Some("Fixing identified issues..."),
                    true,
                )?;
                let config = self.model_config(kind, PipelineStage::Fixing, request);
                files = fix_files(ctx, files, &review, &architecture, &config, sink).await?;
            }
        }

        // Stage 7: Backend
        let mut backend_files_count = 0;
        if let Some(options) = &request.backend {
            advance(
                pipeline,
                sink,
                PipelineStage::Backend,
                Some("Generating backend code..."),
                true,
            )?;
            let backend_plan = BackendPlan::from_planning(&plan, options);
            let output = BackendSkill::run(
                ctx,
                &backend_plan,
                &architecture,
                &self.model_config(kind, PipelineStage::Backend, request),
                |chunk| {
                    sink.chunk(chunk);
                },
            )
            .await;

            for (path, err) in &output.failures {
                let warning = PipelineEvent::warning(
                    PipelineStage::Backend,
                    format!("Failed to generate backend file {path}: {err}"),
                );
                if !sink.emit(warning) {
                    return Err(PipelineError::Cancelled);
                }
            }
            if output.files.is_empty() {
                let warning = PipelineEvent::warning(
                    PipelineStage::Backend,
                    "Backend generation failed: no backend files were produced",
                );
                if !sink.emit(warning) {
                    return Err(PipelineError::Cancelled);
                }
            }
            backend_files_count = output.files.len();
            files.extend(output.files);
        }

        advance(pipeline, sink, PipelineStage::Complete, None, false)?;
        Ok(CompletionPayload::Files {
            files,
            backend_included: backend_files_count > 0,
            backend_files_count,
        })
    }
}

/// Enter `stage`, optionally reporting it.
fn advance(
    pipeline: &mut Pipeline,
    sink: &mut EventSink,
    stage: PipelineStage,
    message: Option<&str>,
    report: bool,
) -> Result<(), PipelineError> {
    let Some(progress) = pipeline.enter(stage) else {
        return Err(PipelineError::stage_failed(
            stage,
            StageError::Config(format!("stage {stage} entered out of order")),
        ));
    };
    tracing::info!(%stage, progress, "Stage started");
    if !report {
        return Ok(());
    }
    let event = PipelineEvent::StageProgress {
        stage,
        progress,
        message: message.map(str::to_string),
    };
    if sink.emit(event) {
        Ok(())
    } else {
        Err(PipelineError::Cancelled)
    }
}

/// Repair every flagged file, one fix call each. A failed fix keeps the
/// original file; unflagged files pass through untouched.
async fn fix_files(
    ctx: &StageContext,
    mut files: FileSet,
    review: &WebsiteReview,
    architecture: &ArchitectureSpec,
    config: &ModelConfig,
    sink: &mut EventSink,
) -> Result<FileSet, PipelineError> {
    let targets = plan_fixes(&files, review);
    let total = targets.len();
    let progress = RunKind::Website.progress(PipelineStage::Fixing);

    for (index, target) in targets.iter().enumerate() {
        let started = PipelineEvent::FileStarted {
            stage: PipelineStage::Fixing,
            progress,
            path: target.path.clone(),
            completed: index,
            total,
        };
        if !sink.emit(started) {
            return Err(PipelineError::Cancelled);
        }

        let event = match FixSkill::fix_file(ctx, target, architecture, config, |_| {}).await {
            Ok(code) => {
                let event = PipelineEvent::FileCompleted {
                    stage: PipelineStage::Fixing,
                    progress,
                    path: target.path.clone(),
                    size: code.len(),
                    completed: index + 1,
                    total,
                };
                files.insert(target.path.clone(), code);
                event
            }
            Err(err) => {
                tracing::warn!(path = %target.path, "Fix failed, keeping original: {err}");
                PipelineEvent::warning(
                    PipelineStage::Fixing,
                    format!("Failed to fix {}: {err}. Keeping original file.", target.path),
                )
            }
        };
        if !sink.emit(event) {
            return Err(PipelineError::Cancelled);
        }
    }

    Ok(files)
}
