//! # Pipeline Stages
//!
//! Defines the stages of a generation run and the state machine that
//! keeps them in order.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stage of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Deciding the project file structure (website runs)
    Architecture,
    /// Writing the technical plan
    Planning,
    /// Creating the design system
    Designing,
    /// Generating source code
    Generating,
    /// Quality review
    Reviewing,
    /// Repairing flagged code
    Fixing,
    /// Optional backend generation (website runs)
    Backend,
    /// Complete
    Complete,
    /// Failed outside any single stage (timeouts, bad requests)
    #[serde(rename = "pipeline")]
    Failed,
}

impl PipelineStage {
    /// Name used in event frames.
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Architecture => "architecture",
            PipelineStage::Planning => "planning",
            PipelineStage::Designing => "designing",
            PipelineStage::Generating => "generating",
            PipelineStage::Reviewing => "reviewing",
            PipelineStage::Fixing => "fixing",
            PipelineStage::Backend => "backend",
            PipelineStage::Complete => "complete",
            PipelineStage::Failed => "pipeline",
        }
    }

    /// Prefix of the error message when this stage fails.
    pub fn failure_label(&self) -> &'static str {
        match self {
            PipelineStage::Architecture => "Architecture planning failed",
            PipelineStage::Planning => "Planning stage failed",
            PipelineStage::Designing => "Design stage failed",
            PipelineStage::Generating => "Code generation stage failed",
            PipelineStage::Reviewing => "Quality review stage failed",
            PipelineStage::Fixing => "Fix stage failed",
            PipelineStage::Backend => "Backend generation failed",
            PipelineStage::Complete | PipelineStage::Failed => "Pipeline failed",
        }
    }

    /// Stages a run may skip.
    pub fn is_optional(&self) -> bool {
        matches!(
            self,
            PipelineStage::Reviewing | PipelineStage::Fixing | PipelineStage::Backend
        )
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three kinds of run the service offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    /// One streamed completion, no intermediate stages
    Simple,
    /// Plan, design, code, review and fix a single component
    Component,
    /// Multi-file website with fan-out generation
    Website,
}

impl RunKind {
    /// Stages in execution order.
    pub fn stages(&self) -> &'static [PipelineStage] {
        use PipelineStage::*;
        match self {
            RunKind::Simple => &[Generating],
            RunKind::Component => &[Planning, Designing, Generating, Reviewing, Fixing],
            RunKind::Website => &[
                Architecture,
                Planning,
                Designing,
                Generating,
                Reviewing,
                Fixing,
                Backend,
            ],
        }
    }

    /// Progress percentage reported when `stage` starts.
    pub fn progress(&self, stage: PipelineStage) -> u8 {
        use PipelineStage::*;
        match (self, stage) {
            (_, Complete) => 100,
            (RunKind::Website, Architecture) => 5,
            (RunKind::Website, Planning) => 15,
            (RunKind::Website, Designing) => 25,
            (RunKind::Website, Generating) => 40,
            (RunKind::Website, Reviewing) => 85,
            (RunKind::Website, Fixing) => 90,
            (RunKind::Website, Backend) => 95,
            (RunKind::Component, Planning) => 10,
            (RunKind::Component, Designing) => 30,
            (RunKind::Component, Generating) => 50,
            (RunKind::Component, Reviewing) => 75,
            (RunKind::Component, Fixing) => 85,
            _ => 0,
        }
    }

    /// Band the generating stage spreads file progress over.
    pub fn generating_band(&self) -> (u8, u8) {
        match self {
            RunKind::Website => (40, 80),
            RunKind::Component => (50, 50),
            RunKind::Simple => (0, 0),
        }
    }
}

/// Progress inside a band after `done` of `total` items.
pub fn band_progress((start, end): (u8, u8), done: usize, total: usize) -> u8 {
    if total == 0 {
        return end;
    }
    let span = end.saturating_sub(start) as usize;
    start + (done.min(total) * span / total) as u8
}

/// The pipeline state machine
#[derive(Debug, Clone)]
pub struct Pipeline {
    kind: RunKind,
    /// Current stage; `None` before the first stage starts
    stage: Option<PipelineStage>,
    /// Stages entered so far, in order
    visited: Vec<PipelineStage>,
}

impl Pipeline {
    /// Create a new pipeline
    pub fn new(kind: RunKind) -> Self {
        Self {
            kind,
            stage: None,
            visited: Vec::new(),
        }
    }

    pub fn kind(&self) -> RunKind {
        self.kind
    }

    pub fn stage(&self) -> Option<PipelineStage> {
        self.stage
    }

    pub fn visited(&self) -> &[PipelineStage] {
        &self.visited
    }

    fn position(&self, stage: PipelineStage) -> Option<usize> {
        self.kind.stages().iter().position(|s| *s == stage)
    }

    /// Move to `next`, skipping only optional stages. Returns the progress
    /// to report, or `None` when the move is out of order.
    pub fn enter(&mut self, next: PipelineStage) -> Option<u8> {
        if self.is_complete() {
            return None;
        }
        let stages = self.kind.stages();
        let from = match self.stage {
            Some(current) => self.position(current)? + 1,
            None => 0,
        };
        let to = match next {
            PipelineStage::Complete => stages.len(),
            PipelineStage::Failed => return None,
            other => self.position(other)?,
        };
        if to < from || !stages[from..to].iter().all(PipelineStage::is_optional) {
            return None;
        }

        self.stage = Some(next);
        self.visited.push(next);
        Some(self.kind.progress(next))
    }

    /// Fail the pipeline
    pub fn fail(&mut self) {
        self.stage = Some(PipelineStage::Failed);
    }

    /// Check if pipeline is complete
    pub fn is_complete(&self) -> bool {
        matches!(
            self.stage,
            Some(PipelineStage::Complete | PipelineStage::Failed)
        )
    }

    /// Check if pipeline succeeded
    pub fn is_success(&self) -> bool {
        self.stage == Some(PipelineStage::Complete)
    }
}
