//! # Pipeline Events
//!
//! Events a run reports to its client, and the sink that delivers them.
//!
//! Every event maps to one JSON frame (see [`PipelineEvent::to_wire`]).
//! `Complete` and `Error` are terminal; the sink delivers exactly one of
//! them and drops anything after it.

use serde::Serialize;
use serde_json::{json, Map, Value};
use tokio::sync::mpsc;

use super::pipeline::PipelineStage;
use crate::skills::artifact_registry::FileSet;

/// A file that could not be produced, reported without ending the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileError {
    pub file_name: String,
    pub error: String,
}

/// Final deliverable of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionPayload {
    /// Simple and component runs
    Code(String),
    /// Website runs
    Files {
        files: FileSet,
        backend_included: bool,
        backend_files_count: usize,
    },
}

/// An event in a generation run
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// A stage started
    StageProgress {
        stage: PipelineStage,
        progress: u8,
        message: Option<String>,
    },
    /// Work on one file started (generating or fixing)
    FileStarted {
        stage: PipelineStage,
        progress: u8,
        path: String,
        completed: usize,
        total: usize,
    },
    /// One file finished
    FileCompleted {
        stage: PipelineStage,
        progress: u8,
        path: String,
        size: usize,
        completed: usize,
        total: usize,
    },
    /// One file failed; the run goes on
    FileFailed {
        stage: PipelineStage,
        progress: u8,
        path: String,
        reason: String,
        completed: usize,
        total: usize,
    },
    /// Streamed code fragment
    Chunk(String),
    /// Review summary from the quality stage
    Review(Value),
    /// Non-fatal problem
    Warning {
        stage: PipelineStage,
        progress: Option<u8>,
        message: String,
        file_errors: Vec<FileError>,
        missing_files: Vec<String>,
    },
    /// Terminal failure
    Error {
        stage: PipelineStage,
        message: String,
    },
    /// Terminal success
    Complete(CompletionPayload),
}

impl PipelineEvent {
    pub fn stage(stage: PipelineStage, progress: u8, message: impl Into<String>) -> Self {
        PipelineEvent::StageProgress {
            stage,
            progress,
            message: Some(message.into()),
        }
    }

    pub fn warning(stage: PipelineStage, message: impl Into<String>) -> Self {
        PipelineEvent::Warning {
            stage,
            progress: None,
            message: message.into(),
            file_errors: Vec::new(),
            missing_files: Vec::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineEvent::Complete(_) | PipelineEvent::Error { .. })
    }

    pub fn progress(&self) -> Option<u8> {
        match self {
            PipelineEvent::StageProgress { progress, .. }
            | PipelineEvent::FileStarted { progress, .. }
            | PipelineEvent::FileCompleted { progress, .. }
            | PipelineEvent::FileFailed { progress, .. } => Some(*progress),
            PipelineEvent::Warning { progress, .. } => *progress,
            PipelineEvent::Complete(_) => Some(100),
            PipelineEvent::Chunk(_) | PipelineEvent::Review(_) | PipelineEvent::Error { .. } => {
                None
            }
        }
    }

    fn progress_mut(&mut self) -> Option<&mut u8> {
        match self {
            PipelineEvent::StageProgress { progress, .. }
            | PipelineEvent::FileStarted { progress, .. }
            | PipelineEvent::FileCompleted { progress, .. }
            | PipelineEvent::FileFailed { progress, .. } => Some(progress),
            PipelineEvent::Warning { progress, .. } => progress.as_mut(),
            _ => None,
        }
    }

    /// The JSON object sent to clients.
    pub fn to_wire(&self) -> Value {
        match self {
            PipelineEvent::StageProgress {
                stage,
                progress,
                message,
            } => {
                let mut frame = json!({ "stage": stage, "progress": progress });
                if let Some(message) = message {
                    frame["message"] = json!(message);
                }
                frame
            }
            PipelineEvent::FileStarted {
                stage,
                progress,
                path,
                completed,
                total,
            } => {
                let verb = if *stage == PipelineStage::Fixing { "Fixing" } else { "Generating" };
                let mut frame = json!({
                    "stage": stage,
                    "progress": progress,
                    "currentFile": path,
                    "message": format!("{verb} {path}..."),
                });
                counters(&mut frame, *stage, *completed, *total);
                frame
            }
            PipelineEvent::FileCompleted {
                stage,
                progress,
                path,
                size,
                completed,
                total,
            } => {
                let mut frame = json!({
                    "stage": stage,
                    "progress": progress,
                    "fileComplete": { "path": path, "size": size },
                });
                counters(&mut frame, *stage, *completed, *total);
                frame
            }
            PipelineEvent::FileFailed {
                stage,
                progress,
                path,
                reason,
                completed,
                total,
            } => {
                let verb = if *stage == PipelineStage::Fixing { "fix" } else { "generate" };
                let mut frame = json!({
                    "stage": stage,
                    "progress": progress,
                    "fileError": format!("Failed to {verb} {path}: {reason}"),
                    "fileName": path,
                });
                counters(&mut frame, *stage, *completed, *total);
                frame
            }
            PipelineEvent::Chunk(chunk) => json!({ "chunk": chunk }),
            PipelineEvent::Review(review) => json!({ "review": review }),
            PipelineEvent::Warning {
                stage,
                progress,
                message,
                file_errors,
                missing_files,
            } => {
                let mut frame = Map::new();
                frame.insert("stage".into(), json!(stage));
                if let Some(progress) = progress {
                    frame.insert("progress".into(), json!(progress));
                }
                frame.insert("warning".into(), json!(message));
                if !file_errors.is_empty() || !missing_files.is_empty() {
                    frame.insert("fileGenerationErrors".into(), json!(file_errors));
                    frame.insert("missingFiles".into(), json!(missing_files));
                    frame.insert(
                        "message".into(),
                        json!("Code generation completed with warnings"),
                    );
                }
                Value::Object(frame)
            }
            PipelineEvent::Error { stage, message } => json!({ "error": message, "stage": stage }),
            PipelineEvent::Complete(CompletionPayload::Code(code)) => json!({
                "stage": PipelineStage::Complete,
                "progress": 100,
                "code": code,
            }),
            PipelineEvent::Complete(CompletionPayload::Files {
                files,
                backend_included,
                backend_files_count,
            }) => json!({
                "stage": PipelineStage::Complete,
                "progress": 100,
                "files": files,
                "backendIncluded": backend_included,
                "backendFilesCount": backend_files_count,
                "message": if *backend_included {
                    "Full-stack application generation complete!"
                } else {
                    "Website generation complete!"
                },
            }),
        }
    }
}

fn counters(frame: &mut Value, stage: PipelineStage, completed: usize, total: usize) {
    let (done_key, total_key) = if stage == PipelineStage::Fixing {
        ("filesFixed", "totalFilesToFix")
    } else {
        ("filesCompleted", "totalFiles")
    };
    frame[done_key] = json!(completed);
    frame[total_key] = json!(total);
}

/// Create a connected sink and receiver.
pub fn channel() -> (EventSink, mpsc::UnboundedReceiver<PipelineEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSink::new(tx), rx)
}

/// Write side of a run's event stream.
///
/// Keeps reported progress non-decreasing and lets exactly one terminal
/// event through. Writes after the client went away are no-ops that
/// return `false`.
#[derive(Debug)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<PipelineEvent>,
    last_progress: u8,
    finished: bool,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<PipelineEvent>) -> Self {
        Self {
            tx,
            last_progress: 0,
            finished: false,
        }
    }

    /// Deliver an event. Returns `false` if it was dropped.
    pub fn emit(&mut self, mut event: PipelineEvent) -> bool {
        if self.finished {
            tracing::debug!(?event, "Dropping event after terminal event");
            return false;
        }
        if let Some(progress) = event.progress_mut() {
            if *progress < self.last_progress {
                *progress = self.last_progress;
            }
            self.last_progress = *progress;
        }
        if let PipelineEvent::Complete(_) = event {
            self.last_progress = 100;
        }
        if event.is_terminal() {
            self.finished = true;
        }
        self.send(event)
    }

    /// Forward a streamed code fragment.
    pub fn chunk(&self, chunk: &str) -> bool {
        if self.finished {
            return false;
        }
        self.send(PipelineEvent::Chunk(chunk.to_string()))
    }

    fn send(&self, event: PipelineEvent) -> bool {
        if self.tx.send(event).is_err() {
            tracing::warn!("Attempted to write to closed event stream");
            return false;
        }
        true
    }

    /// Whether a terminal event has been delivered.
    #[cfg(test)]
    pub(crate) fn is_finished(&self) -> bool {
        self.finished
    }

    /// Whether the receiving side is gone.
    #[cfg(test)]
    pub(crate) fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
