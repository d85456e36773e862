//! # File Fan-Out
//!
//! Generates every manifest file on a bounded worker pool.
//!
//! ```text
//! manifest ──► [worker × concurrency] ──► join_next ──► events + FileSet
//! ```
//!
//! Only the gathering loop touches the event sink, so counters and progress
//! stay monotonic at any concurrency. A failed file becomes a placeholder
//! and the run continues; a failed or missing critical file aborts it.

use std::sync::Arc;

use tokio::task::JoinSet;

use super::events::{EventSink, FileError, PipelineEvent};
use super::pipeline::{band_progress, PipelineStage};
use crate::error::{PipelineError, StageError};
use crate::models::ModelConfig;
use crate::skills::artifact_registry::{FileSet, ManifestEntry};
use crate::skills::code_skill::{CodeSkill, FileBrief};
use crate::skills::StageContext;

/// Marker that opens the content of a file that failed to generate.
pub const PLACEHOLDER_MARKER: &str = "// Error generating this file:";

pub fn placeholder(reason: &str) -> String {
    format!("{PLACEHOLDER_MARKER} {reason}")
}

/// Whether `path` names one of the critical entries, either exactly or as
/// a trailing path component.
pub fn is_critical(path: &str, critical: &[String]) -> bool {
    critical
        .iter()
        .any(|entry| path == entry || path.ends_with(&format!("/{entry}")))
}

/// Settings for one fan-out.
#[derive(Debug, Clone)]
pub struct FanOut {
    pub concurrency: usize,
    /// Progress band for the generating stage
    pub band: (u8, u8),
    pub critical_files: Vec<String>,
}

/// What the fan-out produced.
#[derive(Debug, Default)]
pub struct FanOutReport {
    /// One entry per produced path, in manifest order; failures hold a placeholder
    pub files: FileSet,
    pub failures: Vec<FileError>,
    /// Manifest paths that were never produced
    pub missing_files: Vec<String>,
}

impl FanOut {
    pub async fn run(
        &self,
        ctx: &StageContext,
        brief: Arc<FileBrief>,
        manifest: &[ManifestEntry],
        config: &ModelConfig,
        sink: &mut EventSink,
    ) -> Result<FanOutReport, PipelineError> {
        let total = manifest.len();
        let concurrency = self.concurrency.max(1);
        let mut outputs: Vec<Option<Result<String, StageError>>> =
            (0..total).map(|_| None).collect();
        let mut join_set: JoinSet<(usize, Result<String, StageError>)> = JoinSet::new();
        let mut next = 0;
        let mut completed = 0;
        let mut report = FanOutReport::default();

        loop {
            // SCATTER: keep the pool full
            while join_set.len() < concurrency && next < total {
                let index = next;
                let entry = manifest[index].clone();
                next += 1;

                let started = PipelineEvent::FileStarted {
                    stage: PipelineStage::Generating,
                    progress: band_progress(self.band, completed, total),
                    path: entry.path.clone(),
                    completed,
                    total,
                };
                if !sink.emit(started) {
                    return Err(PipelineError::Cancelled);
                }
                tracing::info!(path = %entry.path, index, total, "Generating file");

                let ctx = ctx.clone();
                let brief = brief.clone();
                let config = config.clone();
                join_set.spawn(async move {
                    let result = CodeSkill::generate_file(&ctx, &brief, &entry, &config, |_| {}).await;
                    (index, result)
                });
            }

            // GATHER
            let Some(joined) = join_set.join_next().await else {
                break;
            };
            completed += 1;
            let progress = band_progress(self.band, completed, total);

            let (index, result) = match joined {
                Ok(output) => output,
                Err(e) => {
                    tracing::error!("File worker panicked: {e}");
                    continue;
                }
            };
            let path = manifest[index].path.clone();

            let event = match &result {
                Ok(code) => {
                    tracing::info!(%path, completed, total, "Completed file");
                    PipelineEvent::FileCompleted {
                        stage: PipelineStage::Generating,
                        progress,
                        path: path.clone(),
                        size: code.len(),
                        completed,
                        total,
                    }
                }
                Err(err) => {
                    tracing::warn!(%path, "File generation failed: {err}");
                    PipelineEvent::FileFailed {
                        stage: PipelineStage::Generating,
                        progress,
                        path: path.clone(),
                        reason: err.to_string(),
                        completed,
                        total,
                    }
                }
            };
            outputs[index] = Some(result);
            if !sink.emit(event) {
                return Err(PipelineError::Cancelled);
            }
        }

        for (entry, output) in manifest.iter().zip(outputs) {
            match output {
                Some(Ok(code)) => {
                    report.files.insert(entry.path.clone(), code);
                }
                Some(Err(err)) => {
                    let reason = err.to_string();
                    report.files.insert(entry.path.clone(), placeholder(&reason));
                    report.failures.push(FileError {
                        file_name: entry.path.clone(),
                        error: reason,
                    });
                }
                None => {}
            }
        }
        report.missing_files = manifest
            .iter()
            .filter(|entry| !report.files.contains(&entry.path))
            .map(|entry| entry.path.clone())
            .collect();

        self.check(&report, sink)?;
        Ok(report)
    }

    /// Warn about failures and missing files; abort if any is critical.
    fn check(&self, report: &FanOutReport, sink: &mut EventSink) -> Result<(), PipelineError> {
        if report.failures.is_empty() && report.missing_files.is_empty() {
            return Ok(());
        }

        let mut summary = Vec::new();
        if !report.failures.is_empty() {
            summary.push(format!("{} file(s) failed to generate", report.failures.len()));
        }
        if !report.missing_files.is_empty() {
            summary.push(format!(
                "{} required file(s) missing",
                report.missing_files.len()
            ));
        }
        let summary = summary.join("; ");
        tracing::warn!(
            failed = report.failures.len(),
            missing = ?report.missing_files,
            "{summary}"
        );

        let warning = PipelineEvent::Warning {
            stage: PipelineStage::Generating,
            progress: Some(self.band.1),
            message: summary,
            file_errors: report.failures.clone(),
            missing_files: report.missing_files.clone(),
        };
        if !sink.emit(warning) {
            return Err(PipelineError::Cancelled);
        }

        let critical: Vec<String> = report
            .failures
            .iter()
            .map(|f| f.file_name.as_str())
            .chain(report.missing_files.iter().map(String::as_str))
            .filter(|path| is_critical(path, &self.critical_files))
            .map(str::to_string)
            .collect();
        if critical.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::CriticalFilesMissing { files: critical })
        }
    }
}
