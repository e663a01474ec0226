// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Job runner.
//!
//! Owns the lifecycle of one download job: emits the preparing event,
//! drives the blocking extractor call on the blocking pool, verifies the
//! reported artifact on disk, and signals exactly one terminal event.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::extract::{DownloadRequest, DownloadSignal, MediaExtractor};
use crate::jobs::filename::{sanitize_title, unique_stem};
use crate::jobs::types::{DownloadJob, JobOutcome, TerminalGate};
use crate::relay::{
    translate_log, translate_progress, EventSink, ProgressEvent, ProgressStatus, SessionEvent,
    StatusCell,
};
use crate::session::JobGuard;
use crate::utils::format_file_size;

/// Runs download jobs against the external extractor.
///
/// Cheap to clone; shared by every session.
#[derive(Clone)]
pub struct JobRunner {
    extractor: Arc<dyn MediaExtractor>,
    download_dir: PathBuf,
}

impl JobRunner {
    pub fn new(extractor: Arc<dyn MediaExtractor>, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            extractor,
            download_dir: download_dir.into(),
        }
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Execute one job to its terminal state.
    ///
    /// The session's job slot (`guard`) is held until this returns, and the
    /// underlying download runs to completion even if the session
    /// disconnects; the sink just starts dropping events.
    pub async fn run(
        &self,
        job: DownloadJob,
        sink: Arc<dyn EventSink>,
        guard: JobGuard,
    ) -> JobOutcome {
        let _slot = guard;
        let gate = TerminalGate::new();
        let status = Arc::new(StatusCell::new(ProgressStatus::Preparing));

        tracing::info!(
            job_id = %job.id,
            session_id = %job.session_id,
            url = %job.url,
            format_id = %job.format_id,
            "Job accepted"
        );

        sink.emit(SessionEvent::ProgressUpdate(ProgressEvent {
            progress: 0.0,
            message: "Starting download...".to_string(),
            status: ProgressStatus::Preparing,
        }));

        let stem = unique_stem(&self.download_dir, &sanitize_title(&job.title));
        let request = DownloadRequest {
            url: job.url.clone(),
            format_id: job.format_id.clone(),
            output_stem: stem,
            download_dir: self.download_dir.clone(),
        };

        let extractor = Arc::clone(&self.extractor);
        let callback_sink = Arc::clone(&sink);
        let callback_status = Arc::clone(&status);
        let result = tokio::task::spawn_blocking(move || {
            extractor.download(&request, &mut |signal| match signal {
                DownloadSignal::Progress(snapshot) => {
                    callback_status.set(ProgressStatus::Downloading);
                    callback_sink.emit(SessionEvent::ProgressUpdate(translate_progress(
                        &snapshot,
                    )));
                }
                DownloadSignal::Log { level, message } => {
                    callback_sink.emit(SessionEvent::ProgressUpdate(translate_log(
                        level,
                        &message,
                        callback_status.get(),
                    )));
                }
            })
        })
        .await;

        match result {
            Ok(Ok(reported_path)) => {
                self.verify_and_complete(&job, &reported_path, &sink, &gate, &status)
            }
            Ok(Err(err)) => {
                tracing::error!(job_id = %job.id, error = %err, "Extractor failed");
                self.fail(&job, format!("Download failed: {}", err), &sink, &gate, &status)
            }
            Err(join_err) => {
                tracing::error!(job_id = %job.id, error = %join_err, "Download task panicked");
                self.fail(
                    &job,
                    "An unexpected error occurred during download.".to_string(),
                    &sink,
                    &gate,
                    &status,
                )
            }
        }
    }

    /// The extractor claims completion; trust it only after the artifact is
    /// actually on disk.
    fn verify_and_complete(
        &self,
        job: &DownloadJob,
        reported_path: &Path,
        sink: &Arc<dyn EventSink>,
        gate: &TerminalGate,
        status: &StatusCell,
    ) -> JobOutcome {
        let filename = match reported_path.file_name().and_then(|name| name.to_str()) {
            Some(name) => name.to_string(),
            None => {
                return self.fail(
                    job,
                    "Download reported an unusable output path.".to_string(),
                    sink,
                    gate,
                    status,
                );
            }
        };

        let artifact = self.download_dir.join(&filename);
        match std::fs::metadata(&artifact) {
            Ok(meta) => {
                tracing::info!(
                    job_id = %job.id,
                    filename = %filename,
                    size = %format_file_size(meta.len()),
                    "Artifact verified on disk"
                );
            }
            Err(_) => {
                tracing::error!(
                    job_id = %job.id,
                    artifact = %artifact.display(),
                    "Extractor reported completion but the artifact is missing"
                );
                return self.fail(
                    job,
                    format!(
                        "Download reported complete, but file not found: {}",
                        filename
                    ),
                    sink,
                    gate,
                    status,
                );
            }
        }

        if !gate.fire() {
            tracing::warn!(job_id = %job.id, "Suppressed duplicate terminal event");
            return JobOutcome::Completed { filename };
        }

        status.set(ProgressStatus::Finished);
        sink.emit(SessionEvent::ProgressUpdate(ProgressEvent {
            progress: 100.0,
            message: "Download complete!".to_string(),
            status: ProgressStatus::Finished,
        }));
        sink.emit(SessionEvent::DownloadComplete {
            file_url: format!("/downloads/{}", filename),
            filename: filename.clone(),
            message: "Download completed successfully!".to_string(),
        });

        tracing::info!(job_id = %job.id, filename = %filename, "Job finished");
        JobOutcome::Completed { filename }
    }

    fn fail(
        &self,
        job: &DownloadJob,
        message: String,
        sink: &Arc<dyn EventSink>,
        gate: &TerminalGate,
        status: &StatusCell,
    ) -> JobOutcome {
        status.set(ProgressStatus::Error);

        if gate.fire() {
            sink.emit(SessionEvent::DownloadError {
                message: message.clone(),
            });
        } else {
            tracing::warn!(job_id = %job.id, "Suppressed duplicate terminal event");
        }

        tracing::info!(job_id = %job.id, message = %message, "Job failed");
        JobOutcome::Failed { message }
    }
}
