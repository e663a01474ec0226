// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! External extractor client.
//!
//! All media retrieval and format negotiation is delegated to the pre-built
//! `yt-dlp` binary, consumed in two modes:
//!
//! - **metadata-only**: one JSON dump of everything known about a URL, no
//!   payload fetched;
//! - **download**: format selection by id, an output path template, a
//!   machine-readable progress stream (see [`progress`]) and a captured log
//!   stream.
//!
//! [`YtDlpClient::download`] is synchronous and thread-blocking by design:
//! it drives the subprocess to completion, invoking the caller's signal
//! callback for every progress line and log line. The orchestrator runs it
//! on the blocking pool.

pub mod progress;

use std::fmt;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::formats::RawStream;
use crate::relay::{LogLevel, ProgressSnapshot};
use progress::{classify_log_line, parse_final_path, parse_progress_line};

/// Hard deadline for the metadata dump; a hung probe would otherwise pin an
/// HTTP request forever.
const METADATA_TIMEOUT_SECS: u64 = 45;

/// Deadline for `--version` when checking extractor availability.
const PROBE_TIMEOUT_SECS: u64 = 10;

/// Well-known install locations checked before falling back to PATH.
const COMMON_BINARY_PATHS: [&str; 3] = [
    "/usr/local/bin/yt-dlp",
    "/usr/bin/yt-dlp",
    "/opt/homebrew/bin/yt-dlp",
];

/// Everything that can go wrong at the extractor boundary.
#[derive(Debug)]
pub enum ExtractError {
    /// The binary could not be launched.
    Spawn(std::io::Error),
    /// The extractor ran and reported failure.
    Failed { cause: String },
    /// The extractor produced output we could not parse.
    Parse(String),
    /// The subprocess exceeded its deadline and was killed.
    Timeout { seconds: u64 },
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractError::Spawn(err) => write!(f, "failed to launch yt-dlp: {}", err),
            ExtractError::Failed { cause } => write!(f, "{}", cause),
            ExtractError::Parse(detail) => write!(f, "unreadable extractor output: {}", detail),
            ExtractError::Timeout { seconds } => {
                write!(f, "extractor timed out after {}s", seconds)
            }
        }
    }
}

impl std::error::Error for ExtractError {}

/// Structured description of one video, metadata-only mode.
///
/// Missing fields take fixed fallbacks so the API response shape is stable.
#[derive(Debug, Clone)]
pub struct VideoMetadata {
    pub title: String,
    pub thumbnail: String,
    pub channel: String,
    pub duration: u64,
    pub view_count: u64,
    pub description: String,
    pub uploader: String,
    pub upload_date: String,
    pub webpage_url: String,
    pub streams: Vec<RawStream>,
}

/// One download invocation.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    pub format_id: String,
    /// Sanitized, collision-free filename stem; yt-dlp appends the
    /// extension it chooses.
    pub output_stem: String,
    pub download_dir: PathBuf,
}

/// One invocation of the download callback.
#[derive(Debug, Clone)]
pub enum DownloadSignal {
    Progress(ProgressSnapshot),
    Log { level: LogLevel, message: String },
}

/// Seam between the orchestrator and the external extractor.
pub trait MediaExtractor: Send + Sync {
    /// Check availability; returns the extractor version string.
    fn probe(&self) -> Result<String, ExtractError>;

    /// Metadata-only mode: no payload download.
    fn fetch_metadata(&self, url: &str) -> Result<VideoMetadata, ExtractError>;

    /// Download mode. Blocking; invokes `on_signal` for every progress
    /// callback and captured log line, and returns the final artifact path
    /// the extractor reported.
    fn download(
        &self,
        request: &DownloadRequest,
        on_signal: &mut dyn FnMut(DownloadSignal),
    ) -> Result<PathBuf, ExtractError>;
}

/// Client for the `yt-dlp` binary.
#[derive(Debug, Clone)]
pub struct YtDlpClient {
    binary: PathBuf,
}

impl YtDlpClient {
    /// Use an explicit binary path.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Locate the binary: explicit override, `YTDLP_PATH`, well-known
    /// install paths, then plain `yt-dlp` resolved via PATH.
    pub fn discover(override_path: Option<PathBuf>) -> Self {
        if let Some(path) = override_path {
            return Self::new(path);
        }
        if let Ok(path) = std::env::var("YTDLP_PATH") {
            if !path.is_empty() {
                return Self::new(path);
            }
        }
        for candidate in COMMON_BINARY_PATHS {
            if Path::new(candidate).exists() {
                return Self::new(candidate);
            }
        }
        Self::new("yt-dlp")
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Run the binary to completion with a hard deadline, killing it on
    /// expiry.
    fn run_with_timeout(&self, args: &[String], seconds: u64) -> Result<Output, ExtractError> {
        let child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(ExtractError::Spawn)?;

        wait_with_deadline(child, seconds)
    }
}

impl MediaExtractor for YtDlpClient {
    fn probe(&self) -> Result<String, ExtractError> {
        let output = self.run_with_timeout(&["--version".to_string()], PROBE_TIMEOUT_SECS)?;
        if !output.status.success() {
            return Err(ExtractError::Failed {
                cause: failure_cause(&output.stderr),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn fetch_metadata(&self, url: &str) -> Result<VideoMetadata, ExtractError> {
        let args = vec![
            "--dump-single-json".to_string(),
            "--flat-playlist".to_string(),
            "--no-warnings".to_string(),
            "--skip-download".to_string(),
            url.to_string(),
        ];

        let started = Instant::now();
        let output = self.run_with_timeout(&args, METADATA_TIMEOUT_SECS)?;
        tracing::debug!(
            url = %url,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Metadata dump finished"
        );

        if !output.status.success() {
            return Err(ExtractError::Failed {
                cause: failure_cause(&output.stderr),
            });
        }

        parse_metadata(&String::from_utf8_lossy(&output.stdout), url)
    }

    fn download(
        &self,
        request: &DownloadRequest,
        on_signal: &mut dyn FnMut(DownloadSignal),
    ) -> Result<PathBuf, ExtractError> {
        let output_template = request
            .download_dir
            .join(format!("{}.%(ext)s", request.output_stem));

        let args = vec![
            "-f".to_string(),
            request.format_id.clone(),
            "--newline".to_string(),
            "--no-playlist".to_string(),
            "--progress".to_string(),
            "--progress-template".to_string(),
            progress::PROGRESS_TEMPLATE.to_string(),
            "--print".to_string(),
            progress::DONE_PRINT.to_string(),
            // --print alone would put yt-dlp into simulate mode
            "--no-simulate".to_string(),
            "-o".to_string(),
            output_template.to_string_lossy().to_string(),
            request.url.clone(),
        ];

        tracing::info!(
            url = %request.url,
            format_id = %request.format_id,
            stem = %request.output_stem,
            "Starting yt-dlp download"
        );

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(ExtractError::Spawn)?;

        let stdout = child.stdout.take().ok_or_else(|| ExtractError::Failed {
            cause: "could not capture extractor stdout".to_string(),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| ExtractError::Failed {
            cause: "could not capture extractor stderr".to_string(),
        })?;

        // Both pipes feed one channel so signals reach the callback in
        // arrival order from a single thread.
        let (line_tx, line_rx) = mpsc::channel::<StreamLine>();
        let stdout_tx = line_tx.clone();
        let stdout_reader = thread::spawn(move || {
            for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                if stdout_tx.send(StreamLine::Out(line)).is_err() {
                    break;
                }
            }
        });
        let stderr_reader = thread::spawn(move || {
            for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                if line_tx.send(StreamLine::Err(line)).is_err() {
                    break;
                }
            }
        });

        let mut final_path: Option<PathBuf> = None;
        let mut error_lines: Vec<String> = Vec::new();

        for line in line_rx {
            match line {
                StreamLine::Out(line) => {
                    if let Some(snapshot) = parse_progress_line(&line) {
                        on_signal(DownloadSignal::Progress(snapshot));
                    } else if let Some(path) = parse_final_path(&line) {
                        final_path = Some(path);
                    }
                }
                StreamLine::Err(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let (level, message) = classify_log_line(&line);
                    if level == LogLevel::Error {
                        error_lines.push(message.to_string());
                    }
                    on_signal(DownloadSignal::Log {
                        level,
                        message: message.to_string(),
                    });
                }
            }
        }

        let _ = stdout_reader.join();
        let _ = stderr_reader.join();

        let status = child.wait().map_err(ExtractError::Spawn)?;

        if !status.success() {
            let cause = if error_lines.is_empty() {
                format!("yt-dlp exited with status {}", status)
            } else {
                error_lines.join("; ")
            };
            return Err(ExtractError::Failed { cause });
        }

        final_path.ok_or_else(|| ExtractError::Failed {
            cause: "extractor finished without reporting an output file".to_string(),
        })
    }
}

enum StreamLine {
    Out(String),
    Err(String),
}

/// Poll-wait a child with a deadline, killing it on expiry.
fn wait_with_deadline(mut child: Child, seconds: u64) -> Result<Output, ExtractError> {
    let deadline = Instant::now() + Duration::from_secs(seconds);

    loop {
        match child.try_wait().map_err(ExtractError::Spawn)? {
            Some(_) => {
                return child.wait_with_output().map_err(ExtractError::Spawn);
            }
            None if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ExtractError::Timeout { seconds });
            }
            None => thread::sleep(Duration::from_millis(50)),
        }
    }
}

/// Pull the most useful line out of a failed run's stderr.
fn failure_cause(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let error_lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("ERROR:"))
        .collect();

    if !error_lines.is_empty() {
        return error_lines.join("; ");
    }

    text.lines()
        .map(str::trim)
        .rev()
        .find(|line| !line.is_empty())
        .unwrap_or("yt-dlp failed without diagnostic output")
        .to_string()
}

/// Loosely-typed mirror of the JSON dump; only the fields we surface.
#[derive(Debug, Deserialize)]
struct InfoDump {
    title: Option<String>,
    thumbnail: Option<String>,
    channel: Option<String>,
    duration: Option<f64>,
    view_count: Option<u64>,
    description: Option<String>,
    uploader: Option<String>,
    upload_date: Option<String>,
    webpage_url: Option<String>,
    #[serde(default)]
    formats: Vec<RawStream>,
}

fn parse_metadata(json: &str, requested_url: &str) -> Result<VideoMetadata, ExtractError> {
    let dump: InfoDump =
        serde_json::from_str(json).map_err(|err| ExtractError::Parse(err.to_string()))?;

    Ok(VideoMetadata {
        title: dump.title.unwrap_or_else(|| "N/A".to_string()),
        thumbnail: dump.thumbnail.unwrap_or_default(),
        channel: dump.channel.unwrap_or_else(|| "N/A".to_string()),
        duration: dump.duration.unwrap_or(0.0).max(0.0) as u64,
        view_count: dump.view_count.unwrap_or(0),
        description: dump
            .description
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| crate::summary::NO_DESCRIPTION.to_string()),
        uploader: dump.uploader.unwrap_or_else(|| "N/A".to_string()),
        upload_date: dump.upload_date.unwrap_or_else(|| "N/A".to_string()),
        webpage_url: dump
            .webpage_url
            .unwrap_or_else(|| requested_url.to_string()),
        streams: dump.formats,
    })
}
