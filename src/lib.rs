// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! fetchtube - Self-hosted video download gateway library
//!
//! Paste a URL, pick a format, watch progress stream live.
//!
//! The heavy lifting (site support, format negotiation, the actual
//! transfer) belongs to the external `yt-dlp` binary. fetchtube wraps it
//! with a web API and a per-session progress relay:
//!
//! **HTTP** (metadata, summaries, artifacts) + **WebSocket** (live job events)
//!
//! # Core Modules
//!
//! - [`validate`] - Video URL validation and id extraction
//! - [`extract`] - External extractor client (yt-dlp, two modes)
//! - [`formats`] - Candidate stream filtering and ranking
//! - [`relay`] - Session progress relay and event types
//! - [`session`] - Connected-client registry, one job slot per session
//! - [`jobs`] - Download orchestration and filename derivation
//! - [`server`] - axum HTTP/WebSocket server
//! - [`errors`] - User-facing API errors with reference codes
//! - [`summary`] - Description summarizing
//! - [`config`] - Runtime configuration

pub mod config;
pub mod errors;
pub mod extract;
pub mod formats;
pub mod jobs;
pub mod relay;
pub mod security;
pub mod server;
pub mod session;
pub mod summary;
pub mod utils;
pub mod validate;

// Re-export commonly used types from the config module
pub use config::{AppConfig, DEFAULT_BIND_ADDRESS, DEFAULT_DOWNLOAD_DIR, DEFAULT_PORT};

// Re-export validation helpers
pub use validate::{extract_video_id, is_valid_video_url};

// Re-export extractor types
pub use extract::{
    DownloadRequest, DownloadSignal, ExtractError, MediaExtractor, VideoMetadata, YtDlpClient,
};

// Re-export format types
pub use formats::{build_format_list, FormatDescriptor, RawStream};

// Re-export relay types
pub use relay::{
    translate_log, translate_progress, EventSink, LogLevel, ProgressEvent, ProgressSnapshot,
    ProgressStatus, SessionEvent, SessionSink, StatusCell,
};

// Re-export session types
pub use session::{JobGuard, Session, SessionManager, EVENT_CHANNEL_CAPACITY};

// Re-export job types
pub use jobs::{
    sanitize_title, unique_stem, DownloadJob, JobOutcome, JobRunner, TerminalGate, FALLBACK_STEM,
};

// Re-export server and error types
pub use errors::{generate_reference_code, sanitize_error_details, ApiError, ApiResult};
pub use server::Server;

// Re-export utility helpers
pub use summary::summarize;
pub use utils::{format_file_size, random_id};
