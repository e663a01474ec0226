// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Download job lifecycle.
//!
//! One job = one download attempt bound to one session. Jobs run on the
//! blocking pool so the extractor's synchronous download call never stalls
//! the event loop, and report back through the session's relay sink.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐ start_download ┌──────────────┐ spawn_blocking ┌──────────────┐
//! │ ws session   │───────────────▶│ JobRunner    │───────────────▶│ yt-dlp       │
//! │ (claims slot)│                │ (lifecycle)  │   callbacks    │ subprocess   │
//! └──────▲───────┘                └──────┬───────┘◀───────────────└──────────────┘
//!        │         progress_update /     │
//!        └─────────terminal event────────┘
//! ```
//!
//! States: `requested -> preparing -> downloading -> {finished | failed}`.
//! Terminal events are emitted exactly once per job ([`TerminalGate`]),
//! and success is only declared after the artifact is verified on disk.

pub mod filename;
pub mod orchestrator;
pub mod types;

// Re-export commonly used items
pub use filename::{sanitize_title, unique_stem, FALLBACK_STEM};
pub use orchestrator::JobRunner;
pub use types::{DownloadJob, JobOutcome, TerminalGate};
