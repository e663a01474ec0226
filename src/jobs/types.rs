// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Job types.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::random_id;

/// One download attempt bound to one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadJob {
    /// Unique job identifier.
    pub id: String,
    /// Target video URL.
    pub url: String,
    /// Requested format identifier, passed through to the extractor.
    pub format_id: String,
    /// Display title; the output filename stem is derived from it.
    pub title: String,
    /// Owning session.
    pub session_id: String,
    /// When the start request arrived.
    pub created_at: DateTime<Utc>,
}

impl DownloadJob {
    pub fn new(
        url: impl Into<String>,
        format_id: impl Into<String>,
        title: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            id: random_id(),
            url: url.into(),
            format_id: format_id.into(),
            title: title.into(),
            session_id: session_id.into(),
            created_at: Utc::now(),
        }
    }
}

/// How a job ended.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// Artifact verified on disk.
    Completed { filename: String },
    /// Terminal failure; `message` is what the session was told.
    Failed { message: String },
}

/// Exactly-once guard for terminal events.
///
/// The first call to [`TerminalGate::fire`] returns `true`; every later
/// call returns `false`, regardless of which thread makes it.
#[derive(Debug, Default)]
pub struct TerminalGate(AtomicBool);

impl TerminalGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the terminal emission. Only the first caller wins.
    pub fn fire(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }

    pub fn fired(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_ids_are_unique() {
        let a = DownloadJob::new("u", "f", "t", "s");
        let b = DownloadJob::new("u", "f", "t", "s");
        assert_ne!(a.id, b.id);
        assert_eq!(a.session_id, "s");
    }

    #[test]
    fn test_terminal_gate_fires_once() {
        let gate = TerminalGate::new();
        assert!(!gate.fired());
        assert!(gate.fire());
        assert!(gate.fired());
        assert!(!gate.fire());
        assert!(!gate.fire());
    }
}
