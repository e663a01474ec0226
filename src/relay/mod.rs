// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Session progress relay.
//!
//! Bridges the extractor's blocking, callback-driven download interface to
//! the per-session event channel. Each job owns exactly one [`EventSink`]
//! pointing at the session that started it; events are never broadcast.
//!
//! Delivery is fire-and-forget: the sink uses a bounded channel and
//! `try_send`, so a slow or disconnected client drops events instead of
//! stalling the download.
//!
//! Two translations live here:
//! - byte-level progress callbacks -> `progress_update` events with a
//!   computed percent and a human-readable transfer message;
//! - extractor log lines -> zero-percent informational events tagged with
//!   the originating severity, which never advance the job lifecycle.

use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Coarse status tag carried by every progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Preparing,
    Downloading,
    Finished,
    Error,
}

impl ProgressStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressStatus::Finished | ProgressStatus::Error)
    }

    fn as_u8(self) -> u8 {
        match self {
            ProgressStatus::Preparing => 0,
            ProgressStatus::Downloading => 1,
            ProgressStatus::Finished => 2,
            ProgressStatus::Error => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => ProgressStatus::Downloading,
            2 => ProgressStatus::Finished,
            3 => ProgressStatus::Error,
            _ => ProgressStatus::Preparing,
        }
    }
}

/// Lock-free cell holding a job's current [`ProgressStatus`].
///
/// The download callback runs on a blocking-pool thread while the
/// orchestrator advances the lifecycle, so the current status is shared
/// through an atomic rather than a lock.
#[derive(Debug)]
pub struct StatusCell(AtomicU8);

impl StatusCell {
    pub fn new(status: ProgressStatus) -> Self {
        Self(AtomicU8::new(status.as_u8()))
    }

    pub fn set(&self, status: ProgressStatus) {
        self.0.store(status.as_u8(), Ordering::SeqCst);
    }

    pub fn get(&self) -> ProgressStatus {
        ProgressStatus::from_u8(self.0.load(Ordering::SeqCst))
    }
}

/// A point-in-time status update pushed to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Percent complete, 0-100.
    pub progress: f64,
    /// Human-readable message.
    pub message: String,
    /// Coarse lifecycle tag.
    pub status: ProgressStatus,
}

/// Everything the server can push over a session's event channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Sent once on connect.
    StatusUpdate { message: String },
    /// Zero or more per job.
    ProgressUpdate(ProgressEvent),
    /// Terminal: the artifact is ready under `file_url`.
    DownloadComplete {
        filename: String,
        file_url: String,
        message: String,
    },
    /// Terminal: the job failed.
    DownloadError { message: String },
}

/// Severity of an extractor log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn label(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }
}

/// One invocation of the extractor's progress callback.
///
/// Every field is optional; the extractor supplies whatever it knows at
/// that instant (byte counts plus preformatted human strings).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressSnapshot {
    pub downloaded_bytes: Option<u64>,
    pub total_bytes: Option<u64>,
    /// Library-supplied generic percent (0-100), used when byte totals are
    /// unknown.
    pub fraction: Option<f64>,
    pub downloaded_str: Option<String>,
    pub total_str: Option<String>,
    pub speed_str: Option<String>,
    pub eta_str: Option<String>,
}

/// Destination for a job's events. Implementations must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: SessionEvent);
}

/// [`EventSink`] backed by a session's bounded event channel.
///
/// Emission never blocks and never fails the caller: when the channel is
/// full or the session is gone the event is dropped.
#[derive(Debug, Clone)]
pub struct SessionSink {
    tx: mpsc::Sender<SessionEvent>,
}

impl SessionSink {
    pub fn new(tx: mpsc::Sender<SessionEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for SessionSink {
    fn emit(&self, event: SessionEvent) {
        if let Err(err) = self.tx.try_send(event) {
            tracing::debug!("Dropping session event ({})", err);
        }
    }
}

/// Translate a progress callback into a `progress_update` event.
///
/// When both byte counts are known the percent is exact and the message
/// embeds the formatted transfer numbers, substituting "N/A" for missing
/// sub-fields. Otherwise the library's generic percent (or 0) is used and
/// the message carries only what is present.
pub fn translate_progress(snapshot: &ProgressSnapshot) -> ProgressEvent {
    let known_total = matches!(
        (snapshot.downloaded_bytes, snapshot.total_bytes),
        (Some(_), Some(total)) if total > 0
    );

    if known_total {
        let downloaded = snapshot.downloaded_bytes.unwrap_or(0);
        let total = snapshot.total_bytes.unwrap_or(0);
        let percent = (downloaded as f64 / total as f64 * 100.0).min(100.0);

        let message = format!(
            "Downloading: {} / {} at {} ETA {}",
            snapshot.downloaded_str.as_deref().unwrap_or("N/A"),
            snapshot.total_str.as_deref().unwrap_or("N/A"),
            snapshot.speed_str.as_deref().unwrap_or("N/A"),
            snapshot.eta_str.as_deref().unwrap_or("N/A"),
        );

        ProgressEvent {
            progress: percent,
            message,
            status: ProgressStatus::Downloading,
        }
    } else {
        let mut parts = vec!["Downloading...".to_string()];
        if let Some(downloaded) = &snapshot.downloaded_str {
            parts.push(format!("Downloaded: {}", downloaded));
        }
        if let Some(speed) = &snapshot.speed_str {
            parts.push(format!("Speed: {}", speed));
        }
        if let Some(eta) = &snapshot.eta_str {
            parts.push(format!("ETA: {}", eta));
        }

        ProgressEvent {
            progress: snapshot.fraction.unwrap_or(0.0).clamp(0.0, 100.0),
            message: parts.join(" "),
            status: ProgressStatus::Downloading,
        }
    }
}

/// Translate an extractor log line into a zero-percent informational event.
///
/// The event carries the job's current status so forwarding a log line
/// never advances the lifecycle.
pub fn translate_log(level: LogLevel, line: &str, current: ProgressStatus) -> ProgressEvent {
    ProgressEvent {
        progress: 0.0,
        message: format!("yt-dlp {}: {}", level.label(), line),
        status: current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_percent_with_known_totals() {
        let event = translate_progress(&ProgressSnapshot {
            downloaded_bytes: Some(25),
            total_bytes: Some(100),
            downloaded_str: Some("25.0B".to_string()),
            total_str: Some("100.0B".to_string()),
            speed_str: Some("5.0B/s".to_string()),
            eta_str: Some("00:15".to_string()),
            ..ProgressSnapshot::default()
        });

        assert_eq!(event.progress, 25.0);
        assert_eq!(
            event.message,
            "Downloading: 25.0B / 100.0B at 5.0B/s ETA 00:15"
        );
        assert_eq!(event.status, ProgressStatus::Downloading);
    }

    #[test]
    fn test_missing_substrings_become_na() {
        let event = translate_progress(&ProgressSnapshot {
            downloaded_bytes: Some(50),
            total_bytes: Some(200),
            ..ProgressSnapshot::default()
        });

        assert_eq!(event.progress, 25.0);
        assert_eq!(event.message, "Downloading: N/A / N/A at N/A ETA N/A");
    }

    #[test]
    fn test_unknown_total_falls_back_to_fraction() {
        let event = translate_progress(&ProgressSnapshot {
            downloaded_bytes: Some(50),
            fraction: Some(12.5),
            downloaded_str: Some("50.0B".to_string()),
            speed_str: Some("1.0KB/s".to_string()),
            ..ProgressSnapshot::default()
        });

        assert_eq!(event.progress, 12.5);
        assert_eq!(event.message, "Downloading... Downloaded: 50.0B Speed: 1.0KB/s");
    }

    #[test]
    fn test_zero_total_is_not_divided() {
        let event = translate_progress(&ProgressSnapshot {
            downloaded_bytes: Some(10),
            total_bytes: Some(0),
            ..ProgressSnapshot::default()
        });
        assert_eq!(event.progress, 0.0);
        assert!(event.message.starts_with("Downloading..."));
    }

    #[test]
    fn test_empty_snapshot() {
        let event = translate_progress(&ProgressSnapshot::default());
        assert_eq!(event.progress, 0.0);
        assert_eq!(event.message, "Downloading...");
    }

    #[test]
    fn test_log_translation_keeps_current_status() {
        let event = translate_log(
            LogLevel::Warning,
            "unable to download thumbnail",
            ProgressStatus::Preparing,
        );
        assert_eq!(event.progress, 0.0);
        assert_eq!(event.status, ProgressStatus::Preparing);
        assert_eq!(event.message, "yt-dlp WARNING: unable to download thumbnail");
    }

    #[test]
    fn test_sink_drops_when_channel_full() {
        let (tx, mut rx) = mpsc::channel(1);
        let sink = SessionSink::new(tx);

        sink.emit(SessionEvent::StatusUpdate {
            message: "first".to_string(),
        });
        // Channel capacity is 1; the second emit is dropped, not blocked
        sink.emit(SessionEvent::StatusUpdate {
            message: "second".to_string(),
        });

        let first = rx.try_recv().expect("first event delivered");
        assert_eq!(
            first,
            SessionEvent::StatusUpdate {
                message: "first".to_string()
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_wire_shape() {
        let json = serde_json::to_value(SessionEvent::ProgressUpdate(ProgressEvent {
            progress: 42.0,
            message: "Downloading...".to_string(),
            status: ProgressStatus::Downloading,
        }))
        .unwrap();

        assert_eq!(json["event"], "progress_update");
        assert_eq!(json["data"]["progress"], 42.0);
        assert_eq!(json["data"]["status"], "downloading");
    }

    #[test]
    fn test_status_cell_round_trip() {
        let cell = StatusCell::new(ProgressStatus::Preparing);
        assert_eq!(cell.get(), ProgressStatus::Preparing);
        cell.set(ProgressStatus::Downloading);
        assert_eq!(cell.get(), ProgressStatus::Downloading);
        cell.set(ProgressStatus::Error);
        assert!(cell.get().is_terminal());
    }
}
