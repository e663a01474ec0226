// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Wire format between yt-dlp and the relay.
//!
//! The download invocation passes a `--progress-template` that makes every
//! progress callback print one machine-parsable `PROGRESS|...` line, and a
//! `--print after_move:` template that reports the final artifact path as a
//! `DONE|...` line. Everything yt-dlp writes to stderr is a log line and is
//! classified by severity.

use std::path::PathBuf;

use crate::relay::{LogLevel, ProgressSnapshot};

/// Progress template handed to yt-dlp. Fields, in order: downloaded bytes,
/// total bytes (estimate as fallback), percent string, and the preformatted
/// downloaded/total/speed/ETA strings. Unknown fields render as "NA".
pub const PROGRESS_TEMPLATE: &str = "download:PROGRESS|%(progress.downloaded_bytes)d|\
%(progress.total_bytes,progress.total_bytes_estimate)d|%(progress._percent_str)s|\
%(progress._downloaded_bytes_str)s|%(progress._total_bytes_str)s|\
%(progress._speed_str)s|%(progress._eta_str)s";

/// Print template that reports the final artifact path after the file has
/// been moved into place.
pub const DONE_PRINT: &str = "after_move:DONE|%(filepath)s";

/// Parse one `PROGRESS|...` line into a snapshot.
///
/// Returns `None` for anything that is not a progress line; malformed
/// fields degrade to `None` values rather than failing the line.
pub fn parse_progress_line(line: &str) -> Option<ProgressSnapshot> {
    let rest = line.strip_prefix("PROGRESS|")?;
    let fields: Vec<&str> = rest.split('|').collect();
    if fields.len() < 7 {
        return None;
    }

    Some(ProgressSnapshot {
        downloaded_bytes: parse_bytes(fields[0]),
        total_bytes: parse_bytes(fields[1]),
        fraction: parse_percent(fields[2]),
        downloaded_str: parse_text(fields[3]),
        total_str: parse_text(fields[4]),
        speed_str: parse_text(fields[5]),
        eta_str: parse_text(fields[6]),
    })
}

/// Parse a `DONE|<filepath>` line into the reported artifact path.
pub fn parse_final_path(line: &str) -> Option<PathBuf> {
    let path = line.strip_prefix("DONE|")?.trim();
    if path.is_empty() {
        None
    } else {
        Some(PathBuf::from(path))
    }
}

/// Classify a stderr line by severity and strip the level prefix.
pub fn classify_log_line(line: &str) -> (LogLevel, &str) {
    let trimmed = line.trim();
    if let Some(rest) = trimmed.strip_prefix("ERROR:") {
        (LogLevel::Error, rest.trim_start())
    } else if let Some(rest) = trimmed.strip_prefix("WARNING:") {
        (LogLevel::Warning, rest.trim_start())
    } else if let Some(rest) = trimmed.strip_prefix("[debug]") {
        (LogLevel::Debug, rest.trim_start())
    } else {
        (LogLevel::Info, trimmed)
    }
}

fn parse_bytes(field: &str) -> Option<u64> {
    let trimmed = field.trim();
    if is_absent(trimmed) {
        return None;
    }
    trimmed.parse::<u64>().ok()
}

fn parse_percent(field: &str) -> Option<f64> {
    let trimmed = field.trim().trim_end_matches('%');
    if is_absent(trimmed) {
        return None;
    }
    trimmed.trim().parse::<f64>().ok()
}

fn parse_text(field: &str) -> Option<String> {
    let trimmed = field.trim();
    if is_absent(trimmed) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn is_absent(field: &str) -> bool {
    field.is_empty() || field == "NA" || field == "N/A" || field == "Unknown"
}
