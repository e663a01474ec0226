// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Utility functions for fetchtube.
//!
//! This module provides common utility functions used across the codebase.

use rand::Rng;

/// Generate a random 32-hex identifier (UUID v4 layout, no hyphens).
///
/// Used for session ids and job ids, and anywhere an opaque server-assigned
/// token is needed.
pub fn random_id() -> String {
    let mut rng = rand::thread_rng();

    // Generate 16 random bytes
    let mut bytes = [0u8; 16];
    rng.fill(&mut bytes);

    // Set version (4) and variant (RFC 4122) bits
    bytes[6] = (bytes[6] & 0x0f) | 0x40; // Version 4
    bytes[8] = (bytes[8] & 0x3f) | 0x80; // Variant RFC 4122

    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Format a byte count into a human-readable string (e.g. "1.5KB").
pub fn format_file_size(size_bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

    if size_bytes == 0 {
        return "0B".to_string();
    }

    let mut size = size_bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    format!("{:.1}{}", size, UNITS[unit])
}
