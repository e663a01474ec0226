// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Output filename derivation.
//!
//! Titles are user-controlled text; the stem written to disk keeps only a
//! conservative character set. Sanitization is idempotent, so a stem run
//! through it again comes back unchanged.

use std::path::Path;

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Substituted when sanitization leaves nothing usable.
pub const FALLBACK_STEM: &str = "downloaded_video";

/// Maximum stem length in characters.
pub const MAX_STEM_LEN: usize = 100;

/// Length of the random collision suffix.
const SUFFIX_LEN: usize = 6;

/// Sanitize a display title into a filename stem.
///
/// Keeps alphanumerics, whitespace, `.`, `-` and `_`; trims, collapses
/// whitespace runs to a single `_`, truncates to [`MAX_STEM_LEN`]
/// characters, and falls back to [`FALLBACK_STEM`] when empty.
pub fn sanitize_title(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || matches!(c, '.' | '-' | '_'))
        .collect();

    let stem: String = kept
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .take(MAX_STEM_LEN)
        .collect();

    if stem.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        stem
    }
}

/// Make a stem unique within the download directory.
///
/// Artifact names are stem + extractor-chosen extension; if any file with
/// this stem already exists (whatever its extension), a short random suffix
/// is appended so concurrent jobs cannot overwrite each other.
pub fn unique_stem(dir: &Path, stem: &str) -> String {
    if !stem_taken(dir, stem) {
        return stem.to_string();
    }

    loop {
        let candidate = format!("{}-{}", stem, random_suffix());
        if !stem_taken(dir, &candidate) {
            return candidate;
        }
    }
}

fn stem_taken(dir: &Path, stem: &str) -> bool {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        // Unreadable directory: fall through and let the download surface
        // the real I/O error
        Err(_) => return false,
    };

    entries
        .flatten()
        .any(|entry| entry.path().file_stem().map(|s| s == stem).unwrap_or(false))
}

fn random_suffix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_punctuation_and_joins_words() {
        assert_eq!(sanitize_title("My Video: Part 1/2!!"), "My_Video_Part_12");
    }

    #[test]
    fn test_idempotent() {
        let once = sanitize_title("My Video: Part 1/2!!");
        assert_eq!(sanitize_title(&once), once);

        let plain = sanitize_title("already_clean-name.v2");
        assert_eq!(sanitize_title(&plain), plain);
    }

    #[test]
    fn test_whitespace_runs_collapse() {
        assert_eq!(sanitize_title("  a   b\t c  "), "a_b_c");
    }

    #[test]
    fn test_all_disallowed_falls_back() {
        assert_eq!(sanitize_title("!!!???///"), FALLBACK_STEM);
        assert_eq!(sanitize_title(""), FALLBACK_STEM);
        assert_eq!(sanitize_title("   "), FALLBACK_STEM);
    }

    #[test]
    fn test_truncates_to_limit() {
        let long = "x".repeat(MAX_STEM_LEN * 2);
        assert_eq!(sanitize_title(&long).chars().count(), MAX_STEM_LEN);
    }

    #[test]
    fn test_unique_stem_without_collision() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(unique_stem(dir.path(), "clip"), "clip");
    }

    #[test]
    fn test_unique_stem_suffixes_on_collision() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("clip.mp4"), b"x").unwrap();

        let stem = unique_stem(dir.path(), "clip");
        assert_ne!(stem, "clip");
        assert!(stem.starts_with("clip-"));
        assert_eq!(stem.len(), "clip-".len() + 6);
    }

    #[test]
    fn test_unique_stem_collides_across_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("clip.webm"), b"x").unwrap();

        // Same stem, different extension still counts as taken
        assert_ne!(unique_stem(dir.path(), "clip"), "clip");
    }
}
