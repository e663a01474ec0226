// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Video description summarizing.
//!
//! Pure text templating: no model calls, no network. Long descriptions are
//! truncated to [`SUMMARY_LIMIT`] characters with a trim notice.

/// Maximum number of description characters carried into a summary.
pub const SUMMARY_LIMIT: usize = 500;

/// Placeholder the metadata layer substitutes when a video has no
/// description; treated the same as an absent description here.
pub const NO_DESCRIPTION: &str = "No description available.";

/// Build a short text summary from a title and description.
pub fn summarize(title: Option<&str>, description: Option<&str>) -> String {
    let title = title.unwrap_or_default();
    let description = description.unwrap_or_default();

    if !description.is_empty() && description != NO_DESCRIPTION {
        let head: String = description.chars().take(SUMMARY_LIMIT).collect();
        let mut summary = format!("Summary of '{}': {}...", title, head.trim());
        if description.chars().count() > SUMMARY_LIMIT {
            summary.push_str("\n(Description trimmed for summarization)");
        }
        summary
    } else if !title.is_empty() {
        format!(
            "No detailed description available, but the video is titled '{}'.",
            title
        )
    } else {
        "Could not generate summary.".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_description() {
        let summary = summarize(Some("My Video"), Some("A short description."));
        assert_eq!(summary, "Summary of 'My Video': A short description....");
        assert!(!summary.contains("trimmed"));
    }

    #[test]
    fn test_long_description_gets_trim_notice() {
        let long = "x".repeat(SUMMARY_LIMIT + 50);
        let summary = summarize(Some("My Video"), Some(&long));
        assert!(summary.contains("(Description trimmed for summarization)"));
        // Only the first 500 characters survive
        assert!(summary.contains(&"x".repeat(SUMMARY_LIMIT)));
        assert!(!summary.contains(&"x".repeat(SUMMARY_LIMIT + 1)));
    }

    #[test]
    fn test_placeholder_description_falls_back_to_title() {
        let summary = summarize(Some("My Video"), Some(NO_DESCRIPTION));
        assert_eq!(
            summary,
            "No detailed description available, but the video is titled 'My Video'."
        );
    }

    #[test]
    fn test_nothing_to_summarize() {
        assert_eq!(summarize(None, None), "Could not generate summary.");
        assert_eq!(summarize(Some(""), Some("")), "Could not generate summary.");
    }

    #[test]
    fn test_multibyte_descriptions_truncate_on_char_boundaries() {
        let long = "ü".repeat(SUMMARY_LIMIT * 2);
        let summary = summarize(Some("Umlauts"), Some(&long));
        assert!(summary.contains("(Description trimmed for summarization)"));
    }
}
