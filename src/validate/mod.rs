// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Video URL validation.
//!
//! A URL is accepted when its host belongs to the fixed allow-list of
//! YouTube domains AND an 11-character video identifier can be extracted
//! from one of the known URL shapes. Malformed input never panics; it is
//! simply invalid.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Hosts accepted by [`is_valid_video_url`]. A leading `www.` is stripped
/// before comparison.
const ALLOWED_DOMAINS: [&str; 3] = ["youtube.com", "youtu.be", "m.youtube.com"];

/// Known URL shapes, tried in order; the first match wins.
///
/// The identifier alphabet is fixed: 11 characters of `[0-9A-Za-z_-]`.
static ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // Standard watch?v= or /v/ path segment
        Regex::new(r"(?:v=|/)([0-9A-Za-z_-]{11})(?:[?&]|$)").expect("watch pattern"),
        // Embed URLs
        Regex::new(r"embed/([0-9A-Za-z_-]{11})").expect("embed pattern"),
        // Shortened youtu.be URLs
        Regex::new(r"youtu\.be/([0-9A-Za-z_-]{11})").expect("short pattern"),
    ]
});

/// Extract the 11-character video identifier from a URL string.
///
/// Returns `None` when no pattern matches.
pub fn extract_video_id(url: &str) -> Option<String> {
    for pattern in ID_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(url) {
            if let Some(id) = caps.get(1) {
                return Some(id.as_str().to_string());
            }
        }
    }
    None
}

/// Check whether a string is a valid video URL.
///
/// Requires a parseable URL, an allow-listed host, and an extractable
/// video identifier. Unparseable input returns `false`.
pub fn is_valid_video_url(url: &str) -> bool {
    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(_) => return false,
    };

    let domain = match parsed.host_str() {
        Some(host) => host.to_lowercase(),
        None => return false,
    };
    let domain = domain.strip_prefix("www.").unwrap_or(&domain);

    let is_allowed_domain = ALLOWED_DOMAINS.contains(&domain);

    is_allowed_domain && extract_video_id(url).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_from_watch_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_extract_from_path_shapes() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/v/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_extract_rejects_wrong_length() {
        assert_eq!(extract_video_id("https://www.youtube.com/watch?v=short"), None);
        assert_eq!(extract_video_id("https://youtu.be/"), None);
    }

    #[test]
    fn test_valid_urls() {
        assert!(is_valid_video_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_valid_video_url("https://youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_valid_video_url("https://m.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_valid_video_url("https://youtu.be/dQw4w9WgXcQ"));
        assert!(is_valid_video_url("https://www.youtube.com/embed/dQw4w9WgXcQ"));
    }

    #[test]
    fn test_foreign_domains_rejected() {
        assert!(!is_valid_video_url("https://vimeo.com/watch?v=dQw4w9WgXcQ"));
        assert!(!is_valid_video_url("https://example.com/dQw4w9WgXcQ"));
        // Allow-listed shape on a lookalike domain
        assert!(!is_valid_video_url("https://notyoutube.com/watch?v=dQw4w9WgXcQ"));
    }

    #[test]
    fn test_missing_id_rejected() {
        assert!(!is_valid_video_url("https://www.youtube.com/"));
        assert!(!is_valid_video_url("https://www.youtube.com/watch?v=tooshort"));
    }

    #[test]
    fn test_malformed_urls_never_panic() {
        assert!(!is_valid_video_url(""));
        assert!(!is_valid_video_url("not a url at all"));
        assert!(!is_valid_video_url("http://"));
        assert!(!is_valid_video_url("youtube.com/watch?v=dQw4w9WgXcQ")); // no scheme
        assert!(!is_valid_video_url("ht!tp://youtube.com/watch?v=dQw4w9WgXcQ"));
    }
}
