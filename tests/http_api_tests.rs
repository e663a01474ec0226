//! Integration tests for the fetchtube server
//!
//! These tests verify the HTTP surface by hitting a live server. They are
//! marked with #[ignore] so they don't run in CI without a server running.
//!
//! To run these tests:
//! 1. Start the server: fetchtube serve
//! 2. Run tests with: cargo test --test http_api_tests -- --ignored

use reqwest::Client;
use serde_json::{json, Value};

const BASE: &str = "http://localhost:5000";

// =============================================================================
// Health Endpoint Tests
// =============================================================================

#[tokio::test]
#[ignore]
async fn test_health_endpoint() -> Result<(), Box<dyn std::error::Error>> {
    let client = Client::new();
    let response = client.get(format!("{BASE}/health")).send().await?;

    assert_eq!(response.status(), 200);

    let body: Value = response.json().await?;
    assert!(body.get("status").is_some());
    assert!(body.get("version").is_some());
    assert!(body.get("extractor_status").is_some());
    assert!(body["active_sessions"].is_u64());

    Ok(())
}

// =============================================================================
// Video Info Endpoint Tests
// =============================================================================

#[tokio::test]
#[ignore]
async fn test_video_info_requires_url() -> Result<(), Box<dyn std::error::Error>> {
    let client = Client::new();
    let response = client
        .post(format!("{BASE}/get_video_info"))
        .json(&json!({}))
        .send()
        .await?;

    assert_eq!(response.status(), 400);

    let body: Value = response.json().await?;
    assert_eq!(body["error"].as_str(), Some("URL is required"));
    assert!(body.get("reference").is_some());

    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_video_info_rejects_foreign_urls() -> Result<(), Box<dyn std::error::Error>> {
    let client = Client::new();
    let response = client
        .post(format!("{BASE}/get_video_info"))
        .json(&json!({"url": "https://example.com/clip"}))
        .send()
        .await?;

    assert_eq!(response.status(), 400);

    let body: Value = response.json().await?;
    let error = body["error"].as_str().unwrap_or_default();
    assert!(error.contains("Invalid"));

    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_video_info_returns_sorted_formats() -> Result<(), Box<dyn std::error::Error>> {
    // Requires network access and a working yt-dlp installation
    let client = Client::new();
    let response = client
        .post(format!("{BASE}/get_video_info"))
        .json(&json!({"url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ"}))
        .send()
        .await?;

    assert_eq!(response.status(), 200);

    let body: Value = response.json().await?;
    assert!(body.get("title").is_some());
    assert_eq!(
        body["webpage_url"].as_str().map(|u| u.contains("dQw4w9WgXcQ")),
        Some(true)
    );

    let formats = body["formats"].as_array().expect("formats array");
    assert!(!formats.is_empty());

    // Heights must be non-increasing among entries that have one
    let heights: Vec<u64> = formats
        .iter()
        .filter_map(|f| f["height"].as_u64())
        .collect();
    let mut sorted = heights.clone();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    assert_eq!(heights, sorted);

    Ok(())
}

// =============================================================================
// Summarize Endpoint Tests
// =============================================================================

#[tokio::test]
#[ignore]
async fn test_summarize_trims_long_descriptions() -> Result<(), Box<dyn std::error::Error>> {
    let client = Client::new();
    let response = client
        .post(format!("{BASE}/summarize_video"))
        .json(&json!({
            "title": "My Video",
            "description": "y".repeat(600),
        }))
        .send()
        .await?;

    assert_eq!(response.status(), 200);

    let body: Value = response.json().await?;
    let summary = body["summary"].as_str().expect("summary string");
    assert!(summary.starts_with("Summary of 'My Video'"));
    assert!(summary.contains("(Description trimmed for summarization)"));

    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_summarize_requires_input() -> Result<(), Box<dyn std::error::Error>> {
    let client = Client::new();
    let response = client
        .post(format!("{BASE}/summarize_video"))
        .json(&json!({}))
        .send()
        .await?;

    assert_eq!(response.status(), 400);

    Ok(())
}

// =============================================================================
// File Server Tests
// =============================================================================

#[tokio::test]
#[ignore]
async fn test_downloads_unknown_file_is_404() -> Result<(), Box<dyn std::error::Error>> {
    let client = Client::new();
    let response = client
        .get(format!("{BASE}/downloads/no-such-artifact.mp4"))
        .send()
        .await?;

    assert_eq!(response.status(), 404);

    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_downloads_rejects_dotted_names() -> Result<(), Box<dyn std::error::Error>> {
    let client = Client::new();
    let response = client
        .get(format!("{BASE}/downloads/..secret"))
        .send()
        .await?;

    assert_eq!(response.status(), 400);

    Ok(())
}
