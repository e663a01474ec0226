//! HTTP/WebSocket server
//!
//! Exposes the download gateway's public surface.
//!
//! # Endpoints
//!
//! - `POST /get_video_info` - Metadata and ranked formats for a URL
//! - `POST /summarize_video` - Text summary of a title/description
//! - `GET /downloads/{filename}` - Stream a completed artifact
//! - `GET /ws` - Per-session live progress channel
//! - `GET /health` - Health check
//!
//! # Example
//!
//! ```no_run
//! use fetchtube::config::AppConfig;
//! use fetchtube::server::Server;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let server = Server::new(AppConfig::default());
//! server.start().await?;
//! # Ok(())
//! # }
//! ```

pub mod ws;

use std::path::Path as FsPath;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::timeout::TimeoutLayer;

use crate::config::AppConfig;
use crate::errors::{ApiError, ApiResult};
use crate::extract::{MediaExtractor, YtDlpClient};
use crate::formats::{build_format_list, FormatDescriptor};
use crate::jobs::JobRunner;
use crate::session::SessionManager;
use crate::summary::summarize;
use crate::validate;

// Maximum request body size (64KB); the API only ever receives small JSON
const MAX_BODY_SIZE: usize = 64 * 1024;
// Hard deadline for any plain HTTP request (the metadata dump dominates)
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Server state shared across handlers.
pub struct AppState {
    /// Application configuration.
    pub config: AppConfig,
    /// External extractor client.
    pub extractor: Arc<dyn MediaExtractor>,
    /// Live WebSocket sessions.
    pub sessions: SessionManager,
    /// Download job runner.
    pub runner: JobRunner,
}

/// API server configuration.
pub struct Server {
    config: AppConfig,
    extractor: Option<Arc<dyn MediaExtractor>>,
}

impl Server {
    /// Create a new server for the given configuration.
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            extractor: None,
        }
    }

    /// Inject a specific extractor (tests use a stub here).
    pub fn with_extractor(mut self, extractor: Arc<dyn MediaExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Build the router with all routes.
    pub fn build_router(&self) -> Router {
        let extractor = self.extractor.clone().unwrap_or_else(|| {
            Arc::new(YtDlpClient::discover(self.config.ytdlp_path.clone()))
        });

        let state = Arc::new(AppState {
            runner: JobRunner::new(Arc::clone(&extractor), self.config.download_dir.clone()),
            config: self.config.clone(),
            extractor,
            sessions: SessionManager::new(),
        });

        // Rate limiting: 2 requests per second with a burst of 30 per IP
        let governor_conf = Arc::new(
            GovernorConfigBuilder::default()
                .per_second(2)
                .burst_size(30)
                .key_extractor(SmartIpKeyExtractor)
                .finish()
                .expect("Failed to build governor config"),
        );

        // The WebSocket route stays outside the timeout layer; it is
        // long-lived by design
        let api = Router::new()
            .route("/get_video_info", post(get_video_info_handler))
            .route("/summarize_video", post(summarize_video_handler))
            .route("/health", get(health_handler))
            .layer(
                ServiceBuilder::new()
                    .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
                    .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
                    .layer(GovernorLayer {
                        config: governor_conf,
                    }),
            );

        Router::new()
            .merge(api)
            .route("/downloads/:filename", get(download_file_handler))
            .route("/ws", get(ws::ws_handler))
            .with_state(state)
    }

    /// Start the server with graceful shutdown.
    pub async fn start(&self) -> Result<()> {
        let router = self.build_router();
        let addr = self.config.listen_addr();

        tracing::info!("Starting server on {}", addr);

        // Security warning if binding to all interfaces
        if self.config.bind_address == "0.0.0.0" {
            tracing::warn!(
                "Server is binding to 0.0.0.0 which exposes the API to the network. \
                Use 127.0.0.1 (default) for local-only access."
            );
        }

        let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                anyhow::anyhow!(
                    "Port {} is already in use. This usually means another fetchtube \
                    instance is running. Try stopping other instances or use a different \
                    port with: fetchtube serve --port <PORT>",
                    self.config.port
                )
            } else {
                anyhow::anyhow!("Failed to bind to {}: {}", addr, e)
            }
        })?;

        // Start server with graceful shutdown on signal
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }

    /// Get the configured port.
    pub fn port(&self) -> u16 {
        self.config.port
    }
}

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Deserialize)]
struct VideoInfoRequest {
    #[serde(default)]
    url: Option<String>,
}

/// Metadata plus the ranked format list for one URL.
#[derive(Serialize)]
struct VideoInfoResponse {
    title: String,
    thumbnail: String,
    channel: String,
    duration: u64,
    view_count: u64,
    description: String,
    formats: Vec<FormatDescriptor>,
    original_url: String,
    uploader: String,
    upload_date: String,
    webpage_url: String,
}

#[derive(Deserialize)]
struct SummarizeRequest {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Serialize)]
struct SummarizeResponse {
    summary: String,
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: &'static str,
    extractor_status: String,
    active_sessions: usize,
}

// =============================================================================
// Handlers
// =============================================================================

/// Metadata handler: validate the URL, run the extractor in metadata-only
/// mode, and return the ranked format list.
async fn get_video_info_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VideoInfoRequest>,
) -> ApiResult<Json<VideoInfoResponse>> {
    let url = request
        .url
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ApiError::invalid_request("URL is required"))?;

    if !validate::is_valid_video_url(&url) {
        return Err(ApiError::invalid_request("Invalid or unsupported video URL."));
    }

    let extractor = Arc::clone(&state.extractor);
    let fetch_url = url.clone();
    let metadata = tokio::task::spawn_blocking(move || extractor.fetch_metadata(&fetch_url))
        .await
        .map_err(|e| ApiError::internal_error(&e.to_string()))??;

    let formats = build_format_list(&metadata.streams);
    tracing::info!(url = %url, formats = formats.len(), "Video info served");

    Ok(Json(VideoInfoResponse {
        title: metadata.title,
        thumbnail: metadata.thumbnail,
        channel: metadata.channel,
        duration: metadata.duration,
        view_count: metadata.view_count,
        description: metadata.description,
        formats,
        original_url: url,
        uploader: metadata.uploader,
        upload_date: metadata.upload_date,
        webpage_url: metadata.webpage_url,
    }))
}

/// Summarize handler: pure text templating over title/description.
async fn summarize_video_handler(
    Json(request): Json<SummarizeRequest>,
) -> ApiResult<Json<SummarizeResponse>> {
    let title = request.title.as_deref().filter(|t| !t.is_empty());
    let description = request.description.as_deref().filter(|d| !d.is_empty());

    if title.is_none() && description.is_none() {
        return Err(ApiError::invalid_request(
            "No video title or description provided for summarization.",
        ));
    }

    Ok(Json(SummarizeResponse {
        summary: summarize(title, description),
    }))
}

/// File server: stream a completed artifact as an attachment.
async fn download_file_handler(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> ApiResult<Response> {
    // The download directory is flat; anything that looks like a path is
    // hostile
    if filename.is_empty()
        || filename.contains('/')
        || filename.contains('\\')
        || filename.contains("..")
    {
        return Err(ApiError::invalid_request("Invalid filename."));
    }

    let path = state.config.download_dir.join(&filename);
    let meta = tokio::fs::metadata(&path)
        .await
        .map_err(|_| ApiError::not_found("file"))?;
    if !meta.is_file() {
        return Err(ApiError::not_found("file"));
    }

    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|e| ApiError::internal_error(&e.to_string()))?;
    let body = Body::from_stream(ReaderStream::new(file));

    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static(content_type_for_filename(&filename)),
    );
    headers.insert(
        CONTENT_LENGTH,
        HeaderValue::from_str(&meta.len().to_string())
            .map_err(|e| ApiError::internal_error(&e.to_string()))?,
    );
    headers.insert(
        CONTENT_DISPOSITION,
        HeaderValue::from_str(&build_content_disposition(&filename))
            .map_err(|e| ApiError::internal_error(&e.to_string()))?,
    );

    tracing::info!(filename = %filename, "Serving artifact");
    Ok((headers, body).into_response())
}

/// Health check handler.
///
/// Probes the extractor and reports degraded status when it is missing.
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let extractor = Arc::clone(&state.extractor);
    let extractor_status = match tokio::task::spawn_blocking(move || extractor.probe()).await {
        Ok(Ok(version)) => format!("ok ({})", version),
        Ok(Err(_)) | Err(_) => "unavailable".to_string(),
    };

    let status = if extractor_status.starts_with("ok") {
        "ok".to_string()
    } else {
        "degraded".to_string()
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        extractor_status,
        active_sessions: state.sessions.len(),
    })
}

// =============================================================================
// Utilities
// =============================================================================

/// Content type from the artifact extension.
fn content_type_for_filename(filename: &str) -> &'static str {
    let extension = FsPath::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "opus" | "ogg" => "audio/ogg",
        "wav" => "audio/wav",
        _ => "application/octet-stream",
    }
}

/// Attachment disposition with an ASCII-safe filename.
fn build_content_disposition(filename: &str) -> String {
    let safe: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("attachment; filename=\"{}\"", safe)
}

/// Graceful shutdown signal handler.
///
/// Waits for SIGINT/SIGTERM. Running download jobs are abandoned with the
/// process; nothing persists.
async fn shutdown_signal() {
    // On Unix, listen for SIGINT and SIGTERM
    // On Windows, fall back to Ctrl+C only
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown...");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
        tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
    }

    tracing::info!("Cleanup complete, shutting down server");
}
