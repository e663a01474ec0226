// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! API error handling.
//!
//! User-facing errors carry a human-readable message and a unique reference
//! code; the full internal detail goes to the server log only. Internal
//! errors never expose paths, addresses, or other implementation detail to
//! the caller; the reference code is what links a report back to the log.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde::Serialize;

use crate::extract::ExtractError;

/// Generate a unique error reference code.
/// Format: ERR-YYYYMMDD-XXXXXX (e.g. ERR-20250115-A3F8K2)
pub fn generate_reference_code() -> String {
    let date = Utc::now().format("%Y%m%d");
    let mut rng = rand::thread_rng();
    let chars: Vec<char> = "ABCDEFGHJKLMNPQRSTUVWXYZ23456789".chars().collect();
    let random: String = (0..6)
        .map(|_| chars[rng.gen_range(0..chars.len())])
        .collect();
    format!("ERR-{}-{}", date, random)
}

/// User-facing error for the HTTP API.
#[derive(Debug, Clone)]
pub enum ApiError {
    /// Invalid request from the client (400)
    InvalidRequest { message: String, reference: String },

    /// The external extractor failed (502)
    ExtractionFailed { message: String, reference: String },

    /// The extractor exceeded its deadline (504)
    GatewayTimeout { message: String, reference: String },

    /// Resource not found (404)
    NotFound { message: String, reference: String },

    /// Internal server error (500) - never exposes internal details
    Internal { message: String, reference: String },
}

impl ApiError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::ExtractionFailed { .. } => StatusCode::BAD_GATEWAY,
            ApiError::GatewayTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the user-facing message.
    pub fn message(&self) -> &str {
        match self {
            ApiError::InvalidRequest { message, .. } => message,
            ApiError::ExtractionFailed { message, .. } => message,
            ApiError::GatewayTimeout { message, .. } => message,
            ApiError::NotFound { message, .. } => message,
            ApiError::Internal { message, .. } => message,
        }
    }

    /// Get the reference code for this error.
    pub fn reference(&self) -> &str {
        match self {
            ApiError::InvalidRequest { reference, .. } => reference,
            ApiError::ExtractionFailed { reference, .. } => reference,
            ApiError::GatewayTimeout { reference, .. } => reference,
            ApiError::NotFound { reference, .. } => reference,
            ApiError::Internal { reference, .. } => reference,
        }
    }

    /// Create an InvalidRequest error.
    pub fn invalid_request(user_message: &str) -> Self {
        let reference = generate_reference_code();

        tracing::warn!(
            reference = %reference,
            message = %user_message,
            "Invalid request"
        );

        Self::InvalidRequest {
            message: user_message.to_string(),
            reference,
        }
    }

    /// Create an ExtractionFailed error. The cause is user-visible by
    /// contract (it is the extractor's human-readable failure string).
    pub fn extraction_failed(cause: &str) -> Self {
        let reference = generate_reference_code();
        let sanitized = sanitize_error_details(cause);

        tracing::error!(
            reference = %reference,
            cause = %sanitized,
            "Extraction failed"
        );

        Self::ExtractionFailed {
            message: format!("Failed to get video info: {}", sanitized),
            reference,
        }
    }

    /// Create a GatewayTimeout error.
    pub fn gateway_timeout(internal_details: &str) -> Self {
        let reference = generate_reference_code();

        tracing::error!(
            reference = %reference,
            internal_details = %sanitize_error_details(internal_details),
            "Extractor timed out"
        );

        Self::GatewayTimeout {
            message: "The video service took too long to respond. Please try again.".to_string(),
            reference,
        }
    }

    /// Create a NotFound error.
    pub fn not_found(resource: &str) -> Self {
        let reference = generate_reference_code();

        tracing::info!(
            reference = %reference,
            resource = %resource,
            "Resource not found"
        );

        Self::NotFound {
            message: format!("The requested {} was not found.", resource),
            reference,
        }
    }

    /// Create an Internal error, logging full details internally.
    /// This never exposes internal details to the user.
    pub fn internal_error(internal_error: &str) -> Self {
        let reference = generate_reference_code();

        tracing::error!(
            reference = %reference,
            internal_error = %sanitize_error_details(internal_error),
            "Internal server error"
        );

        Self::Internal {
            message: format!("An unexpected error occurred. Reference: {}", reference),
            reference,
        }
    }
}

impl From<ExtractError> for ApiError {
    fn from(err: ExtractError) -> Self {
        match &err {
            ExtractError::Failed { .. } | ExtractError::Parse(_) => {
                ApiError::extraction_failed(&err.to_string())
            }
            ExtractError::Timeout { .. } => ApiError::gateway_timeout(&err.to_string()),
            // A missing or unlaunchable binary is our misconfiguration,
            // not something the caller should see verbatim
            ExtractError::Spawn(_) => ApiError::internal_error(&err.to_string()),
        }
    }
}

/// Wire shape: `{"error": ..., "reference": ...}` plus the HTTP status.
#[derive(Debug, Clone, Serialize)]
struct ErrorBody {
    error: String,
    reference: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: self.message().to_string(),
            reference: self.reference().to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Patterns for scrubbing sensitive information from logged error detail.
/// Compiled once at startup.
static SANITIZE_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        // File paths (Windows and Unix)
        (
            Regex::new(r"[A-Za-z]:\\[^\s]+").expect("Windows path regex"),
            "[PATH_REDACTED]",
        ),
        (
            Regex::new(r"/(?:home|usr|var|etc|opt|tmp|root)/[^\s]+").expect("Unix path regex"),
            "[PATH_REDACTED]",
        ),
        // IP addresses
        (
            Regex::new(r"\b\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}\b").expect("IPv4 regex"),
            "[IP_REDACTED]",
        ),
        // Bearer tokens and cookie blobs that a hostile URL could smuggle in
        (
            Regex::new(r"Bearer [a-zA-Z0-9-._~+/]+=*").expect("Bearer token regex"),
            "Bearer [TOKEN_REDACTED]",
        ),
        (
            Regex::new(r"\b[A-Za-z0-9]{40,}\b").expect("Long secret regex"),
            "[SECRET_REDACTED]",
        ),
    ]
});

/// Scrub paths, addresses, and token-shaped strings out of error detail.
pub fn sanitize_error_details(error: &str) -> String {
    let mut result = error.to_string();

    for (pattern, replacement) in SANITIZE_PATTERNS.iter() {
        result = pattern.replace_all(&result, *replacement).to_string();
    }

    result
}

/// Result type that uses ApiError for the error variant.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_reference_code() {
        let code = generate_reference_code();
        assert!(code.starts_with("ERR-"));
        assert_eq!(code.len(), 19); // ERR-YYYYMMDD-XXXXXX = 4+8+1+6

        // Should be unique
        let code2 = generate_reference_code();
        assert_ne!(code, code2);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::invalid_request("test").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::extraction_failed("test").status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::gateway_timeout("test").status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ApiError::not_found("file").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::internal_error("test").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_sanitize_paths_and_ips() {
        let detail = "open /home/user/secret/clip.mp4 failed, peer 192.168.1.20";
        let sanitized = sanitize_error_details(detail);
        assert!(!sanitized.contains("/home/user"));
        assert!(!sanitized.contains("192.168.1.20"));
        assert!(sanitized.contains("[PATH_REDACTED]"));
        assert!(sanitized.contains("[IP_REDACTED]"));
    }

    #[test]
    fn test_internal_error_never_exposes_details() {
        let err = ApiError::internal_error("io error at /home/user/downloads/x.mp4");
        assert!(!err.message().contains("/home/user"));
        assert!(err.message().contains("Reference:"));
    }

    #[test]
    fn test_extraction_error_keeps_cause() {
        let err = ApiError::extraction_failed("ERROR: Video unavailable");
        assert!(err.message().contains("Video unavailable"));
        assert!(err.message().starts_with("Failed to get video info:"));
    }

    #[test]
    fn test_extract_error_mapping() {
        let err: ApiError = ExtractError::Failed {
            cause: "no formats found".to_string(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);

        let err: ApiError = ExtractError::Timeout { seconds: 45 }.into();
        assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);

        let err: ApiError =
            ExtractError::Spawn(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_body_shape() {
        let err = ApiError::invalid_request("URL is required");
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
