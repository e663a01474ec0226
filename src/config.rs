// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Runtime configuration.
//!
//! Everything is overridable from the environment; CLI flags win over both.
//!
//! | Variable                 | Default      |
//! |--------------------------|--------------|
//! | `FETCHTUBE_PORT`         | `5000`       |
//! | `FETCHTUBE_BIND`         | `127.0.0.1`  |
//! | `FETCHTUBE_DOWNLOAD_DIR` | `downloads`  |
//! | `YTDLP_PATH`             | discovered   |

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default port to listen on.
pub const DEFAULT_PORT: u16 = 5000;

/// Default bind address; localhost-only unless explicitly widened.
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";

/// Default download directory, one flat directory for every artifact.
pub const DEFAULT_DOWNLOAD_DIR: &str = "downloads";

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Port to listen on.
    pub port: u16,
    /// Address to bind to.
    pub bind_address: String,
    /// Directory completed artifacts are written to and served from.
    pub download_dir: PathBuf,
    /// Explicit yt-dlp binary path; `None` means auto-discover.
    pub ytdlp_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
            ytdlp_path: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            port: port_from(std::env::var("FETCHTUBE_PORT").ok()),
            bind_address: std::env::var("FETCHTUBE_BIND")
                .ok()
                .filter(|addr| !addr.is_empty())
                .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            download_dir: std::env::var("FETCHTUBE_DOWNLOAD_DIR")
                .ok()
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DOWNLOAD_DIR)),
            ytdlp_path: std::env::var("YTDLP_PATH")
                .ok()
                .filter(|path| !path.is_empty())
                .map(PathBuf::from),
        }
    }

    /// Create the download directory if it does not exist yet.
    pub fn ensure_download_dir(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.download_dir).map_err(|err| {
            anyhow::anyhow!(
                "Failed to create download directory {}: {}",
                self.download_dir.display(),
                err
            )
        })
    }

    /// "host:port" string the listener binds to.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

fn port_from(raw: Option<String>) -> u16 {
    raw.and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.port, 5000);
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.download_dir, PathBuf::from("downloads"));
        assert!(config.ytdlp_path.is_none());
        assert_eq!(config.listen_addr(), "127.0.0.1:5000");
    }

    #[test]
    fn test_port_parsing() {
        assert_eq!(port_from(Some("8080".to_string())), 8080);
        assert_eq!(port_from(Some("not-a-port".to_string())), DEFAULT_PORT);
        assert_eq!(port_from(None), DEFAULT_PORT);
    }

    #[test]
    fn test_ensure_download_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let config = AppConfig {
            download_dir: tmp.path().join("nested").join("downloads"),
            ..AppConfig::default()
        };
        config.ensure_download_dir().unwrap();
        assert!(config.download_dir.is_dir());

        // Idempotent
        config.ensure_download_dir().unwrap();
    }
}
