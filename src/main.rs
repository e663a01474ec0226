// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::Colorize;

use fetchtube::config::AppConfig;
use fetchtube::extract::{MediaExtractor, YtDlpClient};
use fetchtube::server::Server;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit codes following sysexits.h conventions
mod exit_codes {
    /// Success - operation completed successfully
    pub const SUCCESS: i32 = 0;
    /// General error - unspecified error
    pub const ERROR: i32 = 1;
    /// Service unavailable - required tool (yt-dlp) not running/installed
    pub const SERVICE_UNAVAILABLE: i32 = 69;
    /// Configuration error - invalid or missing config
    pub const CONFIG: i32 = 78;
}

use exit_codes::*;

#[derive(Parser)]
#[command(name = "fetchtube", version = VERSION)]
#[command(about = "Self-hosted video download gateway", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the gateway server (default)
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
        /// Bind address; use 0.0.0.0 to expose on the network
        #[arg(short, long)]
        bind: Option<String>,
        /// Download directory for completed artifacts
        #[arg(short, long)]
        download_dir: Option<PathBuf>,
        /// Explicit yt-dlp binary path
        #[arg(long)]
        ytdlp_path: Option<PathBuf>,
    },
    /// Check that the external extractor is available
    Check,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(log_level).init();

    let code = match cli.command.unwrap_or(Command::Serve {
        port: None,
        bind: None,
        download_dir: None,
        ytdlp_path: None,
    }) {
        Command::Serve {
            port,
            bind,
            download_dir,
            ytdlp_path,
        } => run_serve(port, bind, download_dir, ytdlp_path).await,
        Command::Check => run_check(),
    };

    std::process::exit(code);
}

async fn run_serve(
    port: Option<u16>,
    bind: Option<String>,
    download_dir: Option<PathBuf>,
    ytdlp_path: Option<PathBuf>,
) -> i32 {
    // Environment first, CLI flags win
    let mut config = AppConfig::from_env();
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(bind) = bind {
        config.bind_address = bind;
    }
    if let Some(dir) = download_dir {
        config.download_dir = dir;
    }
    if let Some(path) = ytdlp_path {
        config.ytdlp_path = Some(path);
    }

    if let Err(err) = config.ensure_download_dir() {
        eprintln!("{} {}", "[X]".red(), err);
        return CONFIG;
    }

    let extractor = YtDlpClient::discover(config.ytdlp_path.clone());
    match extractor.probe() {
        Ok(version) => {
            println!(
                "{} yt-dlp {} at {}",
                "[OK]".green(),
                version,
                extractor.binary().display()
            );
        }
        Err(err) => {
            // The server still starts; metadata and download requests will
            // fail until the binary appears
            println!("{} yt-dlp unavailable: {}", "[!]".yellow(), err);
            println!("    Install it or set YTDLP_PATH before starting downloads.");
        }
    }

    println!(
        "{} {} v{} on {}",
        "fetchtube".bright_cyan().bold(),
        "serving".bold(),
        VERSION,
        format!("http://{}", config.listen_addr()).underline()
    );
    println!(
        "    downloads -> {}",
        config.download_dir.display().to_string().dimmed()
    );

    let server = Server::new(config).with_extractor(Arc::new(extractor));
    match server.start().await {
        Ok(()) => SUCCESS,
        Err(err) => {
            eprintln!("{} {}", "[X]".red(), err);
            ERROR
        }
    }
}

fn run_check() -> i32 {
    let extractor = YtDlpClient::discover(AppConfig::from_env().ytdlp_path);
    print!("yt-dlp ({}) ... ", extractor.binary().display());

    match extractor.probe() {
        Ok(version) => {
            println!("{} version {}", "[OK]".green(), version);
            SUCCESS
        }
        Err(err) => {
            println!("{} {}", "[X]".red(), err);
            println!("Install yt-dlp (https://github.com/yt-dlp/yt-dlp) or set YTDLP_PATH.");
            SERVICE_UNAVAILABLE
        }
    }
}
