//! IMEI Hunter CLI - interactive theft-record check.
//!
//! ```text
//! main() -> HunterConfig -> HttpLookupService -> VerificationSession
//!                                                      |
//!                                                      v
//!                                Console::run(): IMEI -> challenge -> verdict
//! ```
//!
//! Logs go to `~/.imei-hunter/logs/imei-hunter.log` so they never interleave
//! with the prompts.

mod challenge;
mod console;

use std::{
    env,
    fs::{self, OpenOptions},
    io::stdout,
    path::PathBuf,
    sync::Mutex,
};

use anyhow::{Context, Result};
use imei_client::HttpLookupService;
use imei_config::HunterConfig;
use imei_core::VerificationSession;
use tokio::io::{BufReader, stdin};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::console::Console;

const USAGE: &str = "Usage: imei-hunter [IMEI]";

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // No log file: keep stderr quiet enough not to bury the prompts.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::new("warn"))
        .init();
    for warning in init_warnings {
        tracing::warn!("{warning}");
    }
}

fn open_log_file() -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();
    let Some(candidate) = imei_config::log_path() else {
        warnings.push("Could not determine home directory for log file".to_string());
        return (None, warnings);
    };

    if let Some(parent) = candidate.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warnings.push(format!(
            "Failed to create log dir {}: {e}",
            parent.display()
        ));
        return (None, warnings);
    }

    match OpenOptions::new().create(true).append(true).open(&candidate) {
        Ok(file) => (Some((candidate, file)), warnings),
        Err(e) => {
            warnings.push(format!(
                "Failed to open log file {}: {e}",
                candidate.display()
            ));
            (None, warnings)
        }
    }
}

fn load_config() -> HunterConfig {
    match HunterConfig::load() {
        Ok(config) => config.unwrap_or_default(),
        Err(err) => {
            eprintln!("Warning: {err}. Using defaults.");
            HunterConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let identifier = match env::args().nth(1).as_deref() {
        Some("-h" | "--help") => {
            println!("{USAGE}");
            return Ok(());
        }
        Some("-V" | "--version") => {
            println!("imei-hunter {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Some(arg) => Some(arg.trim().to_string()),
        None => None,
    };

    init_tracing();

    let config = load_config();
    let client_config = config
        .client_config()
        .context("invalid lookup service URL")?;
    tracing::info!(base_url = %client_config.base_url(), "Using lookup service");
    let service = HttpLookupService::new(client_config)?;
    let flow = VerificationSession::new(service);

    let mut console = Console::new(BufReader::new(stdin()), stdout(), config.challenge_dir());
    console.run(&flow, identifier).await
}
