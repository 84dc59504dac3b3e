//! Log setup: two plain-message log files plus stderr.

use anyhow::{Context, Result};
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::filter::{EnvFilter, Targets};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// HTTP internals that would otherwise flood the debug log.
const NOISY_TARGETS: [&str; 4] = ["hyper", "reqwest", "h2", "rustls"];

fn file_filter(level: Level) -> Targets {
    NOISY_TARGETS
        .iter()
        .fold(Targets::new().with_default(level), |targets, target| {
            targets.with_target(*target, Level::WARN)
        })
}

fn truncate(path: &Path) -> Result<Mutex<File>> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    Ok(Mutex::new(file))
}

/// Install the global subscriber. Both log files are truncated.
pub fn configure_logging(debug_log: &Path, info_log: &Path) -> Result<()> {
    let debug_layer = tracing_subscriber::fmt::layer()
        .with_writer(truncate(debug_log)?)
        .with_ansi(false)
        .with_target(false)
        .with_level(false)
        .without_time()
        .with_filter(file_filter(Level::DEBUG));

    let info_layer = tracing_subscriber::fmt::layer()
        .with_writer(truncate(info_log)?)
        .with_ansi(false)
        .with_target(false)
        .with_level(false)
        .without_time()
        .with_filter(file_filter(Level::INFO));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()));

    tracing_subscriber::registry()
        .with(debug_layer)
        .with(info_layer)
        .with(stderr_layer)
        .try_init()
        .context("Failed to install log subscriber")
}
