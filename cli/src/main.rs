//! driftwatch - binary entry point.
//!
//! Reads newline-delimited JSON deliveries from stdin and appends every
//! delivery whose reported time is too far from its receipt time to the
//! anomaly log.
//!
//! ```text
//! main() -> ListenerConfig::load() -> init_tracing() -> LineSource(stdin)
//!                                                          |
//!                                                          v
//!                                            SkewHandler per line -> diff.log
//! ```
//!
//! Runs until stdin reaches EOF or Ctrl-C; in-flight deliveries finish first.

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    future::Future,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tokio::runtime::{Builder, Runtime};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use driftwatch_config::{DEFAULT_DIAGNOSTICS_DIR, ListenerConfig};
use driftwatch_core::{LineSource, SkewHandler};

const LOG_FILE_NAME: &str = "driftwatch.log";

fn init_tracing(diagnostics_dir: &Path) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_log_file(diagnostics_dir);

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
    } else {
        // Headless: stderr is fine when no log directory is writable.
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    }

    for warning in init_warnings {
        tracing::warn!("{warning}");
    }
}

fn open_log_file(diagnostics_dir: &Path) -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates(diagnostics_dir) {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates(diagnostics_dir: &Path) -> Vec<PathBuf> {
    // Primary: configured directory (./logs by default)
    let mut candidates = vec![diagnostics_dir.join(LOG_FILE_NAME)];

    // Fallback: ~/.driftwatch/logs/driftwatch.log
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".driftwatch").join("logs").join(LOG_FILE_NAME));
    }

    candidates
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C, running until EOF: {err}");
        std::future::pending::<()>().await;
    }
}

async fn listen(config: ListenerConfig) -> Result<()> {
    tracing::info!(
        threshold = %config.threshold(),
        log_path = %config.log_path.display(),
        sync_writes = config.sync_writes,
        "Listening for deliveries on stdin"
    );

    let handler = Arc::new(SkewHandler::from_config(&config));
    let stats = LineSource::new(tokio::io::stdin())
        .run_until(handler, shutdown_signal())
        .await
        .context("failed to read deliveries from stdin")?;

    tracing::info!(
        delivered = stats.delivered,
        skipped = stats.skipped,
        "Delivery source finished"
    );
    Ok(())
}

fn build_runtime() -> Result<Runtime> {
    Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")
}

/// Drive `future` to completion, then drop the runtime without joining its
/// blocking pool.
///
/// tokio's stdin parks a read on the blocking pool that cannot be cancelled.
/// A plain runtime drop would wait for it, so Ctrl-C on an idle pipe would
/// never exit. Deliveries are already drained when `future` returns.
fn block_on_then_release<F: Future>(runtime: Runtime, future: F) -> F::Output {
    let output = runtime.block_on(future);
    runtime.shutdown_background();
    output
}

fn main() -> Result<()> {
    // Config decides where diagnostics go, so it loads before tracing exists;
    // a load failure is logged once the subscriber is up.
    let config = ListenerConfig::load();
    let diagnostics_dir = config.as_ref().map_or_else(
        |_| PathBuf::from(DEFAULT_DIAGNOSTICS_DIR),
        |config| config.diagnostics_dir.clone(),
    );
    init_tracing(&diagnostics_dir);

    let config = match config {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("{err}");
            return Err(anyhow::Error::from(err).context("failed to load driftwatch configuration"));
        }
    };

    let runtime = build_runtime()?;
    block_on_then_release(runtime, listen(config))
}
