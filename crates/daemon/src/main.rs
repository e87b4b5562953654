// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! jobwatch daemon (jwd)
//!
//! Background process that owns the watcher engine: it recovers the store,
//! resumes ACTIVE watchers, runs periodic health checks and checkpoints,
//! and shuts the engine down cleanly on SIGTERM/SIGINT.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod env;
mod lifecycle;

use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

use crate::lifecycle::{Config, DaemonState, LifecycleError};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle info flags before any config/lock acquisition
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("jwd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("jwd {}", env!("CARGO_PKG_VERSION"));
                println!("jobwatch daemon - monitors batch job output and runs watcher actions");
                println!();
                println!("USAGE:");
                println!("    jwd");
                println!();
                println!("State lives under $JW_STATE_DIR (default ~/.local/state/jobwatch).");
                println!("Engine settings are read from the [engine] table of config.toml there.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: jwd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;

    // Write startup marker to log (before tracing setup)
    write_startup_marker(&config)?;
    let log_guard = setup_logging(&config)?;

    info!("starting jobwatch daemon");

    let health_interval = config.health_check_interval();
    let checkpoint_interval = config.checkpoint_interval();
    let daemon = match lifecycle::startup(config.clone()).await {
        Ok(daemon) => daemon,
        Err(LifecycleError::LockFailed(_)) => {
            let pid = std::fs::read_to_string(&config.lock_path)
                .unwrap_or_default()
                .trim()
                .to_string();
            eprintln!("jwd is already running");
            if !pid.is_empty() {
                eprintln!("  pid: {pid}");
            }
            std::process::exit(1);
        }
        Err(e) => {
            // Write error synchronously (tracing is non-blocking and may not flush in time)
            write_startup_error(&config, &e);
            error!(error = %e, "failed to start daemon");
            drop(log_guard);
            return Err(e.into());
        }
    };

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!(
        resumed = daemon.resumed,
        health_check_ms = health_interval.as_millis() as u64,
        checkpoint_ms = checkpoint_interval.as_millis() as u64,
        "daemon ready"
    );
    println!("READY");

    run(&daemon, health_interval, checkpoint_interval, async move {
        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
            _ = sigint.recv() => info!("received SIGINT, shutting down"),
        }
    })
    .await;

    daemon.shutdown().await?;
    info!("daemon stopped");
    Ok(())
}

/// Flush interval for group commit (~10ms durability window)
const FLUSH_INTERVAL: std::time::Duration = std::time::Duration::from_millis(10);

/// Run periodic maintenance until `stop` resolves.
async fn run(
    daemon: &DaemonState,
    health_interval: std::time::Duration,
    checkpoint_interval: std::time::Duration,
    stop: impl std::future::Future<Output = ()>,
) {
    // NOTE: Intervals must live outside the loop; select! rebuilds branch futures each pass
    let mut health = tokio::time::interval(health_interval);
    let mut checkpoint = tokio::time::interval(checkpoint_interval);
    let mut flush = tokio::time::interval(FLUSH_INTERVAL);
    // Both fire immediately; the first real check is one period out
    health.tick().await;
    checkpoint.tick().await;
    tokio::pin!(stop);

    loop {
        tokio::select! {
            _ = &mut stop => break,
            _ = health.tick() => {
                let report = daemon.engine.health_check().await;
                if report.restarted.is_empty() && report.completed.is_empty() {
                    tracing::debug!(running = daemon.engine.running_count(), "health check ok");
                } else {
                    info!(
                        restarted = report.restarted.len(),
                        completed = report.completed.len(),
                        "health check repaired watchers"
                    );
                }
            }
            _ = flush.tick() => {
                if daemon.store.needs_flush() {
                    if let Err(e) = daemon.store.flush() {
                        error!(error = %e, "failed to flush store");
                    }
                }
            }
            _ = checkpoint.tick() => {
                if let Err(e) = daemon.store.checkpoint() {
                    warn!(error = %e, "failed to checkpoint store");
                }
            }
        }
    }
}

/// Startup marker prefix written to the log before anything else.
/// Full format: "--- jwd: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- jwd: starting (pid: ";

/// Write startup marker to log file (appends to existing log)
fn write_startup_marker(config: &Config) -> Result<(), LifecycleError> {
    use std::io::Write;

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;
    writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())?;
    Ok(())
}

/// Write startup error synchronously to log file.
fn write_startup_error(config: &Config, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR failed to start daemon: {}", error);
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().ok_or(LifecycleError::NoStateDir)?,
        config
            .log_path
            .file_name()
            .ok_or(LifecycleError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
