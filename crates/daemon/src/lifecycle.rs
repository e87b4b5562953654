// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fs2::FileExt;
use jw_adapters::{LogNotifyAdapter, SlurmAdapter, SshTransport, TracedJobs, TracedRemote};
use jw_core::SystemClock;
use jw_engine::{Engine, EngineConfig, EngineDeps};
use jw_storage::{Store, StoreError};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::env::state_dir;

/// Engine over the production adapters
pub type DaemonEngine =
    Engine<TracedRemote<SlurmAdapter>, TracedJobs<SlurmAdapter>, LogNotifyAdapter, SystemClock>;

/// Optional `config.toml` contents
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub engine: EngineConfig,
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/jobwatch)
    pub state_dir: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to version file
    pub version_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Directory holding the store's WAL and snapshot
    pub store_path: PathBuf,
    pub engine: EngineConfig,
}

impl Config {
    /// Load configuration for the user-level daemon from the resolved
    /// state directory.
    pub fn load() -> Result<Self, LifecycleError> {
        Self::for_dir(state_dir()?)
    }

    /// Configuration rooted at `state_dir`, reading `config.toml` there if
    /// it exists.
    pub fn for_dir(state_dir: PathBuf) -> Result<Self, LifecycleError> {
        let file = read_config_file(&state_dir.join("config.toml"))?;
        Ok(Self {
            lock_path: state_dir.join("jwd.pid"),
            version_path: state_dir.join("jwd.version"),
            log_path: state_dir.join("jwd.log"),
            store_path: state_dir.join("store"),
            engine: file.engine,
            state_dir,
        })
    }

    /// Health check period: env override, else the engine setting
    pub fn health_check_interval(&self) -> Duration {
        crate::env::health_check_ms().unwrap_or_else(|| self.engine.health_check_interval())
    }

    pub fn checkpoint_interval(&self) -> Duration {
        crate::env::checkpoint_ms().unwrap_or(DEFAULT_CHECKPOINT_INTERVAL)
    }
}

/// Default store checkpoint period
pub const DEFAULT_CHECKPOINT_INTERVAL: Duration = Duration::from_secs(60);

fn read_config_file(path: &Path) -> Result<ConfigFile, LifecycleError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ConfigFile::default()),
        Err(e) => return Err(e.into()),
    };
    toml::from_str(&text).map_err(|e| LifecycleError::Config(path.to_path_buf(), e))
}

/// Daemon state during operation
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub store: Store,
    pub engine: DaemonEngine,
    /// Watchers whose tasks were restarted at startup
    pub resumed: usize,
}

impl DaemonState {
    /// Stop every watcher task, checkpoint the store and remove the PID and
    /// version files.
    ///
    /// Instances keep their persisted state, so ACTIVE watchers resume on
    /// the next startup.
    pub async fn shutdown(self) -> Result<(), LifecycleError> {
        info!("shutting down daemon");

        // 1. Stop monitor tasks
        self.engine.shutdown().await;

        // 2. Final checkpoint so the next startup does not replay the WAL
        self.store.checkpoint()?;

        // 3. Remove PID and version files
        for path in [&self.config.lock_path, &self.config.version_path] {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    warn!(path = %path.display(), error = %e, "failed to remove file");
                }
            }
        }

        // 4. Lock file is released when self.lock_file is dropped
        info!("daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine state directory")]
    NoStateDir,

    #[error("failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("invalid config {0}: {1}")]
    Config(PathBuf, #[source] toml::de::Error),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon
pub async fn startup(config: Config) -> Result<DaemonState, LifecycleError> {
    match startup_inner(&config) {
        Ok((lock_file, store, engine)) => {
            // Watchers restart only after the lock is held and the store recovered
            let resumed = engine.resume_all();
            Ok(DaemonState {
                config,
                lock_file,
                store,
                engine,
                resumed,
            })
        }
        Err(e) => {
            // On a lock failure the files belong to the running daemon
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(&config);
            }
            Err(e)
        }
    }
}

fn startup_inner(config: &Config) -> Result<(File, Store, DaemonEngine), LifecycleError> {
    // 1. Create state directory
    std::fs::create_dir_all(&config.state_dir)?;

    // 2. Acquire lock file FIRST - prevents two daemons sharing a store.
    // Open without truncating so a running daemon's PID survives a failed attempt.
    let mut lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    std::fs::write(&config.version_path, env!("CARGO_PKG_VERSION"))?;

    // 3. Recover the store
    std::fs::create_dir_all(&config.store_path)?;
    let store = Store::open(&config.store_path)?;

    // 4. Production adapters, wrapped with tracing
    let slurm = SlurmAdapter::new(SshTransport::new());
    let engine = Engine::new(
        EngineDeps {
            remote: TracedRemote::new(slurm.clone()),
            jobs: TracedJobs::new(slurm),
            notifier: LogNotifyAdapter::new(),
            store: store.clone(),
        },
        SystemClock,
        config.engine.clone(),
    );

    info!(
        state_dir = %config.state_dir.display(),
        instances = store.list_instances().len(),
        "daemon state recovered"
    );
    Ok((lock_file, store, engine))
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    if config.version_path.exists() {
        let _ = std::fs::remove_file(&config.version_path);
    }
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
