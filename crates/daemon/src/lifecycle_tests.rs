// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use jw_core::test_support::{definition, instance};
use jw_core::WatcherState;
use serial_test::serial;
use tempfile::tempdir;

fn write_config(dir: &Path, text: &str) {
    std::fs::write(dir.join("config.toml"), text).unwrap();
}

#[test]
fn config_without_file_uses_engine_defaults() {
    let dir = tempdir().unwrap();

    let config = Config::for_dir(dir.path().to_path_buf()).unwrap();

    assert_eq!(config.engine, EngineConfig::default());
    assert_eq!(config.lock_path, dir.path().join("jwd.pid"));
    assert_eq!(config.log_path, dir.path().join("jwd.log"));
    assert_eq!(config.store_path, dir.path().join("store"));
}

#[test]
fn config_reads_engine_table() {
    let dir = tempdir().unwrap();
    write_config(
        dir.path(),
        r#"
[engine]
max_consecutive_failures = 3
remote_timeout_secs = 30
allowed_commands = ["echo", "nvidia-smi"]
"#,
    );

    let config = Config::for_dir(dir.path().to_path_buf()).unwrap();

    assert_eq!(config.engine.max_consecutive_failures, 3);
    assert_eq!(config.engine.remote_timeout_secs, 30);
    assert_eq!(config.engine.allowed_commands, vec!["echo", "nvidia-smi"]);
    assert_eq!(config.engine.rate_limit_max_actions, 10);
}

#[test]
fn config_rejects_unknown_tables() {
    let dir = tempdir().unwrap();
    write_config(dir.path(), "[engnie]\nmax_backoff = 2.0\n");

    let err = Config::for_dir(dir.path().to_path_buf()).unwrap_err();

    assert!(matches!(err, LifecycleError::Config(..)), "{err}");
}

#[test]
fn config_rejects_malformed_toml() {
    let dir = tempdir().unwrap();
    write_config(dir.path(), "[engine\n");

    let err = Config::for_dir(dir.path().to_path_buf()).unwrap_err();

    assert!(err.to_string().contains("config.toml"), "{err}");
}

#[tokio::test]
async fn startup_writes_pid_and_shutdown_removes_it() {
    let dir = tempdir().unwrap();
    let config = Config::for_dir(dir.path().to_path_buf()).unwrap();

    let daemon = startup(config.clone()).await.unwrap();
    let pid = std::fs::read_to_string(&config.lock_path).unwrap();
    assert_eq!(pid.trim(), std::process::id().to_string());
    assert!(config.version_path.exists());
    assert_eq!(daemon.resumed, 0);

    daemon.shutdown().await.unwrap();
    assert!(!config.lock_path.exists());
    assert!(!config.version_path.exists());
    assert!(config.store_path.join("snapshot.json").exists());
}

#[tokio::test]
async fn second_startup_fails_without_touching_running_daemon() {
    let dir = tempdir().unwrap();
    let config = Config::for_dir(dir.path().to_path_buf()).unwrap();
    let running = startup(config.clone()).await.unwrap();

    let err = startup(config.clone()).await.err().unwrap();

    assert!(matches!(err, LifecycleError::LockFailed(_)), "{err}");
    assert!(config.lock_path.exists());
    assert!(config.version_path.exists());
    running.shutdown().await.unwrap();
}

#[tokio::test]
#[serial]
async fn startup_resumes_persisted_active_watchers() {
    std::env::set_var("JW_SSH_BIN", "false");
    let dir = tempdir().unwrap();
    let config = Config::for_dir(dir.path().to_path_buf()).unwrap();
    {
        std::fs::create_dir_all(&config.store_path).unwrap();
        let store = Store::open(&config.store_path).unwrap();
        store.put_definition(definition("loss", "loss=(.*)", &["loss"])).unwrap();
        store
            .put_instance(instance("w-1", "loss", "100", WatcherState::Active))
            .unwrap();
        store
            .put_instance(instance("w-2", "loss", "100", WatcherState::Paused))
            .unwrap();
        store.checkpoint().unwrap();
    }

    let daemon = startup(config).await.unwrap();

    assert_eq!(daemon.resumed, 1);
    assert_eq!(daemon.store.list_instances().len(), 2);
    daemon.shutdown().await.unwrap();
    std::env::remove_var("JW_SSH_BIN");
}
