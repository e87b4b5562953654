// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn startup_marker_is_appended() {
    let dir = tempdir().unwrap();
    let config = Config::for_dir(dir.path().to_path_buf()).unwrap();
    std::fs::write(&config.log_path, "previous run\n").unwrap();

    write_startup_marker(&config).unwrap();

    let log = std::fs::read_to_string(&config.log_path).unwrap();
    let mut lines = log.lines();
    assert_eq!(lines.next(), Some("previous run"));
    let marker = lines.next().unwrap();
    assert!(marker.starts_with(STARTUP_MARKER_PREFIX));
    assert!(marker.contains(&std::process::id().to_string()));
}

#[test]
fn startup_error_is_written_to_log() {
    let dir = tempdir().unwrap();
    let config = Config::for_dir(dir.path().to_path_buf()).unwrap();

    write_startup_error(&config, &LifecycleError::NoStateDir);

    let log = std::fs::read_to_string(&config.log_path).unwrap();
    assert!(log.contains("could not determine state directory"));
}

#[tokio::test]
async fn maintenance_loop_checkpoints_until_stopped() {
    let dir = tempdir().unwrap();
    let config = Config::for_dir(dir.path().to_path_buf()).unwrap();
    let snapshot = config.store_path.join("snapshot.json");
    let daemon = lifecycle::startup(config).await.unwrap();

    run(
        &daemon,
        Duration::from_millis(20),
        Duration::from_millis(20),
        tokio::time::sleep(Duration::from_millis(100)),
    )
    .await;

    assert!(snapshot.exists());
    daemon.shutdown().await.unwrap();
}
