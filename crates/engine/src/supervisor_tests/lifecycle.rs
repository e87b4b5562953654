// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test(start_paused = true)]
async fn second_start_does_not_spawn_another_task() {
    let ctx = setup();
    let id = ctx.seed(loss_definition(), "w-1", WatcherState::Active);

    assert!(ctx.engine.start(&id));
    assert!(!ctx.engine.start(&id));
    assert_eq!(ctx.engine.running_count(), 1);

    run_for(1).await;
    assert_eq!(ctx.remote.read_count(), 1);
}

#[tokio::test]
async fn start_unknown_watcher_is_refused() {
    let ctx = setup();
    assert!(!ctx.engine.start(&WatcherId::new("missing")));
}

#[tokio::test(start_paused = true)]
async fn stop_ends_the_task() {
    let ctx = setup();
    let id = ctx.seed(loss_definition(), "w-1", WatcherState::Active);
    ctx.engine.start(&id);
    run_for(1).await;

    assert!(ctx.engine.stop(&id));
    settle().await;
    run_for(120).await;

    assert!(!ctx.engine.is_running(&id));
    assert!(!ctx.engine.stop(&id));
    assert_eq!(ctx.remote.read_count(), 1);
    assert_eq!(ctx.state(&id), WatcherState::Active);
}

#[tokio::test(start_paused = true)]
async fn pause_and_resume_round_trip() {
    let ctx = setup();
    let id = ctx.seed(loss_definition(), "w-1", WatcherState::Active);
    ctx.engine.start(&id);
    run_for(1).await;

    let paused = ctx.engine.pause(&id).unwrap();
    assert_eq!(paused.state, WatcherState::Paused);
    run_for(120).await;
    assert!(!ctx.engine.is_running(&id));
    let reads = ctx.remote.read_count();

    let resumed = ctx.engine.resume(&id).unwrap();
    assert_eq!(resumed.state, WatcherState::Active);
    assert!(ctx.engine.is_running(&id));
    run_for(1).await;
    assert_eq!(ctx.remote.read_count(), reads + 1);
}

#[tokio::test]
async fn pausing_a_finished_watcher_fails() {
    let ctx = setup();
    let id = ctx.seed(loss_definition(), "w-1", WatcherState::Completed);

    let err = ctx.engine.pause(&id).unwrap_err();

    assert!(matches!(err, EngineError::Transition(_)), "{err}");
    assert_eq!(ctx.state(&id), WatcherState::Completed);
}

#[tokio::test]
async fn pausing_an_unknown_watcher_fails() {
    let ctx = setup();
    let err = ctx.engine.pause(&WatcherId::new("missing")).unwrap_err();
    assert!(matches!(err, EngineError::WatcherNotFound(_)), "{err}");
}

#[tokio::test]
async fn resume_all_starts_only_active_watchers() {
    let ctx = setup();
    ctx.seed(loss_definition(), "w-1", WatcherState::Active);
    ctx.seed(loss_definition(), "w-2", WatcherState::Paused);
    ctx.seed(loss_definition(), "w-3", WatcherState::Static);
    ctx.seed(loss_definition(), "w-4", WatcherState::Triggered);

    assert_eq!(ctx.engine.resume_all(), 1);
    assert!(ctx.engine.is_running(&WatcherId::new("w-1")));
}

#[tokio::test(start_paused = true)]
async fn shutdown_waits_for_every_task() {
    let ctx = setup();
    let a = ctx.seed(loss_definition(), "w-1", WatcherState::Active);
    let b = ctx.seed(loss_definition(), "w-2", WatcherState::Active);
    ctx.engine.start(&a);
    ctx.engine.start(&b);
    run_for(1).await;

    ctx.engine.shutdown().await;

    assert_eq!(ctx.engine.running_count(), 0);
    assert_eq!(ctx.state(&a), WatcherState::Active);
}

#[tokio::test]
async fn delete_removes_instance_history_and_unused_definition() {
    let ctx = setup();
    let id = ctx.seed(loss_definition(), "w-1", WatcherState::Static);
    ctx.remote.append_stdout(JOB, "loss=0.3\n");
    ctx.engine.trigger_manually(&id).await.unwrap();
    assert_eq!(ctx.engine.get_events(&id, 10).len(), 1);

    ctx.engine.delete_watcher(&id).unwrap();

    assert!(ctx.engine.get_instance(&id).is_none());
    assert!(ctx.engine.get_events(&id, 10).is_empty());
    assert!(ctx.store.get_variables(&id).is_none());
    assert!(ctx.store.get_definition("loss").is_none());

    let err = ctx.engine.delete_watcher(&id).unwrap_err();
    assert!(matches!(err, EngineError::WatcherNotFound(_)), "{err}");
}

#[tokio::test]
async fn delete_keeps_a_definition_still_in_use() {
    let ctx = setup();
    let a = ctx.seed(loss_definition(), "w-1", WatcherState::Active);
    ctx.seed_on(loss_definition(), "w-2", "200", WatcherState::Static);
    ctx.engine.start(&a);

    ctx.engine.delete_watcher(&a).unwrap();

    assert!(!ctx.engine.is_running(&a));
    assert!(ctx.store.get_definition("loss").is_some());
}

#[tokio::test]
async fn update_definition_replaces_stored_copy() {
    let ctx = setup();
    ctx.seed(loss_definition(), "w-1", WatcherState::Active);
    let mut def = loss_definition();
    def.max_triggers = Some(3);

    ctx.engine.update_definition(def.clone()).unwrap();

    assert_eq!(ctx.store.get_definition("loss"), Some(def));
}

#[tokio::test]
async fn update_definition_requires_existing_definition() {
    let ctx = setup();
    let err = ctx.engine.update_definition(loss_definition()).unwrap_err();
    assert!(matches!(err, EngineError::DefinitionNotFound(_)), "{err}");
}

#[tokio::test]
async fn update_definition_validates_pattern() {
    let ctx = setup();
    ctx.seed(loss_definition(), "w-1", WatcherState::Active);
    let mut def = loss_definition();
    def.pattern = "loss=(".to_string();

    let err = ctx.engine.update_definition(def).unwrap_err();

    assert!(matches!(err, EngineError::InvalidPattern(_)), "{err}");
    assert_eq!(
        ctx.store.get_definition("loss").map(|d| d.pattern),
        Some(r"loss=([0-9.]+)".to_string())
    );
}
