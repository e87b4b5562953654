// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn active_job_gets_a_running_watcher() {
    let ctx = setup();

    let instance = ctx
        .engine
        .create_watcher(loss_definition(), job(JOB), TEST_HOST)
        .await
        .unwrap();

    assert_eq!(instance.state, WatcherState::Active);
    assert_eq!(instance.host, TEST_HOST);
    assert!(ctx.engine.is_running(&instance.id));
    assert!(ctx.store.get_definition("loss").is_some());
    assert_eq!(ctx.engine.get_instance(&instance.id), Some(instance));
}

#[tokio::test]
async fn finished_job_gets_a_static_watcher() {
    let ctx = setup();
    ctx.jobs.set_state("200", JobState::Terminal);

    let instance = ctx
        .engine
        .create_watcher(loss_definition(), job("200"), TEST_HOST)
        .await
        .unwrap();

    assert_eq!(instance.state, WatcherState::Static);
    assert!(!ctx.engine.is_running(&instance.id));
}

#[tokio::test]
async fn failed_status_lookup_gives_a_static_watcher() {
    let ctx = setup();
    ctx.jobs.fail_status(Some("slurmctld unreachable"));

    let instance = ctx
        .engine
        .create_watcher(loss_definition(), job(JOB), TEST_HOST)
        .await
        .unwrap();

    assert_eq!(instance.state, WatcherState::Static);
    assert_eq!(ctx.engine.running_count(), 0);
}

#[tokio::test]
async fn invalid_pattern_is_rejected_before_storing() {
    let ctx = setup();
    let def = definition("bad", "loss=(", &[]);

    let err = ctx
        .engine
        .create_watcher(def, job(JOB), TEST_HOST)
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::InvalidPattern(_)), "{err}");
    assert!(ctx.store.get_definition("bad").is_none());
    assert!(ctx.store.list_instances().is_empty());
}

#[tokio::test]
async fn zero_interval_is_rejected() {
    let ctx = setup();
    let mut def = loss_definition();
    def.interval_secs = 0;

    let err = ctx
        .engine
        .create_watcher(def, job(JOB), TEST_HOST)
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::InvalidDefinition(_)), "{err}");
}

#[tokio::test]
async fn unparseable_condition_is_stored_anyway() {
    let ctx = setup();
    let mut def = loss_definition();
    def.condition = Some("loss <".to_string());

    let instance = ctx
        .engine
        .create_watcher(def, job(JOB), TEST_HOST)
        .await
        .unwrap();

    assert_eq!(instance.state, WatcherState::Active);
}

#[tokio::test]
async fn start_all_for_job_skips_invalid_definitions() {
    let ctx = setup();
    let defs = vec![
        loss_definition(),
        definition("broken", "[", &[]),
        definition("errors", "ERROR: (.*)", &["message"]),
    ];

    let created = ctx.engine.start_all_for_job(&job(JOB), TEST_HOST, defs).await;

    let ids: Vec<&str> = created.iter().map(|i| i.definition_id.as_str()).collect();
    assert_eq!(ids, vec!["loss", "errors"]);
    assert_eq!(ctx.engine.running_count(), 2);
    assert_ne!(created[0].id, created[1].id);
}
