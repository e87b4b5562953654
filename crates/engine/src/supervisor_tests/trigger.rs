// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn static_watcher_scans_entire_output() {
    let ctx = setup();
    let def = definition("errors", "ERROR: (.*)", &["message"]);
    let id = ctx.seed(def, "w-1", WatcherState::Static);
    let mut output = String::from("ERROR: out of memory\n");
    for i in 1..10_000 {
        output.push_str(&format!("step {i} ok\n"));
    }
    ctx.remote.append_stdout(JOB, &output);

    let result = ctx.engine.trigger_manually(&id).await.unwrap();

    assert!(result.matched);
    assert_eq!(result.match_count, 1);
    assert_eq!(result.executed_actions, 1);
    assert_eq!(result.message, "found 1 match(es), executed 1 action(s)");
    assert_eq!(ctx.state(&id), WatcherState::Static);
    let vars = ctx.store.get_variables(&id).unwrap();
    assert_eq!(vars.values.get("message").map(String::as_str), Some("out of memory"));
}

#[tokio::test]
async fn manual_trigger_ignores_stored_offset() {
    let ctx = setup();
    let id = ctx.seed(loss_definition(), "w-1", WatcherState::Active);
    let output = "loss=0.3\n";
    ctx.remote.append_stdout(JOB, output);
    ctx.store
        .update_instance(&id, |i| i.last_position = output.len() as u64)
        .unwrap();

    let result = ctx.engine.trigger_manually(&id).await.unwrap();

    assert_eq!(result.match_count, 1);
}

#[tokio::test]
async fn manual_trigger_without_matches() {
    let ctx = setup();
    let id = ctx.seed(loss_definition(), "w-1", WatcherState::Paused);
    ctx.remote.append_stdout(JOB, "nothing to see\n");

    let result = ctx.engine.trigger_manually(&id).await.unwrap();

    assert!(!result.matched);
    assert_eq!(result.executed_actions, 0);
    assert_eq!(result.message, "no matches found");
}

#[tokio::test]
async fn manual_trigger_can_use_up_the_cap() {
    let ctx = setup();
    let mut def = loss_definition();
    def.max_triggers = Some(1);
    let id = ctx.seed(def, "w-1", WatcherState::Static);
    ctx.remote.append_stdout(JOB, "loss=0.3\nloss=0.2\n");

    let result = ctx.engine.trigger_manually(&id).await.unwrap();

    assert_eq!(result.executed_actions, 1);
    assert_eq!(ctx.state(&id), WatcherState::Triggered);
}

#[tokio::test]
async fn manual_trigger_in_timer_mode_uses_cached_variables() {
    let ctx = setup();
    let mut def = loss_definition();
    def.timer_mode = true;
    let id = ctx.seed(def, "w-1", WatcherState::Static);
    ctx.remote.append_stdout(JOB, "loss=0.3\n");
    ctx.engine.trigger_manually(&id).await.unwrap();
    assert!(ctx.instance(&id).timer_mode_active);

    let result = ctx.engine.trigger_manually(&id).await.unwrap();

    assert_eq!(
        result.message,
        "timer mode: executed 1 action(s) with cached variables"
    );
    assert_eq!(ctx.remote.read_count(), 1);
}

#[tokio::test]
async fn finished_watchers_cannot_be_triggered() {
    let ctx = setup();
    for (i, state) in [
        WatcherState::Triggered,
        WatcherState::Disabled,
        WatcherState::Completed,
    ]
    .into_iter()
    .enumerate()
    {
        let id = ctx.seed(loss_definition(), &format!("w-{i}"), state);

        let err = ctx.engine.trigger_manually(&id).await.unwrap_err();

        assert!(matches!(err, EngineError::NotTriggerable { .. }), "{state}: {err}");
    }
}

#[tokio::test]
async fn unknown_watcher_cannot_be_triggered() {
    let ctx = setup();
    let err = ctx
        .engine
        .trigger_manually(&WatcherId::new("missing"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::WatcherNotFound(_)), "{err}");
}

#[tokio::test]
async fn manual_trigger_reports_read_failure() {
    let ctx = setup();
    let id = ctx.seed(loss_definition(), "w-1", WatcherState::Static);
    ctx.remote.fail_next_reads(1);

    let err = ctx.engine.trigger_manually(&id).await.unwrap_err();

    assert!(matches!(err, EngineError::Iteration(IterationError::Remote(_))), "{err}");
    assert_eq!(ctx.state(&id), WatcherState::Static);
}

#[tokio::test]
async fn manual_trigger_on_paused_watcher_can_use_up_the_cap() {
    let ctx = setup();
    let mut def = loss_definition();
    def.max_triggers = Some(1);
    let id = ctx.seed(def, "w-1", WatcherState::Paused);
    ctx.remote.append_stdout(JOB, "loss=0.3\n");

    let result = ctx.engine.trigger_manually(&id).await.unwrap();

    assert!(result.matched);
    assert_eq!(ctx.state(&id), WatcherState::Triggered);
    assert_eq!(ctx.instance(&id).trigger_count, 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_triggers_run_one_after_the_other() {
    let ctx = setup();
    let mut def = loss_definition();
    def.max_triggers = Some(1);
    let id = ctx.seed(def, "w-1", WatcherState::Static);
    ctx.remote.append_stdout(JOB, "loss=0.3\n");
    ctx.remote.delay_reads(Duration::from_secs(5));

    let (first, second) = tokio::join!(
        ctx.engine.trigger_manually(&id),
        ctx.engine.trigger_manually(&id)
    );

    let executed = first.unwrap().executed_actions + second.unwrap().executed_actions;
    assert_eq!(executed, 1);
    assert_eq!(ctx.remote.read_count(), 1);
    assert_eq!(ctx.instance(&id).trigger_count, 1);
    assert_eq!(ctx.events(&id).len(), 1);
    assert_eq!(ctx.state(&id), WatcherState::Triggered);
}

#[tokio::test(start_paused = true)]
async fn manual_trigger_waits_for_a_running_iteration() {
    let ctx = setup();
    let mut def = loss_definition();
    def.max_triggers = Some(1);
    let id = ctx.seed(def, "w-1", WatcherState::Active);
    ctx.remote.append_stdout(JOB, "loss=0.3\n");
    ctx.remote.delay_reads(Duration::from_secs(5));
    ctx.engine.start(&id);
    settle().await;

    let result = ctx.engine.trigger_manually(&id).await.unwrap();

    assert_eq!(result.executed_actions, 0);
    assert_eq!(ctx.instance(&id).trigger_count, 1);
    assert_eq!(ctx.events(&id).len(), 1);
    assert_eq!(ctx.state(&id), WatcherState::Triggered);
}

#[tokio::test]
async fn reaching_the_cap_drops_rate_limit_history() {
    let ctx = setup();
    let mut def = loss_definition();
    def.max_triggers = Some(1);
    let id = ctx.seed(def, "w-1", WatcherState::Static);
    let other = ctx.seed(loss_definition(), "w-2", WatcherState::Static);
    ctx.remote.append_stdout(JOB, "loss=0.3\n");

    ctx.engine.trigger_manually(&other).await.unwrap();
    assert_eq!(ctx.engine.inner.executor.rate_limited_watchers(), 1);
    ctx.engine.trigger_manually(&id).await.unwrap();

    assert_eq!(ctx.state(&id), WatcherState::Triggered);
    assert_eq!(ctx.engine.inner.executor.rate_limited_watchers(), 1);
}
