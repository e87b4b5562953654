// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use jw_adapters::JobsCall;

fn status_queries(ctx: &TestContext, job_id: &str) -> usize {
    ctx.jobs
        .calls()
        .iter()
        .filter(|c| matches!(c, JobsCall::JobState { job_id: j, .. } if j.as_str() == job_id))
        .count()
}

#[tokio::test]
async fn orphans_on_finished_jobs_are_completed() {
    let ctx = setup();
    let active = ctx.seed(loss_definition(), "w-1", WatcherState::Active);
    let paused = ctx.seed(loss_definition(), "w-2", WatcherState::Paused);
    let fixed = ctx.seed(loss_definition(), "w-3", WatcherState::Static);
    let other = ctx.seed_on(loss_definition(), "w-4", "200", WatcherState::Active);
    ctx.jobs.set_state(JOB, JobState::Terminal);
    ctx.jobs.set_state("200", JobState::Active);

    let completed = ctx.engine.cleanup_orphans().await;

    assert_eq!(completed, vec![active.clone(), paused.clone()]);
    assert_eq!(ctx.state(&active), WatcherState::Completed);
    assert_eq!(ctx.state(&paused), WatcherState::Completed);
    assert_eq!(ctx.state(&fixed), WatcherState::Static);
    assert_eq!(ctx.state(&other), WatcherState::Active);
    assert_eq!(status_queries(&ctx, JOB), 1);
}

#[tokio::test]
async fn unknown_job_counts_as_finished() {
    let ctx = setup();
    let id = ctx.seed_on(loss_definition(), "w-1", "404", WatcherState::Active);

    let completed = ctx.engine.cleanup_orphans().await;

    assert_eq!(completed, vec![id]);
}

#[tokio::test]
async fn orphan_check_skips_jobs_it_cannot_query() {
    let ctx = setup();
    let id = ctx.seed(loss_definition(), "w-1", WatcherState::Active);
    ctx.jobs.fail_status(Some("timeout"));

    let completed = ctx.engine.cleanup_orphans().await;

    assert!(completed.is_empty());
    assert_eq!(ctx.state(&id), WatcherState::Active);
}

#[tokio::test(start_paused = true)]
async fn orphan_cleanup_stops_running_task() {
    let ctx = setup();
    let id = ctx.seed(loss_definition(), "w-1", WatcherState::Active);
    ctx.engine.start(&id);
    run_for(1).await;
    ctx.jobs.set_state(JOB, JobState::Terminal);

    ctx.engine.cleanup_orphans().await;
    settle().await;

    assert!(!ctx.engine.is_running(&id));
}

#[tokio::test(start_paused = true)]
async fn healthy_tasks_are_left_alone() {
    let ctx = setup();
    let id = ctx.seed(loss_definition(), "w-1", WatcherState::Active);
    ctx.engine.start(&id);
    run_for(1).await;

    let report = ctx.engine.health_check().await;

    assert_eq!(report, HealthReport::default());
    assert!(ctx.engine.is_running(&id));
}

#[tokio::test(start_paused = true)]
async fn stalled_task_is_restarted() {
    let ctx = setup();
    let id = ctx.seed(loss_definition(), "w-1", WatcherState::Active);
    ctx.engine.start(&id);
    run_for(1).await;
    ctx.clock.advance(Duration::from_secs(600));

    let report = ctx.engine.health_check().await;

    assert_eq!(report.restarted, vec![id.clone()]);
    assert!(ctx.engine.is_running(&id));
    assert_eq!(ctx.engine.running_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn finished_task_of_completed_watcher_stays_down() {
    let ctx = setup();
    let id = ctx.seed(loss_definition(), "w-1", WatcherState::Active);
    ctx.engine.start(&id);
    ctx.jobs.set_state(JOB, JobState::Terminal);
    run_for(1).await;

    let report = ctx.engine.health_check().await;

    assert!(report.restarted.is_empty());
    assert_eq!(ctx.state(&id), WatcherState::Completed);
    assert!(!ctx.engine.is_running(&id));
}

#[tokio::test]
async fn health_check_includes_orphan_cleanup() {
    let ctx = setup();
    let id = ctx.seed(loss_definition(), "w-1", WatcherState::Paused);
    ctx.jobs.set_state(JOB, JobState::Terminal);

    let report = ctx.engine.health_check().await;

    assert_eq!(report.completed, vec![id]);
}

#[tokio::test(start_paused = true)]
async fn hanging_host_is_disabled_despite_health_checks() {
    let ctx = setup();
    let id = ctx.seed(loss_definition(), "w-1", WatcherState::Active);
    ctx.remote.hang_reads(JOB);
    ctx.engine.start(&id);

    for _ in 0..40 {
        ctx.clock.advance(Duration::from_secs(60));
        run_for(60).await;
        let report = ctx.engine.health_check().await;
        assert!(report.restarted.is_empty(), "{report:?}");
    }

    assert_eq!(ctx.state(&id), WatcherState::Disabled);
    assert_eq!(ctx.remote.read_count(), 5);
    assert!(!ctx.engine.is_running(&id));
}

#[tokio::test(start_paused = true)]
async fn restarted_task_keeps_the_failure_count() {
    let ctx = setup();
    let id = ctx.seed(loss_definition(), "w-1", WatcherState::Active);
    ctx.remote.fail_next_reads(3);
    ctx.engine.start(&id);
    run_for(30).await;
    assert_eq!(ctx.remote.read_count(), 3);
    assert_eq!(ctx.state(&id), WatcherState::Active);

    ctx.remote.fail_next_reads(2);
    ctx.clock.advance(Duration::from_secs(600));
    let report = ctx.engine.health_check().await;
    assert_eq!(report.restarted, vec![id.clone()]);
    run_for(60).await;

    assert_eq!(ctx.state(&id), WatcherState::Disabled);
    assert_eq!(ctx.remote.read_count(), 5);
}
