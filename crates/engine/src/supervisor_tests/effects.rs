// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const SCRIPT: &str = "#!/bin/bash\n#SBATCH --time=01:00:00\npython train.py\n";

fn with_actions(mut def: WatcherDefinition, actions: Vec<ActionSpec>) -> WatcherDefinition {
    def.actions = actions;
    def
}

#[tokio::test]
async fn cancel_completes_every_watcher_on_the_job() {
    let ctx = setup();
    let def = with_actions(
        definition("nan", "loss=nan", &[]),
        vec![ActionSpec::new(ActionKind::CancelJob)],
    );
    let id = ctx.seed(def, "w-1", WatcherState::Active);
    let sibling = ctx.seed(loss_definition(), "w-2", WatcherState::Paused);
    ctx.remote.append_stdout(JOB, "loss=nan\n");

    ctx.engine.trigger_manually(&id).await.unwrap();

    assert_eq!(ctx.jobs.cancelled(), vec![job(JOB)]);
    assert_eq!(ctx.state(&id), WatcherState::Completed);
    assert_eq!(ctx.state(&sibling), WatcherState::Completed);
}

#[tokio::test]
async fn resubmit_moves_watchers_to_the_new_job() {
    let ctx = setup();
    ctx.jobs.set_script(JOB, SCRIPT);
    let def = with_actions(
        definition("oom", "CUDA out of memory", &[]),
        vec![ActionSpec::new(ActionKind::Resubmit).with_param("mem", "64G")],
    );
    let id = ctx.seed(def, "w-1", WatcherState::Active);
    ctx.seed(loss_definition(), "w-2", WatcherState::Active);
    ctx.remote.append_stdout(JOB, "RuntimeError: CUDA out of memory\n");

    ctx.engine.trigger_manually(&id).await.unwrap();

    assert_eq!(ctx.state(&id), WatcherState::Completed);
    let mut moved = ctx.definitions_on("9000");
    moved.sort();
    assert_eq!(
        moved,
        vec![DefinitionId::new("loss"), DefinitionId::new("oom")]
    );
    let attached = ctx.store.list_instances_for_job(&job("9000"), TEST_HOST);
    assert!(attached.iter().all(|i| i.state == WatcherState::Active));
    assert!(attached.iter().all(|i| ctx.engine.is_running(&i.id)));
    assert!(ctx.jobs.submitted()[0].contains("#SBATCH --mem=64G"));
}

#[tokio::test]
async fn attach_skips_definitions_already_on_the_new_job() {
    let ctx = setup();
    ctx.jobs.set_script(JOB, SCRIPT);
    let def = with_actions(
        definition("oom", "CUDA out of memory", &[]),
        vec![ActionSpec::new(ActionKind::Resubmit)],
    );
    let id = ctx.seed(def.clone(), "w-1", WatcherState::Active);
    ctx.seed_on(def, "w-9", "9000", WatcherState::Active);
    ctx.jobs.set_state("9000", JobState::Active);
    ctx.remote.append_stdout(JOB, "CUDA out of memory\n");

    ctx.engine.trigger_manually(&id).await.unwrap();

    assert_eq!(ctx.definitions_on("9000"), vec![DefinitionId::new("oom")]);
}

#[tokio::test]
async fn failed_resubmit_leaves_watchers_alone() {
    let ctx = setup();
    let def = with_actions(
        definition("oom", "CUDA out of memory", &[]),
        vec![ActionSpec::new(ActionKind::Resubmit)],
    );
    let id = ctx.seed(def, "w-1", WatcherState::Active);
    ctx.remote.append_stdout(JOB, "CUDA out of memory\n");

    let result = ctx.engine.trigger_manually(&id).await.unwrap();

    assert_eq!(result.executed_actions, 1);
    assert_eq!(ctx.state(&id), WatcherState::Active);
    assert!(ctx.jobs.submitted().is_empty());
    assert!(!ctx.engine.get_events(&id, 1)[0].success);
}
