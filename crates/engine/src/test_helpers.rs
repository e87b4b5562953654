// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for the engine crate.

use crate::{Backoff, Engine, EngineConfig, EngineDeps};
use jw_adapters::{FakeJobsAdapter, FakeNotifyAdapter, FakeRemoteAdapter};
use jw_core::test_support::TEST_HOST;
use jw_core::{
    DefinitionId, FakeClock, JobId, JobState, WatcherDefinition, WatcherEvent, WatcherId,
    WatcherInstance, WatcherState,
};
use jw_storage::Store;
use std::time::Duration;

/// Convenience alias for the fully-typed test engine.
pub(crate) type TestEngine = Engine<FakeRemoteAdapter, FakeJobsAdapter, FakeNotifyAdapter, FakeClock>;

/// Job most tests watch
pub(crate) const JOB: &str = "100";

/// Test context holding the engine and handles to its fakes.
pub(crate) struct TestContext {
    pub engine: TestEngine,
    pub remote: FakeRemoteAdapter,
    pub jobs: FakeJobsAdapter,
    pub notifier: FakeNotifyAdapter,
    pub clock: FakeClock,
    pub store: Store,
}

pub(crate) fn setup() -> TestContext {
    setup_with_config(EngineConfig::default())
}

pub(crate) fn setup_with_config(config: EngineConfig) -> TestContext {
    let remote = FakeRemoteAdapter::new();
    let jobs = FakeJobsAdapter::new();
    let notifier = FakeNotifyAdapter::new();
    let clock = FakeClock::new();
    let store = Store::in_memory();
    let engine = Engine::new(
        EngineDeps {
            remote: remote.clone(),
            jobs: jobs.clone(),
            notifier: notifier.clone(),
            store: store.clone(),
        },
        clock.clone(),
        config,
    );
    jobs.set_state(JOB, JobState::Active);
    TestContext {
        engine,
        remote,
        jobs,
        notifier,
        clock,
        store,
    }
}

impl TestContext {
    /// Store a definition and an instance of it on [`JOB`] directly,
    /// without a job status lookup or a running task.
    pub fn seed(&self, definition: WatcherDefinition, id: &str, state: WatcherState) -> WatcherId {
        self.seed_on(definition, id, JOB, state)
    }

    pub fn seed_on(
        &self,
        definition: WatcherDefinition,
        id: &str,
        job: &str,
        state: WatcherState,
    ) -> WatcherId {
        let instance = WatcherInstance::new(
            WatcherId::new(id),
            definition.id.clone(),
            JobId::new(job),
            TEST_HOST,
            state,
            self.clock_ms(),
        );
        self.store.put_definition(definition).unwrap();
        self.store.put_instance(instance).unwrap();
        WatcherId::new(id)
    }

    pub fn instance(&self, id: &WatcherId) -> WatcherInstance {
        self.store
            .get_instance(id)
            .unwrap_or_else(|| panic!("no instance {id}"))
    }

    pub fn state(&self, id: &WatcherId) -> WatcherState {
        self.instance(id).state
    }

    pub fn events(&self, id: &WatcherId) -> Vec<WatcherEvent> {
        self.store.events(id, 1000)
    }

    /// Definition ids of every instance on `job`
    pub fn definitions_on(&self, job: &str) -> Vec<DefinitionId> {
        self.store
            .list_instances_for_job(&JobId::new(job), TEST_HOST)
            .into_iter()
            .map(|i| i.definition_id)
            .collect()
    }

    fn clock_ms(&self) -> u64 {
        use jw_core::Clock;
        self.clock.epoch_ms()
    }
}

/// Default backoff for driving iterations by hand
pub(crate) fn backoff() -> Backoff {
    let config = EngineConfig::default();
    Backoff::new(config.backoff_factor, config.max_backoff)
}

/// Let spawned tasks run until they block, with time paused.
pub(crate) async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

/// Advance paused time by `secs`, letting monitor tasks run their iterations.
pub(crate) async fn run_for(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
    settle().await;
}
