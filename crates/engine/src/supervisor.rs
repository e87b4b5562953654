// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine: owns one monitor task per active watcher instance

use crate::actions::{ActionEffect, ActionExecutor};
use crate::backoff::Backoff;
use crate::condition;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::monitor::{self, Control, InstanceSlot, ScanMode};
use crate::pattern::PatternMatcher;
use jw_adapters::{JobsAdapter, JobsError, NotifyAdapter, RemoteAdapter};
use jw_core::{
    Clock, DefinitionId, IdGen, JobId, JobState, UuidIdGen, WatcherDefinition, WatcherEvent,
    WatcherId, WatcherInstance, WatcherState,
};
use jw_storage::Store;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Fallback poll interval when an instance's definition cannot be loaded
const FALLBACK_INTERVAL: Duration = Duration::from_secs(60);

/// Engine adapter dependencies
pub struct EngineDeps<R, J, N> {
    pub remote: R,
    pub jobs: J,
    pub notifier: N,
    pub store: Store,
}

/// Result of [`Engine::trigger_manually`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualTriggerResult {
    pub matched: bool,
    pub match_count: usize,
    pub executed_actions: usize,
    pub message: String,
}

/// What a health check did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthReport {
    /// Tasks that had died or stalled and were started again
    pub restarted: Vec<WatcherId>,
    /// Instances completed because their job is gone or finished
    pub completed: Vec<WatcherId>,
}

struct TaskEntry {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
    generation: u64,
    slot: Arc<InstanceSlot>,
}

pub(crate) struct EngineInner<R, J, N, C: Clock> {
    pub(crate) remote: R,
    pub(crate) jobs: J,
    pub(crate) store: Store,
    pub(crate) clock: C,
    pub(crate) config: EngineConfig,
    pub(crate) patterns: PatternMatcher,
    pub(crate) executor: ActionExecutor<R, J, N, C>,
    tasks: Mutex<HashMap<WatcherId, TaskEntry>>,
    slots: Mutex<HashMap<WatcherId, Arc<InstanceSlot>>>,
    next_generation: AtomicU64,
}

/// Supervisor for watcher monitor tasks.
///
/// Cheap to clone; clones share the same task registry. The store is the
/// source of truth for every instance, so the engine keeps no instance
/// state of its own beyond the running tasks.
pub struct Engine<R, J, N, C: Clock> {
    pub(crate) inner: Arc<EngineInner<R, J, N, C>>,
}

impl<R, J, N, C: Clock> Clone for Engine<R, J, N, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R, J, N, C> Engine<R, J, N, C>
where
    R: RemoteAdapter,
    J: JobsAdapter,
    N: NotifyAdapter,
    C: Clock,
{
    pub fn new(deps: EngineDeps<R, J, N>, clock: C, config: EngineConfig) -> Self {
        let executor = ActionExecutor::new(
            deps.remote.clone(),
            deps.jobs.clone(),
            deps.notifier,
            deps.store.clone(),
            clock.clone(),
            &config,
        );
        Self {
            inner: Arc::new(EngineInner {
                remote: deps.remote,
                jobs: deps.jobs,
                store: deps.store,
                clock,
                patterns: PatternMatcher::new(config.pattern_cache_capacity, config.max_pattern_len),
                config,
                executor,
                tasks: Mutex::new(HashMap::new()),
                slots: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(1),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    pub(crate) fn now_ms(&self) -> u64 {
        self.inner.clock.epoch_ms()
    }

    // === Watcher creation ===

    /// Validate and store a definition, then attach it to a job.
    ///
    /// The instance starts ACTIVE (with a running task) when the job is
    /// active, and STATIC when the job has finished or its state cannot be
    /// determined.
    pub async fn create_watcher(
        &self,
        definition: WatcherDefinition,
        job_id: JobId,
        host: &str,
    ) -> Result<WatcherInstance, EngineError> {
        self.validate(&definition)?;
        self.inner.store.put_definition(definition.clone())?;

        let state = match self.job_state(&job_id, host).await {
            Ok(state) if state.is_active() => WatcherState::Active,
            Ok(state) => {
                tracing::info!(job_id = %job_id, job_state = %state, "job not active, watcher is static");
                WatcherState::Static
            }
            Err(e) => {
                tracing::warn!(
                    job_id = %job_id,
                    error = %e,
                    "job status lookup failed, watcher is static"
                );
                WatcherState::Static
            }
        };

        let instance = WatcherInstance::new(
            WatcherId::new(UuidIdGen.next()),
            definition.id.clone(),
            job_id,
            host,
            state,
            self.now_ms(),
        );
        self.inner.store.put_instance(instance.clone())?;
        tracing::info!(
            watcher_id = %instance.id,
            definition_id = %definition.id,
            job_id = %instance.job_id,
            host,
            state = %state,
            "watcher created"
        );

        if state == WatcherState::Active {
            self.start(&instance.id);
        }
        Ok(instance)
    }

    /// Create a watcher for each definition. Invalid definitions are logged
    /// and skipped; the created instances are returned.
    pub async fn start_all_for_job(
        &self,
        job_id: &JobId,
        host: &str,
        definitions: Vec<WatcherDefinition>,
    ) -> Vec<WatcherInstance> {
        let mut created = Vec::with_capacity(definitions.len());
        for definition in definitions {
            let definition_id = definition.id.clone();
            match self.create_watcher(definition, job_id.clone(), host).await {
                Ok(instance) => created.push(instance),
                Err(e) => tracing::warn!(
                    job_id = %job_id,
                    definition_id = %definition_id,
                    error = %e,
                    "skipping watcher"
                ),
            }
        }
        created
    }

    fn validate(&self, definition: &WatcherDefinition) -> Result<(), EngineError> {
        definition.validate(self.inner.config.max_pattern_len)?;
        self.inner.patterns.compile(&definition.pattern)?;
        if let Some(expr) = definition.condition_expr() {
            // Stored anyway: a bad condition only ever evaluates to false
            if let Err(e) = condition::check(expr) {
                tracing::warn!(
                    definition_id = %definition.id,
                    condition = expr,
                    error = %e,
                    "condition does not parse"
                );
            }
        }
        Ok(())
    }

    /// Replace a definition wholesale. Running tasks pick it up on their
    /// next iteration.
    pub fn update_definition(&self, definition: WatcherDefinition) -> Result<(), EngineError> {
        if self
            .inner
            .store
            .get_definition(definition.id.as_str())
            .is_none()
        {
            return Err(EngineError::DefinitionNotFound(definition.id.to_string()));
        }
        self.validate(&definition)?;
        tracing::info!(definition_id = %definition.id, "definition updated");
        self.inner.store.put_definition(definition)?;
        Ok(())
    }

    /// Stop and remove a watcher with its variables and events. The
    /// definition goes too once no instance references it.
    pub fn delete_watcher(&self, id: &WatcherId) -> Result<(), EngineError> {
        let instance = self
            .get_instance(id)
            .ok_or_else(|| EngineError::WatcherNotFound(id.clone()))?;
        self.stop(id);
        self.inner.store.delete_instance(id)?;
        self.inner
            .store
            .delete_definition_if_unused(instance.definition_id.as_str())?;
        self.release(id);
        tracing::info!(watcher_id = %id, "watcher deleted");
        Ok(())
    }

    // === Task registry ===

    /// Spawn a monitor task for `id` unless one is already running.
    ///
    /// Returns whether a task was spawned. The registry check and insert
    /// happen under one lock, so concurrent calls spawn at most one task.
    pub fn start(&self, id: &WatcherId) -> bool {
        let Some(expected) = self.expected_interval(id) else {
            return false;
        };
        let mut tasks = self.inner.tasks.lock();
        if tasks.get(id).is_some_and(|entry| !entry.handle.is_finished()) {
            tracing::debug!(watcher_id = %id, "monitor already running");
            return false;
        }

        let (shutdown, shutdown_rx) = oneshot::channel();
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let slot = self.slot(id);
        slot.progress.touch(self.now_ms(), expected);
        let handle = tokio::spawn(monitor::run_task(
            self.clone(),
            id.clone(),
            generation,
            Arc::clone(&slot),
            shutdown_rx,
        ));
        tasks.insert(
            id.clone(),
            TaskEntry {
                shutdown,
                handle,
                generation,
                slot,
            },
        );
        true
    }

    /// Signal the task for `id` to stop at its next suspension point.
    ///
    /// Returns whether a task was registered.
    pub fn stop(&self, id: &WatcherId) -> bool {
        let Some(entry) = self.inner.tasks.lock().remove(id) else {
            return false;
        };
        let _ = entry.shutdown.send(());
        tracing::debug!(watcher_id = %id, "monitor stop requested");
        true
    }

    pub fn is_running(&self, id: &WatcherId) -> bool {
        self.inner
            .tasks
            .lock()
            .get(id)
            .is_some_and(|entry| !entry.handle.is_finished())
    }

    pub fn running_count(&self) -> usize {
        self.inner
            .tasks
            .lock()
            .values()
            .filter(|entry| !entry.handle.is_finished())
            .count()
    }

    /// Called by a task on exit; a newer task for the same id is left alone
    pub(crate) fn deregister(&self, id: &WatcherId, generation: u64) {
        let mut tasks = self.inner.tasks.lock();
        if tasks.get(id).is_some_and(|entry| entry.generation == generation) {
            tasks.remove(id);
        }
    }

    /// The instance's shared slot, created on first use
    pub(crate) fn slot(&self, id: &WatcherId) -> Arc<InstanceSlot> {
        let mut slots = self.inner.slots.lock();
        let slot = slots
            .entry(id.clone())
            .or_insert_with(|| Arc::new(InstanceSlot::new(self.now_ms(), FALLBACK_INTERVAL)));
        Arc::clone(slot)
    }

    /// Record that the instance is waiting on a call bounded by the remote
    /// timeout
    pub(crate) fn heartbeat(&self, id: &WatcherId) {
        if let Some(slot) = self.inner.slots.lock().get(id) {
            slot.progress
                .touch(self.now_ms(), self.inner.config.remote_timeout());
        }
    }

    /// Drop per-instance bookkeeping once the instance can no longer run
    pub(crate) fn release(&self, id: &WatcherId) {
        self.inner.slots.lock().remove(id);
        self.inner.executor.forget(id);
    }

    /// Start a task for every persisted ACTIVE instance
    pub fn resume_all(&self) -> usize {
        let started = self
            .inner
            .store
            .list_instances()
            .iter()
            .filter(|i| i.state == WatcherState::Active)
            .filter(|i| self.start(&i.id))
            .count();
        tracing::info!(started, "resumed watchers");
        started
    }

    /// Stop every task and wait for them to exit
    pub async fn shutdown(&self) {
        let entries: Vec<TaskEntry> = self
            .inner
            .tasks
            .lock()
            .drain()
            .map(|(_, entry)| entry)
            .collect();
        let count = entries.len();
        let mut handles = Vec::with_capacity(count);
        for entry in entries {
            let _ = entry.shutdown.send(());
            handles.push(entry.handle);
        }
        for handle in handles {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    tracing::warn!(error = %e, "monitor task failed during shutdown");
                }
            }
        }
        tracing::info!(count, "engine shut down");
    }

    // === Lifecycle controls ===

    pub fn pause(&self, id: &WatcherId) -> Result<WatcherInstance, EngineError> {
        let instance = self.transition(id, WatcherState::Paused)?;
        self.stop(id);
        tracing::info!(watcher_id = %id, "watcher paused");
        Ok(instance)
    }

    pub fn resume(&self, id: &WatcherId) -> Result<WatcherInstance, EngineError> {
        let instance = self.transition(id, WatcherState::Active)?;
        self.slot(id).failures.store(0, Ordering::Relaxed);
        self.start(id);
        tracing::info!(watcher_id = %id, "watcher resumed");
        Ok(instance)
    }

    fn transition(&self, id: &WatcherId, to: WatcherState) -> Result<WatcherInstance, EngineError> {
        let now = self.now_ms();
        let mut outcome = Ok(());
        let instance = self
            .inner
            .store
            .update_instance(id, |i| outcome = i.transition(to, now))?
            .ok_or_else(|| EngineError::WatcherNotFound(id.clone()))?;
        outcome?;
        Ok(instance)
    }

    /// Best-effort transition used from inside iterations.
    ///
    /// A rejected transition (e.g. the instance was paused concurrently) is
    /// logged and leaves the instance unchanged.
    pub(crate) fn set_state(&self, id: &WatcherId, to: WatcherState) -> Option<WatcherInstance> {
        match self.transition(id, to) {
            Ok(instance) => {
                tracing::info!(watcher_id = %id, state = %to, "watcher state changed");
                if to.is_terminal() {
                    self.release(id);
                }
                Some(instance)
            }
            Err(e) => {
                tracing::warn!(watcher_id = %id, to = %to, error = %e, "state change skipped");
                None
            }
        }
    }

    /// Run one iteration now, over the whole available output.
    ///
    /// Works on any non-terminal instance, including STATIC and PAUSED
    /// ones. An instance in timer mode runs its actions once with the
    /// cached variables instead.
    pub async fn trigger_manually(&self, id: &WatcherId) -> Result<ManualTriggerResult, EngineError> {
        let instance = self
            .get_instance(id)
            .ok_or_else(|| EngineError::WatcherNotFound(id.clone()))?;
        if instance.state.is_terminal() {
            return Err(EngineError::NotTriggerable {
                id: id.clone(),
                state: instance.state,
            });
        }

        let config = &self.inner.config;
        let mut backoff = Backoff::new(config.backoff_factor, config.max_backoff);
        let report = monitor::run_iteration(self, id, ScanMode::FullScan, &mut backoff).await?;

        let message = if report.timer {
            format!(
                "timer mode: executed {} action(s) with cached variables",
                report.executed_actions
            )
        } else if report.matched {
            format!(
                "found {} match(es), executed {} action(s)",
                report.match_count, report.executed_actions
            )
        } else {
            "no matches found".to_string()
        };
        tracing::info!(
            watcher_id = %id,
            matches = report.match_count,
            executed = report.executed_actions,
            "manual trigger"
        );
        Ok(ManualTriggerResult {
            matched: report.matched,
            match_count: report.match_count,
            executed_actions: report.executed_actions,
            message,
        })
    }

    // === Maintenance ===

    /// Restart dead or stalled tasks, then clean up orphans.
    ///
    /// A task is stalled when it has made no progress for more than
    /// `stall_factor` times its expected interval. While a remote call is in
    /// flight the expected interval is the remote timeout. A restarted task
    /// keeps the consecutive failure count of the one it replaces.
    pub async fn health_check(&self) -> HealthReport {
        let now = self.now_ms();
        let factor = self.inner.config.stall_factor;
        let suspects: Vec<WatcherId> = {
            let mut tasks = self.inner.tasks.lock();
            let suspects: Vec<WatcherId> = tasks
                .iter()
                .filter(|(_, e)| e.handle.is_finished() || e.slot.progress.is_stalled(now, factor))
                .map(|(id, _)| id.clone())
                .collect();
            for id in &suspects {
                if let Some(entry) = tasks.remove(id) {
                    if !entry.handle.is_finished() {
                        tracing::warn!(watcher_id = %id, "monitor stalled, aborting");
                        entry.handle.abort();
                    }
                }
            }
            suspects
        };

        let mut restarted = Vec::new();
        for id in suspects {
            let monitorable = self.get_instance(&id).is_some_and(|i| i.state.is_monitorable());
            if monitorable && self.start(&id) {
                tracing::info!(watcher_id = %id, "monitor restarted");
                restarted.push(id);
            }
        }

        let completed = self.cleanup_orphans().await;
        HealthReport {
            restarted,
            completed,
        }
    }

    /// Complete ACTIVE and PAUSED instances whose job is no longer active.
    ///
    /// Each job is queried once. A job whose status cannot be read is left
    /// alone until the next check.
    pub async fn cleanup_orphans(&self) -> Vec<WatcherId> {
        let mut states: HashMap<(JobId, String), Option<JobState>> = HashMap::new();
        let mut completed = Vec::new();

        for instance in self.inner.store.list_instances() {
            if !matches!(instance.state, WatcherState::Active | WatcherState::Paused) {
                continue;
            }
            let key = (instance.job_id.clone(), instance.host.clone());
            let state = match states.get(&key) {
                Some(state) => *state,
                None => {
                    let state = match self.job_state(&instance.job_id, &instance.host).await {
                        Ok(state) => Some(state),
                        Err(e) => {
                            tracing::warn!(
                                job_id = %instance.job_id,
                                error = %e,
                                "orphan check: job status unavailable"
                            );
                            None
                        }
                    };
                    states.insert(key, state);
                    state
                }
            };
            if matches!(state, None | Some(JobState::Active)) {
                continue;
            }

            self.stop(&instance.id);
            if self.set_state(&instance.id, WatcherState::Completed).is_some() {
                tracing::info!(
                    watcher_id = %instance.id,
                    job_id = %instance.job_id,
                    "orphan watcher completed"
                );
                completed.push(instance.id);
            }
        }
        completed
    }

    async fn job_state(&self, job_id: &JobId, host: &str) -> Result<JobState, JobsError> {
        let timeout = self.inner.config.remote_timeout();
        match tokio::time::timeout(timeout, self.inner.jobs.job_state(job_id, host)).await {
            Ok(result) => result,
            Err(_) => Err(JobsError::StatusFailed(format!(
                "no response within {}s",
                timeout.as_secs()
            ))),
        }
    }

    // === Queries ===

    pub fn get_instance(&self, id: &WatcherId) -> Option<WatcherInstance> {
        self.inner.store.get_instance(id)
    }

    /// Most recent events for an instance, oldest first
    pub fn get_events(&self, id: &WatcherId, limit: usize) -> Vec<WatcherEvent> {
        self.inner.store.events(id, limit)
    }

    /// Base poll interval for an instance (timer interval in timer mode)
    pub(crate) fn poll_interval(&self, id: &WatcherId) -> Duration {
        self.expected_interval(id).unwrap_or(FALLBACK_INTERVAL)
    }

    fn expected_interval(&self, id: &WatcherId) -> Option<Duration> {
        let instance = self.inner.store.get_instance(id)?;
        let interval = self
            .inner
            .store
            .get_definition(instance.definition_id.as_str())
            .map(|d| {
                if instance.timer_mode_active {
                    d.timer_interval()
                } else {
                    d.interval()
                }
            })
            .unwrap_or(FALLBACK_INTERVAL);
        Some(interval)
    }

    /// Continue with `sleep` while the instance is still monitorable
    pub(crate) fn next_control(&self, id: &WatcherId, sleep: Duration) -> Control {
        match self.inner.store.get_instance(id) {
            Some(i) if i.state.is_monitorable() => Control::Continue(sleep),
            _ => Control::Exit,
        }
    }

    // === Action follow-ups ===

    /// Apply effects requested by actions, after the iteration persisted
    pub(crate) fn apply_effects(&self, effects: Vec<ActionEffect>) {
        for effect in effects {
            match effect {
                ActionEffect::StopJobWatchers { job_id, host } => {
                    self.complete_job_watchers(&job_id, &host);
                }
                ActionEffect::AttachWatchers { from, job_id, host } => {
                    self.attach_watchers(&from, &job_id, &host);
                }
            }
        }
    }

    fn complete_job_watchers(&self, job_id: &JobId, host: &str) {
        for instance in self.inner.store.list_instances_for_job(job_id, host) {
            if !matches!(instance.state, WatcherState::Active | WatcherState::Paused) {
                continue;
            }
            self.stop(&instance.id);
            self.set_state(&instance.id, WatcherState::Completed);
        }
    }

    /// Give the resubmitted job an ACTIVE instance of every definition that
    /// watched the original job
    fn attach_watchers(&self, from: &JobId, job_id: &JobId, host: &str) {
        let existing: HashSet<DefinitionId> = self
            .inner
            .store
            .list_instances_for_job(job_id, host)
            .into_iter()
            .map(|i| i.definition_id)
            .collect();
        let mut seen = HashSet::new();
        for source in self.inner.store.list_instances_for_job(from, host) {
            let definition_id = source.definition_id;
            if existing.contains(&definition_id) || !seen.insert(definition_id.clone()) {
                continue;
            }
            let instance = WatcherInstance::new(
                WatcherId::new(UuidIdGen.next()),
                definition_id,
                job_id.clone(),
                host,
                WatcherState::Active,
                self.now_ms(),
            );
            if let Err(e) = self.inner.store.put_instance(instance.clone()) {
                tracing::warn!(job_id = %job_id, error = %e, "failed to attach watcher");
                continue;
            }
            tracing::info!(
                watcher_id = %instance.id,
                definition_id = %instance.definition_id,
                from = %from,
                job_id = %job_id,
                "watcher attached to resubmitted job"
            );
            self.start(&instance.id);
        }
    }
}

#[cfg(test)]
#[path = "supervisor_tests/mod.rs"]
mod tests;
