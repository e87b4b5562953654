// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-instance monitor loop.
//!
//! Each iteration reloads the instance and its definition from the store,
//! checks the job, then either runs the cached-variable actions (timer
//! mode) or scans new output for matches. The loop itself is the error
//! boundary: a failed iteration is logged and counted, never propagated.
//!
//! Iterations of one instance never overlap: the task loop and manual
//! triggers both hold the instance's [`InstanceSlot`] iteration lock.

use crate::actions::{ActionContext, ActionEffect};
use crate::backoff::Backoff;
use crate::condition;
use crate::error::IterationError;
use crate::pattern::find_matches;
use crate::supervisor::Engine;
use jw_adapters::{JobsAdapter, NotifyAdapter, RemoteAdapter};
use jw_core::{
    Clock, OutputPosition, Variables, WatcherDefinition, WatcherId, WatcherInstance,
    WatcherState, WatcherVariables,
};
use std::future::Future;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// Longest unterminated line held back before it is consumed anyway
const MAX_PENDING_LINE: usize = 64 * 1024;

/// How much output an iteration reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScanMode {
    /// New output since the last consumed offset, complete lines only
    Incremental,
    /// All available output from offset 0 (manual triggers)
    FullScan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Control {
    Continue(Duration),
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IterationReport {
    pub matched: bool,
    pub match_count: usize,
    pub executed_actions: usize,
    /// Ran the timer-mode path instead of reading output
    pub timer: bool,
    pub control: Control,
}

impl IterationReport {
    fn exit() -> Self {
        Self {
            matched: false,
            match_count: 0,
            executed_actions: 0,
            timer: false,
            control: Control::Exit,
        }
    }
}

/// Liveness record shared between a monitor task and health checks
#[derive(Debug)]
pub(crate) struct TaskProgress {
    last_progress_ms: AtomicU64,
    expected_ms: AtomicU64,
}

impl TaskProgress {
    pub fn new(now_ms: u64, expected: Duration) -> Self {
        Self {
            last_progress_ms: AtomicU64::new(now_ms),
            expected_ms: AtomicU64::new(expected.as_millis() as u64),
        }
    }

    /// Record that an iteration finished and the next is due after `expected`
    pub fn touch(&self, now_ms: u64, expected: Duration) {
        self.expected_ms
            .store(expected.as_millis() as u64, Ordering::Relaxed);
        self.last_progress_ms.store(now_ms, Ordering::Relaxed);
    }

    /// No progress for more than `factor` expected intervals
    pub fn is_stalled(&self, now_ms: u64, factor: f64) -> bool {
        let last = self.last_progress_ms.load(Ordering::Relaxed);
        let expected = self.expected_ms.load(Ordering::Relaxed);
        let allowed = (expected as f64 * factor) as u64;
        now_ms.saturating_sub(last) > allowed
    }
}

/// Per-instance record shared by its monitor tasks, manual triggers and
/// health checks. Outlives any single task, so a restarted task keeps the
/// failure count of the one it replaced.
#[derive(Debug)]
pub(crate) struct InstanceSlot {
    /// Held for the whole of an iteration
    pub iteration: tokio::sync::Mutex<()>,
    /// Consecutive failed iterations
    pub failures: AtomicU32,
    pub progress: TaskProgress,
}

impl InstanceSlot {
    pub fn new(now_ms: u64, expected: Duration) -> Self {
        Self {
            iteration: tokio::sync::Mutex::new(()),
            failures: AtomicU32::new(0),
            progress: TaskProgress::new(now_ms, expected),
        }
    }
}

/// Await a collaborator call, bounded by `timeout`
async fn bounded<T, E>(
    timeout: Duration,
    fut: impl Future<Output = Result<T, E>>,
) -> Result<T, IterationError>
where
    IterationError: From<E>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(IterationError::from),
        Err(_) => Err(IterationError::Timeout(timeout)),
    }
}

/// Bytes of `data` that end on a line boundary.
///
/// A trailing partial line is left for the next read unless it has grown
/// past [`MAX_PENDING_LINE`].
fn consumable_len(data: &[u8]) -> usize {
    match data.iter().rposition(|b| *b == b'\n') {
        Some(pos) => pos + 1,
        None if data.len() > MAX_PENDING_LINE => data.len(),
        None => 0,
    }
}

/// Body of a spawned monitor task. Runs until the instance stops being
/// monitorable, the failure limit is hit, or `shutdown` fires.
pub(crate) async fn run_task<R, J, N, C>(
    engine: Engine<R, J, N, C>,
    id: WatcherId,
    generation: u64,
    slot: Arc<InstanceSlot>,
    mut shutdown: oneshot::Receiver<()>,
) where
    R: RemoteAdapter,
    J: JobsAdapter,
    N: NotifyAdapter,
    C: Clock,
{
    let config = engine.config().clone();
    let mut backoff = Backoff::new(config.backoff_factor, config.max_backoff);
    tracing::info!(watcher_id = %id, "monitor started");

    loop {
        let step = async {
            let next = match run_iteration(&engine, &id, ScanMode::Incremental, &mut backoff).await
            {
                Ok(report) => {
                    slot.failures.store(0, Ordering::Relaxed);
                    match report.control {
                        Control::Continue(sleep) => Some(sleep),
                        Control::Exit => None,
                    }
                }
                Err(e) => {
                    let failures = slot.failures.fetch_add(1, Ordering::Relaxed) + 1;
                    if failures >= config.max_consecutive_failures {
                        tracing::error!(
                            watcher_id = %id,
                            failures,
                            error = %e,
                            "too many consecutive failures, disabling watcher"
                        );
                        engine.set_state(&id, WatcherState::Disabled);
                        None
                    } else {
                        tracing::warn!(
                            watcher_id = %id,
                            failures,
                            error = %e,
                            "iteration failed"
                        );
                        backoff.grow();
                        Some(backoff.apply(engine.poll_interval(&id)))
                    }
                }
            };
            match next {
                Some(sleep) => {
                    slot.progress.touch(engine.now_ms(), sleep);
                    tracing::debug!(watcher_id = %id, sleep_ms = sleep.as_millis() as u64, "sleeping");
                    tokio::time::sleep(sleep).await;
                    true
                }
                None => false,
            }
        };

        tokio::select! {
            _ = &mut shutdown => {
                tracing::debug!(watcher_id = %id, "monitor cancelled");
                break;
            }
            keep_going = step => {
                if !keep_going {
                    break;
                }
            }
        }
    }

    tracing::info!(watcher_id = %id, "monitor stopped");
    engine.deregister(&id, generation);
}

/// Run one iteration for `id`.
///
/// Incremental scans require an ACTIVE instance and check the job first.
/// Full scans (manual triggers) run on any non-terminal instance and skip
/// the job check. Waits for any iteration of the same instance already in
/// flight; the instance is loaded only once the lock is held.
pub(crate) async fn run_iteration<R, J, N, C>(
    engine: &Engine<R, J, N, C>,
    id: &WatcherId,
    mode: ScanMode,
    backoff: &mut Backoff,
) -> Result<IterationReport, IterationError>
where
    R: RemoteAdapter,
    J: JobsAdapter,
    N: NotifyAdapter,
    C: Clock,
{
    let inner = &engine.inner;
    let slot = engine.slot(id);
    let _running = slot.iteration.lock().await;
    engine.heartbeat(id);

    let Some(instance) = inner.store.get_instance(id) else {
        tracing::debug!(watcher_id = %id, "instance gone");
        engine.release(id);
        return Ok(IterationReport::exit());
    };
    let runnable = match mode {
        ScanMode::Incremental => instance.state.is_monitorable(),
        ScanMode::FullScan => !instance.state.is_terminal(),
    };
    if !runnable {
        tracing::debug!(watcher_id = %id, state = %instance.state, "not monitorable");
        return Ok(IterationReport::exit());
    }
    let Some(definition) = inner
        .store
        .get_definition(instance.definition_id.as_str())
    else {
        tracing::warn!(
            watcher_id = %id,
            definition_id = %instance.definition_id,
            "definition missing"
        );
        return Ok(IterationReport::exit());
    };

    if definition.cap_reached(instance.trigger_count) {
        engine.set_state(id, WatcherState::Triggered);
        return Ok(IterationReport::exit());
    }

    if mode == ScanMode::Incremental {
        let state = bounded(
            inner.config.remote_timeout(),
            inner.jobs.job_state(&instance.job_id, &instance.host),
        )
        .await?;
        if !state.is_active() {
            tracing::info!(
                watcher_id = %id,
                job_id = %instance.job_id,
                job_state = %state,
                "job no longer active"
            );
            engine.set_state(id, WatcherState::Completed);
            return Ok(IterationReport::exit());
        }
    }

    if instance.timer_mode_active {
        timer_iteration(engine, &instance, &definition).await
    } else {
        pattern_iteration(engine, &instance, &definition, mode, backoff).await
    }
}

async fn timer_iteration<R, J, N, C>(
    engine: &Engine<R, J, N, C>,
    instance: &WatcherInstance,
    definition: &WatcherDefinition,
) -> Result<IterationReport, IterationError>
where
    R: RemoteAdapter,
    J: JobsAdapter,
    N: NotifyAdapter,
    C: Clock,
{
    let id = &instance.id;
    let (variables, groups) = engine
        .inner
        .store
        .get_variables(id)
        .map(|v| (v.values, v.groups))
        .unwrap_or_default();

    let fired = condition::evaluate(definition.condition_expr(), &variables);
    let (executed_actions, effects) = if fired {
        run_actions(engine, instance, definition, &variables, &groups).await
    } else {
        tracing::debug!(watcher_id = %id, "timer condition no longer holds, skipping");
        (0, Vec::new())
    };

    let now = engine.now_ms();
    let updated = engine.inner.store.update_instance(id, |i| {
        i.last_checked_at_ms = Some(now);
        if fired {
            i.trigger_count = capped(definition, i.trigger_count, 1);
            i.last_triggered_at_ms = Some(now);
            i.updated_at_ms = now;
        }
    })?;
    if updated.is_some_and(|i| definition.cap_reached(i.trigger_count)) {
        tracing::info!(watcher_id = %id, "trigger cap reached");
        engine.set_state(id, WatcherState::Triggered);
    }
    engine.apply_effects(effects);

    Ok(IterationReport {
        matched: false,
        match_count: 0,
        executed_actions,
        timer: true,
        control: engine.next_control(id, definition.timer_interval()),
    })
}

async fn pattern_iteration<R, J, N, C>(
    engine: &Engine<R, J, N, C>,
    instance: &WatcherInstance,
    definition: &WatcherDefinition,
    mode: ScanMode,
    backoff: &mut Backoff,
) -> Result<IterationReport, IterationError>
where
    R: RemoteAdapter,
    J: JobsAdapter,
    N: NotifyAdapter,
    C: Clock,
{
    let inner = &engine.inner;
    let id = &instance.id;
    let regex = inner.patterns.compile(&definition.pattern)?;

    let from = match mode {
        ScanMode::Incremental => instance.position(),
        ScanMode::FullScan => OutputPosition::default(),
    };
    engine.heartbeat(id);
    let chunks = bounded(
        inner.config.remote_timeout(),
        inner
            .remote
            .get_new_output(&instance.job_id, &instance.host, from, definition.channel),
    )
    .await?;

    let mut consumed_bytes = 0;
    let mut scans = Vec::with_capacity(chunks.len());
    for chunk in &chunks {
        if chunk.truncated {
            tracing::info!(
                watcher_id = %id,
                stream = %chunk.stream,
                previous_offset = from.get(chunk.stream),
                size = chunk.new_offset,
                "output truncated, rescanning from start"
            );
        }
        let consumed = match mode {
            ScanMode::Incremental => consumable_len(&chunk.data),
            ScanMode::FullScan => chunk.data.len(),
        };
        consumed_bytes += consumed;
        let end = chunk.start_offset() + consumed as u64;
        scans.push((chunk, end, String::from_utf8_lossy(&chunk.data[..consumed])));
    }

    let mut match_count = 0;
    let mut executed_actions = 0;
    let mut triggered: u32 = 0;
    let mut effects: Vec<ActionEffect> = Vec::new();
    let mut enter_timer_mode = false;

    'streams: for (_, _, text) in &scans {
        for m in find_matches(&regex, text) {
            match_count += 1;
            let variables = m.bind(&definition.captures);
            inner.store.put_variables(WatcherVariables {
                instance_id: id.clone(),
                values: variables.clone(),
                groups: m.groups.clone(),
                updated_at_ms: engine.now_ms(),
            })?;

            if !condition::evaluate(definition.condition_expr(), &variables) {
                tracing::debug!(watcher_id = %id, matched = %m.matched, "condition not met");
                continue;
            }

            let (executed, fx) =
                run_actions(engine, instance, definition, &variables, &m.groups).await;
            executed_actions += executed;
            effects.extend(fx);
            triggered += 1;

            if definition.cap_reached(instance.trigger_count + triggered) {
                tracing::info!(watcher_id = %id, "trigger cap reached");
                break 'streams;
            }
            if definition.timer_mode {
                tracing::info!(
                    watcher_id = %id,
                    interval_secs = definition.timer_interval_secs,
                    "entering timer mode"
                );
                enter_timer_mode = true;
                break 'streams;
            }
        }
    }

    let now = engine.now_ms();
    let updated = inner.store.update_instance(id, |i| {
        for (chunk, end, _) in &scans {
            i.advance_position(chunk.stream, *end, chunk.truncated);
        }
        i.last_checked_at_ms = Some(now);
        if triggered > 0 {
            i.trigger_count = capped(definition, i.trigger_count, triggered);
            i.last_triggered_at_ms = Some(now);
            i.updated_at_ms = now;
        }
        if enter_timer_mode {
            i.timer_mode_active = true;
        }
    })?;
    if updated.is_some_and(|i| definition.cap_reached(i.trigger_count)) {
        engine.set_state(id, WatcherState::Triggered);
    }
    engine.apply_effects(effects);

    if match_count > 0 {
        backoff.reset();
    } else {
        backoff.grow();
    }
    tracing::debug!(
        watcher_id = %id,
        bytes = consumed_bytes,
        matches = match_count,
        executed = executed_actions,
        backoff = backoff.multiplier(),
        "iteration complete"
    );

    let sleep = if enter_timer_mode {
        definition.timer_interval()
    } else {
        backoff.apply(definition.interval())
    };
    Ok(IterationReport {
        matched: match_count > 0,
        match_count,
        executed_actions,
        timer: false,
        control: engine.next_control(id, sleep),
    })
}

/// `count + fired`, never past the definition's trigger cap
fn capped(definition: &WatcherDefinition, count: u32, fired: u32) -> u32 {
    let total = count.saturating_add(fired);
    match definition.max_triggers {
        Some(max) => total.min(max.max(count)),
        None => total,
    }
}

/// Run every action of the definition in order.
///
/// Returns how many actually executed (not rate limited) and the effects
/// they requested.
async fn run_actions<R, J, N, C>(
    engine: &Engine<R, J, N, C>,
    instance: &WatcherInstance,
    definition: &WatcherDefinition,
    variables: &Variables,
    groups: &[Option<String>],
) -> (usize, Vec<ActionEffect>)
where
    R: RemoteAdapter,
    J: JobsAdapter,
    N: NotifyAdapter,
    C: Clock,
{
    let ctx = ActionContext {
        instance_id: &instance.id,
        job_id: &instance.job_id,
        host: &instance.host,
        variables,
        groups,
    };
    let mut executed = 0;
    let mut effects = Vec::new();
    for spec in &definition.actions {
        engine.heartbeat(&instance.id);
        let outcome = engine.inner.executor.execute(spec, &ctx).await;
        if outcome.executed() {
            executed += 1;
        }
        effects.extend(outcome.effects);
    }
    (executed, effects)
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
