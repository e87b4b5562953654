// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Action executor

use super::allowlist::{CommandAllowList, CommandRejected};
use super::rate_limit::RateLimiter;
use super::script::{apply_directives, ScriptError};
use super::{ActionContext, ActionEffect, ActionOutcome};
use crate::config::EngineConfig;
use crate::substitute::{substitute, SubstitutionContext};
use jw_adapters::{
    JobsAdapter, JobsError, NotifyAdapter, NotifyChannel, NotifyError, RemoteAdapter, RemoteError,
};
use jw_core::{
    ActionKind, ActionSpec, Clock, JobId, StoredMetric, WatcherEvent, WatcherId, MATCHED_TEXT_VAR,
};
use jw_storage::{Store, StoreError};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Why an action failed. The display text becomes the event's result.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("missing parameter '{0}'")]
    MissingParam(&'static str),
    #[error(transparent)]
    Jobs(#[from] JobsError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Notify(#[from] NotifyError),
    #[error(transparent)]
    Rejected(#[from] CommandRejected),
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error("command exited with status {exit_code}: {stderr}")]
    CommandFailed { exit_code: i32, stderr: String },
    #[error("no response within {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Store(#[from] StoreError),
}

struct Executed {
    result: String,
    effects: Vec<ActionEffect>,
}

impl Executed {
    fn message(result: impl Into<String>) -> Self {
        Self {
            result: result.into(),
            effects: Vec::new(),
        }
    }
}

/// Executes watcher actions against the configured adapters.
///
/// Every attempt, including rate-limited ones, is recorded as a
/// [`WatcherEvent`]. Failures never propagate: they are folded into the
/// returned [`ActionOutcome`].
pub struct ActionExecutor<R, J, N, C: Clock> {
    remote: R,
    jobs: J,
    notifier: N,
    store: Store,
    clock: C,
    allowlist: CommandAllowList,
    limiter: Mutex<RateLimiter>,
    timeout: Duration,
}

impl<R, J, N, C> ActionExecutor<R, J, N, C>
where
    R: RemoteAdapter,
    J: JobsAdapter,
    N: NotifyAdapter,
    C: Clock,
{
    pub fn new(remote: R, jobs: J, notifier: N, store: Store, clock: C, config: &EngineConfig) -> Self {
        Self {
            remote,
            jobs,
            notifier,
            store,
            clock,
            allowlist: CommandAllowList::new(config.allowed_commands.iter().cloned()),
            limiter: Mutex::new(RateLimiter::new(
                config.rate_limit_max_actions,
                config.rate_limit_window(),
            )),
            timeout: config.remote_timeout(),
        }
    }

    /// Drop rate-limit history for a watcher that will not run again
    pub fn forget(&self, id: &WatcherId) {
        self.limiter.lock().forget(id);
    }

    /// Watchers the rate limiter holds history for
    pub fn rate_limited_watchers(&self) -> usize {
        self.limiter.lock().tracked()
    }

    /// Run one action and record its event
    pub async fn execute(&self, spec: &ActionSpec, ctx: &ActionContext<'_>) -> ActionOutcome {
        let kind = spec.kind;
        let allowed = self.limiter.lock().try_acquire(ctx.instance_id, self.clock.now());

        let outcome = if !allowed {
            tracing::warn!(
                watcher_id = %ctx.instance_id,
                job_id = %ctx.job_id,
                action = %kind,
                "action rate limited, skipping"
            );
            ActionOutcome {
                kind,
                success: false,
                result: "rate limited".to_string(),
                rate_limited: true,
                effects: Vec::new(),
            }
        } else {
            let params = self.substitute_params(spec, ctx);
            let start = std::time::Instant::now();
            let result = self.dispatch(kind, &params, ctx).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match result {
                Ok(done) => {
                    tracing::info!(
                        watcher_id = %ctx.instance_id,
                        job_id = %ctx.job_id,
                        action = %kind,
                        elapsed_ms,
                        result = %done.result,
                        "action executed"
                    );
                    ActionOutcome {
                        kind,
                        success: true,
                        result: done.result,
                        rate_limited: false,
                        effects: done.effects,
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        watcher_id = %ctx.instance_id,
                        job_id = %ctx.job_id,
                        action = %kind,
                        elapsed_ms,
                        error = %e,
                        "action failed"
                    );
                    ActionOutcome {
                        kind,
                        success: false,
                        result: e.to_string(),
                        rate_limited: false,
                        effects: Vec::new(),
                    }
                }
            }
        };

        self.record(ctx, &outcome);
        outcome
    }

    fn substitute_params(&self, spec: &ActionSpec, ctx: &ActionContext<'_>) -> BTreeMap<String, String> {
        let sub = SubstitutionContext {
            variables: ctx.variables,
            groups: ctx.groups,
            job_id: ctx.job_id.as_str(),
            hostname: ctx.host,
        };
        spec.params
            .iter()
            .map(|(k, v)| (k.clone(), substitute(v, &sub)))
            .collect()
    }

    fn record(&self, ctx: &ActionContext<'_>, outcome: &ActionOutcome) {
        let event = WatcherEvent {
            instance_id: ctx.instance_id.clone(),
            timestamp_ms: self.clock.epoch_ms(),
            matched_text: ctx.variables.get(MATCHED_TEXT_VAR).cloned(),
            variables: ctx.variables.clone(),
            action: outcome.kind,
            result: outcome.result.clone(),
            success: outcome.success,
        };
        if let Err(e) = self.store.append_event(event) {
            tracing::warn!(watcher_id = %ctx.instance_id, error = %e, "failed to record action event");
        }
    }

    /// Await a collaborator call, bounded by the remote timeout
    async fn bounded<T, E>(&self, fut: impl Future<Output = Result<T, E>>) -> Result<T, ActionError>
    where
        ActionError: From<E>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(ActionError::from),
            Err(_) => Err(ActionError::Timeout(self.timeout)),
        }
    }

    async fn dispatch(
        &self,
        kind: ActionKind,
        params: &BTreeMap<String, String>,
        ctx: &ActionContext<'_>,
    ) -> Result<Executed, ActionError> {
        match kind {
            ActionKind::CancelJob => {
                self.bounded(self.jobs.cancel(ctx.job_id, ctx.host)).await?;
                Ok(Executed {
                    result: format!("cancelled job {}", ctx.job_id),
                    effects: vec![ActionEffect::StopJobWatchers {
                        job_id: ctx.job_id.clone(),
                        host: ctx.host.to_string(),
                    }],
                })
            }
            ActionKind::Resubmit => self.resubmit(params, ctx).await,
            ActionKind::NotifyEmail => {
                self.notify(NotifyChannel::Email, "to", params, ctx)
                    .await
            }
            ActionKind::NotifySlack => {
                self.notify(NotifyChannel::Slack, "channel", params, ctx)
                    .await
            }
            ActionKind::RunCommand => {
                let command = params
                    .get("command")
                    .map(|c| c.trim())
                    .filter(|c| !c.is_empty())
                    .ok_or(ActionError::MissingParam("command"))?;
                self.allowlist.check(command)?;
                let output = self
                    .bounded(
                        self.remote
                            .run_command(ctx.job_id, ctx.host, command, self.timeout),
                    )
                    .await?;
                if !output.success() {
                    return Err(ActionError::CommandFailed {
                        exit_code: output.exit_code,
                        stderr: output.stderr.trim().to_string(),
                    });
                }
                Ok(Executed::message(output.stdout.trim().to_string()))
            }
            ActionKind::StoreMetric => {
                let name = params
                    .get("name")
                    .map(|n| n.trim())
                    .filter(|n| !n.is_empty())
                    .ok_or(ActionError::MissingParam("name"))?;
                let value = params
                    .get("value")
                    .or_else(|| ctx.variables.get(name))
                    .ok_or(ActionError::MissingParam("value"))?;
                self.store.put_metric(StoredMetric {
                    instance_id: ctx.instance_id.clone(),
                    job_id: ctx.job_id.clone(),
                    name: name.to_string(),
                    value: value.clone(),
                    recorded_at_ms: self.clock.epoch_ms(),
                })?;
                Ok(Executed::message(format!("stored {name}={value}")))
            }
            ActionKind::LogEvent => {
                let message = params
                    .get("message")
                    .cloned()
                    .or_else(|| ctx.variables.get(MATCHED_TEXT_VAR).cloned())
                    .unwrap_or_default();
                tracing::info!(
                    watcher_id = %ctx.instance_id,
                    job_id = %ctx.job_id,
                    message = %message,
                    "watcher event"
                );
                Ok(Executed::message(message))
            }
        }
    }

    async fn notify(
        &self,
        channel: NotifyChannel,
        target_param: &'static str,
        params: &BTreeMap<String, String>,
        ctx: &ActionContext<'_>,
    ) -> Result<Executed, ActionError> {
        let target = params
            .get(target_param)
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .ok_or(ActionError::MissingParam(target_param))?;
        let subject = params
            .get("subject")
            .cloned()
            .unwrap_or_else(|| format!("jobwatch: job {} on {}", ctx.job_id, ctx.host));
        let message = params
            .get("message")
            .cloned()
            .or_else(|| ctx.variables.get(MATCHED_TEXT_VAR).cloned())
            .unwrap_or_default();
        self.bounded(self.notifier.send(channel, target, &subject, &message))
            .await?;
        Ok(Executed::message(format!("sent {channel} notification to {target}")))
    }

    async fn resubmit(
        &self,
        params: &BTreeMap<String, String>,
        ctx: &ActionContext<'_>,
    ) -> Result<Executed, ActionError> {
        let script = self
            .bounded(self.jobs.fetch_script(ctx.job_id, ctx.host))
            .await?;
        let script = apply_directives(&script, params)?;

        // The job may already have ended on its own
        if let Err(e) = self.bounded(self.jobs.cancel(ctx.job_id, ctx.host)).await {
            tracing::warn!(job_id = %ctx.job_id, error = %e, "cancel before resubmit failed");
        }

        let new_job: JobId = self.bounded(self.jobs.submit(&script, ctx.host)).await?;
        Ok(Executed {
            result: format!("resubmitted as job {new_job}"),
            effects: vec![
                ActionEffect::StopJobWatchers {
                    job_id: ctx.job_id.clone(),
                    host: ctx.host.to_string(),
                },
                ActionEffect::AttachWatchers {
                    from: ctx.job_id.clone(),
                    job_id: new_job,
                    host: ctx.host.to_string(),
                },
            ],
        })
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
