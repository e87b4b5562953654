// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watcher actions: dispatch, rate limiting and the command allow-list

mod allowlist;
mod executor;
mod rate_limit;
mod script;

pub use allowlist::{CommandAllowList, CommandRejected};
pub use executor::{ActionError, ActionExecutor};
pub use rate_limit::RateLimiter;
pub use script::{apply_directives, ScriptError};

use jw_core::{ActionKind, JobId, Variables, WatcherId};

/// Everything an action may reference when it runs
#[derive(Debug, Clone, Copy)]
pub struct ActionContext<'a> {
    pub instance_id: &'a WatcherId,
    pub job_id: &'a JobId,
    pub host: &'a str,
    /// Captured variables, including `_matched_text`
    pub variables: &'a Variables,
    /// Regex groups of the triggering match (cached ones in timer mode)
    pub groups: &'a [Option<String>],
}

/// Follow-up work for the engine once the iteration has been persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionEffect {
    /// Complete and stop every live watcher on the job
    StopJobWatchers { job_id: JobId, host: String },
    /// Attach the definitions watching `from` to the resubmitted job
    AttachWatchers {
        from: JobId,
        job_id: JobId,
        host: String,
    },
}

/// Result of one action attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub kind: ActionKind,
    pub success: bool,
    pub result: String,
    /// Skipped by the rate limiter; nothing ran
    pub rate_limited: bool,
    pub effects: Vec<ActionEffect>,
}

impl ActionOutcome {
    /// Whether the action actually ran (successfully or not)
    pub fn executed(&self) -> bool {
        !self.rate_limited
    }
}
