// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Batch job identity and scheduler-reported state.

use serde::{Deserialize, Serialize};
use std::fmt;

crate::define_id! {
    /// Identifier of a batch-cluster job as reported by the scheduler.
    #[derive(Default)]
    pub struct JobId;
}

/// Job state as seen by the job status collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Pending or running; output may still grow
    Active,
    /// Completed, failed, cancelled, timed out
    Terminal,
    /// The scheduler answered but the state was not recognized
    Unknown,
    /// The scheduler no longer knows the job
    NotFound,
}

impl JobState {
    /// Only `Active` keeps a watcher polling. `Unknown` and `NotFound` are
    /// treated as terminal so a watcher never polls a vanished job forever.
    pub fn is_active(self) -> bool {
        matches!(self, JobState::Active)
    }

    /// Map a Slurm state name (`squeue %T` / `sacct State`) onto a job state.
    pub fn from_slurm(state: &str) -> Self {
        // sacct reports e.g. "CANCELLED by 1234"
        let word = state
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .trim_end_matches('+')
            .to_ascii_uppercase();
        match word.as_str() {
            "PENDING" | "RUNNING" | "CONFIGURING" | "COMPLETING" | "SUSPENDED" | "REQUEUED"
            | "RESIZING" | "SIGNALING" | "STAGE_OUT" | "STOPPED" | "REQUEUE_HOLD"
            | "REQUEUE_FED" | "RESV_DEL_HOLD" | "PD" | "R" | "CF" | "CG" | "S" => {
                JobState::Active
            }
            "COMPLETED" | "FAILED" | "CANCELLED" | "TIMEOUT" | "NODE_FAIL" | "PREEMPTED"
            | "OUT_OF_MEMORY" | "BOOT_FAIL" | "DEADLINE" | "REVOKED" | "SPECIAL_EXIT" | "CD"
            | "F" | "CA" | "TO" | "NF" | "PR" | "OOM" | "BF" | "DL" => JobState::Terminal,
            "" => JobState::NotFound,
            _ => JobState::Unknown,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Active => write!(f, "active"),
            JobState::Terminal => write!(f, "terminal"),
            JobState::Unknown => write!(f, "unknown"),
            JobState::NotFound => write!(f, "not_found"),
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
