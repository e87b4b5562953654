// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watcher instance: the mutable runtime attachment of a definition to one job.

use crate::job::JobId;
use crate::watcher::{DefinitionId, OutputPosition, OutputStream};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

crate::define_id! {
    /// Identifier of a watcher instance.
    pub struct WatcherId;
}

/// Lifecycle state of a watcher instance.
///
/// ```text
/// ACTIVE <-> PAUSED
/// ACTIVE  -> TRIGGERED   (trigger cap reached)
/// ACTIVE  -> DISABLED    (too many consecutive failures)
/// STATIC  -> TRIGGERED   (manual trigger reached the cap)
/// PAUSED  -> TRIGGERED   (manual trigger reached the cap)
/// non-terminal -> COMPLETED (job finished or vanished)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatcherState {
    Active,
    Paused,
    /// Attached to a job that had already finished; only runs on manual trigger
    Static,
    Triggered,
    Disabled,
    Completed,
}

impl WatcherState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WatcherState::Triggered | WatcherState::Disabled | WatcherState::Completed
        )
    }

    /// Whether an autonomous monitor task should be polling this instance
    pub fn is_monitorable(self) -> bool {
        self == WatcherState::Active
    }

    pub fn can_transition_to(self, next: WatcherState) -> bool {
        use WatcherState::*;
        match (self, next) {
            (Active, Paused) | (Paused, Active) => true,
            (Active | Static | Paused, Triggered) => true,
            (Active, Disabled) => true,
            (from, Completed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for WatcherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WatcherState::Active => "active",
            WatcherState::Paused => "paused",
            WatcherState::Static => "static",
            WatcherState::Triggered => "triggered",
            WatcherState::Disabled => "disabled",
            WatcherState::Completed => "completed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid watcher transition {from} -> {to}")]
pub struct TransitionError {
    pub from: WatcherState,
    pub to: WatcherState,
}

/// Runtime record for one watcher on one job.
///
/// Owned by at most one monitor task at a time and persisted after every
/// state-affecting step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherInstance {
    pub id: WatcherId,
    pub definition_id: DefinitionId,
    pub job_id: JobId,
    pub host: String,
    pub state: WatcherState,
    /// Byte offset of the first unconsumed stdout byte
    #[serde(default)]
    pub last_position: u64,
    /// Byte offset of the first unconsumed stderr byte
    #[serde(default)]
    pub last_stderr_position: u64,
    #[serde(default)]
    pub trigger_count: u32,
    #[serde(default)]
    pub timer_mode_active: bool,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_triggered_at_ms: Option<u64>,
}

impl WatcherInstance {
    pub fn new(
        id: WatcherId,
        definition_id: DefinitionId,
        job_id: JobId,
        host: impl Into<String>,
        state: WatcherState,
        now_ms: u64,
    ) -> Self {
        Self {
            id,
            definition_id,
            job_id,
            host: host.into(),
            state,
            last_position: 0,
            last_stderr_position: 0,
            trigger_count: 0,
            timer_mode_active: false,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
            last_checked_at_ms: None,
            last_triggered_at_ms: None,
        }
    }

    pub fn transition(&mut self, to: WatcherState, now_ms: u64) -> Result<(), TransitionError> {
        if self.state == to {
            return Ok(());
        }
        if !self.state.can_transition_to(to) {
            return Err(TransitionError {
                from: self.state,
                to,
            });
        }
        self.state = to;
        self.updated_at_ms = now_ms;
        Ok(())
    }

    pub fn position(&self) -> OutputPosition {
        OutputPosition {
            stdout: self.last_position,
            stderr: self.last_stderr_position,
        }
    }

    /// Record a new read position in one stream.
    ///
    /// The position only moves forward unless the reader detected truncation,
    /// in which case the new position is measured from the start of the
    /// rewritten output.
    pub fn advance_position(&mut self, stream: OutputStream, new_position: u64, truncated: bool) {
        let position = match stream {
            OutputStream::Stdout => &mut self.last_position,
            OutputStream::Stderr => &mut self.last_stderr_position,
        };
        if truncated {
            *position = new_position;
        } else {
            *position = (*position).max(new_position);
        }
    }
}

#[cfg(test)]
#[path = "instance_tests.rs"]
mod tests;
