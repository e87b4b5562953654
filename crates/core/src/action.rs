// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Action specifications attached to a watcher definition.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The closed set of actions a watcher can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    CancelJob,
    Resubmit,
    NotifyEmail,
    NotifySlack,
    RunCommand,
    StoreMetric,
    LogEvent,
}

impl ActionKind {
    pub const ALL: [ActionKind; 7] = [
        ActionKind::CancelJob,
        ActionKind::Resubmit,
        ActionKind::NotifyEmail,
        ActionKind::NotifySlack,
        ActionKind::RunCommand,
        ActionKind::StoreMetric,
        ActionKind::LogEvent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::CancelJob => "cancel_job",
            ActionKind::Resubmit => "resubmit",
            ActionKind::NotifyEmail => "notify_email",
            ActionKind::NotifySlack => "notify_slack",
            ActionKind::RunCommand => "run_command",
            ActionKind::StoreMetric => "store_metric",
            ActionKind::LogEvent => "log_event",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = String;

    /// Accepts `cancel_job`, `CANCEL_JOB` and `cancel-job` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        ActionKind::ALL
            .into_iter()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| format!("unknown action kind: {s}"))
    }
}

/// One action to run when a watcher triggers.
///
/// Parameter values may contain `$name`, `${name}`, `$0` and `$1..$N`
/// placeholders which are substituted before dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpec {
    pub kind: ActionKind,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
}

impl ActionSpec {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            params: BTreeMap::new(),
        }
    }

    /// Builder-style parameter setter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

#[cfg(test)]
#[path = "action_tests.rs"]
mod tests;
