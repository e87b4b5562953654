// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Captured variables, action events and stored metrics.

use crate::action::ActionKind;
use crate::instance::WatcherId;
use crate::job::JobId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name → value bindings captured from a match
pub type Variables = BTreeMap<String, String>;

/// Variable holding the full text of the latest match (also `$0`)
pub const MATCHED_TEXT_VAR: &str = "_matched_text";

/// Latest variables captured for an instance.
///
/// Overwritten on every match; read back by timer mode and condition checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherVariables {
    pub instance_id: WatcherId,
    pub values: Variables,
    /// Regex groups `1..=N` of the same match, for `$N` in timer mode
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<Option<String>>,
    pub updated_at_ms: u64,
}

/// Append-only record of one action attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherEvent {
    pub instance_id: WatcherId,
    pub timestamp_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_text: Option<String>,
    #[serde(default)]
    pub variables: Variables,
    pub action: ActionKind,
    pub result: String,
    pub success: bool,
}

/// A user-named value persisted by a `store_metric` action.
///
/// Kept apart from pattern captures so a metric survives the next match
/// overwriting the instance's variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMetric {
    pub instance_id: WatcherId,
    pub job_id: JobId,
    pub name: String,
    pub value: String,
    pub recorded_at_ms: u64,
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
