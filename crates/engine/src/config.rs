// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine tunables

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Command prefixes `run_command` actions may execute
pub const DEFAULT_ALLOWED_COMMANDS: &[&str] = &[
    "echo",
    "date",
    "ls",
    "cat",
    "head",
    "tail",
    "grep",
    "wc",
    "df",
    "du",
    "touch",
    "mkdir -p",
    "nvidia-smi",
    "squeue",
    "sacct",
    "sinfo",
    "sstat",
    "scontrol show",
];

/// Engine configuration. Every field has a default, so an empty `[engine]`
/// table (or none at all) yields the stock behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Consecutive failed iterations before an instance is disabled
    pub max_consecutive_failures: u32,
    /// Executed actions allowed per instance within the rate window
    pub rate_limit_max_actions: usize,
    pub rate_limit_window_secs: u64,
    /// Poll interval multiplier applied after each iteration without a match
    pub backoff_factor: f64,
    /// Upper bound for the backoff multiplier
    pub max_backoff: f64,
    /// Bound for every remote read and command
    pub remote_timeout_secs: u64,
    pub health_check_secs: u64,
    /// A task is stalled after this many expected intervals without progress
    pub stall_factor: f64,
    pub pattern_cache_capacity: usize,
    pub max_pattern_len: usize,
    pub allowed_commands: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_consecutive_failures: 5,
            rate_limit_max_actions: 10,
            rate_limit_window_secs: 60,
            backoff_factor: 1.1,
            max_backoff: 5.0,
            remote_timeout_secs: 120,
            health_check_secs: 60,
            stall_factor: 2.0,
            pattern_cache_capacity: 256,
            max_pattern_len: jw_core::watcher::DEFAULT_MAX_PATTERN_LEN,
            allowed_commands: DEFAULT_ALLOWED_COMMANDS
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }
}

impl EngineConfig {
    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_secs)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_secs)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
