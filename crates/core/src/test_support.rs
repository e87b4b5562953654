// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{
    ActionKind, ActionSpec, DefinitionId, JobId, WatcherDefinition, WatcherId, WatcherInstance,
    WatcherState,
};

pub const TEST_HOST: &str = "cluster-a";

/// Definition with named captures and a single `log_event` action
pub fn definition(id: &str, pattern: &str, captures: &[&str]) -> WatcherDefinition {
    let mut def = WatcherDefinition::new(DefinitionId::new(id), pattern);
    def.name = format!("{id}-watcher");
    def.interval_secs = 10;
    def.captures = captures.iter().map(|c| c.to_string()).collect();
    def.actions = vec![ActionSpec::new(ActionKind::LogEvent).with_param("message", "$0")];
    def
}

pub fn instance(id: &str, def_id: &str, job_id: &str, state: WatcherState) -> WatcherInstance {
    WatcherInstance::new(
        WatcherId::new(id),
        DefinitionId::new(def_id),
        JobId::new(job_id),
        TEST_HOST,
        state,
        1_700_000_000_000,
    )
}
