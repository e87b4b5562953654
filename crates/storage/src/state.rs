// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state from WAL replay

use jw_core::{StoredMetric, WatcherDefinition, WatcherEvent, WatcherInstance, WatcherVariables};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Oldest events are dropped once an instance's history exceeds this
pub const MAX_EVENTS_PER_INSTANCE: usize = 1000;

/// A single durable mutation. Every write to the store is one of these,
/// logged to the WAL before it is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreOp {
    DefinitionSaved { definition: WatcherDefinition },
    DefinitionDeleted { id: String },
    InstanceSaved { instance: WatcherInstance },
    /// Removes the instance together with its variables, events and metrics
    InstanceDeleted { id: String },
    VariablesSaved { variables: WatcherVariables },
    EventAppended { event: WatcherEvent },
    MetricStored { metric: StoredMetric },
}

/// Everything the engine persists, keyed by id string
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterializedState {
    #[serde(default)]
    pub definitions: HashMap<String, WatcherDefinition>,
    #[serde(default)]
    pub instances: HashMap<String, WatcherInstance>,
    #[serde(default)]
    pub variables: HashMap<String, WatcherVariables>,
    #[serde(default)]
    pub events: HashMap<String, VecDeque<WatcherEvent>>,
    #[serde(default)]
    pub metrics: HashMap<String, Vec<StoredMetric>>,
}

impl StoreOp {
    /// Whether the op is made durable before the write returns. Variables,
    /// events and metrics ride along with the next synced op or group flush.
    pub fn needs_sync(&self) -> bool {
        matches!(
            self,
            StoreOp::DefinitionSaved { .. }
                | StoreOp::DefinitionDeleted { .. }
                | StoreOp::InstanceSaved { .. }
                | StoreOp::InstanceDeleted { .. }
        )
    }
}

impl MaterializedState {
    /// Apply a mutation. Replaying the same sequence of ops always yields
    /// the same state.
    pub fn apply_op(&mut self, op: &StoreOp) {
        match op {
            StoreOp::DefinitionSaved { definition } => {
                self.definitions
                    .insert(definition.id.to_string(), definition.clone());
            }
            StoreOp::DefinitionDeleted { id } => {
                self.definitions.remove(id);
            }
            StoreOp::InstanceSaved { instance } => {
                self.instances
                    .insert(instance.id.to_string(), instance.clone());
            }
            StoreOp::InstanceDeleted { id } => {
                self.instances.remove(id);
                self.variables.remove(id);
                self.events.remove(id);
                self.metrics.remove(id);
            }
            StoreOp::VariablesSaved { variables } => {
                self.variables
                    .insert(variables.instance_id.to_string(), variables.clone());
            }
            StoreOp::EventAppended { event } => {
                let events = self
                    .events
                    .entry(event.instance_id.to_string())
                    .or_default();
                events.push_back(event.clone());
                while events.len() > MAX_EVENTS_PER_INSTANCE {
                    events.pop_front();
                }
            }
            StoreOp::MetricStored { metric } => {
                self.metrics
                    .entry(metric.instance_id.to_string())
                    .or_default()
                    .push(metric.clone());
            }
        }
    }

    /// Whether any instance still refers to the definition
    pub fn definition_in_use(&self, definition_id: &str) -> bool {
        self.instances
            .values()
            .any(|i| i.definition_id == *definition_id)
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
