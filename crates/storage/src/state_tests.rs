// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use jw_core::test_support::{definition, instance};
use jw_core::{ActionKind, JobId, Variables, WatcherId, WatcherState};

fn event(id: &str, n: u64) -> WatcherEvent {
    WatcherEvent {
        instance_id: WatcherId::new(id),
        timestamp_ms: n,
        matched_text: Some(format!("line {n}")),
        variables: Variables::new(),
        action: ActionKind::LogEvent,
        result: "logged".to_string(),
        success: true,
    }
}

#[test]
fn saves_and_replaces_instances() {
    let mut state = MaterializedState::default();
    let mut inst = instance("w-1", "d-1", "100", WatcherState::Active);
    state.apply_op(&StoreOp::InstanceSaved {
        instance: inst.clone(),
    });

    inst.last_position = 42;
    state.apply_op(&StoreOp::InstanceSaved {
        instance: inst.clone(),
    });

    assert_eq!(state.instances.len(), 1);
    assert_eq!(state.instances["w-1"].last_position, 42);
}

#[test]
fn deleting_instance_removes_dependents() {
    let mut state = MaterializedState::default();
    state.apply_op(&StoreOp::InstanceSaved {
        instance: instance("w-1", "d-1", "100", WatcherState::Active),
    });
    state.apply_op(&StoreOp::EventAppended {
        event: event("w-1", 1),
    });
    state.apply_op(&StoreOp::VariablesSaved {
        variables: WatcherVariables {
            instance_id: WatcherId::new("w-1"),
            values: Variables::new(),
            groups: Vec::new(),
            updated_at_ms: 1,
        },
    });
    state.apply_op(&StoreOp::MetricStored {
        metric: StoredMetric {
            instance_id: WatcherId::new("w-1"),
            job_id: JobId::new("100"),
            name: "loss".to_string(),
            value: "0.3".to_string(),
            recorded_at_ms: 1,
        },
    });

    state.apply_op(&StoreOp::InstanceDeleted {
        id: "w-1".to_string(),
    });

    assert!(state.instances.is_empty());
    assert!(state.events.is_empty());
    assert!(state.variables.is_empty());
    assert!(state.metrics.is_empty());
}

#[test]
fn event_history_is_bounded() {
    let mut state = MaterializedState::default();
    for n in 0..(MAX_EVENTS_PER_INSTANCE as u64 + 5) {
        state.apply_op(&StoreOp::EventAppended {
            event: event("w-1", n),
        });
    }

    let events = &state.events["w-1"];
    assert_eq!(events.len(), MAX_EVENTS_PER_INSTANCE);
    assert_eq!(events.front().map(|e| e.timestamp_ms), Some(5));
}

#[test]
fn definition_in_use_tracks_instances() {
    let mut state = MaterializedState::default();
    state.apply_op(&StoreOp::DefinitionSaved {
        definition: definition("d-1", "ERROR", &[]),
    });
    assert!(!state.definition_in_use("d-1"));

    state.apply_op(&StoreOp::InstanceSaved {
        instance: instance("w-1", "d-1", "100", WatcherState::Active),
    });
    assert!(state.definition_in_use("d-1"));
}

#[test]
fn ops_serialize_with_type_tag() {
    let op = StoreOp::DefinitionDeleted {
        id: "d-1".to_string(),
    };
    let json = serde_json::to_string(&op).unwrap();
    assert_eq!(json, r#"{"type":"definition_deleted","id":"d-1"}"#);
    let back: StoreOp = serde_json::from_str(&json).unwrap();
    assert_eq!(back, op);
}
