// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use jw_core::test_support::{definition, instance};
use jw_core::{ActionKind, Variables, WatcherState};
use tempfile::tempdir;

fn event(id: &str, n: u64) -> WatcherEvent {
    WatcherEvent {
        instance_id: WatcherId::new(id),
        timestamp_ms: n,
        matched_text: None,
        variables: Variables::new(),
        action: ActionKind::LogEvent,
        result: format!("event {n}"),
        success: true,
    }
}

#[test]
fn reads_observe_prior_writes() {
    let store = Store::in_memory();
    store
        .put_instance(instance("w-1", "d-1", "100", WatcherState::Active))
        .unwrap();

    let id = WatcherId::new("w-1");
    store
        .update_instance(&id, |i| i.last_position = 512)
        .unwrap();

    assert_eq!(store.get_instance(&id).unwrap().last_position, 512);
}

#[test]
fn update_missing_instance_returns_none() {
    let store = Store::in_memory();
    let result = store
        .update_instance(&WatcherId::new("nope"), |i| i.trigger_count += 1)
        .unwrap();
    assert!(result.is_none());
}

#[test]
fn events_returns_most_recent_oldest_first() {
    let store = Store::in_memory();
    for n in 1..=5 {
        store.append_event(event("w-1", n)).unwrap();
    }

    let recent: Vec<u64> = store
        .events(&WatcherId::new("w-1"), 2)
        .iter()
        .map(|e| e.timestamp_ms)
        .collect();
    assert_eq!(recent, vec![4, 5]);
    assert!(store.events(&WatcherId::new("w-2"), 10).is_empty());
}

#[test]
fn list_instances_for_job_filters_by_job_and_host() {
    let store = Store::in_memory();
    store
        .put_instance(instance("w-1", "d-1", "100", WatcherState::Active))
        .unwrap();
    store
        .put_instance(instance("w-2", "d-1", "200", WatcherState::Active))
        .unwrap();

    let found = store.list_instances_for_job(&JobId::new("100"), "cluster-a");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, "w-1");
    assert!(store
        .list_instances_for_job(&JobId::new("100"), "cluster-b")
        .is_empty());
}

#[test]
fn definition_is_kept_while_referenced() {
    let store = Store::in_memory();
    store.put_definition(definition("d-1", "ERROR", &[])).unwrap();
    store
        .put_instance(instance("w-1", "d-1", "100", WatcherState::Active))
        .unwrap();

    assert!(!store.delete_definition_if_unused("d-1").unwrap());
    store.delete_instance(&WatcherId::new("w-1")).unwrap();
    assert!(store.delete_definition_if_unused("d-1").unwrap());
    assert!(store.get_definition("d-1").is_none());
}

#[test]
fn durable_store_recovers_after_reopen() {
    let dir = tempdir().unwrap();
    {
        let store = Store::open(dir.path()).unwrap();
        store.put_definition(definition("d-1", "ERROR", &[])).unwrap();
        store
            .put_instance(instance("w-1", "d-1", "100", WatcherState::Active))
            .unwrap();
        store
            .update_instance(&WatcherId::new("w-1"), |i| i.last_position = 99)
            .unwrap();
        store.append_event(event("w-1", 1)).unwrap();
    }

    let store = Store::open(dir.path()).unwrap();
    assert_eq!(
        store
            .get_instance(&WatcherId::new("w-1"))
            .unwrap()
            .last_position,
        99
    );
    assert!(store.get_definition("d-1").is_some());
    assert_eq!(store.events(&WatcherId::new("w-1"), 10).len(), 1);
}

#[test]
fn checkpoint_then_more_writes_recover() {
    let dir = tempdir().unwrap();
    {
        let store = Store::open(dir.path()).unwrap();
        store
            .put_instance(instance("w-1", "d-1", "100", WatcherState::Active))
            .unwrap();
        store.checkpoint().unwrap();
        store
            .update_instance(&WatcherId::new("w-1"), |i| i.trigger_count = 3)
            .unwrap();
    }

    assert!(dir.path().join("snapshot.json").exists());
    let store = Store::open(dir.path()).unwrap();
    let inst = store.get_instance(&WatcherId::new("w-1")).unwrap();
    assert_eq!(inst.trigger_count, 3);
}

#[test]
fn checkpoint_on_memory_store_is_noop() {
    Store::in_memory().checkpoint().unwrap();
}

#[test]
fn variables_and_events_are_group_committed() {
    let dir = tempdir().unwrap();
    let store = Store::open(dir.path()).unwrap();
    store
        .put_instance(instance("w-1", "d-1", "100", WatcherState::Active))
        .unwrap();
    assert_eq!(store.pending_writes(), 0);

    store
        .put_variables(WatcherVariables {
            instance_id: WatcherId::new("w-1"),
            values: Variables::new(),
            groups: Vec::new(),
            updated_at_ms: 1,
        })
        .unwrap();
    store.append_event(event("w-1", 1)).unwrap();
    assert_eq!(store.pending_writes(), 2);

    store
        .update_instance(&WatcherId::new("w-1"), |i| i.last_position = 10)
        .unwrap();
    assert_eq!(store.pending_writes(), 0);
}

#[test]
fn flush_makes_buffered_writes_durable() {
    let dir = tempdir().unwrap();
    let store = Store::open(dir.path()).unwrap();
    store.append_event(event("w-1", 1)).unwrap();

    store.flush().unwrap();

    assert_eq!(store.pending_writes(), 0);
    let wal = Wal::open(&dir.path().join(WAL_FILE)).unwrap();
    assert_eq!(wal.entries_after(0).unwrap().len(), 1);
}
