// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn event(matched_text: Option<&str>) -> WatcherEvent {
    WatcherEvent {
        instance_id: WatcherId::new("w-1"),
        timestamp_ms: 1_700_000_000_000,
        matched_text: matched_text.map(str::to_string),
        variables: [("loss".to_string(), "0.3".to_string())].into_iter().collect(),
        action: ActionKind::LogEvent,
        result: "logged".to_string(),
        success: true,
    }
}

#[test]
fn event_with_match_keeps_matched_text() {
    let json = serde_json::to_value(event(Some("loss=0.3"))).unwrap();
    assert_eq!(json["matched_text"], "loss=0.3");
    assert_eq!(json["variables"]["loss"], "0.3");
}

#[test]
fn event_without_match_omits_matched_text() {
    let json = serde_json::to_value(event(None)).unwrap();
    assert!(json.get("matched_text").is_none());
    assert_eq!(json["action"], "log_event");
}

#[test]
fn event_reads_records_without_variables() {
    let json = r#"{
        "instance_id": "w-1",
        "timestamp_ms": 5,
        "action": "cancel_job",
        "result": "cancelled job 100",
        "success": true
    }"#;
    let parsed: WatcherEvent = serde_json::from_str(json).unwrap();
    assert!(parsed.variables.is_empty());
    assert_eq!(parsed.matched_text, None);
    assert_eq!(parsed.action, ActionKind::CancelJob);
}

#[test]
fn variables_keep_sorted_order() {
    let vars = WatcherVariables {
        instance_id: WatcherId::new("w-1"),
        values: [("z", "1"), (MATCHED_TEXT_VAR, "z=1 a=2"), ("a", "2")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        groups: Vec::new(),
        updated_at_ms: 0,
    };
    let keys: Vec<&str> = vars.values.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["_matched_text", "a", "z"]);
}

#[test]
fn variables_without_groups_deserialize() {
    let json = r#"{"instance_id":"w-1","values":{"loss":"0.3"},"updated_at_ms":5}"#;
    let vars: WatcherVariables = serde_json::from_str(json).unwrap();
    assert!(vars.groups.is_empty());
    assert_eq!(vars.values.get("loss").map(String::as_str), Some("0.3"));
}
