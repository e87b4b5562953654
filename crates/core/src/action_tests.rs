// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    snake     = { "cancel_job", ActionKind::CancelJob },
    upper     = { "NOTIFY_SLACK", ActionKind::NotifySlack },
    kebab     = { "run-command", ActionKind::RunCommand },
    padded    = { "  store_metric ", ActionKind::StoreMetric },
)]
fn parses_kind(raw: &str, expected: ActionKind) {
    assert_eq!(raw.parse::<ActionKind>().unwrap(), expected);
}

#[test]
fn rejects_unknown_kind() {
    let err = "exec".parse::<ActionKind>().unwrap_err();
    assert!(err.contains("exec"));
}

#[test]
fn display_round_trips_through_from_str() {
    for kind in ActionKind::ALL {
        assert_eq!(kind.to_string().parse::<ActionKind>().unwrap(), kind);
    }
}

#[test]
fn spec_serializes_kind_and_params() {
    let spec = ActionSpec::new(ActionKind::StoreMetric)
        .with_param("name", "loss")
        .with_param("value", "$loss");
    let json = serde_json::to_value(&spec).unwrap();
    assert_eq!(json["kind"], "store_metric");
    assert_eq!(json["params"]["value"], "$loss");
    assert_eq!(spec.param("name"), Some("loss"));
    assert_eq!(spec.param("missing"), None);
}

#[test]
fn spec_without_params_omits_field() {
    let json = serde_json::to_string(&ActionSpec::new(ActionKind::CancelJob)).unwrap();
    assert_eq!(json, r#"{"kind":"cancel_job"}"#);
    let back: ActionSpec = serde_json::from_str(&json).unwrap();
    assert!(back.params.is_empty());
}
