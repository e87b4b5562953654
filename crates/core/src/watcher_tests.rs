// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn definition() -> WatcherDefinition {
    let mut def = WatcherDefinition::new("def-1", r"loss=(\d+\.\d+)");
    def.captures = vec!["loss".to_string()];
    def
}

#[test]
fn valid_definition_passes() {
    assert_eq!(definition().validate(DEFAULT_MAX_PATTERN_LEN), Ok(()));
}

#[test]
fn empty_pattern_rejected() {
    let mut def = definition();
    def.pattern.clear();
    assert_eq!(def.validate(1000), Err(DefinitionError::EmptyPattern));
}

#[test]
fn long_pattern_rejected() {
    let mut def = definition();
    def.pattern = "a".repeat(1001);
    assert_eq!(
        def.validate(1000),
        Err(DefinitionError::PatternTooLong {
            len: 1001,
            max: 1000
        })
    );
}

#[test]
fn zero_intervals_rejected() {
    let mut def = definition();
    def.interval_secs = 0;
    assert_eq!(def.validate(1000), Err(DefinitionError::ZeroInterval));

    let mut def = definition();
    def.timer_interval_secs = 0;
    // Only matters when timer mode is on
    assert_eq!(def.validate(1000), Ok(()));
    def.timer_mode = true;
    assert_eq!(def.validate(1000), Err(DefinitionError::ZeroTimerInterval));
}

#[yare::parameterized(
    leading_digit = { "1abc" },
    dash          = { "my-var" },
    empty         = { "" },
    space         = { "a b" },
)]
fn bad_capture_names_rejected(name: &str) {
    let mut def = definition();
    def.captures.push(name.to_string());
    assert_eq!(
        def.validate(1000),
        Err(DefinitionError::InvalidCaptureName(name.to_string()))
    );
}

#[test]
fn cap_reached_respects_max_triggers() {
    let mut def = definition();
    assert!(!def.cap_reached(1_000));
    def.max_triggers = Some(3);
    assert!(!def.cap_reached(2));
    assert!(def.cap_reached(3));
}

#[test]
fn blank_condition_is_treated_as_missing() {
    let mut def = definition();
    def.condition = Some("   ".to_string());
    assert_eq!(def.condition_expr(), None);
    def.condition = Some(" float(loss) < 0.5 ".to_string());
    assert_eq!(def.condition_expr(), Some("float(loss) < 0.5"));
}

#[test]
fn minimal_json_fills_defaults() {
    let def: WatcherDefinition =
        serde_json::from_str(r#"{"id":"d","pattern":"ERROR"}"#).unwrap();
    assert_eq!(def.interval_secs, 60);
    assert_eq!(def.channel, OutputChannel::Stdout);
    assert!(!def.timer_mode);
    assert!(def.actions.is_empty());
}
