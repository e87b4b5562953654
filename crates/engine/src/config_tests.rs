// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn defaults_match_documented_limits() {
    let config = EngineConfig::default();
    assert_eq!(config.max_consecutive_failures, 5);
    assert_eq!(config.rate_limit_max_actions, 10);
    assert_eq!(config.rate_limit_window(), Duration::from_secs(60));
    assert_eq!(config.remote_timeout(), Duration::from_secs(120));
    assert_eq!(config.max_pattern_len, 1000);
    assert!(config.allowed_commands.iter().any(|c| c == "squeue"));
}

#[test]
fn empty_table_uses_defaults() {
    let config: EngineConfig = toml::from_str("").unwrap();
    assert_eq!(config, EngineConfig::default());
}

#[test]
fn partial_table_overrides_only_given_fields() {
    let config: EngineConfig = toml::from_str(
        r#"
        max_consecutive_failures = 3
        allowed_commands = ["echo"]
        "#,
    )
    .unwrap();
    assert_eq!(config.max_consecutive_failures, 3);
    assert_eq!(config.allowed_commands, vec!["echo".to_string()]);
    assert_eq!(config.backoff_factor, 1.1);
}
