// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the adapters crate.

use std::time::Duration;

/// ssh binary used for remote access (default: `ssh` from PATH).
pub fn ssh_bin() -> String {
    std::env::var("JW_SSH_BIN")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "ssh".to_string())
}

/// ssh `ConnectTimeout` (default: 10s).
pub fn ssh_connect_timeout() -> Duration {
    std::env::var("JW_SSH_CONNECT_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(10))
}
