// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    plain      = { "/home/u/job.out", "'/home/u/job.out'" },
    spaces     = { "my file", "'my file'" },
    quote      = { "it's", r"'it'\''s'" },
    dollar     = { "$HOME", "'$HOME'" },
    empty      = { "", "''" },
)]
fn quotes_for_sh(raw: &str, expected: &str) {
    assert_eq!(shell_quote(raw), expected);
}

#[test]
fn classify_maps_timeouts() {
    assert!(matches!(
        classify("h", "ssh timed out after 5s".to_string()),
        RemoteError::Timeout(_)
    ));
    assert!(matches!(
        classify("h", "ssh failed: No such file".to_string()),
        RemoteError::Connection { .. }
    ));
}

#[tokio::test]
async fn missing_ssh_binary_is_a_connection_error() {
    let transport = SshTransport {
        ssh_bin: "/nonexistent/ssh".to_string(),
        connect_timeout: Duration::from_secs(1),
    };
    let err = transport
        .exec("host", "true", Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Connection { .. }), "got {err:?}");
}
