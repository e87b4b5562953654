// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn log_notify_accepts_any_target() {
    let adapter = LogNotifyAdapter::new();
    adapter
        .send(NotifyChannel::Slack, "#alerts", "job 42", "loss diverged")
        .await
        .unwrap();
}

#[tokio::test]
async fn log_notify_rejects_empty_target() {
    let adapter = LogNotifyAdapter::new();
    let err = adapter
        .send(NotifyChannel::Email, "  ", "job 42", "done")
        .await
        .unwrap_err();
    assert!(matches!(err, NotifyError::MissingTarget(NotifyChannel::Email)));
    assert_eq!(err.to_string(), "missing recipient for email notification");
}
