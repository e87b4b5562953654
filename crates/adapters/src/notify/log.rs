// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification adapter that records notifications in the daemon log.

use super::{NotifyAdapter, NotifyChannel, NotifyError};
use async_trait::async_trait;

/// Writes each notification as a structured log line.
///
/// Used when no mail relay or Slack webhook is configured; the log remains
/// the record of what would have been sent.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifyAdapter;

impl LogNotifyAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotifyAdapter for LogNotifyAdapter {
    async fn send(
        &self,
        channel: NotifyChannel,
        target: &str,
        subject: &str,
        message: &str,
    ) -> Result<(), NotifyError> {
        if target.trim().is_empty() {
            return Err(NotifyError::MissingTarget(channel));
        }
        tracing::info!(%channel, target, subject, message, "notification");
        Ok(())
    }
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
