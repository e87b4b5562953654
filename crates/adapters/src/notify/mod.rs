// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification adapters

mod log;

pub use log::LogNotifyAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeNotifyAdapter, NotifyCall};

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Errors from notify operations
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("missing recipient for {0} notification")]
    MissingTarget(NotifyChannel),
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Delivery channel for a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifyChannel {
    Email,
    Slack,
}

impl fmt::Display for NotifyChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyChannel::Email => write!(f, "email"),
            NotifyChannel::Slack => write!(f, "slack"),
        }
    }
}

/// Adapter for sending notifications.
///
/// `target` is an email address or a Slack channel / webhook name.
#[async_trait]
pub trait NotifyAdapter: Clone + Send + Sync + 'static {
    async fn send(
        &self,
        channel: NotifyChannel,
        target: &str,
        subject: &str,
        message: &str,
    ) -> Result<(), NotifyError>;
}
