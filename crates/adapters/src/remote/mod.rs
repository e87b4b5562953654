// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote output access and command execution

mod ssh;

pub use ssh::{shell_quote, SshTransport};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeRemoteAdapter, RemoteCall};

use async_trait::async_trait;
use jw_core::{JobId, OutputChannel, OutputPosition, OutputStream};
use std::time::Duration;
use thiserror::Error;

/// Errors from remote operations. All of them are transient from the
/// engine's point of view: the next iteration simply tries again.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("connection to {host} failed: {message}")]
    Connection { host: String, message: String },
    #[error("remote command failed: {0}")]
    CommandFailed(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("output unavailable for job {job_id}: {message}")]
    OutputUnavailable { job_id: String, message: String },
}

/// New output of one stream, returned by [`RemoteAdapter::get_new_output`].
///
/// When `truncated` is false, `data` starts at the requested offset of
/// `stream` and `new_offset == offset + data.len()`. When the output shrank
/// below the requested offset (log rotated or rewritten) `truncated` is true
/// and `data` starts at byte 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    pub stream: OutputStream,
    pub data: Vec<u8>,
    pub new_offset: u64,
    pub truncated: bool,
}

impl OutputChunk {
    /// Offset the chunk's data starts at
    pub fn start_offset(&self) -> u64 {
        self.new_offset.saturating_sub(self.data.len() as u64)
    }
}

/// Result of a remote command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Adapter for reading job output and running commands on a cluster host.
///
/// Connections may be shared and multiplexed between many watchers; callers
/// must not assume exclusive access.
#[async_trait]
pub trait RemoteAdapter: Clone + Send + Sync + 'static {
    /// Read output appended since `from` on the given channel.
    ///
    /// Returns one chunk per distinct output file, stdout first. Each chunk
    /// is read from the position of its own stream. When stderr is merged
    /// into stdout, [`OutputChannel::Both`] yields a single stdout chunk.
    async fn get_new_output(
        &self,
        job_id: &JobId,
        host: &str,
        from: OutputPosition,
        channel: OutputChannel,
    ) -> Result<Vec<OutputChunk>, RemoteError>;

    /// Run a shell command on the host in the context of a job
    async fn run_command(
        &self,
        job_id: &JobId,
        host: &str,
        command: &str,
        timeout: Duration,
    ) -> Result<CommandOutput, RemoteError>;
}
