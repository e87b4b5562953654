// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake remote adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{CommandOutput, OutputChunk, RemoteAdapter, RemoteError};
use async_trait::async_trait;
use jw_core::{JobId, OutputChannel, OutputPosition, OutputStream};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// Recorded remote call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    GetNewOutput {
        job_id: JobId,
        host: String,
        from: OutputPosition,
        channel: OutputChannel,
    },
    RunCommand {
        job_id: JobId,
        host: String,
        command: String,
        timeout: Duration,
    },
}

#[derive(Default, Clone)]
struct JobOutput {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl JobOutput {
    fn stream(&self, stream: OutputStream) -> &[u8] {
        match stream {
            OutputStream::Stdout => &self.stdout,
            OutputStream::Stderr => &self.stderr,
        }
    }

    /// Read one stream from `offset`, rereading from 0 if it shrank
    fn read(&self, stream: OutputStream, offset: u64) -> OutputChunk {
        let content = self.stream(stream);
        let len = content.len() as u64;
        let truncated = offset > len;
        let start = if truncated { 0 } else { offset as usize };
        OutputChunk {
            stream,
            data: content[start..].to_vec(),
            new_offset: len,
            truncated,
        }
    }
}

/// Streams read for a channel. The fake always keeps stdout and stderr in
/// separate files.
fn streams(channel: OutputChannel) -> &'static [OutputStream] {
    match channel {
        OutputChannel::Stdout => &[OutputStream::Stdout],
        OutputChannel::Stderr => &[OutputStream::Stderr],
        OutputChannel::Both => &[OutputStream::Stdout, OutputStream::Stderr],
    }
}

struct FakeRemoteState {
    outputs: HashMap<JobId, JobOutput>,
    /// Number of upcoming reads that fail
    failing_reads: u32,
    /// Reads for these jobs never complete
    hanging: HashSet<JobId>,
    /// Reads complete only after this much (tokio) time
    read_delay: Option<Duration>,
    command_result: Result<CommandOutput, String>,
    calls: Vec<RemoteCall>,
}

/// Fake remote adapter for testing
#[derive(Clone)]
pub struct FakeRemoteAdapter {
    inner: Arc<Mutex<FakeRemoteState>>,
}

impl Default for FakeRemoteAdapter {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeRemoteState {
                outputs: HashMap::new(),
                failing_reads: 0,
                hanging: HashSet::new(),
                read_delay: None,
                command_result: Ok(CommandOutput {
                    exit_code: 0,
                    stdout: String::new(),
                    stderr: String::new(),
                }),
                calls: Vec::new(),
            })),
        }
    }
}

impl FakeRemoteAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append text to a job's stdout
    pub fn append_stdout(&self, job_id: &str, text: &str) {
        let mut state = self.inner.lock();
        let out = state.outputs.entry(JobId::new(job_id)).or_default();
        out.stdout.extend_from_slice(text.as_bytes());
    }

    /// Append text to a job's stderr
    pub fn append_stderr(&self, job_id: &str, text: &str) {
        let mut state = self.inner.lock();
        let out = state.outputs.entry(JobId::new(job_id)).or_default();
        out.stderr.extend_from_slice(text.as_bytes());
    }

    /// Replace a job's stdout (simulates log rotation / truncation)
    pub fn replace_stdout(&self, job_id: &str, text: &str) {
        let mut state = self.inner.lock();
        let out = state.outputs.entry(JobId::new(job_id)).or_default();
        out.stdout = text.as_bytes().to_vec();
    }

    /// Make the next `n` reads fail with a connection error
    pub fn fail_next_reads(&self, n: u32) {
        self.inner.lock().failing_reads = n;
    }

    /// Make every read for `job_id` block forever
    pub fn hang_reads(&self, job_id: &str) {
        self.inner.lock().hanging.insert(JobId::new(job_id));
    }

    /// Make every read wait `delay` before returning the output it saw
    pub fn delay_reads(&self, delay: Duration) {
        self.inner.lock().read_delay = Some(delay);
    }

    pub fn set_command_result(&self, exit_code: i32, stdout: &str, stderr: &str) {
        self.inner.lock().command_result = Ok(CommandOutput {
            exit_code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        });
    }

    pub fn fail_commands(&self, message: &str) {
        self.inner.lock().command_result = Err(message.to_string());
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.inner.lock().calls.clone()
    }

    /// Number of output reads attempted
    pub fn read_count(&self) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, RemoteCall::GetNewOutput { .. }))
            .count()
    }

    /// Commands passed to `run_command`, in order
    pub fn commands(&self) -> Vec<String> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                RemoteCall::RunCommand { command, .. } => Some(command.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl RemoteAdapter for FakeRemoteAdapter {
    async fn get_new_output(
        &self,
        job_id: &JobId,
        host: &str,
        from: OutputPosition,
        channel: OutputChannel,
    ) -> Result<Vec<OutputChunk>, RemoteError> {
        let (result, hang, delay) = {
            let mut state = self.inner.lock();
            state.calls.push(RemoteCall::GetNewOutput {
                job_id: job_id.clone(),
                host: host.to_string(),
                from,
                channel,
            });
            let hang = state.hanging.contains(job_id);
            let result = if state.failing_reads > 0 {
                state.failing_reads -= 1;
                Err(RemoteError::Connection {
                    host: host.to_string(),
                    message: "injected failure".to_string(),
                })
            } else {
                let output = state.outputs.get(job_id).cloned().unwrap_or_default();
                Ok(streams(channel)
                    .iter()
                    .map(|stream| output.read(*stream, from.get(*stream)))
                    .collect())
            };
            (result, hang, state.read_delay)
        };
        if hang {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn run_command(
        &self,
        job_id: &JobId,
        host: &str,
        command: &str,
        timeout: Duration,
    ) -> Result<CommandOutput, RemoteError> {
        let mut state = self.inner.lock();
        state.calls.push(RemoteCall::RunCommand {
            job_id: job_id.clone(),
            host: host.to_string(),
            command: command.to_string(),
            timeout,
        });
        state
            .command_result
            .clone()
            .map_err(RemoteError::CommandFailed)
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
