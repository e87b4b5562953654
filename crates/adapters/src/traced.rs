// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::jobs::{JobsAdapter, JobsError};
use crate::remote::{CommandOutput, OutputChunk, RemoteAdapter, RemoteError};
use async_trait::async_trait;
use jw_core::{JobId, JobState, OutputChannel, OutputPosition};
use std::time::Duration;
use tracing::Instrument;

/// Wrapper that adds tracing to any RemoteAdapter
#[derive(Clone)]
pub struct TracedRemote<R> {
    inner: R,
}

impl<R> TracedRemote<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<R: RemoteAdapter> RemoteAdapter for TracedRemote<R> {
    async fn get_new_output(
        &self,
        job_id: &JobId,
        host: &str,
        from: OutputPosition,
        channel: OutputChannel,
    ) -> Result<Vec<OutputChunk>, RemoteError> {
        async {
            let start = std::time::Instant::now();
            let result = self.inner.get_new_output(job_id, host, from, channel).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(chunks) => tracing::debug!(
                    bytes = chunks.iter().map(|c| c.data.len()).sum::<usize>(),
                    streams = chunks.len(),
                    truncated = chunks.iter().any(|c| c.truncated),
                    elapsed_ms,
                    "read output"
                ),
                Err(e) => tracing::warn!(elapsed_ms, error = %e, "read failed"),
            }
            result
        }
        .instrument(tracing::debug_span!(
            "remote.read",
            %job_id,
            host,
            %channel,
            stdout_offset = from.stdout,
            stderr_offset = from.stderr
        ))
        .await
    }

    async fn run_command(
        &self,
        job_id: &JobId,
        host: &str,
        command: &str,
        timeout: Duration,
    ) -> Result<CommandOutput, RemoteError> {
        async {
            tracing::info!(command, timeout_secs = timeout.as_secs(), "starting");
            let start = std::time::Instant::now();
            let result = self.inner.run_command(job_id, host, command, timeout).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(out) => tracing::info!(exit_code = out.exit_code, elapsed_ms, "command finished"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "command failed"),
            }
            result
        }
        .instrument(tracing::info_span!("remote.run", %job_id, host))
        .await
    }
}

/// Wrapper that adds tracing to any JobsAdapter
#[derive(Clone)]
pub struct TracedJobs<J> {
    inner: J,
}

impl<J> TracedJobs<J> {
    pub fn new(inner: J) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<J: JobsAdapter> JobsAdapter for TracedJobs<J> {
    async fn job_state(&self, job_id: &JobId, host: &str) -> Result<JobState, JobsError> {
        let result = self.inner.job_state(job_id, host).await;
        match &result {
            Ok(state) => tracing::trace!(%job_id, host, %state, "checked"),
            Err(e) => tracing::warn!(%job_id, host, error = %e, "status check failed"),
        }
        result
    }

    async fn cancel(&self, job_id: &JobId, host: &str) -> Result<(), JobsError> {
        let result = self.inner.cancel(job_id, host).await;
        tracing::info_span!("jobs.cancel", %job_id, host).in_scope(|| match &result {
            Ok(()) => tracing::info!("cancelled"),
            Err(e) => tracing::error!(error = %e, "cancel failed"),
        });
        result
    }

    async fn fetch_script(&self, job_id: &JobId, host: &str) -> Result<String, JobsError> {
        let result = self.inner.fetch_script(job_id, host).await;
        tracing::info_span!("jobs.script", %job_id, host).in_scope(|| {
            tracing::debug!(script_len = result.as_ref().map(|s| s.len()).ok(), "fetched")
        });
        result
    }

    async fn submit(&self, script: &str, host: &str) -> Result<JobId, JobsError> {
        async {
            tracing::info!(script_len = script.len(), "starting");
            let start = std::time::Instant::now();
            let result = self.inner.submit(script, host).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(id) => tracing::info!(job_id = %id, elapsed_ms, "job submitted"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "submit failed"),
            }
            result
        }
        .instrument(tracing::info_span!("jobs.submit", host))
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
