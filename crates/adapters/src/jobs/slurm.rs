// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Slurm adapter: job output, status and control over ssh.

use super::{JobsAdapter, JobsError};
use crate::remote::{
    shell_quote, CommandOutput, OutputChunk, RemoteAdapter, RemoteError, SshTransport,
};
use crate::subprocess::{JOB_CONTROL_TIMEOUT, REMOTE_COMMAND_TIMEOUT, SCHEDULER_QUERY_TIMEOUT};
use async_trait::async_trait;
use jw_core::{JobId, JobState, OutputChannel, OutputPosition, OutputStream};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Output file locations reported by `scontrol show job`
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OutputPaths {
    pub stdout: String,
    pub stderr: String,
}

impl OutputPaths {
    /// Files to read for `channel`, each tagged with the stream whose
    /// position it advances
    fn for_channel(&self, channel: OutputChannel) -> Vec<(OutputStream, &str)> {
        let stdout = (OutputStream::Stdout, self.stdout.as_str());
        let stderr = (OutputStream::Stderr, self.stderr.as_str());
        match channel {
            OutputChannel::Stdout => vec![stdout],
            OutputChannel::Stderr => vec![stderr],
            // Merged streams share one file
            OutputChannel::Both if self.stdout == self.stderr => vec![stdout],
            OutputChannel::Both => vec![stdout, stderr],
        }
    }
}

/// Slurm cluster access through `ssh` and the Slurm CLI tools.
///
/// Implements both [`RemoteAdapter`] (output reads, commands) and
/// [`JobsAdapter`] (squeue/sacct, scancel, sbatch). Output paths are looked
/// up once per job and cached.
#[derive(Clone, Default)]
pub struct SlurmAdapter {
    ssh: SshTransport,
    paths: Arc<Mutex<HashMap<(String, JobId), OutputPaths>>>,
}

impl SlurmAdapter {
    pub fn new(ssh: SshTransport) -> Self {
        Self {
            ssh,
            paths: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn output_paths(&self, job_id: &JobId, host: &str) -> Result<OutputPaths, RemoteError> {
        let key = (host.to_string(), job_id.clone());
        if let Some(paths) = self.paths.lock().get(&key) {
            return Ok(paths.clone());
        }

        let script = format!("scontrol show job {}", job_id);
        let output = self.ssh.exec(host, &script, SCHEDULER_QUERY_TIMEOUT).await?;
        let text = String::from_utf8_lossy(&output.stdout);
        let paths =
            parse_output_paths(&text).ok_or_else(|| RemoteError::OutputUnavailable {
                job_id: job_id.to_string(),
                message: "scontrol did not report StdOut".to_string(),
            })?;

        tracing::debug!(
            job_id = %job_id,
            host,
            stdout = %paths.stdout,
            stderr = %paths.stderr,
            "resolved job output paths"
        );
        self.paths.lock().insert(key, paths.clone());
        Ok(paths)
    }
}

#[async_trait]
impl RemoteAdapter for SlurmAdapter {
    async fn get_new_output(
        &self,
        job_id: &JobId,
        host: &str,
        from: OutputPosition,
        channel: OutputChannel,
    ) -> Result<Vec<OutputChunk>, RemoteError> {
        check_job_id(job_id).map_err(|e| RemoteError::CommandFailed(e.to_string()))?;
        let paths = self.output_paths(job_id, host).await?;
        let mut chunks = Vec::with_capacity(2);
        for (stream, path) in paths.for_channel(channel) {
            let offset = from.get(stream);
            let output = self
                .ssh
                .exec(host, &read_script(path, offset), REMOTE_COMMAND_TIMEOUT)
                .await?;
            if !output.status.success() {
                return Err(RemoteError::CommandFailed(
                    String::from_utf8_lossy(&output.stderr).trim().to_string(),
                ));
            }
            let chunk = parse_read_output(&output.stdout, stream, offset).map_err(|message| {
                RemoteError::OutputUnavailable {
                    job_id: job_id.to_string(),
                    message,
                }
            })?;
            chunks.push(chunk);
        }
        Ok(chunks)
    }

    async fn run_command(
        &self,
        _job_id: &JobId,
        host: &str,
        command: &str,
        timeout: Duration,
    ) -> Result<CommandOutput, RemoteError> {
        let output = self.ssh.exec(host, command, timeout).await?;
        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[async_trait]
impl JobsAdapter for SlurmAdapter {
    async fn job_state(&self, job_id: &JobId, host: &str) -> Result<JobState, JobsError> {
        check_job_id(job_id)?;

        // squeue only knows pending/running jobs; it exits non-zero for
        // ids that already left the queue.
        let squeue = format!("squeue -h -j {} -o %T", job_id);
        let output = self
            .ssh
            .exec(host, &squeue, SCHEDULER_QUERY_TIMEOUT)
            .await
            .map_err(|e| JobsError::StatusFailed(e.to_string()))?;
        let queued = String::from_utf8_lossy(&output.stdout);
        if output.status.success() {
            if let Some(line) = queued.lines().find(|l| !l.trim().is_empty()) {
                return Ok(JobState::from_slurm(line));
            }
        }

        let sacct = format!("sacct -n -X -P -j {} -o State", job_id);
        let output = self
            .ssh
            .exec(host, &sacct, SCHEDULER_QUERY_TIMEOUT)
            .await
            .map_err(|e| JobsError::StatusFailed(e.to_string()))?;
        if !output.status.success() {
            return Err(JobsError::StatusFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        let accounted = String::from_utf8_lossy(&output.stdout);
        Ok(accounted
            .lines()
            .find(|l| !l.trim().is_empty())
            .map(JobState::from_slurm)
            .unwrap_or(JobState::NotFound))
    }

    async fn cancel(&self, job_id: &JobId, host: &str) -> Result<(), JobsError> {
        check_job_id(job_id)?;
        let output = self
            .ssh
            .exec(host, &format!("scancel {}", job_id), JOB_CONTROL_TIMEOUT)
            .await
            .map_err(|e| JobsError::CancelFailed(e.to_string()))?;
        if !output.status.success() {
            return Err(JobsError::CancelFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(())
    }

    async fn fetch_script(&self, job_id: &JobId, host: &str) -> Result<String, JobsError> {
        check_job_id(job_id)?;
        let script = format!("scontrol write batch_script {} -", job_id);
        let output = self
            .ssh
            .exec(host, &script, SCHEDULER_QUERY_TIMEOUT)
            .await
            .map_err(|e| JobsError::ScriptUnavailable(e.to_string()))?;
        if !output.status.success() || output.stdout.is_empty() {
            return Err(JobsError::ScriptUnavailable(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn submit(&self, script: &str, host: &str) -> Result<JobId, JobsError> {
        let output = self
            .ssh
            .exec_with_input(host, "sbatch --parsable", script.as_bytes(), JOB_CONTROL_TIMEOUT)
            .await
            .map_err(|e| JobsError::SubmitFailed(e.to_string()))?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            return Err(JobsError::SubmitFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        parse_submitted_job_id(&stdout)
            .ok_or_else(|| JobsError::SubmitFailed(format!("unexpected sbatch output: {stdout}")))
    }
}

/// Job ids are interpolated into remote shell commands, so only plain
/// scheduler ids (`1234`, `1234_5`, `1234.batch`) are accepted.
pub(crate) fn check_job_id(job_id: &JobId) -> Result<(), JobsError> {
    let ok = !job_id.as_str().is_empty()
        && job_id
            .as_str()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '+' | '-'));
    if ok {
        Ok(())
    } else {
        Err(JobsError::InvalidJobId(job_id.to_string()))
    }
}

/// Extract `StdOut=` / `StdErr=` from `scontrol show job` output.
/// A missing `StdErr` means stderr is merged into stdout.
pub(crate) fn parse_output_paths(text: &str) -> Option<OutputPaths> {
    let field = |name: &str| {
        text.split_whitespace()
            .find_map(|tok| tok.strip_prefix(name))
            .filter(|v| !v.is_empty() && *v != "(null)")
            .map(str::to_string)
    };
    let stdout = field("StdOut=")?;
    let stderr = field("StdErr=").unwrap_or_else(|| stdout.clone());
    Some(OutputPaths { stdout, stderr })
}

/// Build a remote script that prints the size of `path` on the first line,
/// followed by the bytes from `offset` (or from 0 when the file shrank below
/// `offset`) up to that size.
pub(crate) fn read_script(path: &str, offset: u64) -> String {
    let file = shell_quote(path);
    format!(
        "total=$(stat -c %s -- {file} 2>/dev/null || echo 0); echo \"$total\"; start={offset}; \
         if [ \"$start\" -gt \"$total\" ]; then start=0; fi; \
         head -c \"$total\" -- {file} 2>/dev/null | tail -c +$((start + 1))"
    )
}

/// Parse the output of [`read_script`].
pub(crate) fn parse_read_output(
    raw: &[u8],
    stream: OutputStream,
    offset: u64,
) -> Result<OutputChunk, String> {
    let newline = raw
        .iter()
        .position(|b| *b == b'\n')
        .ok_or_else(|| "missing size header".to_string())?;
    let header = String::from_utf8_lossy(&raw[..newline]);
    let total: u64 = header
        .trim()
        .parse()
        .map_err(|_| format!("invalid size header: {header}"))?;
    let data = raw[newline + 1..].to_vec();

    let truncated = offset > total;
    let start = if truncated { 0 } else { offset };
    Ok(OutputChunk {
        stream,
        new_offset: start + data.len() as u64,
        data,
        truncated,
    })
}

/// `sbatch --parsable` prints `jobid` or `jobid;cluster`.
pub(crate) fn parse_submitted_job_id(stdout: &str) -> Option<JobId> {
    let line = stdout.lines().map(str::trim).find(|l| !l.is_empty())?;
    let id = line.split(';').next()?.trim();
    let job_id = JobId::new(id);
    check_job_id(&job_id).ok().map(|_| job_id)
}

#[cfg(test)]
#[path = "slurm_tests.rs"]
mod tests;
