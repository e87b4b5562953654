// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::jobs::{FakeJobsAdapter, JobsCall};
use crate::remote::{FakeRemoteAdapter, RemoteCall};
use jw_core::OutputPosition;
use serial_test::{parallel, serial};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// A writer that captures log output for testing
#[derive(Clone, Default)]
struct CapturedLogs {
    logs: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    fn contents(&self) -> String {
        let logs = self.logs.lock().unwrap();
        String::from_utf8_lossy(&logs).to_string()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.logs.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run a test with captured tracing output
fn with_tracing<F, Fut>(f: F) -> (String, Fut::Output)
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future,
{
    let logs = CapturedLogs::default();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(logs.clone())
        .with_ansi(false)
        .without_time()
        .finish();

    let result = tracing::subscriber::with_default(subscriber, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f())
    });

    (logs.contents(), result)
}

fn assert_log(logs: &str, label: &str, expected: &str) {
    assert!(logs.contains(expected), "Should log {label}. Logs:\n{logs}",);
}

fn job() -> JobId {
    JobId::new("4242")
}

// =============================================================================
// Tracing output verification tests
// =============================================================================

#[test]
#[serial(tracing)]
fn traced_remote_read_logs_bytes_and_timing() {
    let (logs, result) = with_tracing(|| async {
        let fake = FakeRemoteAdapter::new();
        fake.append_stdout("4242", "epoch 1\n");
        TracedRemote::new(fake)
            .get_new_output(&job(), "cluster-a", OutputPosition::default(), OutputChannel::Stdout)
            .await
    });

    assert_eq!(result.unwrap()[0].new_offset, 8);
    assert_log(&logs, "span name", "remote.read");
    assert_log(&logs, "completion", "read output");
    assert_log(&logs, "byte count", "bytes=8");
    assert_log(&logs, "timing", "elapsed_ms");
}

#[test]
#[serial(tracing)]
fn traced_remote_read_logs_failure() {
    let (logs, result) = with_tracing(|| async {
        let fake = FakeRemoteAdapter::new();
        fake.fail_next_reads(1);
        TracedRemote::new(fake)
            .get_new_output(&job(), "cluster-a", OutputPosition::default(), OutputChannel::Stdout)
            .await
    });

    assert!(result.is_err());
    assert_log(&logs, "failure", "read failed");
    assert_log(&logs, "error", "injected failure");
}

#[test]
#[serial(tracing)]
fn traced_remote_run_logs_exit_code() {
    let (logs, _) = with_tracing(|| async {
        let fake = FakeRemoteAdapter::new();
        fake.set_command_result(3, "", "boom");
        TracedRemote::new(fake)
            .run_command(&job(), "cluster-a", "ls /scratch", Duration::from_secs(5))
            .await
    });

    assert_log(&logs, "span name", "remote.run");
    assert_log(&logs, "command", "ls /scratch");
    assert_log(&logs, "exit code", "exit_code=3");
}

#[test]
#[serial(tracing)]
fn traced_jobs_submit_logs_new_job() {
    let (logs, result) = with_tracing(|| async {
        TracedJobs::new(FakeJobsAdapter::new())
            .submit("#!/bin/bash\nsrun train\n", "cluster-a")
            .await
    });

    let id = result.unwrap();
    assert_log(&logs, "span name", "jobs.submit");
    assert_log(&logs, "completion", "job submitted");
    assert_log(&logs, "job id", id.as_str());
}

#[test]
#[serial(tracing)]
fn traced_jobs_cancel_logs_failure() {
    let (logs, result) = with_tracing(|| async {
        TracedJobs::new(FakeJobsAdapter::new())
            .cancel(&job(), "cluster-a")
            .await
    });

    assert!(result.is_err());
    assert_log(&logs, "span name", "jobs.cancel");
    assert_log(&logs, "failure", "cancel failed");
}

// =============================================================================
// Delegation tests - verify traced wrapper delegates to inner adapter
// =============================================================================

#[tokio::test]
#[parallel(tracing)]
async fn traced_remote_delegates_to_inner() {
    let fake = FakeRemoteAdapter::new();
    let traced = TracedRemote::new(fake.clone());

    let from = OutputPosition {
        stdout: 0,
        stderr: 12,
    };
    traced
        .get_new_output(&job(), "cluster-a", from, OutputChannel::Stderr)
        .await
        .unwrap();

    assert_eq!(
        fake.calls(),
        vec![RemoteCall::GetNewOutput {
            job_id: job(),
            host: "cluster-a".to_string(),
            from,
            channel: OutputChannel::Stderr,
        }]
    );
}

#[tokio::test]
#[parallel(tracing)]
async fn traced_jobs_delegates_to_inner() {
    let fake = FakeJobsAdapter::new();
    fake.set_state("4242", JobState::Active);
    let traced = TracedJobs::new(fake.clone());

    assert_eq!(
        traced.job_state(&job(), "cluster-a").await.unwrap(),
        JobState::Active
    );
    traced.cancel(&job(), "cluster-a").await.unwrap();

    assert_eq!(fake.cancelled(), vec![job()]);
    assert!(matches!(fake.calls()[0], JobsCall::JobState { .. }));
}
