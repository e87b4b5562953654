// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake jobs adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{JobsAdapter, JobsError};
use async_trait::async_trait;
use jw_core::{JobId, JobState};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Recorded jobs call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobsCall {
    JobState { job_id: JobId, host: String },
    Cancel { job_id: JobId, host: String },
    FetchScript { job_id: JobId, host: String },
    Submit { script: String, host: String },
}

struct FakeJobsState {
    states: HashMap<JobId, JobState>,
    scripts: HashMap<JobId, String>,
    status_error: Option<String>,
    next_job: u64,
    calls: Vec<JobsCall>,
}

/// Fake jobs adapter for testing.
///
/// Jobs default to `NotFound` until registered with [`FakeJobsAdapter::set_state`].
/// Cancelling a job moves it to `Terminal`.
#[derive(Clone)]
pub struct FakeJobsAdapter {
    inner: Arc<Mutex<FakeJobsState>>,
}

impl Default for FakeJobsAdapter {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeJobsState {
                states: HashMap::new(),
                scripts: HashMap::new(),
                status_error: None,
                next_job: 9000,
                calls: Vec::new(),
            })),
        }
    }
}

impl FakeJobsAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_state(&self, job_id: &str, state: JobState) {
        self.inner.lock().states.insert(JobId::new(job_id), state);
    }

    pub fn set_script(&self, job_id: &str, script: &str) {
        self.inner
            .lock()
            .scripts
            .insert(JobId::new(job_id), script.to_string());
    }

    /// Make status queries fail until cleared with `None`
    pub fn fail_status(&self, message: Option<&str>) {
        self.inner.lock().status_error = message.map(str::to_string);
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<JobsCall> {
        self.inner.lock().calls.clone()
    }

    /// Scripts passed to `submit`, in order
    pub fn submitted(&self) -> Vec<String> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                JobsCall::Submit { script, .. } => Some(script.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn cancelled(&self) -> Vec<JobId> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                JobsCall::Cancel { job_id, .. } => Some(job_id.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl JobsAdapter for FakeJobsAdapter {
    async fn job_state(&self, job_id: &JobId, host: &str) -> Result<JobState, JobsError> {
        let mut state = self.inner.lock();
        state.calls.push(JobsCall::JobState {
            job_id: job_id.clone(),
            host: host.to_string(),
        });
        if let Some(message) = &state.status_error {
            return Err(JobsError::StatusFailed(message.clone()));
        }
        Ok(state
            .states
            .get(job_id)
            .copied()
            .unwrap_or(JobState::NotFound))
    }

    async fn cancel(&self, job_id: &JobId, host: &str) -> Result<(), JobsError> {
        let mut state = self.inner.lock();
        state.calls.push(JobsCall::Cancel {
            job_id: job_id.clone(),
            host: host.to_string(),
        });
        match state.states.get_mut(job_id) {
            Some(s) => {
                *s = JobState::Terminal;
                Ok(())
            }
            None => Err(JobsError::CancelFailed(format!("unknown job {job_id}"))),
        }
    }

    async fn fetch_script(&self, job_id: &JobId, host: &str) -> Result<String, JobsError> {
        let mut state = self.inner.lock();
        state.calls.push(JobsCall::FetchScript {
            job_id: job_id.clone(),
            host: host.to_string(),
        });
        state
            .scripts
            .get(job_id)
            .cloned()
            .ok_or_else(|| JobsError::ScriptUnavailable(job_id.to_string()))
    }

    async fn submit(&self, script: &str, host: &str) -> Result<JobId, JobsError> {
        let mut state = self.inner.lock();
        state.calls.push(JobsCall::Submit {
            script: script.to_string(),
            host: host.to_string(),
        });
        let id = JobId::new(state.next_job.to_string());
        state.next_job += 1;
        state.states.insert(id.clone(), JobState::Active);
        state.scripts.insert(id.clone(), script.to_string());
        Ok(id)
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
