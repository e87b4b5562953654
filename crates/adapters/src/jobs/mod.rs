// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job status and job control adapters

mod slurm;

pub use slurm::SlurmAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeJobsAdapter, JobsCall};

use async_trait::async_trait;
use jw_core::{JobId, JobState};
use thiserror::Error;

/// Errors from job status and control operations
#[derive(Debug, Error)]
pub enum JobsError {
    #[error("invalid job id: {0}")]
    InvalidJobId(String),
    #[error("status query failed: {0}")]
    StatusFailed(String),
    #[error("cancel failed: {0}")]
    CancelFailed(String),
    #[error("script unavailable: {0}")]
    ScriptUnavailable(String),
    #[error("submit failed: {0}")]
    SubmitFailed(String),
}

/// Adapter for querying and controlling batch jobs.
#[async_trait]
pub trait JobsAdapter: Clone + Send + Sync + 'static {
    /// Current scheduler state of a job.
    ///
    /// An `Err` means the scheduler could not be asked at all; a job the
    /// scheduler has forgotten is `Ok(JobState::NotFound)`.
    async fn job_state(&self, job_id: &JobId, host: &str) -> Result<JobState, JobsError>;

    /// Cancel a job
    async fn cancel(&self, job_id: &JobId, host: &str) -> Result<(), JobsError>;

    /// Fetch the batch script a job was submitted with
    async fn fetch_script(&self, job_id: &JobId, host: &str) -> Result<String, JobsError>;

    /// Submit a batch script, returning the new job's id
    async fn submit(&self, script: &str, host: &str) -> Result<JobId, JobsError>;
}
