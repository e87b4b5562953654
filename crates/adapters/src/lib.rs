// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for the engine's external collaborators: remote output access,
//! job control and notification delivery.

mod env;
pub mod jobs;
pub mod notify;
pub mod remote;
pub mod subprocess;
pub mod traced;

pub use jobs::{JobsAdapter, JobsError, SlurmAdapter};
pub use notify::{LogNotifyAdapter, NotifyAdapter, NotifyChannel, NotifyError};
pub use remote::{CommandOutput, OutputChunk, RemoteAdapter, RemoteError, SshTransport};
pub use traced::{TracedJobs, TracedRemote};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use jobs::{FakeJobsAdapter, JobsCall};
#[cfg(any(test, feature = "test-support"))]
pub use notify::{FakeNotifyAdapter, NotifyCall};
#[cfg(any(test, feature = "test-support"))]
pub use remote::{FakeRemoteAdapter, RemoteCall};
