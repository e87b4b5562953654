// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! jw-core: data model for the jobwatch watcher engine

pub mod action;
pub mod clock;
pub mod event;
pub mod id;
pub mod instance;
pub mod job;
pub mod watcher;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use action::{ActionKind, ActionSpec};
pub use clock::{Clock, SystemClock};
pub use event::{StoredMetric, Variables, WatcherEvent, WatcherVariables, MATCHED_TEXT_VAR};
pub use id::{IdGen, UuidIdGen};
pub use instance::{TransitionError, WatcherId, WatcherInstance, WatcherState};
pub use job::{JobId, JobState};
pub use watcher::{
    DefinitionError, DefinitionId, OutputChannel, OutputPosition, OutputStream, WatcherDefinition,
};

#[cfg(any(test, feature = "test-support"))]
pub use clock::FakeClock;
