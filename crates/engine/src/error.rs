// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine

use crate::pattern::PatternError;
use jw_adapters::{JobsError, RemoteError};
use jw_core::{DefinitionError, TransitionError, WatcherId, WatcherState};
use jw_storage::StoreError;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by [`crate::Engine`] operations
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("watcher not found: {0}")]
    WatcherNotFound(WatcherId),
    #[error("watcher definition not found: {0}")]
    DefinitionNotFound(String),
    #[error("invalid watcher definition: {0}")]
    InvalidDefinition(#[from] DefinitionError),
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] PatternError),
    #[error("watcher {id} cannot be triggered in state {state}")]
    NotTriggerable { id: WatcherId, state: WatcherState },
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("iteration failed: {0}")]
    Iteration(#[from] IterationError),
}

/// A failed monitor iteration. All variants are transient: they count
/// toward the consecutive-failure limit and the next iteration retries.
#[derive(Debug, Error)]
pub enum IterationError {
    #[error("remote: {0}")]
    Remote(#[from] RemoteError),
    #[error("job status: {0}")]
    Jobs(#[from] JobsError),
    #[error("no response within {0:?}")]
    Timeout(Duration),
    #[error("pattern: {0}")]
    Pattern(#[from] PatternError),
    #[error("store: {0}")]
    Store(#[from] StoreError),
}
