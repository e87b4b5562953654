// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! jobwatch watcher engine: pattern matching, conditions, actions and the
//! per-instance monitor tasks supervised by [`Engine`].

pub mod actions;
mod backoff;
pub mod condition;
mod config;
mod error;
mod monitor;
pub mod pattern;
pub mod substitute;
mod supervisor;

#[cfg(test)]
mod test_helpers;

pub use actions::{ActionContext, ActionEffect, ActionExecutor, ActionOutcome};
pub use backoff::Backoff;
pub use config::EngineConfig;
pub use error::{EngineError, IterationError};
pub use pattern::{PatternError, PatternMatch, PatternMatcher};
pub use substitute::{substitute, SubstitutionContext};
pub use supervisor::{Engine, EngineDeps, HealthReport, ManualTriggerResult};
