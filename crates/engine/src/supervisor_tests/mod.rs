// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine supervisor tests

mod create;
mod effects;
mod lifecycle;
mod maintenance;
mod trigger;

use super::*;
use crate::test_helpers::{run_for, settle, setup, TestContext, JOB};
use crate::IterationError;
use jw_core::test_support::{definition, TEST_HOST};
use jw_core::{ActionKind, ActionSpec};

fn loss_definition() -> WatcherDefinition {
    definition("loss", r"loss=([0-9.]+)", &["loss"])
}

fn job(id: &str) -> JobId {
    JobId::new(id)
}
