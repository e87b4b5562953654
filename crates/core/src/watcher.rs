// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Immutable watcher configuration.
//!
//! A definition is produced by an external parser (script directives or an
//! API call) and replaced wholesale when edited. Instances reference it by id
//! and reload it on every iteration.

use crate::action::ActionSpec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

crate::define_id! {
    /// Identifier of a watcher definition.
    pub struct DefinitionId;
}

/// Default longest accepted pattern, in characters.
pub const DEFAULT_MAX_PATTERN_LEN: usize = 1000;

/// Which output stream of the job a watcher reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputChannel {
    #[default]
    Stdout,
    Stderr,
    Both,
}

impl fmt::Display for OutputChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputChannel::Stdout => write!(f, "stdout"),
            OutputChannel::Stderr => write!(f, "stderr"),
            OutputChannel::Both => write!(f, "both"),
        }
    }
}

/// One output stream of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl fmt::Display for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputStream::Stdout => write!(f, "stdout"),
            OutputStream::Stderr => write!(f, "stderr"),
        }
    }
}

/// Read position in each output stream of a job.
///
/// Streams are tracked separately so that output appended to one never
/// shifts the position of the other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputPosition {
    pub stdout: u64,
    pub stderr: u64,
}

impl OutputPosition {
    pub fn get(&self, stream: OutputStream) -> u64 {
        match stream {
            OutputStream::Stdout => self.stdout,
            OutputStream::Stderr => self.stderr,
        }
    }
}

/// Structural problems with a definition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("pattern is empty")]
    EmptyPattern,
    #[error("pattern is {len} characters, limit is {max}")]
    PatternTooLong { len: usize, max: usize },
    #[error("interval must be at least 1 second")]
    ZeroInterval,
    #[error("timer interval must be at least 1 second when timer mode is enabled")]
    ZeroTimerInterval,
    #[error("invalid capture name '{0}'")]
    InvalidCaptureName(String),
    #[error("max_triggers must be at least 1")]
    ZeroMaxTriggers,
}

fn default_interval_secs() -> u64 {
    60
}

fn default_timer_interval_secs() -> u64 {
    60
}

/// Watcher configuration: what to look for and what to do about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherDefinition {
    pub id: DefinitionId,
    #[serde(default)]
    pub name: String,
    pub pattern: String,
    /// Poll interval in pattern mode (before backoff)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Names bound positionally to the pattern's capture groups
    #[serde(default)]
    pub captures: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default)]
    pub actions: Vec<ActionSpec>,
    #[serde(default)]
    pub channel: OutputChannel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_triggers: Option<u32>,
    #[serde(default)]
    pub timer_mode: bool,
    #[serde(default = "default_timer_interval_secs")]
    pub timer_interval_secs: u64,
}

impl WatcherDefinition {
    pub fn new(id: impl Into<DefinitionId>, pattern: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            pattern: pattern.into(),
            interval_secs: default_interval_secs(),
            captures: Vec::new(),
            condition: None,
            actions: Vec::new(),
            channel: OutputChannel::default(),
            max_triggers: None,
            timer_mode: false,
            timer_interval_secs: default_timer_interval_secs(),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timer_interval(&self) -> Duration {
        Duration::from_secs(self.timer_interval_secs)
    }

    /// The condition expression, if one is set and not blank
    pub fn condition_expr(&self) -> Option<&str> {
        self.condition
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    /// Whether `count` triggers have used up the cap
    pub fn cap_reached(&self, count: u32) -> bool {
        self.max_triggers.is_some_and(|max| count >= max)
    }

    /// Structural validation. Regex compilation is checked separately by
    /// the engine's pattern matcher.
    pub fn validate(&self, max_pattern_len: usize) -> Result<(), DefinitionError> {
        if self.pattern.is_empty() {
            return Err(DefinitionError::EmptyPattern);
        }
        let len = self.pattern.chars().count();
        if len > max_pattern_len {
            return Err(DefinitionError::PatternTooLong {
                len,
                max: max_pattern_len,
            });
        }
        if self.interval_secs == 0 {
            return Err(DefinitionError::ZeroInterval);
        }
        if self.timer_mode && self.timer_interval_secs == 0 {
            return Err(DefinitionError::ZeroTimerInterval);
        }
        if self.max_triggers == Some(0) {
            return Err(DefinitionError::ZeroMaxTriggers);
        }
        if let Some(bad) = self.captures.iter().find(|c| !is_identifier(c)) {
            return Err(DefinitionError::InvalidCaptureName(bad.clone()));
        }
        Ok(())
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
