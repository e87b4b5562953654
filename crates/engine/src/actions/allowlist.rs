// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command allow-list for `run_command` actions.
//!
//! A command is a sequence of segments joined by `&&` or `;`. Every segment
//! must start with an allowed prefix at a word boundary. Pipes, redirection,
//! command substitution and background jobs are rejected outright, since
//! they would let a segment run something the prefix check never saw.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandRejected {
    #[error("command is empty")]
    Empty,
    #[error("command contains forbidden syntax '{0}'")]
    ForbiddenSyntax(&'static str),
    #[error("command segment not in allow-list: '{0}'")]
    NotAllowed(String),
}

const FORBIDDEN: &[&str] = &["|", "`", "$(", "<", ">", "\n", "\r"];

#[derive(Debug, Clone)]
pub struct CommandAllowList {
    prefixes: Vec<String>,
}

impl CommandAllowList {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes
                .into_iter()
                .map(Into::into)
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    pub fn check(&self, command: &str) -> Result<(), CommandRejected> {
        if let Some(bad) = FORBIDDEN.iter().find(|f| command.contains(**f)) {
            return Err(CommandRejected::ForbiddenSyntax(bad));
        }
        if has_lone_ampersand(command) {
            return Err(CommandRejected::ForbiddenSyntax("&"));
        }

        let mut segments = command
            .split("&&")
            .flat_map(|s| s.split(';'))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .peekable();
        if segments.peek().is_none() {
            return Err(CommandRejected::Empty);
        }
        for segment in segments {
            if !self.allows(segment) {
                return Err(CommandRejected::NotAllowed(segment.to_string()));
            }
        }
        Ok(())
    }

    fn allows(&self, segment: &str) -> bool {
        self.prefixes.iter().any(|prefix| {
            segment
                .strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
        })
    }
}

fn has_lone_ampersand(command: &str) -> bool {
    let mut chars = command.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '&' {
            if chars.peek() != Some(&'&') {
                return true;
            }
            chars.next();
        }
    }
    false
}

#[cfg(test)]
#[path = "allowlist_tests.rs"]
mod tests;
