// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `#SBATCH` directive overrides applied to a batch script before resubmission.

use std::collections::BTreeMap;
use thiserror::Error;

const DIRECTIVE: &str = "#SBATCH";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("invalid directive name '{0}'")]
    InvalidKey(String),
    #[error("directive '{0}' value spans multiple lines")]
    MultilineValue(String),
}

/// Option name a directive line sets, e.g. `time` for `#SBATCH --time=1:00:00`
fn directive_key(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix(DIRECTIVE)?;
    let option = rest.split_whitespace().next()?.strip_prefix("--")?;
    Some(option.split('=').next().unwrap_or(option))
}

fn is_directive(line: &str) -> bool {
    line.trim_start().starts_with(DIRECTIVE)
}

/// Normalize a parameter name into a long option name: `cpus_per_task`
/// becomes `cpus-per-task`, a leading `--` is dropped.
fn option_name(key: &str) -> Result<String, ScriptError> {
    let name = key.trim().trim_start_matches("--").replace('_', "-");
    let valid = !name.is_empty()
        && name.starts_with(|c: char| c.is_ascii_alphanumeric())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    if valid {
        Ok(name)
    } else {
        Err(ScriptError::InvalidKey(key.to_string()))
    }
}

/// Apply `overrides` as `#SBATCH --key=value` directives.
///
/// An existing directive for the same option is replaced in place. New
/// directives go after the last existing directive, else after the shebang,
/// else at the top. An empty value yields a bare flag (`#SBATCH --requeue`).
pub fn apply_directives(
    script: &str,
    overrides: &BTreeMap<String, String>,
) -> Result<String, ScriptError> {
    let mut lines: Vec<String> = script.lines().map(str::to_string).collect();

    for (key, value) in overrides {
        if value.contains(['\n', '\r']) {
            return Err(ScriptError::MultilineValue(key.clone()));
        }
        let name = option_name(key)?;
        let value = value.trim();
        let directive = if value.is_empty() {
            format!("{DIRECTIVE} --{name}")
        } else {
            format!("{DIRECTIVE} --{name}={value}")
        };

        if let Some(existing) = lines
            .iter_mut()
            .find(|l| directive_key(l) == Some(name.as_str()))
        {
            *existing = directive;
            continue;
        }

        let insert_at = match lines.iter().rposition(|l| is_directive(l)) {
            Some(last) => last + 1,
            None if lines.first().is_some_and(|l| l.starts_with("#!")) => 1,
            None => 0,
        };
        lines.insert(insert_at, directive);
    }

    let mut out = lines.join("\n");
    if script.ends_with('\n') || script.is_empty() {
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
#[path = "script_tests.rs"]
mod tests;
