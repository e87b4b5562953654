// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Placeholder substitution for action parameters.
//!
//! Supported forms: `$0` / `${_matched_text}` (full match), `$1..$N`
//! (groups), `$name` / `${name}` (captured variables), and the built-ins
//! `$JOB_ID` and `$HOSTNAME`. Substitution is a single left-to-right pass:
//! substituted values are never re-scanned, and unresolved placeholders are
//! kept verbatim.

use jw_core::{Variables, MATCHED_TEXT_VAR};

/// Values available to [`substitute`]
#[derive(Debug, Clone, Copy)]
pub struct SubstitutionContext<'a> {
    pub variables: &'a Variables,
    /// Regex groups `1..=N` of the current (or, in timer mode, cached) match
    pub groups: &'a [Option<String>],
    pub job_id: &'a str,
    pub hostname: &'a str,
}

impl<'a> SubstitutionContext<'a> {
    fn positional(&self, index: usize) -> Option<&'a str> {
        if index == 0 {
            return self.variables.get(MATCHED_TEXT_VAR).map(String::as_str);
        }
        match self.groups.get(index - 1) {
            Some(group) => group.as_deref(),
            None => self.variables.get(&index.to_string()).map(String::as_str),
        }
    }

    fn named(&self, name: &str) -> Option<&'a str> {
        if let Some(value) = self.variables.get(name) {
            return Some(value.as_str());
        }
        match name {
            "JOB_ID" => Some(self.job_id),
            "HOSTNAME" => Some(self.hostname),
            _ => None,
        }
    }

    fn resolve(&self, key: &str) -> Option<&'a str> {
        if key.bytes().all(|b| b.is_ascii_digit()) {
            key.parse().ok().and_then(|i| self.positional(i))
        } else {
            self.named(key)
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Replace placeholders in `template`
pub fn substitute(template: &str, ctx: &SubstitutionContext<'_>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        // Length (after '$') of the placeholder and the key it names
        let placeholder = if let Some(braced) = after.strip_prefix('{') {
            braced.find('}').and_then(|end| {
                let key = &braced[..end];
                let valid = !key.is_empty()
                    && (key.bytes().all(|b| b.is_ascii_digit())
                        || (key.starts_with(is_ident_start) && key.chars().all(is_ident_char)));
                valid.then_some((end + 2, key))
            })
        } else if after.starts_with(|c: char| c.is_ascii_digit()) {
            let end = after
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(after.len());
            Some((end, &after[..end]))
        } else if after.starts_with(is_ident_start) {
            let end = after.find(|c| !is_ident_char(c)).unwrap_or(after.len());
            Some((end, &after[..end]))
        } else {
            None
        };

        match placeholder {
            Some((len, key)) => {
                match ctx.resolve(key) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(&rest[pos..pos + 1 + len]),
                }
                rest = &after[len..];
            }
            None => {
                out.push('$');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
#[path = "substitute_tests.rs"]
mod tests;
