// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Regex compilation cache and match extraction.

use jw_core::{Variables, MATCHED_TEXT_VAR};
use parking_lot::Mutex;
use regex::{Regex, RegexBuilder};
use std::collections::{HashMap, VecDeque};
use thiserror::Error;

/// Compiled program size cap; keeps hostile patterns from eating memory
const REGEX_SIZE_LIMIT: usize = 1 << 20;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("pattern is {len} characters, limit is {max}")]
    TooLong { len: usize, max: usize },
    #[error("{0}")]
    Invalid(String),
}

struct PatternCache {
    compiled: HashMap<String, Regex>,
    /// Insertion order, oldest first
    order: VecDeque<String>,
}

/// Compiles watcher patterns and memoizes them by pattern text.
///
/// The cache is bounded; the oldest pattern is evicted once `capacity`
/// distinct patterns have been compiled. Each engine owns its own matcher.
pub struct PatternMatcher {
    capacity: usize,
    max_len: usize,
    cache: Mutex<PatternCache>,
}

impl PatternMatcher {
    pub fn new(capacity: usize, max_len: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            max_len,
            cache: Mutex::new(PatternCache {
                compiled: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    /// Compile `pattern` (multi-line mode: `^`/`$` match at line breaks)
    pub fn compile(&self, pattern: &str) -> Result<Regex, PatternError> {
        if let Some(regex) = self.cache.lock().compiled.get(pattern) {
            return Ok(regex.clone());
        }

        let len = pattern.chars().count();
        if len > self.max_len {
            return Err(PatternError::TooLong {
                len,
                max: self.max_len,
            });
        }

        let regex = RegexBuilder::new(pattern)
            .multi_line(true)
            .size_limit(REGEX_SIZE_LIMIT)
            .build()
            .map_err(|e| PatternError::Invalid(e.to_string()))?;

        let mut cache = self.cache.lock();
        if !cache.compiled.contains_key(pattern) {
            while cache.order.len() >= self.capacity {
                if let Some(oldest) = cache.order.pop_front() {
                    cache.compiled.remove(&oldest);
                }
            }
            cache.order.push_back(pattern.to_string());
            cache.compiled.insert(pattern.to_string(), regex.clone());
        }
        Ok(regex)
    }

    pub fn cached_len(&self) -> usize {
        self.cache.lock().compiled.len()
    }
}

/// Lazily iterate over the matches of `regex` in `text`
pub fn find_matches<'a>(regex: &'a Regex, text: &'a str) -> Matches<'a> {
    Matches {
        regex,
        text,
        pos: 0,
        last_end: None,
    }
}

/// Iterator returned by [`find_matches`].
///
/// Each step runs one bounded search from the current position, so the
/// iterator holds no regex scratch state between items and can be kept
/// across await points.
pub struct Matches<'a> {
    regex: &'a Regex,
    text: &'a str,
    pos: usize,
    last_end: Option<usize>,
}

impl Iterator for Matches<'_> {
    type Item = PatternMatch;

    fn next(&mut self) -> Option<PatternMatch> {
        loop {
            if self.pos > self.text.len() {
                return None;
            }
            let caps = self.regex.captures_at(self.text, self.pos)?;
            let whole = caps.get(0)?;

            if whole.is_empty() {
                // Step past the empty match by one character
                self.pos = self.text[whole.end()..]
                    .chars()
                    .next()
                    .map_or(self.text.len() + 1, |c| whole.end() + c.len_utf8());
                // An empty match right after the previous match is skipped
                if self.last_end == Some(whole.end()) {
                    continue;
                }
            } else {
                self.pos = whole.end();
            }
            self.last_end = Some(whole.end());

            return Some(PatternMatch {
                matched: whole.as_str().to_string(),
                groups: caps
                    .iter()
                    .skip(1)
                    .map(|g| g.map(|m| m.as_str().to_string()))
                    .collect(),
            });
        }
    }
}

/// One regex match: the full text plus groups `1..=N` in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    pub matched: String,
    pub groups: Vec<Option<String>>,
}

impl PatternMatch {
    /// Bind capture names to groups positionally.
    ///
    /// Produces `_matched_text` plus one entry per name whose group
    /// participated in the match. Groups beyond the named ones are stored
    /// under their position (`"3"`) so they survive in cached variables.
    pub fn bind(&self, names: &[String]) -> Variables {
        let mut vars = Variables::new();
        vars.insert(MATCHED_TEXT_VAR.to_string(), self.matched.clone());
        for (idx, group) in self.groups.iter().enumerate() {
            let Some(value) = group else { continue };
            match names.get(idx) {
                Some(name) => {
                    vars.insert(name.clone(), value.clone());
                }
                None => {
                    vars.insert((idx + 1).to_string(), value.clone());
                }
            }
        }
        vars
    }
}

#[cfg(test)]
#[path = "pattern_tests.rs"]
mod tests;
