// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sliding-window action rate limiter

use jw_core::WatcherId;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// Allows at most `max` acquisitions per watcher within any trailing
/// `window`. Denied attempts are not queued.
#[derive(Debug)]
pub struct RateLimiter {
    max: usize,
    window: Duration,
    recent: HashMap<WatcherId, VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max: usize, window: Duration) -> Self {
        Self {
            max,
            window,
            recent: HashMap::new(),
        }
    }

    /// Record an execution at `now` if the watcher is under its limit
    pub fn try_acquire(&mut self, id: &WatcherId, now: Instant) -> bool {
        let window = self.window;
        let times = self.recent.entry(id.clone()).or_default();
        while times
            .front()
            .is_some_and(|t| now.saturating_duration_since(*t) >= window)
        {
            times.pop_front();
        }
        if times.len() >= self.max {
            return false;
        }
        times.push_back(now);
        true
    }

    /// Executions counted against the watcher in the window ending at `now`
    pub fn in_window(&self, id: &WatcherId, now: Instant) -> usize {
        self.recent.get(id).map_or(0, |times| {
            times
                .iter()
                .filter(|t| now.saturating_duration_since(**t) < self.window)
                .count()
        })
    }

    pub fn forget(&mut self, id: &WatcherId) {
        self.recent.remove(id);
    }

    /// Watchers with recorded history
    pub fn tracked(&self) -> usize {
        self.recent.len()
    }
}

#[cfg(test)]
#[path = "rate_limit_tests.rs"]
mod tests;
