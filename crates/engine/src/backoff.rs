// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adaptive polling backoff

use std::time::Duration;

/// Interval multiplier that grows on idle iterations and resets on a match.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    factor: f64,
    max: f64,
    current: f64,
}

impl Backoff {
    pub fn new(factor: f64, max: f64) -> Self {
        Self {
            factor: factor.max(1.0),
            max: max.max(1.0),
            current: 1.0,
        }
    }

    pub fn multiplier(&self) -> f64 {
        self.current
    }

    /// An iteration found nothing: lengthen the next sleep
    pub fn grow(&mut self) {
        self.current = (self.current * self.factor).min(self.max);
    }

    pub fn reset(&mut self) {
        self.current = 1.0;
    }

    /// `interval` scaled by the current multiplier
    pub fn apply(&self, interval: Duration) -> Duration {
        interval.mul_f64(self.current)
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
