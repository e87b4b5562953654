// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction so time-dependent logic can be driven from tests

use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Source of monotonic and wall-clock time
pub trait Clock: Clone + Send + Sync + 'static {
    /// Monotonic instant, used for rate-limit windows and stall detection
    fn now(&self) -> Instant;

    /// Wall-clock milliseconds since the Unix epoch, used for persisted timestamps
    fn epoch_ms(&self) -> u64;
}

/// Real system clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeClock;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::Clock;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    struct FakeClockState {
        now: Instant,
        epoch_ms: u64,
    }

    /// Manually advanced clock for tests
    #[derive(Clone)]
    pub struct FakeClock {
        inner: Arc<Mutex<FakeClockState>>,
    }

    impl Default for FakeClock {
        fn default() -> Self {
            Self {
                inner: Arc::new(Mutex::new(FakeClockState {
                    now: Instant::now(),
                    epoch_ms: 1_700_000_000_000,
                })),
            }
        }
    }

    impl FakeClock {
        pub fn new() -> Self {
            Self::default()
        }

        /// Move both the monotonic and wall clocks forward
        pub fn advance(&self, by: Duration) {
            let mut state = self.inner.lock();
            state.now += by;
            state.epoch_ms += by.as_millis() as u64;
        }

        pub fn set_epoch_ms(&self, epoch_ms: u64) {
            self.inner.lock().epoch_ms = epoch_ms;
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> Instant {
            self.inner.lock().now
        }

        fn epoch_ms(&self) -> u64 {
            self.inner.lock().epoch_ms
        }
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
