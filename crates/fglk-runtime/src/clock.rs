#![forbid(unsafe_code)]

//! Host-driven time.
//!
//! The engine never reads a wall clock. The host advances [`HostClock`]
//! explicitly, which keeps timer behaviour reproducible in tests and in
//! recorded transcripts.

use core::time::Duration;

/// Monotonic clock controlled by the host.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HostClock {
    now: Duration,
}

impl HostClock {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            now: Duration::ZERO,
        }
    }

    #[must_use]
    pub const fn now(&self) -> Duration {
        self.now
    }

    pub fn set(&mut self, now: Duration) {
        self.now = now;
    }

    pub fn advance(&mut self, dt: Duration) {
        self.now = self.now.saturating_add(dt);
    }

    /// Milliseconds since the clock started, for transcript timestamps.
    #[must_use]
    pub fn millis(&self) -> u64 {
        u64::try_from(self.now.as_millis()).unwrap_or(u64::MAX)
    }
}

/// The VM's periodic timer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TimerState {
    interval_ms: Option<u32>,
    started: Duration,
    /// Interval changed since the last update was compiled.
    changed: bool,
}

impl TimerState {
    /// Start (or with 0, stop) the timer at `now`.
    pub fn request(&mut self, msec: u32, now: Duration) {
        self.interval_ms = (msec > 0).then_some(msec);
        self.started = now;
        self.changed = true;
    }

    #[must_use]
    pub const fn interval_ms(&self) -> Option<u32> {
        self.interval_ms
    }

    /// Whether a full interval has elapsed since the timer last fired.
    #[must_use]
    pub fn is_due(&self, now: Duration) -> bool {
        self.interval_ms.is_some_and(|ms| {
            now.saturating_sub(self.started) >= Duration::from_millis(u64::from(ms))
        })
    }

    /// Restart the interval at `now`.
    pub fn fire(&mut self, now: Duration) {
        self.started = now;
    }

    /// The interval to announce in the next update, if it changed.
    pub fn take_announcement(&mut self) -> Option<Option<u32>> {
        std::mem::take(&mut self.changed).then_some(self.interval_ms)
    }
}
