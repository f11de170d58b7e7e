//! Monotonic time sources.
//!
//! Every time-dependent piece of the kernel (tick pacing, dispatch windows,
//! synthetic busy loops) reads time through [`Clock`], so the same task set can
//! run against the wall clock or against a deterministic virtual clock.

use core::time::Duration;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Instant;

use crate::sync::Arc;

/// Monotonic time measured from an arbitrary origin.
pub trait Clock: Send + Sync {
    /// Current time since the clock origin.
    fn now(&self) -> Duration;

    /// Blocks (or jumps, for virtual clocks) until `instant` has been reached.
    /// Returns immediately when the clock is already past it.
    fn sleep_until(&self, instant: Duration);
}

pub type ClockRef = Arc<dyn Clock>;

/// Wall clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep_until(&self, instant: Duration) {
        let now = self.now();
        if instant > now {
            thread::sleep(instant - now);
        }
    }
}

/// Virtual clock for deterministic runs.
///
/// Behaves like a free-running cycle counter: each call to [`Clock::now`]
/// returns the current time and then advances it by `step`, so a loop polling
/// the clock always makes progress and the first read of an instant sees that
/// instant. `sleep_until` jumps forward and never goes back.
#[derive(Debug)]
pub struct SimulatedClock {
    nanos: AtomicU64,
    step: u64,
}

impl SimulatedClock {
    /// Default cost of a single clock read.
    pub const DEFAULT_STEP: Duration = Duration::from_micros(100);

    pub fn new() -> Self {
        Self::with_step(Self::DEFAULT_STEP)
    }

    /// Creates a clock whose reads each cost `step` of virtual time.
    pub fn with_step(step: Duration) -> Self {
        Self {
            nanos: AtomicU64::new(0),
            step: duration_to_nanos(step),
        }
    }

    /// Moves the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        self.nanos
            .fetch_add(duration_to_nanos(delta), Ordering::SeqCst);
    }

    /// Reads the current virtual time without charging a step.
    pub fn peek(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

impl Default for SimulatedClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SimulatedClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.fetch_add(self.step, Ordering::SeqCst))
    }

    fn sleep_until(&self, instant: Duration) {
        self.nanos
            .fetch_max(duration_to_nanos(instant), Ordering::SeqCst);
    }
}

fn duration_to_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_reads_advance_by_step() {
        let clock = SimulatedClock::with_step(Duration::from_millis(1));
        assert_eq!(clock.now(), Duration::ZERO);
        assert_eq!(clock.now(), Duration::from_millis(1));
        assert_eq!(clock.peek(), Duration::from_millis(2));

        clock.sleep_until(Duration::from_millis(300));
        assert_eq!(clock.now(), Duration::from_millis(300));
    }

    #[test]
    fn simulated_sleep_never_moves_backwards() {
        let clock = SimulatedClock::with_step(Duration::ZERO);
        clock.sleep_until(Duration::from_millis(300));
        assert_eq!(clock.now(), Duration::from_millis(300));

        clock.sleep_until(Duration::from_millis(100));
        assert_eq!(clock.now(), Duration::from_millis(300));

        clock.advance(Duration::from_millis(5));
        assert_eq!(clock.peek(), Duration::from_millis(305));
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let first = clock.now();
        clock.sleep_until(first + Duration::from_millis(2));
        assert!(clock.now() >= first + Duration::from_millis(2));
    }
}
