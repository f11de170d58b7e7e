//! Synthetic CPU load for probing schedulability margins.

use core::time::Duration;
use std::hint::black_box;

use cruise_kernel::{Clock, PeriodicJob, Sampled, TaskContext};
use log::debug;

use crate::signals::{LoadSetting, SignalBoard};

/// One load unit: `percent` of `period`.
pub fn load_unit(period: Duration, percent: u32) -> Duration {
    period * percent / 100
}

/// Spins on `clock` until at least `duration` has elapsed. Returns the time
/// actually spent.
pub fn busy_spin(clock: &dyn Clock, duration: Duration) -> Duration {
    let start = clock.now();
    let mut spins: u64 = 0;
    loop {
        let elapsed = clock.now().saturating_sub(start);
        if elapsed >= duration {
            return elapsed;
        }
        spins = black_box(spins.wrapping_add(1));
    }
}

/// Burns `level` load units each period.
pub struct ExtraLoadTask {
    load: Sampled<LoadSetting>,
    unit_percent: u32,
}

impl ExtraLoadTask {
    pub fn new(board: &SignalBoard, unit_percent: u32) -> Self {
        Self {
            load: board.extra_load.sampled(LoadSetting::default()),
            unit_percent,
        }
    }
}

impl PeriodicJob for ExtraLoadTask {
    fn on_release(&mut self, ctx: &mut TaskContext) {
        let level = self.load.sample().level;
        if level == 0 {
            return;
        }
        let budget = load_unit(ctx.period(), self.unit_percent) * u32::from(level);
        debug!("extra load: level {level}, spinning {} ms", budget.as_millis());
        busy_spin(ctx.clock().as_ref(), budget);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cruise_kernel::SimulatedClock;

    #[test]
    fn unit_is_two_percent_of_period() {
        assert_eq!(
            load_unit(Duration::from_millis(300), 2),
            Duration::from_millis(6)
        );
        assert_eq!(
            load_unit(Duration::from_millis(300), 2) * 50,
            Duration::from_millis(300)
        );
    }

    #[test]
    fn spin_runs_until_budget_elapsed() {
        let clock = SimulatedClock::with_step(Duration::from_micros(500));
        let spent = busy_spin(&clock, Duration::from_millis(60));
        assert!(spent >= Duration::from_millis(60));
        assert!(spent < Duration::from_millis(61));
    }

    #[test]
    fn zero_budget_returns_immediately() {
        let clock = SimulatedClock::with_step(Duration::from_millis(1));
        assert_eq!(busy_spin(&clock, Duration::ZERO), Duration::from_millis(1));
    }
}
