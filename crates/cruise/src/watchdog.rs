//! Overload detection through a heartbeat flag.
//!
//! The detection task runs at the lowest priority and sets the heartbeat each
//! time it gets the CPU. The watchdog, released with the same period, checks
//! and clears it: a heartbeat that was not set since the previous check means
//! the lowest-priority work was starved for a whole period. The result is only
//! reported; nothing is throttled or restarted.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use cruise_kernel::sync::{Arc, Mutex};
use cruise_kernel::{PeriodicJob, TaskContext};
use log::{info, warn};

/// Heartbeat flag shared by the detection and watchdog tasks.
#[derive(Debug, Clone)]
pub struct Heartbeat {
    ok: Arc<AtomicBool>,
}

impl Heartbeat {
    pub fn new(initially_ok: bool) -> Self {
        Self {
            ok: Arc::new(AtomicBool::new(initially_ok)),
        }
    }

    pub fn set(&self) {
        self.ok.store(true, Ordering::SeqCst);
    }

    /// Returns whether the flag was set, clearing it.
    pub fn check_and_clear(&self) -> bool {
        self.ok.swap(false, Ordering::SeqCst)
    }

    pub fn is_set(&self) -> bool {
        self.ok.load(Ordering::SeqCst)
    }
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self::new(true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HealthReport {
    Ok,
    Overload,
}

const HISTORY_LEN: usize = 64;

#[derive(Debug, Default)]
struct MonitorState {
    checks: u64,
    overloads: u64,
    history: VecDeque<HealthReport>,
}

/// Record of watchdog verdicts, shared with whoever wants to observe them.
#[derive(Debug, Clone, Default)]
pub struct HealthMonitor {
    state: Arc<Mutex<MonitorState>>,
}

impl HealthMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, report: HealthReport) {
        let mut state = self.state.lock();
        state.checks += 1;
        if report == HealthReport::Overload {
            state.overloads += 1;
        }
        if state.history.len() == HISTORY_LEN {
            state.history.pop_front();
        }
        state.history.push_back(report);
    }

    pub fn checks(&self) -> u64 {
        self.state.lock().checks
    }

    pub fn overloads(&self) -> u64 {
        self.state.lock().overloads
    }

    pub fn last(&self) -> Option<HealthReport> {
        self.state.lock().history.back().copied()
    }

    /// Most recent verdicts, oldest first.
    pub fn history(&self) -> Vec<HealthReport> {
        self.state.lock().history.iter().copied().collect()
    }
}

/// Lowest-priority task proving that the CPU had spare time this period.
pub struct DetectionTask {
    heartbeat: Heartbeat,
}

impl DetectionTask {
    pub fn new(heartbeat: Heartbeat) -> Self {
        Self { heartbeat }
    }
}

impl PeriodicJob for DetectionTask {
    fn on_release(&mut self, _ctx: &mut TaskContext) {
        self.heartbeat.set();
    }
}

pub struct WatchdogTask {
    heartbeat: Heartbeat,
    monitor: HealthMonitor,
}

impl WatchdogTask {
    pub fn new(heartbeat: Heartbeat, monitor: HealthMonitor) -> Self {
        Self { heartbeat, monitor }
    }

    pub fn check(&self) -> HealthReport {
        let report = if self.heartbeat.check_and_clear() {
            HealthReport::Ok
        } else {
            HealthReport::Overload
        };
        self.monitor.record(report);
        report
    }
}

impl PeriodicJob for WatchdogTask {
    fn on_release(&mut self, ctx: &mut TaskContext) {
        match self.check() {
            HealthReport::Ok => info!("watchdog: OK"),
            HealthReport::Overload => warn!("watchdog: Overload (release {})", ctx.release()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heartbeat_is_read_and_cleared() {
        let heartbeat = Heartbeat::new(false);
        assert!(!heartbeat.check_and_clear());
        heartbeat.set();
        assert!(heartbeat.is_set());
        assert!(heartbeat.check_and_clear());
        assert!(!heartbeat.check_and_clear());
    }

    #[test]
    fn missing_detection_reports_overload() {
        let heartbeat = Heartbeat::new(true);
        let monitor = HealthMonitor::new();
        let detection = DetectionTask::new(heartbeat.clone());
        let watchdog = WatchdogTask::new(heartbeat, monitor.clone());

        assert_eq!(watchdog.check(), HealthReport::Ok);
        // Detection starved for a whole period.
        assert_eq!(watchdog.check(), HealthReport::Overload);
        detection.heartbeat.set();
        assert_eq!(watchdog.check(), HealthReport::Ok);

        assert_eq!(monitor.checks(), 3);
        assert_eq!(monitor.overloads(), 1);
        assert_eq!(
            monitor.history(),
            vec![HealthReport::Ok, HealthReport::Overload, HealthReport::Ok]
        );
    }

    #[test]
    fn detection_every_period_is_always_ok() {
        let heartbeat = Heartbeat::new(false);
        let monitor = HealthMonitor::new();
        let watchdog = WatchdogTask::new(heartbeat.clone(), monitor.clone());
        for _ in 0..10 {
            heartbeat.set();
            assert_eq!(watchdog.check(), HealthReport::Ok);
        }
        assert_eq!(monitor.overloads(), 0);
        assert_eq!(monitor.last(), Some(HealthReport::Ok));
    }

    #[test]
    fn history_is_bounded() {
        let monitor = HealthMonitor::new();
        for _ in 0..(HISTORY_LEN + 10) {
            monitor.record(HealthReport::Overload);
        }
        assert_eq!(monitor.history().len(), HISTORY_LEN);
        assert_eq!(monitor.checks(), (HISTORY_LEN + 10) as u64);
    }
}
