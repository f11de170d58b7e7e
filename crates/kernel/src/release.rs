//! Periodic release timers.
//!
//! [`ReleaseLayer`] turns the shared tick into per-task releases: every
//! registration holds a countdown that is decremented once per tick and
//! reloaded to its period when it reaches zero. [`Dispatcher`] owns the layer
//! and posts due releases to the kernel. Nothing else runs in tick context.

use log::trace;

use crate::error::KernelError;
use crate::kernel::Kernel;
use crate::sync::Arc;
use crate::task::{ReleaseOutcome, TaskHandle};

#[derive(Debug, Clone, Copy)]
struct ReleaseTimer {
    handle: TaskHandle,
    period_ticks: u64,
    remaining: u64,
}

impl ReleaseTimer {
    fn poll(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.remaining = self.period_ticks;
            true
        } else {
            false
        }
    }
}

/// Countdown timers for all periodic tasks.
#[derive(Debug, Default)]
pub struct ReleaseLayer {
    timers: Vec<ReleaseTimer>,
}

impl ReleaseLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a timer releasing `handle` every `period_ticks` ticks. The first
    /// release happens on the next tick, so every task runs once at start-up.
    pub fn register(&mut self, handle: TaskHandle, period_ticks: u64) -> TaskHandle {
        self.timers.push(ReleaseTimer {
            handle,
            period_ticks: period_ticks.max(1),
            remaining: 1,
        });
        handle
    }

    /// Advances every countdown by one tick and returns the tasks now due,
    /// highest priority first.
    pub fn tick(&mut self) -> Vec<TaskHandle> {
        let mut due: Vec<TaskHandle> = self
            .timers
            .iter_mut()
            .filter_map(|timer| timer.poll().then_some(timer.handle))
            .collect();
        due.sort_by(|a, b| b.priority.cmp(&a.priority));
        due
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

/// Releases posted on one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReleases {
    pub posted: usize,
    pub missed: usize,
}

/// Owns the release timers of a kernel and fans releases out to it.
pub struct Dispatcher {
    kernel: Arc<Kernel>,
    layer: ReleaseLayer,
    ticks: u64,
}

impl Dispatcher {
    /// Creates a dispatcher with one timer per registered kernel task.
    pub fn new(kernel: Arc<Kernel>) -> Self {
        let mut layer = ReleaseLayer::new();
        for (handle, spec) in kernel.tasks() {
            // Periods are validated against the tick at registration.
            let period_ticks = kernel.config().ticks_for(spec.period).unwrap_or(1);
            layer.register(handle, period_ticks);
        }
        Self {
            kernel,
            layer,
            ticks: 0,
        }
    }

    /// Processes one tick: posts every due release.
    pub fn tick(&mut self) -> Result<TickReleases, KernelError> {
        self.ticks += 1;
        let mut report = TickReleases::default();
        for handle in self.layer.tick() {
            match self.kernel.release(handle.id)? {
                ReleaseOutcome::Posted { .. } => report.posted += 1,
                ReleaseOutcome::Missed { .. } => report.missed += 1,
            }
        }
        trace!(
            "tick {}: {} released, {} missed",
            self.ticks,
            report.posted,
            report.missed
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskId;

    fn handle(id: u8, priority: u8) -> TaskHandle {
        TaskHandle {
            id: TaskId::new(id),
            priority,
        }
    }

    #[test]
    fn countdown_reloads_to_period() {
        let mut layer = ReleaseLayer::new();
        let task = layer.register(handle(0, 4), 3);

        let fired: Vec<bool> = (0..7).map(|_| layer.tick().contains(&task)).collect();
        assert_eq!(fired, vec![true, false, false, true, false, false, true]);
    }

    #[test]
    fn due_tasks_are_ordered_by_priority() {
        let mut layer = ReleaseLayer::new();
        layer.register(handle(0, 2), 1);
        layer.register(handle(1, 9), 1);
        layer.register(handle(2, 5), 2);

        let due = layer.tick();
        let priorities: Vec<u8> = due.iter().map(|h| h.priority).collect();
        assert_eq!(priorities, vec![9, 5, 2]);

        let due = layer.tick();
        let priorities: Vec<u8> = due.iter().map(|h| h.priority).collect();
        assert_eq!(priorities, vec![9, 2]);
    }

    #[test]
    fn zero_period_is_treated_as_every_tick() {
        let mut layer = ReleaseLayer::new();
        let task = layer.register(handle(0, 1), 0);
        assert!(layer.tick().contains(&task));
        assert!(layer.tick().contains(&task));
        assert_eq!(layer.len(), 1);
    }
}
