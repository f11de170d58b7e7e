//! Periodic task abstraction.
//!
//! A task pairs a [`PeriodicJob`] with a bounded release semaphore. The
//! release layer posts to the semaphore once per period; the kernel takes one
//! count and runs the job to completion. Waiting on its own release is the
//! only suspension point a task has.

use core::time::Duration;

use log::trace;

use crate::clock::ClockRef;
use crate::semaphore::Semaphore;
use crate::sync::{Arc, Mutex};

/// Unique identifier for a task, assigned in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TaskId(pub u8);

impl TaskId {
    pub const fn new(id: u8) -> Self {
        Self(id)
    }
}

/// Returned by registration; identifies a task to the kernel and release layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TaskHandle {
    pub id: TaskId,
    pub priority: u8,
}

/// Static description of a periodic task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSpec {
    pub name: &'static str,
    pub period: Duration,
    /// Higher value wins. 0 is reserved for idle.
    pub priority: u8,
}

impl TaskSpec {
    pub const fn new(name: &'static str, period: Duration, priority: u8) -> Self {
        Self {
            name,
            period,
            priority,
        }
    }
}

/// Release accounting for one task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TaskStats {
    /// Releases accepted into the pending slot.
    pub releases: u64,
    /// Completed job runs.
    pub runs: u64,
    /// Releases dropped because the pending slot was full. Saturates.
    pub missed: u64,
}

/// Result of posting a release to a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Posted { release: u64 },
    Missed { missed: u64 },
}

/// Per-run context handed to a job.
pub struct TaskContext {
    handle: TaskHandle,
    name: &'static str,
    period: Duration,
    release: u64,
    clock: ClockRef,
}

impl TaskContext {
    pub fn new(
        handle: TaskHandle,
        name: &'static str,
        period: Duration,
        release: u64,
        clock: ClockRef,
    ) -> Self {
        Self {
            handle,
            name,
            period,
            release,
            clock,
        }
    }

    pub fn handle(&self) -> TaskHandle {
        self.handle
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// 1-based index of the run in progress; 0 inside `on_start`.
    pub fn release(&self) -> u64 {
        self.release
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    pub fn clock(&self) -> &ClockRef {
        &self.clock
    }
}

/// Work performed once per period.
pub trait PeriodicJob: Send + 'static {
    fn on_start(&mut self, _ctx: &mut TaskContext) {}
    fn on_release(&mut self, ctx: &mut TaskContext);
}

impl<F> PeriodicJob for F
where
    F: FnMut(&mut TaskContext) + Send + 'static,
{
    fn on_release(&mut self, ctx: &mut TaskContext) {
        self(ctx)
    }
}

/// Object-safe interface used by the kernel.
pub trait Runnable: Send + Sync {
    fn handle(&self) -> TaskHandle;
    fn spec(&self) -> TaskSpec;
    fn start(&self, clock: ClockRef);
    fn post_release(&self) -> ReleaseOutcome;
    fn has_pending(&self) -> bool;
    fn run_once(&self, clock: ClockRef) -> bool;
    fn stats(&self) -> TaskStats;
}

pub type TaskRef = Arc<dyn Runnable>;

/// Concrete task for a specific job type.
pub struct PeriodicTask<J: PeriodicJob> {
    handle: TaskHandle,
    spec: TaskSpec,
    release: Semaphore,
    job: Mutex<J>,
    stats: Mutex<TaskStats>,
}

impl<J: PeriodicJob> PeriodicTask<J> {
    pub fn new(id: TaskId, spec: TaskSpec, max_pending: usize, job: J) -> Arc<Self> {
        Arc::new(Self {
            handle: TaskHandle {
                id,
                priority: spec.priority,
            },
            spec,
            release: Semaphore::with_max(0, max_pending.max(1)),
            job: Mutex::new(job),
            stats: Mutex::new(TaskStats::default()),
        })
    }

    fn context(&self, release: u64, clock: ClockRef) -> TaskContext {
        TaskContext::new(self.handle, self.spec.name, self.spec.period, release, clock)
    }
}

impl<J: PeriodicJob> Runnable for PeriodicTask<J> {
    fn handle(&self) -> TaskHandle {
        self.handle
    }

    fn spec(&self) -> TaskSpec {
        self.spec
    }

    fn start(&self, clock: ClockRef) {
        let mut job = self.job.lock();
        let mut ctx = self.context(0, clock);
        job.on_start(&mut ctx);
    }

    fn post_release(&self) -> ReleaseOutcome {
        let mut stats = self.stats.lock();
        match self.release.signal() {
            Ok(()) => {
                stats.releases += 1;
                ReleaseOutcome::Posted {
                    release: stats.releases,
                }
            }
            Err(err) => {
                stats.missed = stats.missed.saturating_add(1);
                trace!("{}: release dropped ({err})", self.spec.name);
                ReleaseOutcome::Missed {
                    missed: stats.missed,
                }
            }
        }
    }

    fn has_pending(&self) -> bool {
        self.release.count() > 0
    }

    fn run_once(&self, clock: ClockRef) -> bool {
        if !self.release.try_wait() {
            return false;
        }
        let release = self.stats.lock().runs + 1;
        {
            let mut job = self.job.lock();
            let mut ctx = self.context(release, clock);
            job.on_release(&mut ctx);
        }
        self.stats.lock().runs = release;
        true
    }

    fn stats(&self) -> TaskStats {
        *self.stats.lock()
    }
}

/// Helper builder for typed tasks.
pub fn new_task<J: PeriodicJob>(
    id: TaskId,
    spec: TaskSpec,
    max_pending: usize,
    job: J,
) -> TaskRef {
    PeriodicTask::new(id, spec, max_pending, job) as TaskRef
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SimulatedClock;

    fn spec() -> TaskSpec {
        TaskSpec::new("sampler", Duration::from_millis(300), 3)
    }

    #[test]
    fn surplus_releases_are_counted_as_missed() {
        let task = new_task(TaskId::new(0), spec(), 1, |_ctx: &mut TaskContext| {});
        assert_eq!(task.post_release(), ReleaseOutcome::Posted { release: 1 });
        assert_eq!(task.post_release(), ReleaseOutcome::Missed { missed: 1 });
        assert_eq!(task.post_release(), ReleaseOutcome::Missed { missed: 2 });

        let stats = task.stats();
        assert_eq!(stats.releases, 1);
        assert_eq!(stats.missed, 2);
        assert!(task.has_pending());
    }

    #[test]
    fn run_once_consumes_one_release() {
        let runs = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&runs);
        let task = new_task(TaskId::new(0), spec(), 2, move |ctx: &mut TaskContext| {
            sink.lock().push(ctx.release());
        });
        let clock: ClockRef = Arc::new(SimulatedClock::new());

        assert!(!task.run_once(Arc::clone(&clock)));
        task.post_release();
        task.post_release();
        assert!(task.run_once(Arc::clone(&clock)));
        assert!(task.run_once(Arc::clone(&clock)));
        assert!(!task.run_once(clock));

        assert_eq!(*runs.lock(), vec![1, 2]);
        assert_eq!(task.stats().runs, 2);
    }
}
