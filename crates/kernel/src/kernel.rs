//! Fixed-priority run-to-completion kernel.
//!
//! Tasks are registered through [`KernelBuilder`], each at a unique priority.
//! Releases mark a task ready; [`Kernel::dispatch_once`] runs one job of the
//! highest ready task. Jobs are never interrupted, so a higher-priority task
//! released while a job runs is picked at the next job boundary.

use core::time::Duration;

use log::{debug, warn};

use crate::clock::{ClockRef, SystemClock};
use crate::error::KernelError;
use crate::scheduler::ReadySet;
use crate::sync::{Arc, Mutex};
use crate::task::{
    new_task, PeriodicJob, ReleaseOutcome, TaskHandle, TaskId, TaskRef, TaskSpec, TaskStats,
};
use crate::trace::{TraceHook, TraceRecord};

/// Highest usable task priority. Priority 0 is reserved for idle.
pub const MAX_PRIORITY: u8 = 63;

/// Configuration for the kernel.
#[derive(Debug, Clone)]
pub struct KernelConfig {
    pub name: &'static str,
    /// Period of the hardware tick driving all release timers.
    pub tick: Duration,
    pub max_tasks: u8,
    /// Releases a task may have outstanding before further ones are dropped.
    pub max_pending_releases: usize,
    pub idle_callback: Option<fn()>,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            name: "cruise-rt",
            tick: Duration::from_millis(100),
            max_tasks: 16,
            max_pending_releases: 1,
            idle_callback: None,
        }
    }
}

impl KernelConfig {
    pub fn builder() -> KernelConfigBuilder {
        KernelConfigBuilder::default()
    }

    /// Number of ticks in `period`, if it is a non-zero whole multiple of the tick.
    pub fn ticks_for(&self, period: Duration) -> Option<u64> {
        let tick = self.tick.as_nanos();
        let period = period.as_nanos();
        if tick == 0 || period == 0 || period % tick != 0 {
            return None;
        }
        u64::try_from(period / tick).ok()
    }
}

/// Builder for ergonomic kernel configuration construction.
#[derive(Debug, Clone, Default)]
pub struct KernelConfigBuilder {
    config: KernelConfig,
}

impl KernelConfigBuilder {
    pub fn name(mut self, name: &'static str) -> Self {
        self.config.name = name;
        self
    }

    pub fn tick(mut self, tick: Duration) -> Self {
        self.config.tick = tick;
        self
    }

    pub fn max_tasks(mut self, max: u8) -> Self {
        self.config.max_tasks = max;
        self
    }

    pub fn max_pending_releases(mut self, max: usize) -> Self {
        self.config.max_pending_releases = max.max(1);
        self
    }

    pub fn idle_callback(mut self, callback: fn()) -> Self {
        self.config.idle_callback = Some(callback);
        self
    }

    pub fn build(self) -> KernelConfig {
        self.config
    }
}

pub struct KernelBuilder {
    config: KernelConfig,
    tasks: Vec<TaskRef>,
    trace: Option<TraceHook>,
    clock: Option<ClockRef>,
}

impl KernelBuilder {
    pub fn new(config: KernelConfig) -> Self {
        Self {
            config,
            tasks: Vec::new(),
            trace: None,
            clock: None,
        }
    }

    /// Registers a periodic job. Fails on a duplicate or out-of-range
    /// priority, or a period that is zero or not a whole number of ticks.
    pub fn register<J: PeriodicJob>(
        &mut self,
        spec: TaskSpec,
        job: J,
    ) -> Result<TaskHandle, KernelError> {
        if self.config.tick.is_zero() {
            return Err(KernelError::ZeroTick);
        }
        if spec.priority == 0 || spec.priority > MAX_PRIORITY {
            return Err(KernelError::InvalidPriority(spec.priority));
        }
        if let Some(existing) = self
            .tasks
            .iter()
            .find(|task| task.handle().priority == spec.priority)
        {
            return Err(KernelError::DuplicatePriority {
                priority: spec.priority,
                existing: existing.spec().name,
            });
        }
        if spec.period.is_zero() {
            return Err(KernelError::ZeroPeriod(spec.name));
        }
        if self.config.ticks_for(spec.period).is_none() {
            return Err(KernelError::PeriodNotTickMultiple {
                name: spec.name,
                period_ms: spec.period.as_millis(),
                tick_ms: self.config.tick.as_millis(),
            });
        }
        if self.tasks.len() >= usize::from(self.config.max_tasks) {
            return Err(KernelError::TooManyTasks(self.config.max_tasks));
        }

        // max_tasks is a u8, so the index always fits.
        let id = TaskId::new(self.tasks.len() as u8);
        let task = new_task(id, spec, self.config.max_pending_releases, job);
        let handle = task.handle();
        self.tasks.push(task);
        debug!(
            "{}: registered task `{}` at priority {}",
            self.config.name, spec.name, spec.priority
        );
        Ok(handle)
    }

    pub fn with_trace_hook(mut self, hook: TraceHook) -> Self {
        self.trace = Some(hook);
        self
    }

    pub fn with_clock(mut self, clock: ClockRef) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn build(self) -> Kernel {
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::new()) as ClockRef);
        Kernel::new(self.config, self.tasks, self.trace, clock)
    }
}

pub struct Kernel {
    config: KernelConfig,
    /// Indexed by `TaskId`.
    tasks: Vec<TaskRef>,
    by_priority: Vec<Option<TaskRef>>,
    ready: Mutex<ReadySet>,
    idle: Mutex<bool>,
    clock: ClockRef,
    trace: Option<TraceHook>,
}

impl Kernel {
    pub fn builder() -> KernelBuilder {
        KernelBuilder::new(KernelConfig::default())
    }

    pub fn with_config(config: KernelConfig) -> KernelBuilder {
        KernelBuilder::new(config)
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn clock(&self) -> ClockRef {
        Arc::clone(&self.clock)
    }

    /// Handles and specs of all registered tasks, in registration order.
    pub fn tasks(&self) -> Vec<(TaskHandle, TaskSpec)> {
        self.tasks
            .iter()
            .map(|task| (task.handle(), task.spec()))
            .collect()
    }

    pub fn task_by_name(&self, name: &str) -> Option<TaskHandle> {
        self.tasks
            .iter()
            .find(|task| task.spec().name == name)
            .map(|task| task.handle())
    }

    pub fn stats(&self, id: TaskId) -> Result<TaskStats, KernelError> {
        Ok(self.task(id)?.stats())
    }

    /// Runs every task's `on_start` hook, in registration order.
    pub fn start(&self) {
        for task in &self.tasks {
            task.start(self.clock());
        }
    }

    /// Posts one release to the task and marks it ready. A release that finds
    /// the pending slot full is counted as missed; it is not an error.
    pub fn release(&self, id: TaskId) -> Result<ReleaseOutcome, KernelError> {
        let task = self.task(id)?;
        let handle = task.handle();
        let outcome = task.post_release();
        self.ready.lock().insert(handle.priority);

        match outcome {
            ReleaseOutcome::Posted { release } => {
                self.emit(TraceRecord::Released {
                    task: handle.id,
                    release,
                });
            }
            ReleaseOutcome::Missed { missed } => {
                warn!(
                    "{}: task `{}` missed a release ({} so far)",
                    self.config.name,
                    task.spec().name,
                    missed
                );
                self.emit(TraceRecord::Missed {
                    task: handle.id,
                    missed,
                });
            }
        }
        Ok(outcome)
    }

    /// Runs one job of the highest-priority ready task. Returns `false` when
    /// nothing was ready.
    pub fn dispatch_once(&self) -> bool {
        loop {
            let next = self.ready.lock().max();
            let Some(prio) = next else {
                self.enter_idle();
                return false;
            };
            let Some(task) = self.by_priority[usize::from(prio)].clone() else {
                self.ready.lock().remove(prio);
                continue;
            };

            *self.idle.lock() = false;
            self.emit(TraceRecord::Dispatched {
                task: task.handle().id,
                priority: prio,
                at: self.clock.now(),
            });
            let ran = task.run_once(self.clock());

            {
                let mut ready = self.ready.lock();
                if !task.has_pending() {
                    ready.remove(prio);
                }
            }

            if ran {
                return true;
            }
        }
    }

    /// Dispatches until no task is ready.
    pub fn run_until_idle(&self) {
        while self.dispatch_once() {}
        if let Some(idle_cb) = self.config.idle_callback {
            idle_cb();
        }
    }

    /// Dispatches while the clock is before `deadline` and work remains.
    /// Returns the number of jobs run. A job started before the deadline
    /// always finishes, even if it overruns it.
    pub fn run_until(&self, deadline: Duration) -> usize {
        let mut ran = 0;
        while self.clock.now() < deadline {
            if !self.dispatch_once() {
                if let Some(idle_cb) = self.config.idle_callback {
                    idle_cb();
                }
                break;
            }
            ran += 1;
        }
        ran
    }

    pub fn is_ready(&self, id: TaskId) -> Result<bool, KernelError> {
        let priority = self.task(id)?.handle().priority;
        Ok(self.ready.lock().contains(priority))
    }
}

impl Kernel {
    fn new(
        config: KernelConfig,
        tasks: Vec<TaskRef>,
        trace: Option<TraceHook>,
        clock: ClockRef,
    ) -> Self {
        let mut by_priority: Vec<Option<TaskRef>> = vec![None; usize::from(MAX_PRIORITY) + 1];
        for task in &tasks {
            by_priority[usize::from(task.handle().priority)] = Some(Arc::clone(task));
        }
        Self {
            config,
            tasks,
            by_priority,
            ready: Mutex::new(ReadySet::new()),
            idle: Mutex::new(false),
            clock,
            trace,
        }
    }

    fn task(&self, id: TaskId) -> Result<&TaskRef, KernelError> {
        self.tasks
            .get(usize::from(id.0))
            .ok_or(KernelError::NotFound(id))
    }

    fn enter_idle(&self) {
        let mut idle = self.idle.lock();
        if !*idle {
            *idle = true;
            drop(idle);
            self.emit(TraceRecord::Idle);
        }
    }

    fn emit(&self, record: TraceRecord) {
        if let Some(trace) = &self.trace {
            trace(&record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SimulatedClock;
    use crate::task::TaskContext;

    fn period() -> Duration {
        Duration::from_millis(300)
    }

    fn recording_job(name: &'static str, log: Arc<Mutex<Vec<&'static str>>>) -> impl PeriodicJob {
        move |_ctx: &mut TaskContext| log.lock().push(name)
    }

    #[test]
    fn register_rejects_duplicate_priority() {
        let mut builder = Kernel::builder();
        builder
            .register(TaskSpec::new("a", period(), 4), |_: &mut TaskContext| {})
            .unwrap();
        let err = builder
            .register(TaskSpec::new("b", period(), 4), |_: &mut TaskContext| {})
            .unwrap_err();
        assert_eq!(
            err,
            KernelError::DuplicatePriority {
                priority: 4,
                existing: "a"
            }
        );
    }

    #[test]
    fn register_validates_priority_and_period() {
        let mut builder = Kernel::builder();
        assert_eq!(
            builder
                .register(TaskSpec::new("idle", period(), 0), |_: &mut TaskContext| {})
                .unwrap_err(),
            KernelError::InvalidPriority(0)
        );
        assert_eq!(
            builder
                .register(TaskSpec::new("high", period(), 64), |_: &mut TaskContext| {})
                .unwrap_err(),
            KernelError::InvalidPriority(64)
        );
        assert_eq!(
            builder
                .register(
                    TaskSpec::new("zero", Duration::ZERO, 2),
                    |_: &mut TaskContext| {}
                )
                .unwrap_err(),
            KernelError::ZeroPeriod("zero")
        );
        assert!(matches!(
            builder.register(
                TaskSpec::new("odd", Duration::from_millis(250), 2),
                |_: &mut TaskContext| {}
            ),
            Err(KernelError::PeriodNotTickMultiple { name: "odd", .. })
        ));
    }

    #[test]
    fn register_enforces_task_limit() {
        let config = KernelConfig::builder().max_tasks(1).build();
        let mut builder = Kernel::with_config(config);
        builder
            .register(TaskSpec::new("a", period(), 1), |_: &mut TaskContext| {})
            .unwrap();
        assert_eq!(
            builder
                .register(TaskSpec::new("b", period(), 2), |_: &mut TaskContext| {})
                .unwrap_err(),
            KernelError::TooManyTasks(1)
        );
    }

    #[test]
    fn dispatch_runs_highest_priority_first() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut builder = Kernel::builder().with_clock(Arc::new(SimulatedClock::new()));
        let low = builder
            .register(TaskSpec::new("low", period(), 1), recording_job("low", log.clone()))
            .unwrap();
        let high = builder
            .register(TaskSpec::new("high", period(), 9), recording_job("high", log.clone()))
            .unwrap();
        let mid = builder
            .register(TaskSpec::new("mid", period(), 5), recording_job("mid", log.clone()))
            .unwrap();
        let kernel = builder.build();
        kernel.start();

        kernel.release(low.id).unwrap();
        kernel.release(high.id).unwrap();
        kernel.release(mid.id).unwrap();
        kernel.run_until_idle();

        assert_eq!(*log.lock(), vec!["high", "mid", "low"]);
        assert!(!kernel.dispatch_once());
    }

    #[test]
    fn release_of_unknown_task_fails() {
        let kernel = Kernel::builder().build();
        assert_eq!(
            kernel.release(TaskId::new(3)).unwrap_err(),
            KernelError::NotFound(TaskId::new(3))
        );
    }

    #[test]
    fn run_until_stops_at_deadline() {
        let clock = Arc::new(SimulatedClock::with_step(Duration::ZERO));
        let busy_clock = Arc::clone(&clock);
        let mut builder = Kernel::builder().with_clock(clock.clone());
        let slow = builder
            .register(
                TaskSpec::new("slow", period(), 2),
                move |_: &mut TaskContext| busy_clock.advance(Duration::from_millis(150)),
            )
            .unwrap();
        let fast = builder
            .register(TaskSpec::new("fast", period(), 1), |_: &mut TaskContext| {})
            .unwrap();
        let kernel = builder.build();

        kernel.release(slow.id).unwrap();
        kernel.release(fast.id).unwrap();
        assert_eq!(kernel.run_until(Duration::from_millis(100)), 1);
        assert!(kernel.is_ready(fast.id).unwrap());

        assert_eq!(kernel.run_until(Duration::from_millis(200)), 1);
        assert!(!kernel.is_ready(fast.id).unwrap());
    }

    #[test]
    fn trace_hook_sees_release_miss_dispatch_and_idle() {
        let records = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&records);
        let hook: TraceHook = Arc::new(move |record: &TraceRecord| sink.lock().push(*record));

        let mut builder = Kernel::builder()
            .with_trace_hook(hook)
            .with_clock(Arc::new(SimulatedClock::new()));
        let task = builder
            .register(TaskSpec::new("only", period(), 3), |_: &mut TaskContext| {})
            .unwrap();
        let kernel = builder.build();

        kernel.release(task.id).unwrap();
        kernel.release(task.id).unwrap();
        kernel.run_until_idle();

        let recorded = records.lock();
        assert_eq!(
            recorded[0],
            TraceRecord::Released {
                task: task.id,
                release: 1
            }
        );
        assert_eq!(
            recorded[1],
            TraceRecord::Missed {
                task: task.id,
                missed: 1
            }
        );
        assert!(matches!(
            recorded[2],
            TraceRecord::Dispatched { priority: 3, .. }
        ));
        assert_eq!(recorded[2].task(), Some(task.id));
        assert_eq!(recorded[3], TraceRecord::Idle);
        assert_eq!(recorded[3].task(), None);
        assert_eq!(recorded.len(), 4);
        assert_eq!(kernel.stats(task.id).unwrap().missed, 1);
    }
}
