//! Host runtime loop tying the clock, release dispatcher and kernel together.

use core::time::Duration;

use log::debug;

use crate::clock::ClockRef;
use crate::error::KernelError;
use crate::kernel::{Kernel, KernelBuilder};
use crate::release::Dispatcher;
use crate::sync::Arc;

/// What happened during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Index of the tick just processed, starting at 0.
    pub tick: u64,
    pub released: usize,
    pub missed: usize,
    /// Jobs run before the next tick instant.
    pub jobs: usize,
    /// The clock had already passed this tick's instant when it was processed.
    pub late: bool,
}

/// Drives a kernel from its clock.
///
/// Tick `n` is due at `n * tick`. [`step`](Self::step) waits for that instant,
/// posts the releases due on it, then dispatches until tick `n + 1` is due.
/// When a job overruns, the ticks it spanned are processed back to back with
/// no dispatch window of their own.
pub struct Runtime {
    kernel: Arc<Kernel>,
    dispatcher: Dispatcher,
    clock: ClockRef,
    tick: Duration,
    ticks: u64,
}

impl Runtime {
    pub fn new(kernel: Arc<Kernel>) -> Self {
        let dispatcher = Dispatcher::new(Arc::clone(&kernel));
        let clock = kernel.clock();
        let tick = kernel.config().tick;
        Self {
            kernel,
            dispatcher,
            clock,
            tick,
            ticks: 0,
        }
    }

    /// Builds and starts the kernel, then wraps it.
    pub fn with_builder(builder: KernelBuilder) -> Self {
        let kernel = Arc::new(builder.build());
        kernel.start();
        Self::new(kernel)
    }

    pub fn kernel(&self) -> Arc<Kernel> {
        Arc::clone(&self.kernel)
    }

    /// Ticks processed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn step(&mut self) -> Result<TickReport, KernelError> {
        let tick = self.ticks;
        let due = self.instant_of(tick);
        let late = self.clock.now() > due;
        self.clock.sleep_until(due);

        let releases = self.dispatcher.tick()?;
        let jobs = self.kernel.run_until(self.instant_of(tick + 1));
        self.ticks += 1;

        if late {
            debug!("tick {tick} processed late");
        }
        Ok(TickReport {
            tick,
            released: releases.posted,
            missed: releases.missed,
            jobs,
            late,
        })
    }

    pub fn run_ticks(&mut self, count: u64) -> Result<(), KernelError> {
        for _ in 0..count {
            self.step()?;
        }
        Ok(())
    }

    /// Steps until `keep_going` returns `false`. Returns the ticks processed.
    pub fn run_while<F>(&mut self, mut keep_going: F) -> Result<u64, KernelError>
    where
        F: FnMut(&TickReport) -> bool,
    {
        let start = self.ticks;
        loop {
            let report = self.step()?;
            if !keep_going(&report) {
                return Ok(self.ticks - start);
            }
        }
    }

    fn instant_of(&self, tick: u64) -> Duration {
        let nanos = u64::try_from(self.tick.as_nanos()).unwrap_or(u64::MAX);
        Duration::from_nanos(nanos.saturating_mul(tick))
    }
}
