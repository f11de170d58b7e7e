//! # cruise-kernel
//!
//! A small fixed-priority periodic task kernel for host simulation of
//! real-time control loops. Tasks are run-to-completion jobs released by
//! tick-driven countdown timers and exchange data through single-slot
//! overwrite mailboxes.
//!
//! ## Module Overview
//! - [`clock`]     – Monotonic time sources, wall and virtual.
//! - [`mailbox`]   – Single-producer sampled value channels.
//! - [`semaphore`] – Bounded counting semaphore backing task releases.
//! - [`task`]      – Periodic job abstraction and per-task statistics.
//! - [`kernel`]    – Priority dispatcher and kernel configuration.
//! - [`release`]   – Tick-to-release countdown timers.
//! - [`runtime`]   – Clock-paced tick loop.
//! - [`trace`]     – Scheduling trace records.

pub mod clock;
pub mod error;
pub mod kernel;
pub mod mailbox;
pub mod release;
pub mod runtime;
pub mod scheduler;
pub mod semaphore;
pub mod sync;
pub mod task;
pub mod trace;

pub use clock::{Clock, ClockRef, SimulatedClock, SystemClock};
pub use error::{KernelError, SyncError};
pub use kernel::{Kernel, KernelBuilder, KernelConfig, KernelConfigBuilder, MAX_PRIORITY};
pub use mailbox::{mailbox, Mailbox, Publisher, Reader, Sampled};
pub use release::{Dispatcher, ReleaseLayer};
pub use runtime::{Runtime, TickReport};
pub use semaphore::Semaphore;
pub use task::{PeriodicJob, TaskContext, TaskHandle, TaskId, TaskSpec, TaskStats};
pub use trace::{TraceHook, TraceRecord};
