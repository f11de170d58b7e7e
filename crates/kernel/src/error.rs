//! Error types raised during kernel bring-up and by counting semaphores.

use thiserror::Error;

use crate::task::TaskId;

/// Failures of the synchronization primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SyncError {
    /// Signalling would push the count past its configured maximum.
    #[error("semaphore count overflow (max {max})")]
    Overflow { max: usize },
}

pub type SyncResult<T> = Result<T, SyncError>;

/// Configuration and lookup failures reported by the kernel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    #[error("priority {priority} is already taken by task `{existing}`")]
    DuplicatePriority {
        priority: u8,
        existing: &'static str,
    },
    #[error("priority {0} outside 1..={}", crate::kernel::MAX_PRIORITY)]
    InvalidPriority(u8),
    #[error("kernel tick must be non-zero")]
    ZeroTick,
    #[error("task `{0}` has a zero period")]
    ZeroPeriod(&'static str),
    #[error("period of task `{name}` ({period_ms} ms) is not a multiple of the {tick_ms} ms tick")]
    PeriodNotTickMultiple {
        name: &'static str,
        period_ms: u128,
        tick_ms: u128,
    },
    #[error("kernel already holds the maximum of {0} tasks")]
    TooManyTasks(u8),
    #[error("task {0:?} not found")]
    NotFound(TaskId),
}
