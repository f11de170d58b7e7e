use thiserror::Error;

use cruise_kernel::KernelError;

/// Bring-up and tick-loop failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CruiseError {
    #[error(transparent)]
    Kernel(#[from] KernelError),
    #[error("task `{higher}` (priority {higher_priority}) must outrank `{lower}` (priority {lower_priority})")]
    PriorityInversion {
        higher: &'static str,
        higher_priority: u8,
        lower: &'static str,
        lower_priority: u8,
    },
    #[error("period of task `{task}` ({period_ms} ms) is not a non-zero multiple of the {tick_ms} ms tick")]
    InvalidPeriod {
        task: &'static str,
        period_ms: u128,
        tick_ms: u128,
    },
    #[error("extra-load level {level} exceeds the maximum of {max}")]
    LoadLevel { level: u32, max: u8 },
}
