//! Kernel trace records.
//!
//! A [`TraceHook`] installed on the kernel receives one record per release,
//! missed release, dispatch and idle transition.

use core::time::Duration;

use crate::sync::Arc;
use crate::task::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceRecord {
    /// The release layer posted a release to the task.
    Released { task: TaskId, release: u64 },
    /// A release found the task's pending slot full.
    Missed { task: TaskId, missed: u64 },
    /// The task's job was dispatched at `at`.
    Dispatched {
        task: TaskId,
        priority: u8,
        at: Duration,
    },
    /// No task was ready.
    Idle,
}

impl TraceRecord {
    pub fn task(&self) -> Option<TaskId> {
        match self {
            Self::Released { task, .. }
            | Self::Missed { task, .. }
            | Self::Dispatched { task, .. } => Some(*task),
            Self::Idle => None,
        }
    }
}

pub type TraceHook = Arc<dyn Fn(&TraceRecord) + Send + Sync>;
