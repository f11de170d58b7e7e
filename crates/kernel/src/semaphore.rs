//! Counting semaphore used as the per-task release counter.

use crate::error::{SyncError, SyncResult};
use crate::sync::{Arc, Mutex};

/// Counting semaphore with an upper bound on outstanding signals.
///
/// The kernel posts one signal per periodic release and takes one per job
/// run. With the bound at 1 a task that falls behind keeps a single pending
/// release and every further post fails with [`SyncError::Overflow`].
#[derive(Clone)]
pub struct Semaphore {
    inner: Arc<Mutex<SemaphoreInner>>,
}

struct SemaphoreInner {
    count: usize,
    max_count: usize,
}

impl Semaphore {
    /// Creates an unbounded semaphore with the given initial count.
    pub fn new(initial_count: usize) -> Self {
        Self::with_max(initial_count, usize::MAX)
    }

    /// Creates a semaphore with initial and maximum counts.
    pub fn with_max(initial_count: usize, max_count: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SemaphoreInner {
                count: initial_count.min(max_count),
                max_count,
            })),
        }
    }

    /// Creates a binary semaphore (max count = 1).
    pub fn binary() -> Self {
        Self::with_max(0, 1)
    }

    /// Takes one count if available. Never blocks.
    pub fn try_wait(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.count > 0 {
            inner.count -= 1;
            true
        } else {
            false
        }
    }

    /// Adds one count, failing when the maximum is already reached.
    pub fn signal(&self) -> SyncResult<()> {
        let mut inner = self.inner.lock();
        if inner.count >= inner.max_count {
            return Err(SyncError::Overflow {
                max: inner.max_count,
            });
        }
        inner.count += 1;
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.inner.lock().count
    }

    pub fn max_count(&self) -> usize {
        self.inner.lock().max_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_semaphore_overflows_on_second_signal() {
        let sem = Semaphore::binary();
        assert!(sem.signal().is_ok());
        assert_eq!(sem.signal(), Err(SyncError::Overflow { max: 1 }));
        assert_eq!(sem.count(), 1);

        assert!(sem.try_wait());
        assert!(!sem.try_wait());
        assert!(sem.signal().is_ok());
    }

    #[test]
    fn initial_count_is_capped_by_max() {
        let sem = Semaphore::with_max(5, 2);
        assert_eq!(sem.count(), 2);
        assert_eq!(sem.max_count(), 2);
    }

    #[test]
    fn unbounded_semaphore_counts_up() {
        let sem = Semaphore::new(0);
        for _ in 0..10 {
            sem.signal().unwrap();
        }
        assert_eq!(sem.count(), 10);
    }
}
