//! Single-slot overwrite mailboxes carrying sampled values between tasks.
//!
//! A mailbox holds at most one value. Publishing replaces it unconditionally;
//! readers see either the newest value they have not observed yet or nothing.
//! There is no queueing and no loss detection: a reader that misses several
//! publishes only ever sees the latest one.
//!
//! Writers and readers are separate types. [`mailbox`] hands out exactly one
//! [`Publisher`], which is not `Clone`, so a channel cannot acquire a second
//! producer after construction. The [`Mailbox`] side can be cloned freely and
//! turned into any number of independent [`Reader`]s or [`Sampled`] caches.

use core::time::Duration;
use std::time::Instant;

use crate::sync::{Arc, Condvar, Mutex};

struct Slot<T> {
    value: Option<T>,
    seq: u64,
}

struct Shared<T> {
    name: &'static str,
    slot: Mutex<Slot<T>>,
    published: Condvar,
}

/// Creates an empty mailbox and its sole publisher.
pub fn mailbox<T: Clone>(name: &'static str) -> (Publisher<T>, Mailbox<T>) {
    let shared = Arc::new(Shared {
        name,
        slot: Mutex::new(Slot {
            value: None,
            seq: 0,
        }),
        published: Condvar::new(),
    });
    (
        Publisher {
            shared: Arc::clone(&shared),
        },
        Mailbox { shared },
    )
}

/// Write side of a mailbox.
pub struct Publisher<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Clone> Publisher<T> {
    /// Overwrites the slot and wakes readers blocked in [`Reader::try_read`].
    pub fn publish(&self, value: T) {
        let mut slot = self.shared.slot.lock();
        slot.value = Some(value);
        slot.seq = slot.seq.wrapping_add(1);
        drop(slot);
        self.shared.published.notify_all();
    }
}

/// Read side of a mailbox.
pub struct Mailbox<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Mailbox<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Clone> Mailbox<T> {
    pub fn name(&self) -> &'static str {
        self.shared.name
    }

    /// Latest published value, regardless of who has seen it.
    pub fn peek(&self) -> Option<T> {
        self.shared.slot.lock().value.clone()
    }

    /// Number of publishes so far.
    pub fn publish_count(&self) -> u64 {
        self.shared.slot.lock().seq
    }

    /// New reader that has observed nothing yet; a value already in the slot
    /// counts as fresh for it.
    pub fn reader(&self) -> Reader<T> {
        Reader {
            shared: Arc::clone(&self.shared),
            seen: 0,
        }
    }

    /// Reader with a last-known-good cache seeded with `initial`.
    pub fn sampled(&self, initial: T) -> Sampled<T> {
        Sampled {
            reader: self.reader(),
            last: initial,
        }
    }
}

/// Cursor over a mailbox tracking which publish this reader saw last.
pub struct Reader<T> {
    shared: Arc<Shared<T>>,
    seen: u64,
}

impl<T: Clone> Reader<T> {
    /// Returns the slot value if it was published after this reader's last
    /// successful read, waiting up to `timeout` for such a publish.
    /// `Duration::ZERO` makes this a pure non-blocking peek.
    pub fn try_read(&mut self, timeout: Duration) -> Option<T> {
        let mut slot = self.shared.slot.lock();
        if slot.seq == self.seen && !timeout.is_zero() {
            let deadline = Instant::now() + timeout;
            while slot.seq == self.seen {
                if self
                    .shared
                    .published
                    .wait_until(&mut slot, deadline)
                    .timed_out()
                {
                    break;
                }
            }
        }

        if slot.seq == self.seen {
            return None;
        }
        self.seen = slot.seq;
        slot.value.clone()
    }
}

/// Reader that falls back to the last value it observed when nothing new has
/// been published.
pub struct Sampled<T> {
    reader: Reader<T>,
    last: T,
}

impl<T: Clone> Sampled<T> {
    /// Non-blocking sample: the fresh value if there is one, else the cached
    /// one. Never returns a default once a value has been observed.
    pub fn sample(&mut self) -> T {
        if let Some(value) = self.reader.try_read(Duration::ZERO) {
            self.last = value;
        }
        self.last.clone()
    }

    /// Like [`sample`](Self::sample) but also reports whether the value was
    /// freshly published since the previous sample.
    pub fn sample_fresh(&mut self) -> (T, bool) {
        match self.reader.try_read(Duration::ZERO) {
            Some(value) => {
                self.last = value;
                (self.last.clone(), true)
            }
            None => (self.last.clone(), false),
        }
    }

    /// Cached value without touching the mailbox.
    pub fn last(&self) -> &T {
        &self.last
    }
}
