//! Locking primitives shared by every kernel object.
//!
//! All kernel state sits behind `parking_lot` locks. They never poison, so a
//! job that panics inside its release handler leaves the mailbox slots and
//! ready set usable for the remaining tasks.

pub use parking_lot::{Condvar, Mutex, MutexGuard};
pub use std::sync::Arc;
