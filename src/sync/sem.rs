//! Counting semaphore built on a mutex and condition variable.
//!
//! # Overview
//!
//! - [`Semaphore::wait`] blocks until the count is positive, then takes one unit
//! - [`Semaphore::signal`] returns one unit and wakes at most one blocked waiter
//! - No timeout, no cancellation: `wait` blocks until a matching `signal`
//!
//! The count is guarded by a mutex and waiters park on a condition variable,
//! so there is no busy-waiting and no lost wakeup: a `signal` issued while no
//! thread is blocked still increments the count, and a later `wait` observes
//! it.
//!
//! The indefinite-blocking contract is deliberate. The producer/consumer and
//! rendezvous callers rely on `wait` returning only after a matching unit is
//! available; a timeout variant would force them to handle spurious
//! empty/full transitions.
//!
//! # Example
//!
//! ```
//! use weir::Semaphore;
//!
//! let sem = Semaphore::new(2);
//! sem.wait();
//! sem.wait();
//! assert!(!sem.try_wait());
//! sem.signal();
//! assert!(sem.try_wait());
//! ```

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::trace::trace;

/// A counting semaphore.
///
/// Holds a non-negative count of available units. The count is `usize`, so a
/// negative initial value is unrepresentable rather than a checked caller
/// error.
///
/// # Thread Safety
///
/// All operations take `&self`; share the semaphore between threads via
/// `Arc` (or a scoped borrow). Dropping a semaphore while a thread is blocked
/// in [`wait`](Self::wait) is ruled out by ownership: the blocked thread
/// itself keeps the semaphore alive.
#[derive(Debug)]
pub struct Semaphore {
    count: Mutex<usize>,
    available: Condvar,
}

impl Semaphore {
    /// Creates a semaphore with `initial` units available.
    #[must_use]
    pub fn new(initial: usize) -> Self {
        Self {
            count: Mutex::new(initial),
            available: Condvar::new(),
        }
    }

    /// Locks the count, recovering from poison.
    ///
    /// The guarded value is a bare counter mutated in single `+= 1`/`-= 1`
    /// steps; a thread that panics elsewhere while holding the guard cannot
    /// leave the count mid-update, so the value behind a poisoned lock is
    /// still consistent.
    fn lock_count(&self) -> MutexGuard<'_, usize> {
        self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until the count is positive, then decrements it by one.
    ///
    /// The zero-check and the decrement happen under a single lock
    /// acquisition: two waiters can never both decrement for one unit, and
    /// the count never goes negative. The condition is re-checked in a loop,
    /// so spurious condvar wakeups are harmless.
    pub fn wait(&self) {
        let mut count = self.lock_count();
        while *count == 0 {
            trace!("semaphore at zero, blocking");
            count = self
                .available
                .wait(count)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *count -= 1;
    }

    /// Decrements the count and returns `true` if a unit was available,
    /// otherwise returns `false` without blocking.
    pub fn try_wait(&self) -> bool {
        let mut count = self.lock_count();
        if *count == 0 {
            return false;
        }
        *count -= 1;
        true
    }

    /// Increments the count by one and wakes at most one blocked waiter.
    ///
    /// The increment is durable: if no thread is currently blocked, the unit
    /// stays available for a later [`wait`](Self::wait).
    pub fn signal(&self) {
        let mut count = self.lock_count();
        *count += 1;
        trace!(count = *count, "semaphore signaled");
        self.available.notify_one();
    }

    /// Returns the current count.
    ///
    /// Diagnostic only: the value may be stale by the time the caller looks
    /// at it.
    #[must_use]
    pub fn count(&self) -> usize {
        *self.lock_count()
    }
}
