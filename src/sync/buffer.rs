//! Blocking bounded buffer for producer/consumer pipelines.
//!
//! A fixed-capacity circular queue shared by any number of producer and
//! consumer threads. Capacity gating is delegated to two counting semaphores
//! (`filled` and `empty` slots) while a per-buffer mutex protects only the
//! slot array and its two cursors.
//!
//! # Overview
//!
//! - [`BoundedBuffer::put`] blocks while the buffer is full, then stores one item
//! - [`BoundedBuffer::get`] blocks while the buffer is empty, then removes one item
//! - FIFO for a single producer and single consumer; no loss and no
//!   duplication for any number of either
//!
//! # Example
//!
//! ```
//! use weir::BoundedBuffer;
//!
//! let buffer = BoundedBuffer::new(2)?;
//!
//! buffer.put((1, 1));
//! buffer.put((2, 2));
//! assert_eq!(buffer.get(), (1, 1));
//! assert_eq!(buffer.get(), (2, 2));
//! # Ok::<(), weir::BufferError>(())
//! ```
//!
//! # Locking discipline
//!
//! The mutex is held only across the cursor-advance-and-copy step, never
//! across a semaphore wait. A producer blocked on a full buffer therefore
//! holds no lock, and a consumer is always free to make space for it. Folding
//! the semaphores into the mutex would deadlock: "space available" could
//! never be signaled while a blocked producer held the lock.

use std::fmt;
use std::fmt::Write as _;
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::sync::sem::Semaphore;
use crate::trace::trace;

/// Errors from bounded buffer construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BufferError {
    /// Capacity zero would deadlock permanently: no slot could ever be
    /// vacant, so the first `put` would block forever.
    #[error("bounded buffer capacity must be greater than zero")]
    ZeroCapacity,
}

/// The slot array and its cursors. Everything in here is only touched with
/// the buffer's mutex held.
struct Ring<T> {
    /// `Some` while a slot holds an unread item, `None` while vacant. The
    /// semaphores make a filled slot at `head` (or a vacant slot at `tail`)
    /// unreachable; hitting one means the accounting is corrupt.
    slots: Box<[Option<T>]>,
    /// Next slot to write. Wraps to 0 at capacity.
    head: usize,
    /// Next slot to read. Wraps to 0 at capacity.
    tail: usize,
}

impl<T> Ring<T> {
    /// Advances a cursor to the next slot index, wrapping to 0 at capacity.
    fn bump(&self, cursor: usize) -> usize {
        let next = cursor + 1;
        if next == self.slots.len() { 0 } else { next }
    }
}

/// A fixed-capacity blocking FIFO queue.
///
/// Built from one mutex and two counting semaphores: `filled` counts unread
/// items, `empty` counts vacant slots, and `filled + empty == capacity` holds
/// whenever no operation is mid-flight.
///
/// # Thread Safety
///
/// All operations take `&self`; share the buffer between threads via `Arc`
/// (or a scoped borrow). Teardown is `Drop`: the buffer cannot be freed while
/// any thread still blocked in `put` or `get` keeps it alive.
pub struct BoundedBuffer<T> {
    ring: Mutex<Ring<T>>,
    /// Units of unread items. `get` waits on this, `put` signals it.
    filled: Semaphore,
    /// Units of vacant slots. `put` waits on this, `get` signals it.
    empty: Semaphore,
    capacity: usize,
}

impl<T: Send> BoundedBuffer<T> {
    /// Creates a buffer with room for `capacity` items.
    ///
    /// The slot array is allocated up front; `put` and `get` never allocate.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::ZeroCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, BufferError> {
        if capacity == 0 {
            return Err(BufferError::ZeroCapacity);
        }

        let slots = std::iter::repeat_with(|| None).take(capacity).collect();

        Ok(Self {
            ring: Mutex::new(Ring {
                slots,
                head: 0,
                tail: 0,
            }),
            filled: Semaphore::new(0),
            empty: Semaphore::new(capacity),
            capacity,
        })
    }

    /// Locks the ring, recovering from poison.
    ///
    /// The critical sections below keep the cursors and the `Option` slots in
    /// step before releasing the guard, so the state behind a poisoned lock
    /// is still consistent.
    fn lock_ring(&self) -> MutexGuard<'_, Ring<T>> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts `item`, blocking while the buffer is full.
    ///
    /// Exactly one vacant slot becomes filled, and at most one blocked
    /// [`get`](Self::get) caller is woken. Items land in slot order; with a
    /// single producer, consumers see them in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if the slot accounting is corrupt (an unread item found at the
    /// write cursor). This fails fast instead of overwriting data.
    pub fn put(&self, item: T) {
        self.empty.wait();
        {
            let mut ring = self.lock_ring();
            let head = ring.head;
            let next = ring.bump(head);
            assert!(
                ring.slots[head].is_none(),
                "slot {head} still holds an unread item"
            );
            ring.slots[head] = Some(item);
            ring.head = next;
            trace!(slot = head, "put");
        }
        self.filled.signal();
    }

    /// Removes and returns the oldest item, blocking while the buffer is
    /// empty.
    ///
    /// Exactly one filled slot becomes vacant, and at most one blocked
    /// [`put`](Self::put) caller is woken.
    ///
    /// # Panics
    ///
    /// Panics if the slot accounting is corrupt (no item found at the read
    /// cursor).
    pub fn get(&self) -> T {
        self.filled.wait();
        let item = {
            let mut ring = self.lock_ring();
            let tail = ring.tail;
            let next = ring.bump(tail);
            let item = ring.slots[tail]
                .take()
                .unwrap_or_else(|| panic!("slot {tail} is vacant"));
            ring.tail = next;
            trace!(slot = tail, "get");
            item
        };
        self.empty.signal();
        item
    }

    /// Maximum number of items the buffer can hold.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of unread items currently buffered.
    ///
    /// Diagnostic only: concurrent `put`/`get` calls may change the answer
    /// before the caller sees it.
    #[must_use]
    pub fn len(&self) -> usize {
        self.filled.count()
    }

    /// Whether the buffer currently holds no unread items. Same staleness
    /// caveat as [`len`](Self::len).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Renders a snapshot of the buffer state for debugging.
    ///
    /// The ring lock is taken briefly for a consistent read, but the snapshot
    /// is stale the moment it returns. Best-effort output for humans, not an
    /// observation primitive.
    #[must_use]
    pub fn dump(&self) -> String
    where
        T: fmt::Debug,
    {
        let ring = self.lock_ring();

        let mut out = String::new();
        let _ = writeln!(out, "---- bounded buffer ----");
        let _ = writeln!(out, "capacity: {}", self.capacity);
        let _ = writeln!(out, "    head: {}", ring.head);
        let _ = writeln!(out, "    tail: {}", ring.tail);
        for (i, slot) in ring.slots.iter().enumerate() {
            match slot {
                Some(item) => {
                    let _ = writeln!(out, " slot[{i}]: {item:?}");
                }
                None => {
                    let _ = writeln!(out, " slot[{i}]: <vacant>");
                }
            }
        }
        let _ = writeln!(out, "------------------------");
        out
    }
}
