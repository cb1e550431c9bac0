use crate::invariants::debug_assert_slots_conserved;
use crate::metrics::Counters;
use crate::{Metrics, RingBuffer, Semaphore};
use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::fmt;
use std::sync::Arc;

// =============================================================================
// SEMAPHORE PROTOCOL
// =============================================================================
//
// Each channel couples one `RingBuffer` with three semaphores:
//
// - `buffer_lock`: binary semaphore (1 permit) guarding the ring's cursors
// - `free`:        one permit per empty usable slot (starts at capacity - 1)
// - `filled`:      one permit per stored item       (starts at 0)
//
// **send:**    acquire free   → acquire buffer_lock → push → release buffer_lock → release filled
// **receive:** acquire filled → acquire buffer_lock → pop  → release buffer_lock → release free
//
// The capacity semaphore is always taken before `buffer_lock`. Taking them in
// the other order lets a sender hold the lock while waiting for a free slot,
// which blocks the receiver that would free one.
//
// ## Slot Conservation
//
// Outside an in-flight send/receive, `filled + free == capacity - 1`. A thread
// between its two acquires/releases holds one permit, so the sum can only dip
// below that bound, never exceed it.
//
// ## Ring Access
//
// Every access to the `UnsafeCell<RingBuffer>` happens while holding a permit
// of `buffer_lock`, whose internal mutex provides the happens-before edge
// between successive holders. `free` guarantees a push never sees a full ring;
// `filled` guarantees a pop never sees an empty one.
//
// =============================================================================

/// Bounded FIFO channel synchronized only by counting semaphores.
///
/// Handles are cheap to clone and share one underlying buffer. Any number of
/// threads may send and receive; a caller that sends or receives more items
/// than the other side ever matches blocks forever.
pub struct Channel<T> {
    inner: Arc<ChannelInner<T>>,
}

struct ChannelInner<T> {
    ring: UnsafeCell<RingBuffer<T>>,
    buffer_lock: Semaphore,
    /// Taken by senders
    free: CachePadded<Semaphore>,
    /// Taken by receivers
    filled: CachePadded<Semaphore>,
    counters: Counters,
    capacity: usize,
}

// Safety: the ring is only reached through `buffer_lock`, so items move
// between threads but are never shared. That needs `T: Send` only.
unsafe impl<T: Send> Send for ChannelInner<T> {}
unsafe impl<T: Send> Sync for ChannelInner<T> {}

impl<T> ChannelInner<T> {
    fn push_locked(&self, item: T) {
        let _permit = self.buffer_lock.access();
        // SAFETY: the buffer_lock permit gives exclusive access to the ring.
        let ring = unsafe { &mut *self.ring.get() };
        ring.push(item);
        self.counters.record_send();
    }

    fn pop_locked(&self) -> T {
        let _permit = self.buffer_lock.access();
        // SAFETY: the buffer_lock permit gives exclusive access to the ring.
        let ring = unsafe { &mut *self.ring.get() };
        let item = ring.pop();
        self.counters.record_receive();
        item
    }
}

impl<T> Channel<T> {
    /// Creates a channel whose ring has `capacity` slots.
    ///
    /// At most `capacity - 1` items are buffered at once.
    ///
    /// # Panics
    ///
    /// Panics if `capacity < 2`.
    pub fn new(capacity: usize) -> Self {
        let ring = RingBuffer::new(capacity);
        let usable = ring.usable_capacity();

        Self {
            inner: Arc::new(ChannelInner {
                ring: UnsafeCell::new(ring),
                buffer_lock: Semaphore::new(1),
                free: CachePadded::new(Semaphore::new(usable)),
                filled: CachePadded::new(Semaphore::new(0)),
                counters: Counters::default(),
                capacity,
            }),
        }
    }

    // ---------------------------------------------------------------------
    // SEND / RECEIVE
    // ---------------------------------------------------------------------

    /// Sends an item, blocking while the channel is full.
    pub fn send(&self, item: T) {
        self.inner.free.acquire();
        self.inner.push_locked(item);
        self.inner.filled.release();
    }

    /// Receives the oldest item, blocking while the channel is empty.
    pub fn receive(&self) -> T {
        self.inner.filled.acquire();
        let item = self.inner.pop_locked();
        self.inner.free.release();
        item
    }

    /// Sends an item if a slot is free right now, otherwise hands it back.
    ///
    /// Only the wait for a free slot is skipped; the buffer lock is still
    /// taken blocking, after the slot is claimed.
    pub fn try_send(&self, item: T) -> Result<(), T> {
        if !self.inner.free.try_acquire() {
            return Err(item);
        }
        self.inner.push_locked(item);
        self.inner.filled.release();
        Ok(())
    }

    /// Receives the oldest item if one is buffered right now.
    pub fn try_receive(&self) -> Option<T> {
        if !self.inner.filled.try_acquire() {
            return None;
        }
        let item = self.inner.pop_locked();
        self.inner.free.release();
        Some(item)
    }

    // ---------------------------------------------------------------------
    // STATUS
    // ---------------------------------------------------------------------

    /// Slots in the underlying ring, including the reserved one.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Number of items buffered, read under the buffer lock.
    pub fn len(&self) -> usize {
        let _permit = self.inner.buffer_lock.access();
        // SAFETY: the buffer_lock permit gives exclusive access to the ring.
        let ring = unsafe { &*self.inner.ring.get() };

        debug_assert_slots_conserved!(
            self.inner.filled.available(),
            self.inner.free.available(),
            ring.usable_capacity()
        );
        ring.len()
    }

    /// Ring `(write_cursor, read_cursor)`, read under the buffer lock.
    ///
    /// Both are in `[0, capacity)`; they are equal exactly when the channel
    /// is empty.
    pub fn cursors(&self) -> (usize, usize) {
        let _permit = self.inner.buffer_lock.access();
        // SAFETY: the buffer_lock permit gives exclusive access to the ring.
        let ring = unsafe { &*self.inner.ring.get() };
        (ring.write_cursor(), ring.read_cursor())
    }

    /// Returns true if no item is buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Permits currently held by the free-slot semaphore.
    pub fn free_slots(&self) -> usize {
        self.inner.free.available()
    }

    /// Permits currently held by the filled-slot semaphore.
    pub fn filled_slots(&self) -> usize {
        self.inner.filled.available()
    }

    /// Snapshot of the channel's send/receive counters.
    pub fn metrics(&self) -> Metrics {
        self.inner.counters.snapshot()
    }
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("capacity", &self.inner.capacity)
            .field("free_slots", &self.free_slots())
            .field("filled_slots", &self.filled_slots())
            .field("metrics", &self.metrics())
            .finish_non_exhaustive()
    }
}
