use crate::invariants::{debug_assert_bounded_occupancy, debug_assert_cursor_in_range};
use std::fmt;
use std::mem::MaybeUninit;

// =============================================================================
// CURSOR PROTOCOL
// =============================================================================
//
// Two cursors index a fixed slot array:
//
// - `write_cursor`: next slot to write. Advanced by `push`.
// - `read_cursor`:  next slot to read.  Advanced by `pop`.
//
// Both stay in `[0, capacity)` and only move forward, modulo capacity.
//
// ## Reserved Slot
//
// Empty and full are told apart by cursor equality alone:
// - empty: `write_cursor == read_cursor`
// - full:  `(write_cursor + 1) % capacity == read_cursor`
//
// One slot is therefore never used, and at most `capacity - 1` elements are
// held at once.
//
// ## Initialized Range
//
// `slots[i]` is initialized exactly when `i` lies in the half-open cyclic
// range `[read_cursor, write_cursor)`. `push` initializes a slot before
// advancing `write_cursor`; `pop` moves the value out before advancing
// `read_cursor`.
//
// The buffer does no locking. Callers that share it between threads must
// provide mutual exclusion (see `Channel`).
//
// =============================================================================

/// Fixed-capacity circular buffer with independently advancing cursors.
pub struct RingBuffer<T> {
    slots: Box<[MaybeUninit<T>]>,
    write_cursor: usize,
    read_cursor: usize,
}

impl<T> RingBuffer<T> {
    /// Creates an empty ring with `capacity` slots, `capacity - 1` of them usable.
    ///
    /// # Panics
    ///
    /// Panics if `capacity < 2`; such a ring could never hold an element.
    pub fn new(capacity: usize) -> Self {
        assert!(
            capacity >= 2,
            "ring capacity must be at least 2 (one slot is reserved), got {capacity}"
        );
        let slots = std::iter::repeat_with(MaybeUninit::uninit)
            .take(capacity)
            .collect();

        Self {
            slots,
            write_cursor: 0,
            read_cursor: 0,
        }
    }

    // ---------------------------------------------------------------------
    // STATUS
    // ---------------------------------------------------------------------

    /// Total number of slots, including the reserved one.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Maximum number of elements the ring holds at once.
    #[inline]
    pub fn usable_capacity(&self) -> usize {
        self.capacity() - 1
    }

    /// Number of elements currently stored.
    #[inline]
    pub fn len(&self) -> usize {
        (self.write_cursor + self.capacity() - self.read_cursor) % self.capacity()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.write_cursor == self.read_cursor
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.advance(self.write_cursor) == self.read_cursor
    }

    #[inline]
    pub fn write_cursor(&self) -> usize {
        self.write_cursor
    }

    #[inline]
    pub fn read_cursor(&self) -> usize {
        self.read_cursor
    }

    #[inline]
    fn advance(&self, cursor: usize) -> usize {
        (cursor + 1) % self.capacity()
    }

    // ---------------------------------------------------------------------
    // WRITE / READ
    // ---------------------------------------------------------------------

    /// Writes `item` at the write cursor.
    ///
    /// # Panics
    ///
    /// Panics if the ring is full. Callers are expected to have reserved a
    /// slot beforehand (the channel does so with its free-slot semaphore).
    pub fn push(&mut self, item: T) {
        if self.try_push(item).is_err() {
            panic!(
                "push into a full ring (capacity {}, len {})",
                self.capacity(),
                self.len()
            );
        }
    }

    /// Removes the element at the read cursor.
    ///
    /// # Panics
    ///
    /// Panics if the ring is empty. Callers are expected to have claimed an
    /// element beforehand (the channel does so with its filled-slot semaphore).
    pub fn pop(&mut self) -> T {
        match self.try_pop() {
            Some(item) => item,
            None => panic!("pop from an empty ring (capacity {})", self.capacity()),
        }
    }

    /// Writes `item` unless the ring is full, handing it back in that case.
    pub fn try_push(&mut self, item: T) -> Result<(), T> {
        if self.is_full() {
            return Err(item);
        }

        self.slots[self.write_cursor].write(item);
        self.write_cursor = self.advance(self.write_cursor);

        debug_assert_cursor_in_range!("write", self.write_cursor, self.capacity());
        debug_assert_bounded_occupancy!(self.len(), self.capacity());
        Ok(())
    }

    /// Removes the oldest element, or returns `None` if the ring is empty.
    pub fn try_pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }

        // SAFETY: read_cursor != write_cursor, so the slot lies in the
        // initialized range [read_cursor, write_cursor). Advancing the cursor
        // right after moves the slot out of that range, so it is read once.
        let item = unsafe { self.slots[self.read_cursor].assume_init_read() };
        self.read_cursor = self.advance(self.read_cursor);

        debug_assert_cursor_in_range!("read", self.read_cursor, self.capacity());
        Some(item)
    }
}

impl<T> Drop for RingBuffer<T> {
    fn drop(&mut self) {
        // Drop all elements still in the initialized range
        while self.try_pop().is_some() {}
    }
}

impl<T> fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .field("write_cursor", &self.write_cursor)
            .field("read_cursor", &self.read_cursor)
            .finish()
    }
}
