//! Debug assertion macros for ring buffer and channel invariants.
//!
//! They are only active in debug builds (`#[cfg(debug_assertions)]`), so there
//! is zero overhead in release builds.
//!
//! Used by `RingBuffer<T>` and `Channel<T>`.

// =============================================================================
// INV-RING-01: Cursor Range
// =============================================================================

/// Assert that a cursor stays inside the slot array.
///
/// **Invariant**: `0 ≤ cursor < capacity`
///
/// Used in: `push()` and `pop()` after advancing a cursor
macro_rules! debug_assert_cursor_in_range {
    ($name:literal, $cursor:expr, $capacity:expr) => {
        debug_assert!(
            $cursor < $capacity,
            "INV-RING-01 violated: {} cursor {} outside [0, {})",
            $name,
            $cursor,
            $capacity
        )
    };
}

// =============================================================================
// INV-RING-02: Bounded Occupancy
// =============================================================================

/// Assert that occupancy never exceeds the usable capacity.
///
/// **Invariant**: `0 ≤ len ≤ capacity - 1` (one slot is always kept free)
///
/// Used in: `push()` after writing, `Channel::len()`
macro_rules! debug_assert_bounded_occupancy {
    ($len:expr, $capacity:expr) => {
        debug_assert!(
            $len < $capacity,
            "INV-RING-02 violated: occupancy {} exceeds usable capacity {}",
            $len,
            $capacity - 1
        )
    };
}

// =============================================================================
// INV-CH-01: Slot Conservation
// =============================================================================

/// Assert that the counting semaphores agree with the buffer.
///
/// **Invariant**: `filled + free ≤ capacity - 1`. Equality holds whenever no
/// `send`/`receive` is in flight; while one is, a permit is held by that thread
/// and the sum is lower.
///
/// Used in: `Channel::len()` while holding the buffer permit
macro_rules! debug_assert_slots_conserved {
    ($filled:expr, $free:expr, $usable:expr) => {
        debug_assert!(
            $filled + $free <= $usable,
            "INV-CH-01 violated: filled {} + free {} exceeds usable capacity {}",
            $filled,
            $free,
            $usable
        )
    };
}

// =============================================================================
// Re-exports for crate-internal use
// =============================================================================

pub(crate) use debug_assert_bounded_occupancy;
pub(crate) use debug_assert_cursor_in_range;
pub(crate) use debug_assert_slots_conserved;
