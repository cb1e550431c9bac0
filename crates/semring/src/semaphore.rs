use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

// =============================================================================
// COUNTING SEMAPHORE
// =============================================================================
//
// Built from a mutex-protected count and a condition variable:
//
// - `acquire` takes the lock, waits on the condvar while `count == 0`, then
//   decrements. The wait is a loop so spurious wake-ups are harmless.
// - `release` takes the lock, increments, and notifies one waiter.
//
// The count never goes below zero: a thread that would take it negative
// blocks instead. The count is only touched while the lock is held.
//
// The internal lock guards a single integer that is updated in one statement,
// so a poisoned lock still holds a consistent value and is recovered rather
// than propagated.
//
// =============================================================================

/// Counting semaphore with blocking `acquire` and waking `release`.
#[derive(Debug)]
pub struct Semaphore {
    count: Mutex<usize>,
    available: Condvar,
}

impl Semaphore {
    /// Creates a semaphore holding `initial` permits.
    pub const fn new(initial: usize) -> Self {
        Self {
            count: Mutex::new(initial),
            available: Condvar::new(),
        }
    }

    /// Blocks until a permit is available, then takes it.
    pub fn acquire(&self) {
        let mut count = self.lock();
        while *count == 0 {
            count = self
                .available
                .wait(count)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *count -= 1;
    }

    /// Takes a permit if one is immediately available.
    pub fn try_acquire(&self) -> bool {
        let mut count = self.lock();
        if *count == 0 {
            return false;
        }
        *count -= 1;
        true
    }

    /// Returns a permit and wakes one blocked waiter.
    pub fn release(&self) {
        let mut count = self.lock();
        *count += 1;
        self.available.notify_one();
    }

    /// Acquires a permit that is returned when the guard is dropped.
    pub fn access(&self) -> Permit<'_> {
        self.acquire();
        Permit { semaphore: self }
    }

    /// Snapshot of the number of permits currently available.
    pub fn available(&self) -> usize {
        *self.lock()
    }

    #[inline]
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// RAII permit returned by [`Semaphore::access`].
#[derive(Debug)]
#[must_use = "the permit is released as soon as it is dropped"]
pub struct Permit<'a> {
    semaphore: &'a Semaphore,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.semaphore.release();
    }
}
