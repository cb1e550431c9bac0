//! Loom-based concurrency tests for the semaphore channel protocol.
//!
//! Run with: `cargo test --features loom --test loom_tests --release`
//!
//! Loom exhaustively explores all possible thread interleavings to find
//! concurrency bugs that might only occur under specific scheduling.

#![cfg(feature = "loom")]

use loom::cell::UnsafeCell;
use loom::sync::{Arc, Condvar, Mutex};
use loom::thread;

/// Counting semaphore built from loom's mutex and condvar.
///
/// Same shape as `semring::Semaphore`, rebuilt on loom primitives so every
/// lock/wait/notify is a scheduling point.
struct LoomSemaphore {
    count: Mutex<usize>,
    available: Condvar,
}

impl LoomSemaphore {
    fn new(initial: usize) -> Self {
        Self {
            count: Mutex::new(initial),
            available: Condvar::new(),
        }
    }

    fn acquire(&self) {
        let mut count = self.count.lock().unwrap();
        while *count == 0 {
            count = self.available.wait(count).unwrap();
        }
        *count -= 1;
    }

    fn release(&self) {
        let mut count = self.count.lock().unwrap();
        *count += 1;
        self.available.notify_one();
    }

    fn available(&self) -> usize {
        *self.count.lock().unwrap()
    }
}

/// Simplified channel: capacity 3 ring (2 usable slots) plus three semaphores.
///
/// Capacity is kept small to keep the state space manageable for loom's
/// exhaustive search.
struct LoomChannel {
    slots: UnsafeCell<[u64; 3]>,
    write_cursor: UnsafeCell<usize>,
    read_cursor: UnsafeCell<usize>,
    buffer_lock: LoomSemaphore,
    free: LoomSemaphore,
    filled: LoomSemaphore,
}

unsafe impl Send for LoomChannel {}
unsafe impl Sync for LoomChannel {}

impl LoomChannel {
    const CAPACITY: usize = 3;

    fn new() -> Self {
        Self {
            slots: UnsafeCell::new([0; 3]),
            write_cursor: UnsafeCell::new(0),
            read_cursor: UnsafeCell::new(0),
            buffer_lock: LoomSemaphore::new(1),
            free: LoomSemaphore::new(Self::CAPACITY - 1),
            filled: LoomSemaphore::new(0),
        }
    }

    fn send(&self, value: u64) {
        self.free.acquire();
        self.buffer_lock.acquire();

        // SAFETY: buffer_lock is held, so no other thread touches the cursors
        self.write_cursor.with_mut(|w| unsafe {
            let idx = *w;
            self.read_cursor.with(|r| {
                assert_ne!((idx + 1) % Self::CAPACITY, *r, "push into full ring");
            });
            self.slots.with_mut(|s| (*s)[idx] = value);
            *w = (idx + 1) % Self::CAPACITY;
        });

        self.buffer_lock.release();
        self.filled.release();
    }

    fn receive(&self) -> u64 {
        self.filled.acquire();
        self.buffer_lock.acquire();

        // SAFETY: buffer_lock is held, so no other thread touches the cursors
        let value = self.read_cursor.with_mut(|r| unsafe {
            let idx = *r;
            self.write_cursor.with(|w| assert_ne!(*w, idx, "pop from empty ring"));
            let value = self.slots.with(|s| (*s)[idx]);
            *r = (idx + 1) % Self::CAPACITY;
            value
        });

        self.buffer_lock.release();
        self.free.release();
        value
    }
}

/// A released permit always reaches a blocked acquirer.
#[test]
fn loom_semaphore_handoff() {
    loom::model(|| {
        let sem = Arc::new(LoomSemaphore::new(0));
        let sem2 = Arc::clone(&sem);

        let waiter = thread::spawn(move || sem2.acquire());
        sem.release();
        waiter.join().unwrap();

        assert_eq!(sem.available(), 0);
    });
}

/// Two acquirers, two releases: both get through, no permit is lost.
#[test]
fn loom_semaphore_two_waiters() {
    loom::model(|| {
        let sem = Arc::new(LoomSemaphore::new(0));
        let a = {
            let sem = Arc::clone(&sem);
            thread::spawn(move || sem.acquire())
        };
        let b = {
            let sem = Arc::clone(&sem);
            thread::spawn(move || sem.acquire())
        };

        sem.release();
        sem.release();
        a.join().unwrap();
        b.join().unwrap();

        assert_eq!(sem.available(), 0);
    });
}

/// More items than usable slots: the sender must block and resume, and the
/// receiver sees every item in order.
#[test]
fn loom_channel_backpressure_fifo() {
    loom::model(|| {
        let ch = Arc::new(LoomChannel::new());
        let tx = Arc::clone(&ch);

        let sender = thread::spawn(move || {
            for v in 1..=3 {
                tx.send(v);
            }
        });

        let received: Vec<u64> = (0..3).map(|_| ch.receive()).collect();
        sender.join().unwrap();

        assert_eq!(received, [1, 2, 3]);
        assert_eq!(ch.free.available(), LoomChannel::CAPACITY - 1);
        assert_eq!(ch.filled.available(), 0);
    });
}

/// A middle stage that receives from one channel and sends into another.
#[test]
fn loom_chained_channels() {
    loom::model(|| {
        let upstream = Arc::new(LoomChannel::new());
        let downstream = Arc::new(LoomChannel::new());

        let producer = {
            let upstream = Arc::clone(&upstream);
            thread::spawn(move || {
                upstream.send(1);
                upstream.send(2);
            })
        };
        let transformer = {
            let (upstream, downstream) = (Arc::clone(&upstream), Arc::clone(&downstream));
            thread::spawn(move || {
                for _ in 0..2 {
                    let v = upstream.receive();
                    downstream.send(v * 10);
                }
            })
        };

        let first = downstream.receive();
        let second = downstream.receive();
        producer.join().unwrap();
        transformer.join().unwrap();

        assert_eq!((first, second), (10, 20));
    });
}
