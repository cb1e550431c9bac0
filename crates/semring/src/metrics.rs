use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one channel, updated as items pass through it.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    sent: AtomicU64,
    received: AtomicU64,
}

impl Counters {
    #[inline]
    pub(crate) fn record_send(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_receive(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> Metrics {
        Metrics {
            sent: self.sent.load(Ordering::Relaxed),
            received: self.received.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of a channel's traffic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Metrics {
    /// Items that completed `send`.
    pub sent: u64,
    /// Items that completed `receive`.
    pub received: u64,
}

impl Metrics {
    /// Items sent but not yet received at snapshot time.
    pub fn in_flight(&self) -> u64 {
        self.sent.saturating_sub(self.received)
    }
}
