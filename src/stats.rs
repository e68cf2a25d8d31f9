//! Request counters for the responder.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared between the serve loop and scheduled sends
#[derive(Debug, Default)]
pub struct ServerStats {
    received: AtomicU64,
    discarded: AtomicU64,
    dropped: AtomicU64,
    scheduled: AtomicU64,
    sent: AtomicU64,
    send_failed: AtomicU64,
}

/// Point-in-time copy of `ServerStats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Datagrams read from the socket
    pub received: u64,
    /// Malformed frames or JSON, never answered
    pub discarded: u64,
    /// Valid requests whose response was dropped on purpose
    pub dropped: u64,
    /// Responses handed to a delayed send
    pub scheduled: u64,
    /// Responses written to the socket
    pub sent: u64,
    /// Responses the socket refused
    pub send_failed: u64,
}

impl StatsSnapshot {
    /// Responses scheduled but not yet completed.
    pub fn pending(&self) -> u64 {
        self.scheduled
            .saturating_sub(self.sent)
            .saturating_sub(self.send_failed)
    }
}

impl ServerStats {
    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_discarded(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_scheduled(&self) {
        self.scheduled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_send_failed(&self) {
        self.send_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            scheduled: self.scheduled.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
            send_failed: self.send_failed.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot() {
        let stats = ServerStats::default();
        stats.record_received();
        stats.record_received();
        stats.record_discarded();
        stats.record_scheduled();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.received, 2);
        assert_eq!(snapshot.discarded, 1);
        assert_eq!(snapshot.pending(), 1);

        stats.record_sent();
        assert_eq!(stats.snapshot().pending(), 0);
    }
}
