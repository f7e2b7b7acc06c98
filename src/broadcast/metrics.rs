use std::sync::atomic::{AtomicU64, Ordering};

use super::BroadcastSummary;

/// Counters across every broadcast a broadcaster has run
#[derive(Debug, Default)]
pub struct BroadcastMetrics {
    /// Deadline broadcasts completed
    pub broadcasts: AtomicU64,
    /// sync_dns requests handed to a proxy
    pub requests_dispatched: AtomicU64,
    pub requests_succeeded: AtomicU64,
    pub requests_failed: AtomicU64,
    pub requests_unresponsive: AtomicU64,
    pub cancellations_issued: AtomicU64,
    /// Lookups or calls that failed before reaching an agent
    pub dispatch_failures: AtomicU64,
    pub arp_deliveries: AtomicU64,
}

/// Point-in-time copy of `BroadcastMetrics`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub broadcasts: u64,
    pub requests_dispatched: u64,
    pub requests_succeeded: u64,
    pub requests_failed: u64,
    pub requests_unresponsive: u64,
    pub cancellations_issued: u64,
    pub dispatch_failures: u64,
    pub arp_deliveries: u64,
}

impl BroadcastMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_dispatched(&self) {
        self.requests_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_cancellations(&self) {
        self.cancellations_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_dispatch_failures(&self) {
        self.dispatch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_arp_deliveries(&self) {
        self.arp_deliveries.fetch_add(1, Ordering::Relaxed);
    }

    /// Fold a finished broadcast into the totals
    pub fn record(&self, summary: &BroadcastSummary) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
        self.requests_succeeded
            .fetch_add(summary.successful as u64, Ordering::Relaxed);
        self.requests_failed
            .fetch_add(summary.failed as u64, Ordering::Relaxed);
        self.requests_unresponsive
            .fetch_add(summary.unresponsive as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            requests_dispatched: self.requests_dispatched.load(Ordering::Relaxed),
            requests_succeeded: self.requests_succeeded.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            requests_unresponsive: self.requests_unresponsive.load(Ordering::Relaxed),
            cancellations_issued: self.cancellations_issued.load(Ordering::Relaxed),
            dispatch_failures: self.dispatch_failures.load(Ordering::Relaxed),
            arp_deliveries: self.arp_deliveries.load(Ordering::Relaxed),
        }
    }
}
