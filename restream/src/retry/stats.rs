//! Counters describing what a retry link has done.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters for one retry link.
#[derive(Debug, Default)]
pub struct LinkStats {
    forwarded: AtomicU64,
    discarded: AtomicU64,
    retries: AtomicU64,
    recoveries: AtomicU64,
    connections: AtomicU64,
}

/// A point-in-time copy of [`LinkStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LinkStatsSnapshot {
    /// Items handed to the consumer.
    pub items_forwarded: u64,
    /// Items swallowed because they triggered a retry.
    pub items_discarded: u64,
    /// Retries triggered by the predicate.
    pub retries: u64,
    /// Recovery runs that finished and led to re-attaching upstream.
    pub recoveries_completed: u64,
    /// Connections opened, to either producer.
    pub connections_opened: u64,
}

impl LinkStats {
    pub(crate) fn record_forward(&self) {
        self.forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_retry(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_recovery(&self) {
        self.recoveries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_connection(&self) {
        self.connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of items forwarded downstream.
    #[must_use]
    pub fn items_forwarded(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }

    /// Returns the number of retries triggered.
    #[must_use]
    pub fn retries(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }

    /// Copies all counters.
    #[must_use]
    pub fn snapshot(&self) -> LinkStatsSnapshot {
        LinkStatsSnapshot {
            items_forwarded: self.forwarded.load(Ordering::Relaxed),
            items_discarded: self.discarded.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            recoveries_completed: self.recoveries.load(Ordering::Relaxed),
            connections_opened: self.connections.load(Ordering::Relaxed),
        }
    }

    /// Converts the counters to a JSON object.
    #[must_use]
    pub fn to_dict(&self) -> serde_json::Value {
        serde_json::to_value(self.snapshot()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_default() {
        let stats = LinkStats::default();
        assert_eq!(stats.snapshot(), LinkStatsSnapshot::default());
    }

    #[test]
    fn test_stats_recording() {
        let stats = LinkStats::default();
        stats.record_connection();
        stats.record_forward();
        stats.record_retry();
        stats.record_connection();
        stats.record_recovery();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.items_forwarded, 1);
        assert_eq!(snapshot.items_discarded, 1);
        assert_eq!(snapshot.retries, 1);
        assert_eq!(snapshot.recoveries_completed, 1);
        assert_eq!(snapshot.connections_opened, 2);
    }

    #[test]
    fn test_stats_to_dict() {
        let stats = LinkStats::default();
        stats.record_forward();

        let dict = stats.to_dict();
        assert_eq!(dict["items_forwarded"], 1);
        assert_eq!(dict["retries"], 0);
    }
}
