//! Statistics for the hub

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::hub::Rejection;

/// Hub-wide counters
///
/// Updated lock-free from every connection task; read with [`HubStats::snapshot`].
#[derive(Debug)]
pub struct HubStats {
    started_at: Instant,
    connections_opened: AtomicU64,
    connections_closed: AtomicU64,
    messages_accepted: AtomicU64,
    rejected_malformed: AtomicU64,
    rejected_unknown_user: AtomicU64,
    rejected_invalid_signature: AtomicU64,
    rejected_deregistered: AtomicU64,
    deliveries: AtomicU64,
    evictions: AtomicU64,
}

impl HubStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            connections_opened: AtomicU64::new(0),
            connections_closed: AtomicU64::new(0),
            messages_accepted: AtomicU64::new(0),
            rejected_malformed: AtomicU64::new(0),
            rejected_unknown_user: AtomicU64::new(0),
            rejected_invalid_signature: AtomicU64::new(0),
            rejected_deregistered: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub(crate) fn record_open(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_close(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_accepted(&self, delivered: usize, evicted: usize) {
        self.messages_accepted.fetch_add(1, Ordering::Relaxed);
        self.deliveries.fetch_add(delivered as u64, Ordering::Relaxed);
        self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self, rejection: Rejection) {
        let counter = match rejection {
            Rejection::Malformed => &self.rejected_malformed,
            Rejection::UnknownUser => &self.rejected_unknown_user,
            Rejection::InvalidSignature => &self.rejected_invalid_signature,
            Rejection::Deregistered => &self.rejected_deregistered,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> HubStatsSnapshot {
        let opened = self.connections_opened.load(Ordering::Relaxed);
        let closed = self.connections_closed.load(Ordering::Relaxed);

        HubStatsSnapshot {
            uptime: self.started_at.elapsed(),
            connections_opened: opened,
            active_connections: opened.saturating_sub(closed),
            messages_accepted: self.messages_accepted.load(Ordering::Relaxed),
            rejected_malformed: self.rejected_malformed.load(Ordering::Relaxed),
            rejected_unknown_user: self.rejected_unknown_user.load(Ordering::Relaxed),
            rejected_invalid_signature: self.rejected_invalid_signature.load(Ordering::Relaxed),
            rejected_deregistered: self.rejected_deregistered.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

impl Default for HubStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy of [`HubStats`] at one instant
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HubStatsSnapshot {
    /// Time since the hub was created
    pub uptime: Duration,
    /// Total connections ever registered
    pub connections_opened: u64,
    /// Connections currently registered
    pub active_connections: u64,
    /// Messages that passed authentication
    pub messages_accepted: u64,
    /// Lines that were not a valid signed message
    pub rejected_malformed: u64,
    /// Messages from usernames with no key
    pub rejected_unknown_user: u64,
    /// Messages whose signature did not verify
    pub rejected_invalid_signature: u64,
    /// Messages from connections already evicted or closed
    pub rejected_deregistered: u64,
    /// Frames queued to peers
    pub deliveries: u64,
    /// Peers evicted as unresponsive
    pub evictions: u64,
}

impl HubStatsSnapshot {
    /// All rejected messages regardless of reason
    pub fn rejected(&self) -> u64 {
        self.rejected_malformed
            + self.rejected_unknown_user
            + self.rejected_invalid_signature
            + self.rejected_deregistered
    }
}
