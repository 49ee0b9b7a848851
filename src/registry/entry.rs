//! Per-connection registry entries

use std::time::Instant;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::error::DeliveryError;

/// Unique, monotonically increasing connection identifier
///
/// Ids are never reused within a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered connection's outbound channel
#[derive(Debug)]
pub struct PeerEntry {
    /// Sending half of the connection's bounded queue
    pub(super) tx: mpsc::Sender<Bytes>,

    /// Cancelled when the entry leaves the registry
    pub(super) removed: CancellationToken,

    /// When the connection registered
    pub registered_at: Instant,
}

impl PeerEntry {
    pub(super) fn new(tx: mpsc::Sender<Bytes>, removed: CancellationToken) -> Self {
        Self {
            tx,
            removed,
            registered_at: Instant::now(),
        }
    }
}

/// Result of one fan-out
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Peers the frame was queued for
    pub delivered: usize,

    /// Peers that could not take the frame and were evicted
    pub evicted: Vec<(ConnectionId, DeliveryError)>,
}

impl BroadcastReport {
    /// Number of peers the fan-out targeted
    pub fn attempted(&self) -> usize {
        self.delivered + self.evicted.len()
    }
}
