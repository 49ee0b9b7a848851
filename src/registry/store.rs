//! Client registry implementation
//!
//! The one contended structure in the hub. Every connection handler
//! registers, broadcasts through, and deregisters from a single shared
//! instance.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use super::config::RegistryConfig;
use super::entry::{BroadcastReport, ConnectionId, PeerEntry};
use super::error::DeliveryError;

/// Registry of connected peers
///
/// Mutations take the write lock briefly; `broadcast` only holds the read
/// lock long enough to copy out the senders, never while delivering.
#[derive(Debug)]
pub struct ClientRegistry {
    /// Map of connection id to outbound channel
    peers: RwLock<HashMap<ConnectionId, PeerEntry>>,

    /// Next id to hand out
    next_id: AtomicU64,

    /// Configuration
    config: RegistryConfig,
}

impl ClientRegistry {
    /// Create a new registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            peers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register an outbound channel and allocate its id
    pub fn register(&self, tx: mpsc::Sender<Bytes>) -> ConnectionId {
        self.insert(tx, CancellationToken::new())
    }

    /// Create a bounded outbound queue and register its sender
    ///
    /// The registry keeps the only sender, so the receiver observes the
    /// channel closing once the peer is deregistered or evicted.
    pub fn register_channel(&self) -> (ConnectionId, mpsc::Receiver<Bytes>) {
        let (id, rx, _removed) = self.register_peer();
        (id, rx)
    }

    /// Like [`register_channel`](Self::register_channel), also returning a
    /// token that is cancelled as soon as the peer leaves the registry
    ///
    /// A handler whose writer is stuck on a dead socket never sees its queue
    /// close; the token lets it stop anyway.
    pub fn register_peer(&self) -> (ConnectionId, mpsc::Receiver<Bytes>, CancellationToken) {
        let (tx, rx) = mpsc::channel(self.config.outbound_capacity.max(1));
        let removed = CancellationToken::new();
        let id = self.insert(tx, removed.clone());
        (id, rx, removed)
    }

    fn insert(&self, tx: mpsc::Sender<Bytes>, removed: CancellationToken) -> ConnectionId {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let peers = {
            let mut peers = self.peers.write();
            peers.insert(id, PeerEntry::new(tx, removed));
            peers.len()
        };

        tracing::debug!(connection_id = %id, peers = peers, "Peer registered");
        id
    }

    /// Remove a peer
    ///
    /// Returns whether the id was present. Removing an unknown or already
    /// removed id is a no-op. The peer's removal token is cancelled.
    pub fn deregister(&self, id: ConnectionId) -> bool {
        let removed = self.peers.write().remove(&id);

        if let Some(entry) = removed {
            entry.removed.cancel();
            tracing::debug!(
                connection_id = %id,
                connected_for_ms = entry.registered_at.elapsed().as_millis() as u64,
                "Peer deregistered"
            );
            true
        } else {
            false
        }
    }

    /// Queue `payload` for every registered peer except `exclude`
    ///
    /// Never blocks and never fails. Peers that cannot accept the frame are
    /// evicted and listed in the report.
    pub fn broadcast(&self, payload: Bytes, exclude: Option<ConnectionId>) -> BroadcastReport {
        let targets: Vec<(ConnectionId, mpsc::Sender<Bytes>)> = self
            .peers
            .read()
            .iter()
            .filter(|(id, _)| Some(**id) != exclude)
            .map(|(id, entry)| (*id, entry.tx.clone()))
            .collect();

        let mut report = BroadcastReport::default();
        for (id, tx) in targets {
            match tx.try_send(payload.clone()) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => report.evicted.push((id, DeliveryError::Full)),
                Err(TrySendError::Closed(_)) => report.evicted.push((id, DeliveryError::Closed)),
            }
        }

        for (id, reason) in &report.evicted {
            if self.deregister(*id) {
                tracing::warn!(connection_id = %id, reason = %reason, "Evicted unresponsive peer");
            }
        }

        report
    }

    /// Whether `id` is currently registered
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.peers.read().contains_key(&id)
    }

    /// Number of registered peers
    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    /// Whether no peer is registered
    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }

    /// Ids of all registered peers, in no particular order
    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.peers.read().keys().copied().collect()
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}
