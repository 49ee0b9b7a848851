//! RAII handle for a registered connection

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::registry::{ClientRegistry, ConnectionId};
use crate::stats::HubStats;

/// A connection's membership in the hub
///
/// Deregisters exactly once, either on [`Registration::close`] or when
/// dropped. Handler tasks that panic or get cancelled still leave the
/// registry clean.
#[derive(Debug)]
pub struct Registration {
    id: ConnectionId,
    registry: Arc<ClientRegistry>,
    stats: Arc<HubStats>,
    removed: CancellationToken,
    released: bool,
}

impl Registration {
    pub(super) fn new(
        id: ConnectionId,
        registry: Arc<ClientRegistry>,
        stats: Arc<HubStats>,
        removed: CancellationToken,
    ) -> Self {
        stats.record_open();
        Self {
            id,
            registry,
            stats,
            removed,
            released: false,
        }
    }

    /// Connection id allocated by the registry
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Whether the connection is still in the registry
    ///
    /// Turns false after close, or if the registry evicted this peer.
    pub fn is_registered(&self) -> bool {
        !self.released && !self.removed.is_cancelled()
    }

    /// Completes once the connection has left the registry
    ///
    /// Fires on eviction as well as on close, so a handler can stop even
    /// when its outbound queue never drains.
    pub async fn removed(&self) {
        self.removed.cancelled().await
    }

    /// Leave the hub
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.registry.deregister(self.id);
        self.stats.record_close();
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.release();
    }
}
