//! Registry error types

use thiserror::Error;

/// A frame could not be queued for one peer
///
/// Never returned from `broadcast`; recorded in the
/// [`BroadcastReport`](super::BroadcastReport) and converted into eviction of
/// that peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// Peer's outbound queue is at capacity
    #[error("outbound queue full")]
    Full,
    /// Peer's connection handler has gone away
    #[error("outbound queue closed")]
    Closed,
}
