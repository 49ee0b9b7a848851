//! Connection state machine
//!
//! Tracks one connection from stream open to close.
//!
//! ```text
//! Connecting ──► Registered ──► Reading ⇄ Delivering
//!      │              │            │          │
//!      └──────────────┴────────────┴──────────┴──► Closed
//! ```

use std::net::SocketAddr;
use std::time::Instant;

use crate::registry::ConnectionId;

/// Connection lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// Stream open, not yet in the registry
    Connecting,
    /// Registered, no message read yet
    Registered,
    /// Waiting for the next inbound message
    Reading,
    /// Authenticating and fanning out a message
    Delivering,
    /// Deregistered; terminal
    Closed,
}

/// Complete connection state
#[derive(Debug)]
pub struct ConnectionState {
    /// Registry id (after registration)
    pub id: Option<ConnectionId>,

    /// Remote peer address, when the transport has one
    pub peer_addr: Option<SocketAddr>,

    /// Current phase
    pub phase: ConnectionPhase,

    /// Stream open time
    pub opened_at: Instant,

    /// Inbound lines processed
    pub messages_received: u64,

    /// Inbound messages that were broadcast
    pub messages_accepted: u64,

    /// Inbound messages that were rejected
    pub messages_rejected: u64,
}

impl ConnectionState {
    /// Create state for a freshly opened stream
    pub fn new(peer_addr: Option<SocketAddr>) -> Self {
        Self {
            id: None,
            peer_addr,
            phase: ConnectionPhase::Connecting,
            opened_at: Instant::now(),
            messages_received: 0,
            messages_accepted: 0,
            messages_rejected: 0,
        }
    }

    /// Registration completed
    pub fn on_registered(&mut self, id: ConnectionId) {
        if self.phase == ConnectionPhase::Connecting {
            self.id = Some(id);
            self.phase = ConnectionPhase::Registered;
        }
    }

    /// Start waiting for the next message
    pub fn start_reading(&mut self) {
        if matches!(
            self.phase,
            ConnectionPhase::Registered | ConnectionPhase::Delivering
        ) {
            self.phase = ConnectionPhase::Reading;
        }
    }

    /// A message arrived and is being processed
    pub fn start_delivering(&mut self) {
        if self.phase == ConnectionPhase::Reading {
            self.phase = ConnectionPhase::Delivering;
            self.messages_received += 1;
        }
    }

    /// Record the result of the message being delivered
    pub fn record_outcome(&mut self, accepted: bool) {
        if accepted {
            self.messages_accepted += 1;
        } else {
            self.messages_rejected += 1;
        }
    }

    /// Close from any phase
    ///
    /// Returns false if the connection was already closed.
    pub fn close(&mut self) -> bool {
        if self.phase == ConnectionPhase::Closed {
            return false;
        }
        self.phase = ConnectionPhase::Closed;
        true
    }

    /// Whether inbound messages may be processed
    pub fn accepts_messages(&self) -> bool {
        matches!(
            self.phase,
            ConnectionPhase::Reading | ConnectionPhase::Delivering
        )
    }

    /// Time since the stream opened
    pub fn duration(&self) -> std::time::Duration {
        self.opened_at.elapsed()
    }
}
