//! Broadcast hub
//!
//! The hub ties the authenticator to the client registry. Each connection
//! handler calls [`Hub::connect`] once, then [`Hub::submit`] for every
//! inbound message, and lets its [`Registration`] go when the stream ends.
//!
//! ```text
//!  SignedMessage ──► Authenticator ──✗──► Outcome::Rejected (connection stays open)
//!                         │
//!                         ✓
//!                         ▼
//!               Delivery "<user>: <text>" ──► ClientRegistry::broadcast(exclude sender)
//! ```

pub mod config;
pub mod registration;

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::auth::{AuthError, Authenticator};
use crate::error::Result;
use crate::protocol::{decode_signed, Delivery, SignedMessage};
use crate::registry::{BroadcastReport, ClientRegistry, RegistryConfig};
use crate::stats::{HubStats, HubStatsSnapshot};

pub use config::{HubConfig, SenderPolicy};
pub use registration::Registration;

/// Why a message was not broadcast
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Line was not a signed message record
    Malformed,
    /// No key is registered for the claimed username
    UnknownUser,
    /// Signature did not verify against the user's key
    InvalidSignature,
    /// Sending connection is no longer in the registry
    Deregistered,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::Malformed => write!(f, "malformed message"),
            Rejection::UnknownUser => write!(f, "unknown user"),
            Rejection::InvalidSignature => write!(f, "invalid signature"),
            Rejection::Deregistered => write!(f, "sender deregistered"),
        }
    }
}

/// What happened to one submitted message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Authenticated and fanned out
    Delivered(BroadcastReport),
    /// Dropped without broadcasting
    Rejected(Rejection),
}

impl Outcome {
    /// Whether the message was broadcast
    pub fn is_delivered(&self) -> bool {
        matches!(self, Outcome::Delivered(_))
    }
}

/// Authenticated fan-out hub
pub struct Hub<A: Authenticator> {
    authenticator: A,
    registry: Arc<ClientRegistry>,
    stats: Arc<HubStats>,
    config: HubConfig,
}

impl<A: Authenticator> Hub<A> {
    /// Create a hub with default configuration
    pub fn new(authenticator: A) -> Self {
        Self::with_config(authenticator, HubConfig::default())
    }

    /// Create a hub with custom configuration
    pub fn with_config(authenticator: A, config: HubConfig) -> Self {
        let registry_config = RegistryConfig::default().outbound_capacity(config.outbound_capacity);

        Self {
            authenticator,
            registry: Arc::new(ClientRegistry::with_config(registry_config)),
            stats: Arc::new(HubStats::new()),
            config,
        }
    }

    /// Get the hub configuration
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Get the authenticator
    pub fn authenticator(&self) -> &A {
        &self.authenticator
    }

    /// Get the client registry
    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    /// Current counters
    pub fn stats(&self) -> HubStatsSnapshot {
        self.stats.snapshot()
    }

    /// Register a new connection
    ///
    /// Returns the registration handle and the receiving end of the
    /// connection's outbound queue. The queue closes when the registration is
    /// released or the peer is evicted.
    pub fn connect(&self) -> (Registration, mpsc::Receiver<Bytes>) {
        let (id, rx, removed) = self.registry.register_peer();
        let registration = Registration::new(
            id,
            Arc::clone(&self.registry),
            Arc::clone(&self.stats),
            removed,
        );

        tracing::info!(
            connection_id = %id,
            peers = self.registry.len(),
            "Connection registered"
        );

        (registration, rx)
    }

    /// Authenticate a message and broadcast it if valid
    ///
    /// A rejected message is dropped and reported in the outcome; it never
    /// ends the connection.
    pub fn submit(&self, registration: &Registration, message: &SignedMessage) -> Result<Outcome> {
        if let Some(outcome) = self.reject_deregistered(registration) {
            return Ok(outcome);
        }

        let verdict = self.authenticator.authenticate(
            &message.username,
            &message.signature,
            message.text.as_bytes(),
        );

        let rejection = match verdict {
            Ok(true) => None,
            Ok(false) => Some(Rejection::InvalidSignature),
            Err(AuthError::UnknownUser(_)) => Some(Rejection::UnknownUser),
        };

        if let Some(rejection) = rejection {
            self.stats.record_rejected(rejection);
            tracing::warn!(
                connection_id = %registration.id(),
                message_id = %message.id,
                username = %message.username,
                reason = %rejection,
                "Message rejected"
            );
            return Ok(Outcome::Rejected(rejection));
        }

        let payload = Delivery::from_message(message).to_frame()?;
        let exclude = match self.config.sender_policy {
            SenderPolicy::Exclude => Some(registration.id()),
            SenderPolicy::Include => None,
        };

        let report = self.registry.broadcast(payload, exclude);
        self.stats.record_accepted(report.delivered, report.evicted.len());

        tracing::debug!(
            connection_id = %registration.id(),
            message_id = %message.id,
            username = %message.username,
            delivered = report.delivered,
            evicted = report.evicted.len(),
            "Message broadcast"
        );

        Ok(Outcome::Delivered(report))
    }

    /// Decode one inbound line and submit it
    ///
    /// Undecodable lines are rejected as [`Rejection::Malformed`].
    pub fn submit_frame(&self, registration: &Registration, line: &str) -> Result<Outcome> {
        if let Some(outcome) = self.reject_deregistered(registration) {
            return Ok(outcome);
        }

        match decode_signed(line) {
            Ok(message) => self.submit(registration, &message),
            Err(e) => {
                self.stats.record_rejected(Rejection::Malformed);
                tracing::warn!(
                    connection_id = %registration.id(),
                    error = %e,
                    "Malformed message rejected"
                );
                Ok(Outcome::Rejected(Rejection::Malformed))
            }
        }
    }

    // an evicted peer must not keep broadcasting
    fn reject_deregistered(&self, registration: &Registration) -> Option<Outcome> {
        if registration.is_registered() {
            return None;
        }

        self.stats.record_rejected(Rejection::Deregistered);
        tracing::debug!(
            connection_id = %registration.id(),
            "Message from deregistered connection dropped"
        );
        Some(Outcome::Rejected(Rejection::Deregistered))
    }
}
