//! sighub: authenticated broadcast hub
//!
//! Peers connect over TCP and send newline-delimited JSON records signed
//! with their RSA private key. The hub verifies each record against the
//! public key registered for the claimed username and, when it checks out,
//! fans `"<username>: <text>"` out to every other connected peer.
//!
//! # Server
//! ```no_run
//! use sighub::{Hub, HubServer, KeyStore, KeyStoreAuthenticator, ServerConfig};
//!
//! # async fn example() -> sighub::Result<()> {
//! let keys = KeyStore::load("keys")?;
//! let hub = Hub::new(KeyStoreAuthenticator::from(keys));
//! let server = HubServer::new(ServerConfig::default(), hub);
//!
//! server.run_until(async {
//!     let _ = tokio::signal::ctrl_c().await;
//! }).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//! - [`auth`]: public key store and signature verification
//! - [`protocol`]: wire records and line framing
//! - [`registry`]: connected peers and fan-out
//! - [`hub`]: authenticate-then-broadcast pipeline
//! - [`server`]: TCP listener and per-connection handler
//! - [`client`]: signing client

pub mod auth;
pub mod client;
pub mod error;
pub mod hub;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;

pub use auth::{Authenticator, KeyStore, KeyStoreAuthenticator};
pub use client::{HubClient, Signer};
pub use error::{Error, Result};
pub use hub::{Hub, HubConfig, Outcome, Rejection, SenderPolicy};
pub use protocol::{Delivery, SignedMessage};
pub use server::{HubServer, ServerConfig};
