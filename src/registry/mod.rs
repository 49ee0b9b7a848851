//! Client registry for fan-out
//!
//! The registry tracks every connection that is currently open and
//! registered, keyed by [`ConnectionId`], and owns the sending half of each
//! connection's bounded outbound queue.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<ClientRegistry>
//!                  ┌──────────────────────────────┐
//!                  │ peers: RwLock<HashMap<Id,    │
//!                  │   PeerEntry { tx: mpsc::Tx } │
//!                  │ >>                           │
//!                  └──────────────┬───────────────┘
//!                                 │ snapshot, unlock, try_send
//!         ┌───────────────────────┼───────────────────────┐
//!         ▼                       ▼                       ▼
//!    [Connection 1]          [Connection 2]          [Connection 3]
//!    rx.recv() ──► TCP       rx.recv() ──► TCP       (queue full: evicted)
//! ```
//!
//! # Slow consumers
//!
//! Delivery never waits. `broadcast` copies the peer senders out under a
//! short read lock and then uses `try_send`. A peer whose queue is full or
//! closed is evicted: its entry is removed, its sender dropped, and its
//! connection handler winds down once the queue drains.
//!
//! # Zero-Copy Design
//!
//! Payloads are `bytes::Bytes`, so every peer queue holds a reference-counted
//! handle to the same encoded frame.

pub mod config;
pub mod entry;
pub mod error;
pub mod store;

pub use config::RegistryConfig;
pub use entry::{BroadcastReport, ConnectionId, PeerEntry};
pub use error::DeliveryError;
pub use store::ClientRegistry;
