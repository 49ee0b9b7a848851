//! Hub server
//!
//! TCP front end for the hub: accepts connections and runs one
//! [`Connection`] handler per peer.

pub mod config;
pub mod connection;
pub mod listener;

pub use config::ServerConfig;
pub use connection::{CloseReason, Connection};
pub use listener::HubServer;
