//! Hub client implementation
//!
//! Provides the client side of the protocol:
//! - Signing messages with a user's RSA private key
//! - Connecting to a hub, sending signed messages and receiving deliveries

pub mod connector;
pub mod signer;

pub use connector::{HubClient, HubReceiver, HubSender};
pub use signer::{Signer, SignerError};
