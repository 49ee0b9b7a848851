//! Crate-level error type
//!
//! Each layer has its own error enum; this one aggregates them for callers
//! that drive the hub end to end (binaries, the client library).

use thiserror::Error;

use crate::auth::{AuthError, KeyLoadError};
use crate::client::SignerError;
use crate::protocol::TransportError;

/// Errors surfaced by the hub, server and client APIs
#[derive(Debug, Error)]
pub enum Error {
    /// The key directory could not be read at startup
    #[error(transparent)]
    KeyLoad(#[from] KeyLoadError),

    /// Authentication could not be attempted
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The connection's byte stream failed
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A message could not be signed
    #[error(transparent)]
    Signer(#[from] SignerError),

    /// A wire record could not be encoded or decoded
    #[error("malformed wire record: {0}")]
    Codec(#[from] serde_json::Error),

    /// Socket setup failed (bind, connect, accept)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for hub operations
pub type Result<T> = std::result::Result<T, Error>;
