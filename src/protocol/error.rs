//! Transport error types

use thiserror::Error;
use tokio_util::codec::LinesCodecError;

/// Failure of a connection's byte stream
///
/// Always connection-scoped: the handler that hits one closes its own
/// connection and nothing else.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Socket read or write failed
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Peer sent a line longer than the configured limit
    #[error("frame exceeds {max} bytes")]
    FrameTooLong {
        /// Configured maximum frame length
        max: usize,
    },
}

impl TransportError {
    pub(crate) fn from_codec(err: LinesCodecError, max: usize) -> Self {
        match err {
            LinesCodecError::MaxLineLengthExceeded => TransportError::FrameTooLong { max },
            LinesCodecError::Io(e) => TransportError::Io(e),
        }
    }
}
