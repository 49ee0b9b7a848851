//! Authentication error types

use std::path::PathBuf;

use thiserror::Error;

/// The key directory itself could not be read
///
/// Fatal at startup. Individual unreadable or malformed key files are not
/// errors; they are skipped and reported as [`KeyFileError`].
#[derive(Debug, Error)]
pub enum KeyLoadError {
    /// Listing the directory failed (missing, not a directory, no permission)
    #[error("failed to read key directory {}: {source}", path.display())]
    ReadDir {
        /// Directory that was being scanned
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },
}

/// Why a single key file was skipped during load
#[derive(Debug, Error)]
pub enum KeyFileError {
    /// File contents could not be read
    #[error("unreadable key file: {0}")]
    Read(#[from] std::io::Error),

    /// Contents are not PEM-encoded
    #[error("not a PEM document")]
    NotPem,

    /// PEM block does not hold an RSA public key
    #[error("not an RSA public key: {0}")]
    NotRsa(String),
}

/// Authentication could not be attempted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No key is registered for the claimed username
    #[error("unknown user: {0}")]
    UnknownUser(String),
}
