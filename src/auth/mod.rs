//! Message authentication
//!
//! Every inbound message claims a username and carries a base64 signature.
//! The [`KeyStore`] maps usernames to RSA public keys loaded once at startup;
//! an [`Authenticator`] answers whether a signature is valid for the claimed
//! user.
//!
//! ```text
//!   key dir ──load──► KeyStore (immutable, Arc-shared)
//!                          │
//!                          ▼
//!   SignedMessage ──► KeyStoreAuthenticator ──► Ok(true) / Ok(false) / UnknownUser
//! ```
//!
//! The key store is never mutated after load, so verification takes no locks
//! and can run on every connection task concurrently.

pub mod error;
pub mod keystore;
pub mod verifier;

pub use error::{AuthError, KeyFileError, KeyLoadError};
pub use keystore::{KeyStore, SkippedKey, PUBLIC_KEY_EXTENSION};
pub use verifier::{digest, Authenticator, KeyStoreAuthenticator};
