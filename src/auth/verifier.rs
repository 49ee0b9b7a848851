//! Signature verification

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rsa::Pkcs1v15Sign;
use sha2::{Digest, Sha256};

use super::error::AuthError;
use super::keystore::KeyStore;

/// Decides whether a claimed signature is valid for a user
///
/// Implementations must be pure: the answer depends only on the arguments and
/// the implementation's immutable key material. The hub calls this from every
/// connection task without synchronization.
pub trait Authenticator: Send + Sync + 'static {
    /// Check `signature` (base64) over `message` for `username`
    ///
    /// Returns `Ok(false)` for any signature that does not verify, including
    /// undecodable ones. Returns [`AuthError::UnknownUser`] when no key is
    /// registered for `username`.
    fn authenticate(&self, username: &str, signature: &str, message: &[u8])
        -> Result<bool, AuthError>;
}

/// SHA-256 digest of the signed payload
pub fn digest(message: &[u8]) -> Vec<u8> {
    Sha256::digest(message).to_vec()
}

/// Authenticator backed by a [`KeyStore`]
///
/// Verifies RSASSA-PKCS1-v1_5 signatures over the SHA-256 digest of the
/// message text.
#[derive(Debug, Clone)]
pub struct KeyStoreAuthenticator {
    keys: Arc<KeyStore>,
}

impl KeyStoreAuthenticator {
    /// Create an authenticator over a loaded key store
    pub fn new(keys: Arc<KeyStore>) -> Self {
        Self { keys }
    }

    /// The underlying key store
    pub fn keys(&self) -> &KeyStore {
        &self.keys
    }
}

impl From<KeyStore> for KeyStoreAuthenticator {
    fn from(keys: KeyStore) -> Self {
        Self::new(Arc::new(keys))
    }
}

impl Authenticator for KeyStoreAuthenticator {
    fn authenticate(
        &self,
        username: &str,
        signature: &str,
        message: &[u8],
    ) -> Result<bool, AuthError> {
        let key = self
            .keys
            .get(username)
            .ok_or_else(|| AuthError::UnknownUser(username.to_string()))?;

        let signature = match BASE64.decode(signature.trim()) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(username = %username, error = %e, "Signature is not valid base64");
                return Ok(false);
            }
        };

        let hashed = digest(message);
        match key.verify(Pkcs1v15Sign::new::<Sha256>(), &hashed, &signature) {
            Ok(()) => Ok(true),
            Err(e) => {
                tracing::debug!(
                    username = %username,
                    signature_len = signature.len(),
                    error = %e,
                    "Signature verification failed"
                );
                Ok(false)
            }
        }
    }
}
