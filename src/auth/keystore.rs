//! Username to public key mapping
//!
//! Keys are loaded from a flat directory of PEM files, one per user. The file
//! stem is the username: `alice.pub` registers `alice`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::RsaPublicKey;

use super::error::{KeyFileError, KeyLoadError};

/// Extension of files considered during a directory scan
pub const PUBLIC_KEY_EXTENSION: &str = "pub";

const BEGIN_MARKER: &str = "-----BEGIN ";
const SPKI_LABEL: &str = "-----BEGIN PUBLIC KEY-----";
const PKCS1_LABEL: &str = "-----BEGIN RSA PUBLIC KEY-----";

/// A key file that was ignored during [`KeyStore::load`]
#[derive(Debug)]
pub struct SkippedKey {
    /// Path of the skipped file
    pub path: PathBuf,
    /// Why it was skipped
    pub reason: KeyFileError,
}

/// Immutable mapping from username to RSA public key
///
/// Built once at startup and shared behind an `Arc`; there is no reload.
#[derive(Debug, Default)]
pub struct KeyStore {
    keys: HashMap<String, RsaPublicKey>,
    skipped: Vec<SkippedKey>,
}

impl KeyStore {
    /// Load every `*.pub` file in `dir`
    ///
    /// The scan is not recursive. Files that are unreadable, not PEM, or not
    /// RSA keys are skipped with a warning. Only a failure to list the
    /// directory itself is an error.
    ///
    /// Directory enumeration order is unspecified by the OS; files are
    /// processed in sorted name order and a later file wins if two ever map
    /// to the same username.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, KeyLoadError> {
        let dir = dir.as_ref();
        let read_dir_err = |source: std::io::Error| KeyLoadError::ReadDir {
            path: dir.to_path_buf(),
            source,
        };

        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).map_err(read_dir_err)? {
            let path = entry.map_err(read_dir_err)?.path();
            let is_key_file =
                path.extension().and_then(|ext| ext.to_str()) == Some(PUBLIC_KEY_EXTENSION);
            if is_key_file && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut store = Self::default();
        for path in paths {
            let Some(username) = path.file_stem().and_then(|stem| stem.to_str()) else {
                tracing::warn!(path = %path.display(), "Skipping key file with non UTF-8 name");
                continue;
            };
            let username = username.to_string();

            match fs::read_to_string(&path)
                .map_err(KeyFileError::from)
                .and_then(|pem| Self::parse_public_key(&pem))
            {
                Ok(key) => store.insert(username, key),
                Err(reason) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %reason,
                        "Skipping key file"
                    );
                    store.skipped.push(SkippedKey { path, reason });
                }
            }
        }

        tracing::info!(
            dir = %dir.display(),
            users = store.len(),
            skipped = store.skipped.len(),
            "Key store loaded"
        );

        Ok(store)
    }

    /// Build a store from keys already in memory
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = (S, RsaPublicKey)>,
        S: Into<String>,
    {
        let mut store = Self::default();
        for (username, key) in keys {
            store.insert(username.into(), key);
        }
        store
    }

    /// Parse a PEM public key
    ///
    /// Accepts SubjectPublicKeyInfo (`PUBLIC KEY`) holding an RSA key, and
    /// PKCS#1 (`RSA PUBLIC KEY`). Any text before the first `BEGIN` line is
    /// ignored.
    pub fn parse_public_key(pem: &str) -> Result<RsaPublicKey, KeyFileError> {
        let pem = match pem.find(BEGIN_MARKER) {
            Some(start) => &pem[start..],
            None => return Err(KeyFileError::NotPem),
        };

        if pem.starts_with(SPKI_LABEL) {
            RsaPublicKey::from_public_key_pem(pem).map_err(|e| KeyFileError::NotRsa(e.to_string()))
        } else if pem.starts_with(PKCS1_LABEL) {
            RsaPublicKey::from_pkcs1_pem(pem).map_err(|e| KeyFileError::NotRsa(e.to_string()))
        } else {
            let label = pem.lines().next().unwrap_or_default();
            Err(KeyFileError::NotRsa(format!("unsupported PEM block {label}")))
        }
    }

    fn insert(&mut self, username: String, key: RsaPublicKey) {
        if self.keys.insert(username.clone(), key).is_some() {
            tracing::warn!(username = %username, "Duplicate key for user, keeping the later one");
        }
    }

    /// Look up the key registered for `username`
    pub fn get(&self, username: &str) -> Option<&RsaPublicKey> {
        self.keys.get(username)
    }

    /// Whether `username` has a registered key
    pub fn contains(&self, username: &str) -> bool {
        self.keys.contains_key(username)
    }

    /// Number of registered users
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no user has a key
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Registered usernames, sorted
    pub fn usernames(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.keys.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Files ignored by the last [`KeyStore::load`]
    pub fn skipped(&self) -> &[SkippedKey] {
        &self.skipped
    }
}
