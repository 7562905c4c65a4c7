//! Signing key lookup.
//!
//! Keys are produced and stored by external tooling; this module only reads
//! them.

use crate::error::{ChainError, Result};
use crate::types::b64_fixed;
use ed25519_dalek::SigningKey;
use std::fs;
use std::path::{Path, PathBuf};

/// Source of signing keys by signer name.
pub trait KeyProvider {
    fn signing_key(&self, signer: &str) -> Result<SigningKey>;
}

/// Directory of `<signer>.ed25519.sk` files, each holding a base64 32-byte seed.
#[derive(Debug, Clone)]
pub struct KeyDirectory {
    dir: PathBuf,
}

impl KeyDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn key_path(&self, signer: &str) -> PathBuf {
        self.dir.join(format!("{signer}.ed25519.sk"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl KeyProvider for KeyDirectory {
    fn signing_key(&self, signer: &str) -> Result<SigningKey> {
        if signer.is_empty() || signer.contains(['/', '\\']) || signer.starts_with('.') {
            return Err(ChainError::MalformedKey {
                signer: signer.to_string(),
                reason: "signer name is not a valid key file name".to_string(),
            });
        }
        let path = self.key_path(signer);
        let text = fs::read_to_string(&path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => ChainError::MissingKey {
                signer: signer.to_string(),
                path: path.clone(),
            },
            _ => ChainError::io(&path, err),
        })?;
        let seed = b64_fixed::decode::<32>(&text).map_err(|reason| ChainError::MalformedKey {
            signer: signer.to_string(),
            reason,
        })?;
        Ok(SigningKey::from_bytes(&seed))
    }
}
