//! Public keys produced by `cosign generate-key-pair`.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use p256::ecdsa::signature::Verifier;
use p256::ecdsa::{Signature, VerifyingKey};
use p256::pkcs8::DecodePublicKey;

use crate::errors::Error;

/// Public key used to verify image signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    inner: VerifyingKey,
}

impl PublicKey {
    /// Read a PEM encoded ECDSA P-256 public key from the given path.
    pub fn load(path: &Path) -> crate::errors::Result<Self> {
        let key_load_error = |reason: String| Error::KeyLoad {
            path: path.to_owned(),
            reason,
        };

        let key_data = fs::read_to_string(path).map_err(|e| key_load_error(e.to_string()))?;
        if key_data.trim().is_empty() {
            return Err(key_load_error("key file is empty".to_owned()));
        }

        Self::from_pem(&key_data).map_err(|e| key_load_error(format!("{e:#}")))
    }

    /// Decode a PEM encoded ECDSA P-256 public key.
    pub fn from_pem(pem: &str) -> Result<Self> {
        VerifyingKey::from_public_key_pem(pem.trim())
            .map(Self::from)
            .map_err(|e| anyhow!("{e}"))
            .context("Failed to decode public key")
    }

    /// Verify a base64 encoded DER signature over `msg`.
    pub fn verify(&self, msg: &[u8], signature_b64: &str) -> Result<()> {
        let der = BASE64
            .decode(signature_b64.trim())
            .context("Failed to decode base64 signature")?;
        let signature = Signature::from_der(&der).context("Failed to parse ECDSA signature")?;

        self.inner
            .verify(msg, &signature)
            .context("Failed to verify signature")
    }
}

impl From<VerifyingKey> for PublicKey {
    #[inline]
    fn from(inner: VerifyingKey) -> Self {
        Self { inner }
    }
}
