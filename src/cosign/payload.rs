//! Signed payloads and the claims they carry.
//!
//! Payloads follow the "simple signing" JSON layout written by `cosign sign`:
//! a `critical` section binding the signature to a manifest digest, and an
//! `optional` section holding free-form annotations.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;

use super::PublicKey;

/// The bytes of one signature that verified against the caller's key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPayload {
    /// Raw signed payload, printed verbatim by the `verify` command.
    pub payload: Vec<u8>,
    /// Base64 signature that verified `payload`.
    pub signature: String,
}

/// Claims embedded in a cosign container image signature payload.
#[derive(Debug, Clone, Deserialize)]
pub struct SimpleSigning {
    pub critical: Critical,
    #[serde(default)]
    pub optional: Option<BTreeMap<String, Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Critical {
    pub image: Image,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    #[serde(rename = "docker-manifest-digest")]
    pub docker_manifest_digest: String,
}

impl SimpleSigning {
    /// Parse a payload blob.
    #[inline]
    pub fn from_slice(payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload).context("Failed to parse signed payload")
    }

    /// Whether the payload is bound to the manifest with `digest`.
    #[inline]
    pub fn satisfies_digest(&self, digest: &str) -> bool {
        self.critical.image.docker_manifest_digest == digest
    }

    /// Whether every requested annotation is present with the same value.
    /// Extra annotations in the payload are ignored.
    pub fn satisfies_annotations(&self, annotations: &BTreeMap<String, String>) -> bool {
        if annotations.is_empty() {
            return true;
        }
        let Some(optional) = &self.optional else {
            return false;
        };
        annotations
            .iter()
            .all(|(key, value)| matches!(optional.get(key), Some(Value::String(v)) if v == value))
    }
}

/// Check one signature layer: the signature must verify against `key`, and
/// if `check_claims` is set the payload must be bound to `digest` and carry
/// `annotations`.
pub fn verify_layer(
    key: &PublicKey,
    payload: Vec<u8>,
    signature: String,
    check_claims: bool,
    digest: &str,
    annotations: &BTreeMap<String, String>,
) -> Result<SignedPayload> {
    key.verify(&payload, &signature)?;

    if check_claims {
        let claims = SimpleSigning::from_slice(&payload)?;
        if !claims.satisfies_digest(digest) {
            bail!(
                "Payload is bound to {}, not {digest}",
                claims.critical.image.docker_manifest_digest
            );
        }
        if !claims.satisfies_annotations(annotations) {
            bail!("Payload annotations do not match the requested claims");
        }
    }

    Ok(SignedPayload { payload, signature })
}
