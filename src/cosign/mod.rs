//! The signing library seam.
//!
//! Everything cryptographic or registry related happens behind [`Cosign`],
//! so the orchestration in [`crate::verify`] can run against fakes.

mod key;
mod payload;
mod registry;

use std::collections::BTreeMap;

pub use key::PublicKey;
pub use payload::{verify_layer, SignedPayload};
pub use registry::{RegistryCosign, RegistryOptions};

use crate::errors::Result;
use crate::reference::ImageReference;

/// Layer annotation holding the base64 signature over the layer blob.
pub const SIGNATURE_ANNOTATION: &str = "dev.cosignproject.cosign/signature";

/// Capabilities the verify command needs from a signing library.
pub trait Cosign {
    /// Load a public key from `key_ref`.
    fn load_public_key(&self, key_ref: &str) -> Result<PublicKey>;

    /// Return the payloads of every signature on `image` that verifies
    /// against `key`, or an error when none do.
    ///
    /// When `check_claims` is set, only payloads whose claims match the
    /// image digest and contain every entry of `annotations` are returned.
    fn verify(
        &self,
        image: &ImageReference,
        key: &PublicKey,
        check_claims: bool,
        annotations: &BTreeMap<String, String>,
    ) -> Result<Vec<SignedPayload>>;
}
