//! Verify signatures stored in an OCI registry next to the image they sign.

use std::collections::BTreeMap;
use std::path::Path;

use oci_client::client::{ClientConfig, ClientProtocol};
use oci_client::secrets::RegistryAuth;
use oci_client::{Client, Reference};
use tokio::runtime::Runtime;
use tracing::{debug, warn};

use super::{verify_layer, Cosign, PublicKey, SignedPayload, SIGNATURE_ANNOTATION};
use crate::errors::{Result, VerificationError};
use crate::reference::ImageReference;

/// How to reach the registry.
#[derive(Debug, Clone, Default)]
pub struct RegistryOptions {
    /// Bearer token; anonymous access when unset.
    pub token: Option<String>,
    /// Talk plain HTTP instead of HTTPS.
    pub insecure: bool,
}

/// [`Cosign`] backed by a live OCI registry.
pub struct RegistryCosign {
    client: Client,
    auth: RegistryAuth,
    runtime: Runtime,
}

impl RegistryCosign {
    /// Build a registry client with its own blocking runtime.
    pub fn new(options: RegistryOptions) -> std::io::Result<Self> {
        let protocol = if options.insecure {
            ClientProtocol::Http
        } else {
            ClientProtocol::Https
        };
        let client = Client::new(ClientConfig {
            protocol,
            ..Default::default()
        });
        let auth = match options.token {
            Some(token) => RegistryAuth::Bearer(token),
            None => RegistryAuth::Anonymous,
        };
        Ok(Self {
            client,
            auth,
            runtime: Runtime::new()?,
        })
    }

    /// Resolve the manifest digest of `image`, preferring a pinned digest.
    async fn manifest_digest(&self, image: &ImageReference) -> Result<String> {
        if let Some(digest) = image.digest() {
            return Ok(digest.to_owned());
        }
        let digest = self
            .client
            .fetch_manifest_digest(image.as_oci(), &self.auth)
            .await
            .map_err(registry_error)?;
        Ok(digest)
    }

    /// Fetch every `(payload, signature)` pair attached to `signatures`.
    async fn signature_layers(&self, signatures: &Reference) -> Result<Vec<(Vec<u8>, String)>> {
        let (manifest, _) = self
            .client
            .pull_image_manifest(signatures, &self.auth)
            .await
            .map_err(registry_error)?;

        let mut layers = Vec::with_capacity(manifest.layers.len());
        for layer in &manifest.layers {
            let Some(signature) = layer
                .annotations
                .as_ref()
                .and_then(|annotations| annotations.get(SIGNATURE_ANNOTATION))
            else {
                debug!(digest = %layer.digest, "Skipping layer without a signature annotation");
                continue;
            };

            let mut payload = Vec::new();
            self.client
                .pull_blob(signatures, layer, &mut payload)
                .await
                .map_err(registry_error)?;
            layers.push((payload, signature.clone()));
        }
        Ok(layers)
    }

    async fn verify_async(
        &self,
        image: &ImageReference,
        key: &PublicKey,
        check_claims: bool,
        annotations: &BTreeMap<String, String>,
    ) -> Result<Vec<SignedPayload>> {
        let digest = self.manifest_digest(image).await?;
        let signatures = image.with_tag(signature_tag(&digest)?);
        debug!(%image, %digest, %signatures, "Fetching signatures");

        let layers = self.signature_layers(&signatures).await?;
        collect_verified(layers, key, check_claims, &digest, annotations).inspect_err(|_| {
            warn!(%image, "No signature matched the supplied key");
        })
    }
}

impl Cosign for RegistryCosign {
    fn load_public_key(&self, key_ref: &str) -> Result<PublicKey> {
        PublicKey::load(Path::new(key_ref))
    }

    fn verify(
        &self,
        image: &ImageReference,
        key: &PublicKey,
        check_claims: bool,
        annotations: &BTreeMap<String, String>,
    ) -> Result<Vec<SignedPayload>> {
        self.runtime
            .block_on(self.verify_async(image, key, check_claims, annotations))
    }
}

/// Tag under which cosign stores the signatures of the manifest `digest`.
pub fn signature_tag(digest: &str) -> std::result::Result<String, VerificationError> {
    match digest.split_once(':') {
        Some((algorithm, hex)) if !algorithm.is_empty() && !hex.is_empty() => {
            Ok(format!("{algorithm}-{hex}.sig"))
        }
        _ => Err(VerificationError::InvalidDigest(digest.to_owned())),
    }
}

/// Keep the layers that verify against `key`, in manifest order. Layers that
/// fail are skipped; if none survive the image counts as unsigned.
pub fn collect_verified(
    layers: Vec<(Vec<u8>, String)>,
    key: &PublicKey,
    check_claims: bool,
    digest: &str,
    annotations: &BTreeMap<String, String>,
) -> Result<Vec<SignedPayload>> {
    let mut verified = Vec::new();
    for (payload, signature) in layers {
        match verify_layer(key, payload, signature, check_claims, digest, annotations) {
            Ok(signed) => {
                debug!(signature = %signed.signature, "Signature verified");
                verified.push(signed);
            }
            Err(e) => debug!("Discarding signature: {e:#}"),
        }
    }

    if verified.is_empty() {
        return Err(VerificationError::NoMatchingSignatures.into());
    }
    Ok(verified)
}

fn registry_error(e: oci_client::errors::OciDistributionError) -> crate::errors::Error {
    VerificationError::Registry(e.to_string()).into()
}

#[cfg(test)]
mod tests {
    use p256::ecdsa::{SigningKey, VerifyingKey};
    use serde_json::json;

    use super::*;
    use crate::cosign::key::tests::{sign, signing_key};
    use crate::errors::Error;

    const DIGEST: &str = "sha256:2c26b46b68ffc68ff99b453c1d30413413422d706483bfa0f98a5e886266e7ae";

    fn claims(digest: &str, tag: &str) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "critical": {
                "image": { "docker-manifest-digest": digest },
                "type": "cosign container image signature",
            },
            "optional": { "tag": tag },
        }))
        .unwrap()
    }

    fn signed_layer(sk: &SigningKey, payload: Vec<u8>) -> (Vec<u8>, String) {
        let signature = sign(sk, &payload);
        (payload, signature)
    }

    fn trusted_key() -> PublicKey {
        PublicKey::from(VerifyingKey::from(&signing_key()))
    }

    #[test]
    fn failing_layers_are_skipped_and_order_kept() {
        let sk = signing_key();
        let stranger = SigningKey::from_slice(&[11u8; 32]).unwrap();
        let layers = vec![
            signed_layer(&sk, claims(DIGEST, "first")),
            signed_layer(&stranger, claims(DIGEST, "stranger")),
            signed_layer(&sk, claims("sha256:elsewhere", "rebound")),
            (claims(DIGEST, "garbled"), "not base64!".to_owned()),
            signed_layer(&sk, claims(DIGEST, "second")),
        ];

        let verified =
            collect_verified(layers, &trusted_key(), true, DIGEST, &BTreeMap::new()).unwrap();

        assert_eq!(
            verified.iter().map(|s| s.payload.clone()).collect::<Vec<_>>(),
            [claims(DIGEST, "first"), claims(DIGEST, "second")]
        );
    }

    #[test]
    fn unchecked_claims_keep_rebound_payloads() {
        let sk = signing_key();
        let layers = vec![
            signed_layer(&sk, claims("sha256:elsewhere", "rebound")),
            signed_layer(&sk, claims(DIGEST, "bound")),
        ];

        let verified =
            collect_verified(layers, &trusted_key(), false, DIGEST, &BTreeMap::new()).unwrap();
        assert_eq!(verified.len(), 2);
    }

    #[test]
    fn annotations_filter_layers() {
        let sk = signing_key();
        let layers = vec![
            signed_layer(&sk, claims(DIGEST, "v1")),
            signed_layer(&sk, claims(DIGEST, "v2")),
        ];
        let wanted: BTreeMap<_, _> = [("tag".to_owned(), "v2".to_owned())].into();

        let verified = collect_verified(layers, &trusted_key(), true, DIGEST, &wanted).unwrap();
        assert_eq!(verified.len(), 1);
        assert_eq!(verified[0].payload, claims(DIGEST, "v2"));
    }

    #[test]
    fn all_bad_layers_mean_no_matching_signatures() {
        let stranger = SigningKey::from_slice(&[11u8; 32]).unwrap();
        let layers = vec![
            signed_layer(&stranger, claims(DIGEST, "a")),
            signed_layer(&stranger, claims(DIGEST, "b")),
        ];

        assert!(matches!(
            collect_verified(layers, &trusted_key(), true, DIGEST, &BTreeMap::new()),
            Err(Error::Verification(VerificationError::NoMatchingSignatures))
        ));
    }

    #[test]
    fn no_layers_mean_no_matching_signatures() {
        assert!(matches!(
            collect_verified(Vec::new(), &trusted_key(), false, DIGEST, &BTreeMap::new()),
            Err(Error::Verification(VerificationError::NoMatchingSignatures))
        ));
    }

    #[test]
    fn signature_tag_replaces_algorithm_separator() {
        assert_eq!(
            signature_tag("sha256:abcdef").as_deref(),
            Ok("sha256-abcdef.sig")
        );
    }

    #[test]
    fn signature_tag_rejects_unqualified_digest() {
        for digest in ["abcdef", ":abcdef", "sha256:"] {
            assert_eq!(
                signature_tag(digest),
                Err(VerificationError::InvalidDigest(digest.to_owned()))
            );
        }
    }
}
