//! Verify the signatures attached to a container image.

use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::debug;

use crate::annotations::AnnotationSet;
use crate::cosign::{Cosign, SignedPayload};
use crate::errors::{self, Error};
use crate::reference::ImageReference;

/// Warning printed before payloads whose claims were not checked.
pub const UNCHECKED_CLAIMS_WARNING: &str = "Warning: the following claims have not been verified:";

/// How much of a signature's payload was vouched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trust {
    /// Signature and claims both verified.
    Full,
    /// Signature verified, claims left unchecked.
    SignatureOnly,
}

/// Result of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified {
    pub payloads: Vec<SignedPayload>,
    pub trust: Trust,
}

/// Execute the `verify` command.
pub fn command<C: Cosign>(
    cosign: &C,
    key: String,
    image: String,
    check_claims: bool,
    annotations: AnnotationSet,
) -> Result<()> {
    if key.is_empty() {
        return Err(Error::Usage("a public key must be supplied with --key".to_owned()).into());
    }
    let verified = verify(cosign, &key, &image, check_claims, &annotations)?;
    render(&verified, &mut io::stdout().lock(), &mut io::stderr().lock())
        .context("Failed to write verified payloads")
}

/// Parse `image_ref`, load the key at `key_ref` and ask `cosign` to verify
/// the image, stopping at the first failure.
pub fn verify<C: Cosign + ?Sized>(
    cosign: &C,
    key_ref: &str,
    image_ref: &str,
    check_claims: bool,
    annotations: &AnnotationSet,
) -> errors::Result<Verified> {
    let reference = ImageReference::parse(image_ref)?;
    debug!(%reference, "Resolved image reference");

    let public_key = cosign.load_public_key(key_ref)?;
    debug!(key = key_ref, "Loaded public key");

    let payloads = cosign.verify(&reference, &public_key, check_claims, annotations.snapshot())?;
    debug!(count = payloads.len(), "Verified signatures");

    let trust = if check_claims {
        Trust::Full
    } else {
        Trust::SignatureOnly
    };
    Ok(Verified { payloads, trust })
}

/// Write the warning (if any) to `err`, then one payload per line to `out`.
pub fn render<O: Write, E: Write>(verified: &Verified, out: &mut O, err: &mut E) -> io::Result<()> {
    if verified.trust == Trust::SignatureOnly {
        writeln!(err, "{UNCHECKED_CLAIMS_WARNING}")?;
        err.flush()?;
    }
    for signed in &verified.payloads {
        out.write_all(&signed.payload)?;
        out.write_all(b"\n")?;
    }
    out.flush()
}
