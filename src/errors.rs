//! Error taxonomy of the `verify` command.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the verification path.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can stop a verification.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing command-line arguments.
    #[error("usage error: {0}")]
    Usage(String),

    /// The image reference does not follow the registry naming grammar.
    #[error("invalid image reference {input:?}: {reason}")]
    Reference { input: String, reason: String },

    /// The public key could not be read or decoded.
    #[error("failed to load public key from {}: {reason}", .path.display())]
    KeyLoad { path: PathBuf, reason: String },

    /// The collaborator refused to vouch for the image.
    #[error(transparent)]
    Verification(#[from] VerificationError),
}

/// Failures reported by a [`crate::cosign::Cosign`] implementation while
/// verifying an image.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VerificationError {
    /// Not a single signature survived cryptographic and claim checks.
    #[error("no matching signatures")]
    NoMatchingSignatures,

    /// Fetching manifests or blobs from the registry failed.
    #[error("registry error: {0}")]
    Registry(String),

    /// The registry returned a digest we cannot derive a signature tag from.
    #[error("invalid manifest digest {0:?}")]
    InvalidDigest(String),
}
