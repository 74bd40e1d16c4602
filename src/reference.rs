//! Canonical container image references.

use std::fmt;

use oci_client::Reference;

use crate::errors::{Error, Result};

/// A syntactically valid `host[:port]/repository[:tag|@digest]` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    inner: Reference,
}

impl ImageReference {
    /// Parse a user-supplied image reference.
    pub fn parse(input: &str) -> Result<Self> {
        let inner = input.parse::<Reference>().map_err(|e| Error::Reference {
            input: input.to_owned(),
            reason: e.to_string(),
        })?;
        Ok(Self { inner })
    }

    /// The registry host, as written by the user (e.g. `docker.io`).
    #[inline]
    pub fn registry(&self) -> &str {
        self.inner.registry()
    }

    #[inline]
    pub fn repository(&self) -> &str {
        self.inner.repository()
    }

    /// The digest pinned by the reference, if any.
    #[inline]
    pub fn digest(&self) -> Option<&str> {
        self.inner.digest()
    }

    /// Derive a reference to `tag` within the same repository.
    pub fn with_tag(&self, tag: String) -> Reference {
        Reference::with_tag(self.registry().to_owned(), self.repository().to_owned(), tag)
    }

    /// Borrow the underlying registry reference.
    #[inline]
    pub fn as_oci(&self) -> &Reference {
        &self.inner
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.whole())
    }
}
