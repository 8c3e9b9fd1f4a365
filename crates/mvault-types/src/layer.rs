use serde::{Deserialize, Serialize};

use crate::digest::Digest;
use crate::error::TypeError;

/// One content-addressed unit referenced by a manifest.
///
/// The digest is kept as the string found on the wire so that a manifest with
/// an unusual digest still decodes; [`Layer::parsed_digest`] validates it when
/// the blob itself has to be located.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    /// Blob semantics (config, weights, template, ...).
    pub media_type: String,
    /// `<algorithm>:<hex>` content hash of the blob. Empty only for layers
    /// that were never persisted.
    #[serde(default)]
    pub digest: String,
    /// Byte length of the blob.
    pub size: u64,
}

impl Layer {
    /// Create a layer from a media type, digest, and size.
    pub fn new(media_type: impl Into<String>, digest: impl Into<String>, size: u64) -> Self {
        Self {
            media_type: media_type.into(),
            digest: digest.into(),
            size,
        }
    }

    /// Create a layer from an already validated digest.
    pub fn with_digest(media_type: impl Into<String>, digest: Digest, size: u64) -> Self {
        Self::new(media_type, digest.to_string(), size)
    }

    /// Returns `true` if the layer refers to a blob.
    pub fn has_digest(&self) -> bool {
        !self.digest.is_empty()
    }

    /// Validate and parse the digest.
    pub fn parsed_digest(&self) -> Result<Digest, TypeError> {
        Digest::parse(&self.digest)
    }
}
