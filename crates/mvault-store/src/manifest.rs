use std::path::{Path, PathBuf};
use std::sync::Arc;

use mvault_types::Layer;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::metadata::FileMetadata;

/// Schema version written into every manifest.
pub const SCHEMA_VERSION: u32 = 2;

/// Media type written into every manifest.
pub const MANIFEST_MEDIA_TYPE: &str = "application/vnd.docker.distribution.manifest.v2+json";

/// The persisted form of a manifest.
///
/// Field order is the serialization order, which keeps written files
/// byte-for-byte reproducible.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestDocument {
    pub schema_version: u32,
    pub media_type: String,
    pub config: Layer,
    /// Writers that encode an empty list as `null` are accepted.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub layers: Vec<Layer>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Layer>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Layer>>::deserialize(deserializer)?.unwrap_or_default())
}

impl ManifestDocument {
    /// Document with the fixed schema version and media type.
    pub fn new(config: Layer, layers: Vec<Layer>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            media_type: MANIFEST_MEDIA_TYPE.to_string(),
            config,
            layers,
        }
    }

    /// Deterministic encoding: compact JSON followed by a newline.
    pub fn to_bytes(&self) -> StoreResult<Vec<u8>> {
        let mut data =
            serde_json::to_vec(self).map_err(|e| StoreError::Serialization(e.to_string()))?;
        data.push(b'\n');
        Ok(data)
    }
}

/// A manifest together with where it came from.
///
/// Provenance (digest, source path, file metadata, synthetic flag) is fixed at
/// construction. Manifests read from disk are built by the store; synthetic
/// ones by [`Manifest::synthetic`].
#[derive(Clone, Debug)]
pub struct Manifest {
    document: ManifestDocument,
    digest: String,
    source_path: Option<PathBuf>,
    metadata: Arc<dyn FileMetadata>,
    synthetic: bool,
}

impl Manifest {
    pub(crate) fn from_file(
        document: ManifestDocument,
        digest: String,
        source_path: PathBuf,
        metadata: Arc<dyn FileMetadata>,
    ) -> Self {
        Self {
            document,
            digest,
            source_path: Some(source_path),
            metadata,
            synthetic: false,
        }
    }

    /// A manifest with no backing file.
    pub fn synthetic(
        document: ManifestDocument,
        digest: String,
        metadata: Arc<dyn FileMetadata>,
    ) -> Self {
        Self {
            document,
            digest,
            source_path: None,
            metadata,
            synthetic: true,
        }
    }

    pub fn document(&self) -> &ManifestDocument {
        &self.document
    }

    pub fn schema_version(&self) -> u32 {
        self.document.schema_version
    }

    pub fn media_type(&self) -> &str {
        &self.document.media_type
    }

    pub fn config(&self) -> &Layer {
        &self.document.config
    }

    pub fn layers(&self) -> &[Layer] {
        &self.document.layers
    }

    /// Config followed by the data layers.
    pub fn all_layers(&self) -> impl Iterator<Item = &Layer> {
        std::iter::once(&self.document.config).chain(self.document.layers.iter())
    }

    /// Hex SHA-256 of the bytes the manifest was read from.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Location of the backing file; `None` for synthetic manifests.
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn metadata(&self) -> &dyn FileMetadata {
        self.metadata.as_ref()
    }

    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }

    /// Total bytes of the config and all layers.
    pub fn size(&self) -> u64 {
        self.all_layers().map(|layer| layer.size).sum()
    }
}
