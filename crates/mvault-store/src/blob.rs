use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use mvault_types::Digest;

use crate::error::{StoreError, StoreResult};

/// Storage for layer blobs, keyed by digest.
///
/// The manifest store only ever removes blobs; writing them is the job of
/// whatever pulls or creates models.
pub trait BlobStore: Send + Sync {
    /// Check whether a blob exists.
    fn exists(&self, digest: &Digest) -> StoreResult<bool>;

    /// Delete a blob.
    ///
    /// Fails with [`StoreError::NotFound`] if the blob is absent and with
    /// [`StoreError::Io`] on any other failure.
    fn remove(&self, digest: &Digest) -> StoreResult<()>;
}

/// Blobs stored as files named `sha256-<hex>` in one directory.
#[derive(Clone, Debug)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `digest`.
    pub fn blob_path(&self, digest: &Digest) -> PathBuf {
        self.root.join(digest.blob_file_name())
    }
}

impl BlobStore for FsBlobStore {
    fn exists(&self, digest: &Digest) -> StoreResult<bool> {
        match fs::metadata(self.blob_path(digest)) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn remove(&self, digest: &Digest) -> StoreResult<()> {
        match fs::remove_file(self.blob_path(digest)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(digest.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory blob set for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashSet<Digest>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a blob as present.
    pub fn insert(&self, digest: Digest) {
        self.blobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(digest);
    }

    pub fn len(&self) -> usize {
        self.blobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStore for InMemoryBlobStore {
    fn exists(&self, digest: &Digest) -> StoreResult<bool> {
        let blobs = self.blobs.read().unwrap_or_else(PoisonError::into_inner);
        Ok(blobs.contains(digest))
    }

    fn remove(&self, digest: &Digest) -> StoreResult<()> {
        let mut blobs = self.blobs.write().unwrap_or_else(PoisonError::into_inner);
        if blobs.remove(digest) {
            Ok(())
        } else {
            Err(StoreError::NotFound(digest.to_string()))
        }
    }
}
