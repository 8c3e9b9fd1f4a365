use std::collections::HashMap;

use mvault_types::{Layer, Name};

use crate::error::StoreResult;
use crate::manifest::Manifest;

/// How [`ManifestStore::list`] treats entries it cannot read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ListMode {
    /// Fail on the first bad entry and return nothing.
    Strict,
    /// Log and skip bad entries, returning whatever could be read.
    #[default]
    Tolerant,
}

/// Name-keyed repository of model manifests.
///
/// All implementations must satisfy these invariants:
/// - Names missing any part are rejected with `Unqualified` before any
///   storage access.
/// - A manifest's digest is the hash of its stored bytes, never of a
///   re-encoding.
/// - Synthetic manifests are never written or deleted.
/// - Concurrent reads are always safe; writers to one name are serialized.
pub trait ManifestStore: Send + Sync {
    /// Read the stored manifest for `name`.
    ///
    /// Fails with `NotFound` if nothing is stored and `Corrupt` if the stored
    /// bytes are not a manifest.
    fn get(&self, name: &Name) -> StoreResult<Manifest>;

    /// Write a manifest for `name`, replacing any existing one.
    fn put(&self, name: &Name, config: Layer, layers: Vec<Layer>) -> StoreResult<()>;

    /// Every stored manifest, merged with synthetic ones when enabled.
    ///
    /// Synthetic manifests replace stored ones under the same name.
    fn list(&self, mode: ListMode) -> StoreResult<HashMap<Name, Manifest>>;

    /// Delete the manifest for `name`, then prune empty directories.
    fn remove(&self, name: &Name) -> StoreResult<()>;

    /// Delete the blobs behind `manifest`'s layers.
    ///
    /// Missing blobs are not an error. Blobs still referenced by another
    /// stored manifest are kept.
    fn remove_layers(&self, manifest: &Manifest) -> StoreResult<()>;

    /// Resolve `name` with the same precedence as [`ManifestStore::list`]:
    /// an enabled synthetic manifest first, then the stored one.
    fn lookup(&self, name: &Name) -> StoreResult<Manifest> {
        self.get(name)
    }
}
