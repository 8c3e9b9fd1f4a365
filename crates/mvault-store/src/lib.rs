//! Filesystem-backed manifest repository for ModelVault.
//!
//! A manifest describes a model as one config layer plus an ordered list of
//! data layers, each a content-addressed blob. This crate resolves model
//! names to manifest files, reads them with a digest computed over the raw
//! bytes, writes them atomically, lists them tolerant of corruption, and
//! merges in synthetic manifests for built-in models that have no files.
//!
//! # On-disk layout
//!
//! ```text
//! <models_dir>/
//!   manifests/<namespace>/<repository>/<tag>/manifest.json
//!   blobs/sha256-<hex>
//! ```
//!
//! # Storage Backends
//!
//! Manifest stores implement [`ManifestStore`]:
//!
//! - [`FsManifestStore`] -- directory tree under [`StoreConfig::manifests_dir`]
//!
//! Blob stores implement [`BlobStore`]:
//!
//! - [`FsBlobStore`] -- one file per blob
//! - [`InMemoryBlobStore`] -- `HashSet`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. A manifest's digest is the hash of its file bytes, never of a re-encoding.
//! 2. Provenance is fixed at construction; manifests are immutable values.
//! 3. Writes go to a temp file and are renamed into place.
//! 4. Synthetic manifests are never written, deleted, or read from disk.
//! 5. Missing blobs are tolerated on removal; every other I/O error propagates.

pub mod blob;
pub mod cancel;
pub mod config;
pub mod disk;
pub mod error;
pub mod layout;
pub mod manifest;
pub mod metadata;
pub mod prune;
pub mod synthetic;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use blob::{BlobStore, FsBlobStore, InMemoryBlobStore};
pub use cancel::Cancellation;
pub use config::StoreConfig;
pub use disk::FsManifestStore;
pub use error::{StoreError, StoreResult};
pub use manifest::{Manifest, ManifestDocument, MANIFEST_MEDIA_TYPE, SCHEMA_VERSION};
pub use metadata::{DiskMetadata, FileMetadata, SyntheticMetadata};
pub use prune::prune_empty_dirs;
pub use synthetic::{BuiltinModel, SyntheticProvider};
pub use traits::{ListMode, ManifestStore};
