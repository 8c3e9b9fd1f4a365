use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{self, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use mvault_crypto::{DecodeError, DigestComputer};
use mvault_types::{Layer, Name};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::blob::{BlobStore, FsBlobStore};
use crate::cancel::Cancellation;
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::layout::{self, MANIFEST_DEPTH};
use crate::manifest::{Manifest, ManifestDocument};
use crate::metadata::DiskMetadata;
use crate::prune::prune_empty_dirs;
use crate::synthetic::SyntheticProvider;
use crate::traits::{ListMode, ManifestStore};

/// Prefix of in-flight manifest files. Hidden entries are ignored by listings.
const TEMP_PREFIX: &str = ".manifest-";

/// Attempts at creating the manifest directory and temp file when a
/// concurrent prune removes the directory in between.
const CREATE_ATTEMPTS: usize = 10;

/// Manifest store backed by a directory tree.
///
/// Readers never lock. `put` and `remove` hold a per-name lock, and `put`
/// publishes through an atomic rename so readers see either the old file or
/// the new one, never a partial write.
pub struct FsManifestStore {
    root: PathBuf,
    config: StoreConfig,
    blobs: Arc<dyn BlobStore>,
    synthetic: SyntheticProvider,
    writers: Mutex<HashMap<Name, Arc<Mutex<()>>>>,
}

impl FsManifestStore {
    /// Store over `config.manifests_dir()` with blobs in `config.blobs_dir()`.
    pub fn open(config: StoreConfig) -> Self {
        let blobs = Arc::new(FsBlobStore::new(config.blobs_dir()));
        Self::with_blob_store(config, blobs)
    }

    /// Store using a caller-supplied blob store.
    pub fn with_blob_store(config: StoreConfig, blobs: Arc<dyn BlobStore>) -> Self {
        info!(
            root = %config.manifests_dir().display(),
            synthetic_models = config.synthetic_models,
            "manifest store opened"
        );
        Self {
            root: config.manifests_dir(),
            config,
            blobs,
            synthetic: SyntheticProvider::default(),
            writers: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the built-in model set.
    pub fn with_synthetic_provider(mut self, provider: SyntheticProvider) -> Self {
        self.synthetic = provider;
        self
    }

    /// Directory holding manifest files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// [`ManifestStore::list`] with cancellation.
    pub fn list_with(
        &self,
        mode: ListMode,
        cancel: &Cancellation,
    ) -> StoreResult<HashMap<Name, Manifest>> {
        let mut manifests = self.scan(mode, cancel)?;

        debug!(enabled = self.config.synthetic_models, "checking synthetic models");
        match self.synthetic.provide(self.config.synthetic_models) {
            Ok(synthetic) => manifests.extend(synthetic),
            Err(e) if mode == ListMode::Tolerant => {
                warn!(error = %e, "failed to build synthetic manifests");
            }
            Err(e) => return Err(e),
        }

        Ok(manifests)
    }

    /// [`ManifestStore::remove`] with cancellation of the prune step.
    pub fn remove_with(&self, name: &Name, cancel: &Cancellation) -> StoreResult<()> {
        let path = layout::resolve(&self.root, name)?;
        if self.is_protected(name) {
            return Err(StoreError::Protected(name.to_string()));
        }

        self.with_writer(name, || match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        })?;
        debug!(name = %name, path = %path.display(), "manifest removed");

        prune_empty_dirs(&self.root, cancel)
    }

    /// Stored manifests only, without synthetic ones.
    fn scan(&self, mode: ListMode, cancel: &Cancellation) -> StoreResult<HashMap<Name, Manifest>> {
        let mut manifests = HashMap::new();
        cancel.check()?;
        if !self.root.is_dir() {
            return Ok(manifests);
        }

        let walker = WalkDir::new(&self.root)
            .min_depth(MANIFEST_DEPTH)
            .max_depth(MANIFEST_DEPTH)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

        for entry in walker {
            cancel.check()?;
            let entry = match entry {
                Ok(entry) => entry,
                // Pruned by a concurrent remove.
                Err(e) if is_vanished(&e) => continue,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                    skip_or_fail(mode, &path, StoreError::Io(io::Error::from(e)))?;
                    continue;
                }
            };
            if entry.file_type().is_dir() {
                continue;
            }

            match self.read_entry(entry.path()) {
                Ok((name, manifest)) => {
                    manifests.insert(name, manifest);
                }
                Err(StoreError::NotFound(_)) => continue,
                Err(e) => skip_or_fail(mode, entry.path(), e)?,
            }
        }

        Ok(manifests)
    }

    fn read_entry(&self, path: &Path) -> StoreResult<(Name, Manifest)> {
        let rel = path.strip_prefix(&self.root).map_err(|e| StoreError::InvalidName {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let name = layout::parse_from_path(rel)?;
        let manifest = self.read_manifest(&name, path)?;
        Ok((name, manifest))
    }

    /// Decode the file at `path`, hashing its bytes as they are read.
    fn read_manifest(&self, name: &Name, path: &Path) -> StoreResult<Manifest> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let stat = file.metadata()?;
        if stat.is_dir() {
            return Err(StoreError::Corrupt {
                path: path.to_path_buf(),
                reason: "expected a file, found a directory".into(),
            });
        }

        let decoded = DigestComputer::decode_json::<ManifestDocument, _>(BufReader::new(file))
            .map_err(|e| match e {
                DecodeError::Io(e) => StoreError::Io(e),
                DecodeError::Malformed(reason) => StoreError::Corrupt {
                    path: path.to_path_buf(),
                    reason,
                },
            })?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let metadata = DiskMetadata::from_metadata(file_name, &stat);

        Ok(Manifest::from_file(
            decoded.value,
            decoded.digest,
            path.to_path_buf(),
            Arc::new(metadata),
        ))
    }

    /// Write `data` next to `path` and rename it into place.
    fn write_atomic(&self, path: &Path, data: &[u8]) -> StoreResult<()> {
        let parent = path.parent().unwrap_or(&self.root);

        let mut attempt = 0;
        let mut tmp = loop {
            attempt += 1;
            let created = fs::create_dir_all(parent).and_then(|()| {
                tempfile::Builder::new().prefix(TEMP_PREFIX).tempfile_in(parent)
            });
            match created {
                Ok(tmp) => break tmp,
                Err(e) if e.kind() == ErrorKind::NotFound && attempt < CREATE_ATTEMPTS => {
                    debug!(path = %parent.display(), attempt, "manifest directory vanished; retrying");
                }
                Err(e) => return Err(e.into()),
            }
        };

        tmp.write_all(data)?;
        set_file_mode(&tmp)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }

    /// Run `f` holding the writer lock for `name`.
    ///
    /// The lock entry is dropped from the map once no other writer holds or
    /// waits on it, so the map only tracks names with writers in flight.
    fn with_writer<T>(&self, name: &Name, f: impl FnOnce() -> StoreResult<T>) -> StoreResult<T> {
        let lock = {
            let mut writers = self.writers.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(writers.entry(name.clone()).or_default())
        };

        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        drop(lock);

        let mut writers = self.writers.lock().unwrap_or_else(PoisonError::into_inner);
        if writers.get(name).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            writers.remove(name);
        }
        result
    }

    fn is_protected(&self, name: &Name) -> bool {
        self.config.synthetic_models && self.synthetic.contains(name)
    }
}

impl ManifestStore for FsManifestStore {
    fn get(&self, name: &Name) -> StoreResult<Manifest> {
        let path = layout::resolve(&self.root, name)?;
        self.read_manifest(name, &path)
    }

    fn put(&self, name: &Name, config: Layer, layers: Vec<Layer>) -> StoreResult<()> {
        let path = layout::resolve(&self.root, name)?;
        let data = ManifestDocument::new(config, layers).to_bytes()?;

        self.with_writer(name, || self.write_atomic(&path, &data))?;

        debug!(name = %name, bytes = data.len(), "manifest written");
        Ok(())
    }

    fn list(&self, mode: ListMode) -> StoreResult<HashMap<Name, Manifest>> {
        self.list_with(mode, &Cancellation::never())
    }

    fn remove(&self, name: &Name) -> StoreResult<()> {
        self.remove_with(name, &Cancellation::never())
    }

    fn remove_layers(&self, manifest: &Manifest) -> StoreResult<()> {
        if manifest.is_synthetic() {
            return Err(StoreError::Protected(manifest.metadata().name().to_string()));
        }

        // Unreadable manifests must not block deleting freshly orphaned blobs.
        let stored = self.scan(ListMode::Tolerant, &Cancellation::never())?;
        let referenced: HashSet<&str> = stored
            .values()
            .filter(|other| other.source_path() != manifest.source_path())
            .flat_map(|other| other.all_layers().map(|layer| layer.digest.as_str()))
            .collect();

        for layer in manifest.all_layers().filter(|layer| layer.has_digest()) {
            if referenced.contains(layer.digest.as_str()) {
                debug!(digest = %layer.digest, "layer still referenced; keeping blob");
                continue;
            }
            let digest = layer.parsed_digest()?;
            match self.blobs.remove(&digest) {
                Ok(()) => debug!(digest = %digest, "layer removed"),
                Err(e) if e.is_not_found() => debug!(digest = %digest, "layer does not exist"),
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn lookup(&self, name: &Name) -> StoreResult<Manifest> {
        layout::relative_path(name)?;
        if self.config.synthetic_models {
            if let Some(manifest) = self.synthetic.get(name)? {
                return Ok(manifest);
            }
        }
        self.get(name)
    }
}

impl std::fmt::Debug for FsManifestStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsManifestStore")
            .field("root", &self.root)
            .field("synthetic_models", &self.config.synthetic_models)
            .finish()
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_str().is_some_and(|name| name.starts_with('.'))
}

fn is_vanished(err: &walkdir::Error) -> bool {
    err.io_error().is_some_and(|e| e.kind() == ErrorKind::NotFound)
}

fn skip_or_fail(mode: ListMode, path: &Path, err: StoreError) -> StoreResult<()> {
    match mode {
        ListMode::Strict => Err(err),
        ListMode::Tolerant => {
            warn!(path = %path.display(), error = %err, "skipping bad manifest");
            Ok(())
        }
    }
}

#[cfg(unix)]
fn set_file_mode(tmp: &NamedTempFile) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tmp.as_file().set_permissions(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_file_mode(_tmp: &NamedTempFile) -> io::Result<()> {
    Ok(())
}
