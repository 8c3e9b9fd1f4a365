use std::fmt;
use std::fs;

use chrono::{DateTime, Utc};

/// File-level view of a manifest: the capability consumers rely on when they
/// treat a manifest as file-backed (sorting by modification time, showing a
/// size, and so on).
///
/// Real manifests carry [`DiskMetadata`]; synthetic ones carry
/// [`SyntheticMetadata`].
pub trait FileMetadata: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;
    fn size(&self) -> u64;
    /// Unix permission bits.
    fn mode(&self) -> u32;
    fn modified(&self) -> DateTime<Utc>;
    fn is_dir(&self) -> bool;
}

/// Metadata captured from a filesystem entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiskMetadata {
    name: String,
    size: u64,
    mode: u32,
    modified: DateTime<Utc>,
    is_dir: bool,
}

impl DiskMetadata {
    /// Capture `metadata` for the entry called `name`.
    ///
    /// Platforms that cannot report a modification time yield the Unix epoch.
    pub fn from_metadata(name: impl Into<String>, metadata: &fs::Metadata) -> Self {
        let modified = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        Self {
            name: name.into(),
            size: metadata.len(),
            mode: permission_bits(metadata),
            modified,
            is_dir: metadata.is_dir(),
        }
    }
}

#[cfg(unix)]
fn permission_bits(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn permission_bits(metadata: &fs::Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

impl FileMetadata for DiskMetadata {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn mode(&self) -> u32 {
        self.mode
    }

    fn modified(&self) -> DateTime<Utc> {
        self.modified
    }

    fn is_dir(&self) -> bool {
        self.is_dir
    }
}

/// Stand-in metadata for a manifest with no backing file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyntheticMetadata {
    name: String,
    size: u64,
    mode: u32,
    modified: DateTime<Utc>,
}

impl SyntheticMetadata {
    /// Regular-file permissions reported for synthetic entries.
    pub const MODE: u32 = 0o644;

    pub fn new(name: impl Into<String>, size: u64, modified: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            size,
            mode: Self::MODE,
            modified,
        }
    }
}

impl FileMetadata for SyntheticMetadata {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn mode(&self) -> u32 {
        self.mode
    }

    fn modified(&self) -> DateTime<Utc> {
        self.modified
    }

    fn is_dir(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn disk_metadata_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(b"{}\n").unwrap();
        drop(f);

        let meta = DiskMetadata::from_metadata("manifest.json", &fs::metadata(&path).unwrap());
        assert_eq!(meta.name(), "manifest.json");
        assert_eq!(meta.size(), 3);
        assert!(!meta.is_dir());
        assert!(meta.modified() > DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn disk_metadata_for_directory() {
        let dir = tempfile::tempdir().unwrap();
        let meta = DiskMetadata::from_metadata("d", &fs::metadata(dir.path()).unwrap());
        assert!(meta.is_dir());
    }

    #[test]
    fn synthetic_metadata_surface() {
        let now = Utc::now();
        let meta = SyntheticMetadata::new("library/foundation/latest", 42, now);
        let dynamic: &dyn FileMetadata = &meta;
        assert_eq!(dynamic.name(), "library/foundation/latest");
        assert_eq!(dynamic.size(), 42);
        assert_eq!(dynamic.mode(), 0o644);
        assert_eq!(dynamic.modified(), now);
        assert!(!dynamic.is_dir());
    }
}
