//! Mapping between model names and manifest paths.
//!
//! Manifests live at `<root>/<namespace>/<repository>/<tag>/manifest.json`:
//! the three name parts form the directory and [`MANIFEST_FILE`] is the fixed
//! leaf. Every manifest is therefore exactly [`MANIFEST_DEPTH`] components
//! below the root. Deeper or shallower files are not manifests.

use std::path::{Component, Path, PathBuf};

use mvault_types::Name;

use crate::error::{StoreError, StoreResult};

/// File name of every manifest.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Number of path components between the store root and a manifest file.
pub const MANIFEST_DEPTH: usize = 4;

/// Path of `name`'s manifest relative to the store root.
///
/// Fails with [`StoreError::Unqualified`] before looking at anything else if a
/// part is missing, and with [`StoreError::InvalidName`] if a part could
/// escape its directory or otherwise breaks the name rules.
pub fn relative_path(name: &Name) -> StoreResult<PathBuf> {
    if !name.is_fully_qualified() {
        return Err(StoreError::Unqualified(name.to_string()));
    }
    if let Err(reason) = name.validate() {
        return Err(StoreError::InvalidName {
            path: name.parts().iter().collect(),
            reason,
        });
    }
    let mut path: PathBuf = name.parts().iter().collect();
    path.push(MANIFEST_FILE);
    Ok(path)
}

/// Absolute path of `name`'s manifest under `root`.
pub fn resolve(root: &Path, name: &Name) -> StoreResult<PathBuf> {
    Ok(root.join(relative_path(name)?))
}

/// Reconstruct a name from a manifest path relative to the store root.
pub fn parse_from_path(rel: &Path) -> StoreResult<Name> {
    let invalid = |reason: &str| StoreError::InvalidName {
        path: rel.to_path_buf(),
        reason: reason.into(),
    };

    let mut parts = Vec::with_capacity(MANIFEST_DEPTH);
    for component in rel.components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_str().ok_or_else(|| invalid("path is not UTF-8"))?;
                parts.push(part);
            }
            _ => return Err(invalid("path must be relative and normalized")),
        }
    }

    let [namespace, repository, tag, leaf] = parts[..] else {
        return Err(invalid("expected namespace/repository/tag/manifest.json"));
    };
    if leaf != MANIFEST_FILE {
        return Err(invalid("unexpected manifest file name"));
    }

    let name = Name::new(namespace, repository, tag);
    name.validate().map_err(|reason| invalid(&reason))?;
    Ok(name)
}
