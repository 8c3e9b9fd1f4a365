use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Environment variable overriding [`StoreConfig::models_dir`].
pub const ENV_MODELS: &str = "MVAULT_MODELS";

/// Environment variable overriding [`StoreConfig::synthetic_models`].
pub const ENV_SYNTHETIC_MODELS: &str = "MVAULT_SYNTHETIC_MODELS";

const MANIFESTS_DIR: &str = "manifests";
const BLOBS_DIR: &str = "blobs";

/// Configuration for a manifest store.
///
/// The store reads this once at construction; nothing in the library consults
/// the process environment afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Root holding `manifests/` and `blobs/`.
    pub models_dir: PathBuf,
    /// Merge synthetic manifests for built-in models into listings.
    pub synthetic_models: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let models_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".mvault")
            .join("models");
        Self {
            models_dir,
            synthetic_models: false,
        }
    }
}

impl StoreConfig {
    /// Config rooted at `models_dir` with synthetic models disabled.
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
            synthetic_models: false,
        }
    }

    /// Builder-style toggle for synthetic models.
    pub fn with_synthetic_models(mut self, enabled: bool) -> Self {
        self.synthetic_models = enabled;
        self
    }

    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> StoreResult<Self> {
        toml::from_str(s).map_err(|e| StoreError::Config(e.to_string()))
    }

    /// Load a TOML file.
    pub fn load(path: &Path) -> StoreResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Overlay values from the process environment.
    pub fn from_env(self) -> Self {
        self.overlay(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary variable lookup.
    pub fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = lookup(ENV_MODELS).filter(|d| !d.is_empty()) {
            self.models_dir = PathBuf::from(dir);
        }
        if let Some(flag) = lookup(ENV_SYNTHETIC_MODELS) {
            self.synthetic_models = parse_flag(&flag);
        }
        self
    }

    /// Directory holding manifest files.
    pub fn manifests_dir(&self) -> PathBuf {
        self.models_dir.join(MANIFESTS_DIR)
    }

    /// Directory holding layer blobs.
    pub fn blobs_dir(&self) -> PathBuf {
        self.models_dir.join(BLOBS_DIR)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config() {
        let c = StoreConfig::default();
        assert!(!c.synthetic_models);
        assert!(c.models_dir.ends_with(".mvault/models"));
        assert_eq!(c.manifests_dir(), c.models_dir.join("manifests"));
        assert_eq!(c.blobs_dir(), c.models_dir.join("blobs"));
    }

    #[test]
    fn toml_config() {
        let c = StoreConfig::from_toml_str(
            "models_dir = \"/srv/models\"\nsynthetic_models = true\n",
        )
        .unwrap();
        assert_eq!(c.models_dir, PathBuf::from("/srv/models"));
        assert!(c.synthetic_models);
    }

    #[test]
    fn toml_partial_keeps_defaults() {
        let c = StoreConfig::from_toml_str("synthetic_models = true").unwrap();
        assert_eq!(c.models_dir, StoreConfig::default().models_dir);
    }

    #[test]
    fn toml_rejects_bad_types() {
        let err = StoreConfig::from_toml_str("synthetic_models = \"maybe\"").unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn overlay_from_lookup() {
        let vars: HashMap<&str, &str> =
            [(ENV_MODELS, "/tmp/m"), (ENV_SYNTHETIC_MODELS, "1")].into();
        let c = StoreConfig::new("/elsewhere").overlay(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(c.models_dir, PathBuf::from("/tmp/m"));
        assert!(c.synthetic_models);
    }

    #[test]
    fn overlay_flag_off() {
        let c = StoreConfig::new("/m")
            .with_synthetic_models(true)
            .overlay(|k| (k == ENV_SYNTHETIC_MODELS).then(|| "0".to_string()));
        assert!(!c.synthetic_models);
        assert_eq!(c.models_dir, PathBuf::from("/m"));
    }
}
