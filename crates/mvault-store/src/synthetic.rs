//! Manifests for built-in models that have no files on disk.
//!
//! A built-in model is served by something other than downloaded weights, but
//! consumers still expect a manifest for it: listings show it, the serving
//! layer reads its config and template. The provider fabricates those
//! manifests. Every layer digest is derived from the full model name with
//! [`ContentHasher::SYNTHETIC`], so identities are stable across restarts and
//! never collide with a real blob.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use mvault_crypto::{digest_bytes, ContentHasher};
use mvault_types::{Layer, Name};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::layout;
use crate::manifest::{Manifest, ManifestDocument};
use crate::metadata::SyntheticMetadata;

pub const CONFIG_MEDIA_TYPE: &str = "application/vnd.mvault.image.config";
pub const WEIGHTS_MEDIA_TYPE: &str = "application/vnd.mvault.image.weights";
pub const TEMPLATE_MEDIA_TYPE: &str = "application/vnd.mvault.image.template";

/// Size reported for the placeholder weights layer.
pub const PLACEHOLDER_WEIGHTS_SIZE: u64 = 1024 * 1024;

const CHATML_TEMPLATE: &str = "{{ if .System }}<|im_start|>system
{{ .System }}<|im_end|>
{{ end }}{{ if .Prompt }}<|im_start|>user
{{ .Prompt }}<|im_end|>
<|im_start|>assistant
{{ end }}{{ .Response }}<|im_end|>";

/// Definition of one built-in model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuiltinModel {
    pub namespace: &'static str,
    pub repository: &'static str,
    pub tag: &'static str,
    /// Model family recorded in the config layer.
    pub family: &'static str,
    /// Prompt template carried by the template layer.
    pub template: &'static str,
}

impl BuiltinModel {
    /// The on-device foundation model.
    pub const FOUNDATION: Self = Self {
        namespace: "library",
        repository: "foundation",
        tag: "latest",
        family: "foundation",
        template: CHATML_TEMPLATE,
    };

    pub fn name(&self) -> Name {
        Name::new(self.namespace, self.repository, self.tag)
    }
}

/// Config blob contents for a built-in model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub model_format: String,
    pub model_family: String,
    pub model_families: Vec<String>,
    pub model_type: String,
    pub file_type: String,
    pub architecture: String,
    pub os: String,
    pub rootfs: RootFs,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootFs {
    #[serde(rename = "type")]
    pub kind: String,
    pub diff_ids: Vec<String>,
}

impl ModelConfig {
    fn builtin(family: &str) -> Self {
        Self {
            model_format: family.to_string(),
            model_family: family.to_string(),
            model_families: vec![family.to_string()],
            model_type: family.to_string(),
            file_type: family.to_string(),
            architecture: std::env::consts::ARCH.to_string(),
            os: std::env::consts::OS.to_string(),
            rootfs: RootFs {
                kind: "layers".to_string(),
                diff_ids: Vec::new(),
            },
        }
    }
}

/// Fabricates manifests for a fixed set of built-in models.
#[derive(Clone, Debug)]
pub struct SyntheticProvider {
    models: Vec<BuiltinModel>,
    created_at: DateTime<Utc>,
}

impl Default for SyntheticProvider {
    fn default() -> Self {
        Self::new(vec![BuiltinModel::FOUNDATION])
    }
}

impl SyntheticProvider {
    /// Provider for `models`; their modification time is the construction time.
    pub fn new(models: Vec<BuiltinModel>) -> Self {
        Self {
            models,
            created_at: Utc::now(),
        }
    }

    /// Pin the reported modification time.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn models(&self) -> &[BuiltinModel] {
        &self.models
    }

    /// Returns `true` if `name` belongs to a built-in model.
    pub fn contains(&self, name: &Name) -> bool {
        self.models.iter().any(|model| model.name() == *name)
    }

    /// Synthetic manifests keyed by name, or nothing when `enabled` is false.
    pub fn provide(&self, enabled: bool) -> StoreResult<HashMap<Name, Manifest>> {
        if !enabled {
            return Ok(HashMap::new());
        }

        let mut manifests = HashMap::with_capacity(self.models.len());
        for model in &self.models {
            let name = model.name();
            let manifest = self.build(model, &name)?;
            debug!(name = %name, size = manifest.size(), "registered synthetic manifest");
            manifests.insert(name, manifest);
        }
        Ok(manifests)
    }

    /// The synthetic manifest for `name`, if it is a built-in model.
    pub fn get(&self, name: &Name) -> StoreResult<Option<Manifest>> {
        self.models
            .iter()
            .find(|model| model.name() == *name)
            .map(|model| self.build(model, name))
            .transpose()
    }

    fn build(&self, model: &BuiltinModel, name: &Name) -> StoreResult<Manifest> {
        let path = layout::relative_path(name)?;
        let digest = ContentHasher::SYNTHETIC.hash(name.to_string().as_bytes());

        let config_data = serde_json::to_vec(&ModelConfig::builtin(model.family))
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let document = ManifestDocument::new(
            Layer::with_digest(CONFIG_MEDIA_TYPE, digest, config_data.len() as u64),
            vec![
                Layer::with_digest(WEIGHTS_MEDIA_TYPE, digest, PLACEHOLDER_WEIGHTS_SIZE),
                Layer::with_digest(TEMPLATE_MEDIA_TYPE, digest, model.template.len() as u64),
            ],
        );
        let manifest_digest = digest_bytes(&document.to_bytes()?);

        let size = document.config.size + document.layers.iter().map(|l| l.size).sum::<u64>();
        let parent = path.parent().unwrap_or(&path);
        let metadata = SyntheticMetadata::new(parent.display().to_string(), size, self.created_at);

        Ok(Manifest::synthetic(document, manifest_digest, Arc::new(metadata)))
    }
}
