//! Build-configuration document model.
//!
//! These types mirror the on-disk YAML layout of a build-pipeline
//! configuration document. Map-valued fields are backed by [`BTreeMap`] and
//! empty fields are omitted on serialization, so marshal → unmarshal →
//! marshal yields identical bytes; the driver's write-on-change comparison
//! relies on that stability.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::BuildCfgError;

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Top-level configuration document describing how one repository branch
/// assembles its container images.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Base-image table: canonical `org_repo_tag` identifier → tag reference.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub base_images: BTreeMap<String, ImageStreamRef>,

    /// Image build entries, in document order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageBuild>,

    /// Where this document promotes its built artifacts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<PromotionConfig>,

    /// Source coordinates this document was generated for.
    #[serde(
        default,
        skip_serializing_if = "Metadata::is_empty",
        rename = "zz_generated_metadata"
    )]
    pub metadata: Metadata,
}

impl BuildConfig {
    /// Serializes the document to its canonical on-disk YAML form.
    pub fn to_yaml(&self) -> Result<Vec<u8>, BuildCfgError> {
        let out = serde_yaml::to_string(self).map_err(BuildCfgError::Serialize)?;
        Ok(out.into_bytes())
    }

    /// Parses a document from its on-disk YAML form.
    pub fn from_yaml(data: &[u8]) -> Result<Self, BuildCfgError> {
        serde_yaml::from_slice(data).map_err(BuildCfgError::Deserialize)
    }
}

// ---------------------------------------------------------------------------
// Image entries
// ---------------------------------------------------------------------------

/// One image build entry: which directory and Dockerfile it builds from,
/// what it publishes, and how external references are redirected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageBuild {
    /// Directory the build runs in, relative to the repository root.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub context_dir: String,

    /// Dockerfile path relative to `context_dir`; `Dockerfile` when empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dockerfile_path: String,

    /// Input mapping: canonical identifier → replacement record.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<String, ImageBuildInputs>,

    /// Internal base image spliced into the final stage at build time.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub from: String,

    /// Promotion target name this entry publishes.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub to: String,
}

impl ImageBuild {
    /// Effective Dockerfile path: `dockerfile_path` (defaulting to
    /// `Dockerfile`) joined onto `context_dir`.
    pub fn effective_dockerfile_path(&self) -> String {
        let dockerfile = if self.dockerfile_path.is_empty() {
            "Dockerfile"
        } else {
            &self.dockerfile_path
        };
        join_path(&self.context_dir, dockerfile)
    }

    /// Whether any input record already lists `target` among its pull specs.
    pub fn has_replacement_for(&self, target: &str) -> bool {
        self.inputs
            .values()
            .any(|input| input.r#as.iter().any(|existing| existing == target))
    }
}

/// How one declared source maps to build inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageBuildInputs {
    /// Pull specs this input replaces, kept sorted and deduplicated.
    #[serde(default, skip_serializing_if = "Vec::is_empty", rename = "as")]
    pub r#as: Vec<String>,

    /// Copy-path directives sourced from this input.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<SourcePath>,
}

/// A single copy-path directive of an input record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourcePath {
    /// Path inside the source image.
    #[serde(default)]
    pub source_path: String,

    /// Destination directory inside the build context.
    #[serde(default)]
    pub destination_dir: String,
}

// ---------------------------------------------------------------------------
// References and metadata
// ---------------------------------------------------------------------------

/// A (namespace, name, tag) reference into the internal image streams.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageStreamRef {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tag: String,
}

/// Namespace and stream name this document promotes its artifacts into.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}

/// Source coordinates recorded in the document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub org: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repo: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub branch: String,
}

impl Metadata {
    /// True when no source coordinates are recorded.
    pub fn is_empty(&self) -> bool {
        self.org.is_empty() && self.repo.is_empty() && self.branch.is_empty()
    }
}

fn join_path(dir: &str, file: &str) -> String {
    if dir.is_empty() {
        file.to_owned()
    } else {
        format!("{}/{}", dir.trim_end_matches('/'), file)
    }
}
