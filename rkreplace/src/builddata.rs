//! Promoted-artifact metadata from a local build-data checkout.
//!
//! The build-data repository carries one YAML config per promoted image
//! under `images/`. Each names the artifact and, optionally, the source
//! sub-directory and Dockerfile it is built from; together those yield the
//! authoritative Dockerfile path the reconciler compares configured paths
//! against.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

/// A `major.minor` release version, e.g. `4.6`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseVersion {
    pub major: String,
    pub minor: String,
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for ReleaseVersion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let parsed = s.split_once('.').and_then(|(major, minor)| {
            if major.is_empty() || minor.is_empty() {
                None
            } else {
                Some(Self {
                    major: major.to_owned(),
                    minor: minor.to_owned(),
                })
            }
        });
        match parsed {
            Some(version) => Ok(version),
            None => bail!("release version {s:?} is not in MAJOR.MINOR form"),
        }
    }
}

/// One image config from the build-data repository's `images/` directory.
#[derive(Debug, Deserialize)]
struct ImageConfig {
    name: String,
    #[serde(default)]
    content: Option<ImageConfigContent>,
}

#[derive(Debug, Default, Deserialize)]
struct ImageConfigContent {
    #[serde(default)]
    source: ImageConfigSource,
}

#[derive(Debug, Default, Deserialize)]
struct ImageConfigSource {
    /// Sub-directory of the source repository the build runs in.
    #[serde(default)]
    path: String,
    /// Dockerfile relative to `path`; `Dockerfile` when unset.
    #[serde(default)]
    dockerfile: String,
}

impl ImageConfig {
    /// Authoritative Dockerfile path, including the source sub-directory.
    fn dockerfile_path(&self) -> String {
        let (path, dockerfile) = match &self.content {
            Some(content) => (
                content.source.path.as_str(),
                content.source.dockerfile.as_str(),
            ),
            None => ("", ""),
        };
        let dockerfile = if dockerfile.is_empty() {
            "Dockerfile"
        } else {
            dockerfile
        };
        if path.is_empty() {
            dockerfile.to_owned()
        } else {
            format!("{}/{}", path.trim_end_matches('/'), dockerfile)
        }
    }

    /// Tag under which this image is promoted into the release namespace:
    /// the final segment of the config's `name`.
    fn promoted_tag(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

/// Loads the promoted-pull-spec → Dockerfile-path mapping for `release` from
/// the `images/` directory of a build-data checkout. Queried once per run.
pub fn load_promotion_dockerfile_mapping(
    repo_dir: &Path,
    release: &ReleaseVersion,
    namespace: &str,
    registry_host: &str,
) -> Result<HashMap<String, String>> {
    let images_dir = repo_dir.join("images");
    let entries = fs::read_dir(&images_dir).with_context(|| {
        format!(
            "failed to read build-data images dir {}",
            images_dir.display()
        )
    })?;

    let mut mapping = HashMap::new();
    for entry in entries {
        let entry = entry
            .with_context(|| format!("failed to read entry in {}", images_dir.display()))?;
        let path = entry.path();
        let is_yaml = path
            .extension()
            .is_some_and(|ext| ext == "yml" || ext == "yaml");
        if !is_yaml {
            continue;
        }

        let raw = fs::read(&path)
            .with_context(|| format!("failed to read image config {}", path.display()))?;
        let image_config: ImageConfig = serde_yaml::from_slice(&raw)
            .with_context(|| format!("failed to parse image config {}", path.display()))?;

        let pull_spec = format!(
            "{registry_host}/{namespace}/{release}:{}",
            image_config.promoted_tag()
        );
        mapping.insert(pull_spec, image_config.dockerfile_path());
    }

    Ok(mapping)
}
