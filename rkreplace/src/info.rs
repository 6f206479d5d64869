//! Discovery of configuration documents on disk.
//!
//! Documents live at `<config-dir>/<org>/<repo>/<org>-<repo>-<branch>.yaml`.
//! Orgs, repos and branches may themselves contain dashes, so the two parent
//! directory names are authoritative and the branch is whatever remains of
//! the file stem after the `<org>-<repo>-` prefix.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use walkdir::WalkDir;

/// Source coordinates of one configuration document, recovered from its
/// position in the config tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigInfo {
    pub org: String,
    pub repo: String,
    pub branch: String,
    /// On-disk location of the document.
    pub path: PathBuf,
}

impl ConfigInfo {
    /// Derives the coordinates from a document path.
    pub fn from_path(path: &Path) -> Result<Self> {
        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .with_context(|| format!("config path {} has no file stem", path.display()))?;
        let repo = path
            .parent()
            .and_then(Path::file_name)
            .and_then(|name| name.to_str())
            .with_context(|| format!("config path {} has no repo directory", path.display()))?;
        let org = path
            .parent()
            .and_then(Path::parent)
            .and_then(Path::file_name)
            .and_then(|name| name.to_str())
            .with_context(|| format!("config path {} has no org directory", path.display()))?;

        let prefix = format!("{org}-{repo}-");
        let Some(branch) = stem.strip_prefix(&prefix) else {
            bail!("config file name {stem:?} does not start with {prefix:?}");
        };
        if branch.is_empty() {
            bail!("config file name {stem:?} carries no branch after {prefix:?}");
        }

        Ok(Self {
            org: org.to_owned(),
            repo: repo.to_owned(),
            branch: branch.to_owned(),
            path: path.to_owned(),
        })
    }
}

/// Yields every YAML document under `config_dir`.
pub fn discover_configs(config_dir: &Path) -> Result<Vec<ConfigInfo>> {
    let mut configs = Vec::new();
    for entry in WalkDir::new(config_dir) {
        let entry = entry
            .with_context(|| format!("failed to walk config dir {}", config_dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_yaml = entry
            .path()
            .extension()
            .is_some_and(|ext| ext == "yaml" || ext == "yml");
        if !is_yaml {
            continue;
        }
        configs.push(ConfigInfo::from_path(entry.path())?);
    }
    Ok(configs)
}
