//! Reconciliation of configured Dockerfile paths with the promoted-artifact
//! mapping.
//!
//! Runs before any Dockerfile is fetched, since a rewritten path changes
//! which file the rest of the pipeline operates on.

use std::collections::HashMap;

use libbuildcfg::BuildConfig;

use crate::builddata::ReleaseVersion;

/// Settings for the promotion-Dockerfile reconciler.
#[derive(Debug, Clone)]
pub struct PromotionSettings {
    /// Branch whose documents are subject to reconciliation.
    pub integration_branch: String,
    /// Namespace the current release promotes into.
    pub namespace: String,
    /// Release the authoritative mapping was built for.
    pub release: ReleaseVersion,
    /// Registry host used to stringify promoted pull specs.
    pub registry_host: String,
}

/// Rewrites `context_dir`/`dockerfile_path` for every image entry whose
/// promotion target has an authoritative Dockerfile path differing from the
/// configured one. The authoritative path already encodes any sub-directory,
/// so `context_dir` is reset to empty alongside.
///
/// Documents off the integration branch, documents that do not promote into
/// the current release, and targets absent from `mapping` are left
/// untouched.
pub fn reconcile_promotion_dockerfiles(
    config: &mut BuildConfig,
    mapping: &HashMap<String, String>,
    settings: &PromotionSettings,
) {
    if config.metadata.branch != settings.integration_branch {
        return;
    }
    let Some(promotion) = config.promotion.clone() else {
        return;
    };
    if promotion.namespace != settings.namespace
        || promotion.name != settings.release.to_string()
    {
        return;
    }

    for image in &mut config.images {
        if image.to.is_empty() {
            continue;
        }
        let promoted = format!(
            "{}/{}/{}:{}",
            settings.registry_host, promotion.namespace, promotion.name, image.to
        );
        let Some(authoritative) = mapping.get(&promoted) else {
            continue;
        };
        if image.effective_dockerfile_path() != *authoritative {
            image.context_dir = String::new();
            image.dockerfile_path = authoritative.clone();
        }
    }
}
