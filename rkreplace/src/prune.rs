//! Filter-driven pruning of replacement inputs.
//!
//! One reducer carries both pruning policies. The policy is an injected
//! predicate over `(pull spec, input key)`; the reducer owns the cascade:
//! input records whose `as` and `paths` both end up empty are deleted, and
//! image entries left with no inputs, no `from` and no `to` are dropped from
//! the document.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use libbuildcfg::{BuildConfig, PullSpec};

use crate::util::aggregate_errors;

/// Applies `keep` to every pull spec of every input record and cascades the
/// resulting deletions.
///
/// Filter errors drop the spec they were raised for; they are collected per
/// entry and reported together after the full pass instead of aborting it.
pub fn prune_replacements<F>(config: &mut BuildConfig, mut keep: F) -> Result<()>
where
    F: FnMut(&str, &str) -> Result<bool>,
{
    let mut errs = Vec::new();

    for image in &mut config.images {
        let keys: Vec<String> = image.inputs.keys().cloned().collect();
        for key in keys {
            let mut remove = false;
            if let Some(input) = image.inputs.get_mut(&key) {
                let mut kept = Vec::new();
                for pull_string in std::mem::take(&mut input.r#as) {
                    match keep(&pull_string, &key) {
                        Ok(true) => kept.push(pull_string),
                        Ok(false) => {}
                        Err(err) => errs.push(err),
                    }
                }
                input.r#as = kept;
                remove = input.r#as.is_empty() && input.paths.is_empty();
            }
            if remove {
                image.inputs.remove(&key);
            }
        }
    }

    config
        .images
        .retain(|image| !image.inputs.is_empty() || !image.from.is_empty() || !image.to.is_empty());

    aggregate_errors(errs)
}

/// Drops replacement entries not backed by any candidate discovered in this
/// run's Dockerfiles.
pub fn prune_unused_replacements(
    config: &mut BuildConfig,
    candidates: &BTreeSet<String>,
) -> Result<()> {
    prune_replacements(config, |pull_string, _| Ok(candidates.contains(pull_string)))
}

/// Drops replacements that redirect the disallowed `org/repo` pair.
///
/// A matching spec survives when the base-image table has no entry for its
/// input key (nothing to verify the redirect against) or when the table
/// entry equals the spec's own canonical triple (a deliberate self-redirect).
pub fn prune_disallowed_replacements(
    config: &mut BuildConfig,
    disallowed_org: &str,
    disallowed_repo: &str,
) -> Result<()> {
    let base_images = config.base_images.clone();
    prune_replacements(config, move |pull_string, input_key| {
        let spec = PullSpec::parse(pull_string)
            .with_context(|| format!("failed to parse {pull_string} as pullspec"))?;
        if spec.org != disallowed_org || spec.repo != disallowed_repo {
            return Ok(true);
        }
        let Some(base) = base_images.get(input_key) else {
            return Ok(true);
        };
        Ok(base.namespace == spec.org && base.name == spec.repo && base.tag == spec.tag)
    })
}
