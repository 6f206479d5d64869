//! Replacement synthesis for registry-hosted base images.

use anyhow::{Context, Result};
use libbuildcfg::{ImageBuild, PullSpec};
use regex::Regex;

/// Scans `dockerfile` for `FROM` lines pulling from `registry_host` and
/// makes sure `image` carries a replacement input for every one of them.
///
/// Pull specs already listed under any input record are left alone; whoever
/// put them there decided how that reference resolves. Newly inserted specs
/// land under their canonical identifier with the `as` list kept sorted and
/// deduplicated. Returns the specs for which a replacement was inserted so
/// the caller can register matching base-image entries.
pub fn ensure_replacements(
    image: &mut ImageBuild,
    dockerfile: &str,
    registry_host: &str,
) -> Result<Vec<PullSpec>> {
    let pattern = registry_pattern(registry_host)?;

    let mut to_replace = Vec::new();
    for line in dockerfile.lines() {
        if !line.contains("FROM") || !line.contains(registry_host) {
            continue;
        }
        if let Some(found) = pattern.find(line) {
            to_replace.push(found.as_str().to_owned());
        }
    }

    let mut touched = Vec::new();
    for pull_string in to_replace {
        let spec = PullSpec::parse(&pull_string)
            .with_context(|| format!("failed to parse {pull_string} as pullspec"))?;

        if image.has_replacement_for(&pull_string) {
            continue;
        }

        let input = image.inputs.entry(spec.to_string()).or_default();
        input.r#as.push(pull_string);
        input.r#as.sort();
        input.r#as.dedup();

        touched.push(spec);
    }

    Ok(touched)
}

/// Pattern matching a full pull-spec token hosted on `registry_host`.
fn registry_pattern(registry_host: &str) -> Result<Regex> {
    let pattern = format!(r"{}/[^\s]+", regex::escape(registry_host));
    Regex::new(&pattern).with_context(|| format!("failed to compile registry pattern {pattern:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOST: &str = "registry.svc.ci.openshift.org";

    #[test]
    fn inserts_replacement_under_canonical_key() {
        let mut image = ImageBuild::default();
        let touched =
            ensure_replacements(&mut image, "FROM registry.svc.ci.openshift.org/org/repo:tag", HOST)
                .unwrap();

        assert_eq!(touched.len(), 1);
        assert_eq!(touched[0].to_string(), "org_repo_tag");
        assert_eq!(
            image.inputs["org_repo_tag"].r#as,
            vec!["registry.svc.ci.openshift.org/org/repo:tag"]
        );
    }

    #[test]
    fn missing_tag_defaults_to_latest() {
        let mut image = ImageBuild::default();
        let touched =
            ensure_replacements(&mut image, "FROM registry.svc.ci.openshift.org/org/repo", HOST)
                .unwrap();

        assert_eq!(touched[0].tag, "latest");
        assert!(image.inputs.contains_key("org_repo_latest"));
    }

    #[test]
    fn existing_replacement_is_respected() {
        let mut image = ImageBuild::default();
        image.inputs.insert(
            "some-image".into(),
            libbuildcfg::ImageBuildInputs {
                r#as: vec!["registry.svc.ci.openshift.org/org/repo:tag".into()],
                paths: Vec::new(),
            },
        );

        let touched =
            ensure_replacements(&mut image, "FROM registry.svc.ci.openshift.org/org/repo:tag", HOST)
                .unwrap();

        assert!(touched.is_empty());
        assert_eq!(image.inputs.len(), 1);
        assert!(image.inputs.contains_key("some-image"));
    }

    #[test]
    fn repeated_reference_is_inserted_once() {
        let mut image = ImageBuild::default();
        let dockerfile = "FROM registry.svc.ci.openshift.org/org/repo:tag AS builder\n\
                          FROM registry.svc.ci.openshift.org/org/repo:tag";
        let touched = ensure_replacements(&mut image, dockerfile, HOST).unwrap();

        assert_eq!(touched.len(), 1);
        assert_eq!(
            image.inputs["org_repo_tag"].r#as,
            vec!["registry.svc.ci.openshift.org/org/repo:tag"]
        );
    }

    #[test]
    fn other_registries_are_ignored() {
        let mut image = ImageBuild::default();
        let touched =
            ensure_replacements(&mut image, "FROM registry.svc2.ci.openshift.org/org/repo", HOST)
                .unwrap();

        assert!(touched.is_empty());
        assert!(image.inputs.is_empty());
    }

    #[test]
    fn lines_without_from_are_ignored() {
        let mut image = ImageBuild::default();
        let dockerfile = "RUN curl registry.svc.ci.openshift.org/org/repo:tag";
        let touched = ensure_replacements(&mut image, dockerfile, HOST).unwrap();

        assert!(touched.is_empty());
    }

    #[test]
    fn unparseable_pull_spec_fails_with_context() {
        let mut image = ImageBuild::default();
        let dockerfile = "FROM registry.svc.ci.openshift.org/a/b/c:tag";
        let err = ensure_replacements(&mut image, dockerfile, HOST).unwrap_err();

        assert!(
            format!("{err:#}").contains("as pullspec"),
            "got: {err:#}"
        );
    }

    #[test]
    fn as_list_stays_sorted() {
        let mut image = ImageBuild::default();
        image.inputs.insert(
            "org_repo_tag".into(),
            libbuildcfg::ImageBuildInputs {
                r#as: vec!["zzz".into()],
                paths: Vec::new(),
            },
        );

        ensure_replacements(&mut image, "FROM registry.svc.ci.openshift.org/org/repo:tag", HOST)
            .unwrap();

        assert_eq!(
            image.inputs["org_repo_tag"].r#as,
            vec![
                "registry.svc.ci.openshift.org/org/repo:tag".to_owned(),
                "zzz".to_owned()
            ]
        );
    }
}
