//! Line-oriented Dockerfile scanning.
//!
//! The scanner recognizes just enough Dockerfile to track multi-stage
//! builds: `FROM <image> [AS <name>]` opens a stage and `COPY --from=<ref>`
//! records a cross-stage reference. Every other line passes through
//! untouched. A `FROM` line must tokenize to exactly two or four words;
//! anything else fails the whole document rather than being skipped.

use std::collections::{BTreeSet, HashMap};

use anyhow::{Result, bail};

/// One `FROM ... [AS name]` block of a multi-stage Dockerfile, together with
/// the `--from=` references appearing in its `COPY` directives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    /// Alias declared with `AS`, if any.
    pub name: Option<String>,
    /// Raw base-image expression of the stage's `FROM` line.
    pub base_image: String,
    /// Raw `--from=` references of the stage's `COPY` directives.
    pub copy_references: Vec<String>,
}

/// Splits a Dockerfile into its build stages.
pub fn parse_stages(dockerfile: &str) -> Result<Vec<Stage>> {
    let mut stages: Vec<Stage> = Vec::new();
    for line in dockerfile.lines() {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some(&directive) = words.first() else {
            continue;
        };
        if directive.eq_ignore_ascii_case("from") {
            let (base_image, name) = match words.len() {
                2 => (words[1], None),
                4 => (words[1], Some(words[3].to_owned())),
                n => bail!(
                    "splitting line {line:?} into tokens did not yield two or four but {n} results"
                ),
            };
            stages.push(Stage {
                name,
                base_image: base_image.to_owned(),
                copy_references: Vec::new(),
            });
        } else if directive.eq_ignore_ascii_case("copy") {
            // A COPY before the first FROM is not a valid Dockerfile; there
            // is no stage to attach it to, so it is dropped.
            let Some(stage) = stages.last_mut() else {
                continue;
            };
            for word in &words[1..] {
                if let Some(reference) = word.strip_prefix("--from=") {
                    stage.copy_references.push(reference.to_owned());
                }
            }
        }
    }
    Ok(stages)
}

/// Collects every externally-referenced image from a Dockerfile.
///
/// A `FROM` whose image expression names an earlier stage stays internal, as
/// does a `COPY --from=` pointing at a known stage alias; everything else is
/// a replacement candidate. The result is sorted and deduplicated.
pub fn extract_replacement_candidates(dockerfile: &str) -> Result<BTreeSet<String>> {
    let mut aliases: HashMap<String, String> = HashMap::new();
    let mut candidates = BTreeSet::new();
    for stage in parse_stages(dockerfile)? {
        if !aliases.contains_key(&stage.base_image) {
            candidates.insert(stage.base_image.clone());
        }
        if let Some(name) = &stage.name {
            aliases.insert(name.clone(), stage.base_image.clone());
        }
        for reference in &stage.copy_references {
            if !aliases.contains_key(reference) {
                candidates.insert(reference.clone());
            }
        }
    }
    Ok(candidates)
}

/// Rewrites the final stage's base image, mirroring the substitution the
/// build itself performs when an image entry declares an internal base.
///
/// Directive casing, `AS` clauses and every other line are preserved
/// verbatim. A Dockerfile without any `FROM` line passes through unchanged.
pub fn splice_final_stage_base(dockerfile: &str, base: &str) -> Result<String> {
    let mut lines: Vec<String> = dockerfile.split('\n').map(str::to_owned).collect();
    let last_from = lines.iter().rposition(|line| {
        line.split_whitespace()
            .next()
            .is_some_and(|word| word.eq_ignore_ascii_case("from"))
    });
    let Some(idx) = last_from else {
        return Ok(dockerfile.to_owned());
    };

    let rebuilt = {
        let line = &lines[idx];
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.len() {
            2 => format!("{} {base}", words[0]),
            4 => format!("{} {base} {} {}", words[0], words[2], words[3]),
            n => bail!(
                "splitting line {line:?} into tokens did not yield two or four but {n} results"
            ),
        }
    };
    lines[idx] = rebuilt;
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(dockerfile: &str) -> Vec<String> {
        extract_replacement_candidates(dockerfile)
            .unwrap()
            .into_iter()
            .collect()
    }

    #[test]
    fn simple_from() {
        assert_eq!(candidates("FROM capetown/center:1"), vec!["capetown/center:1"]);
    }

    #[test]
    fn copy_from_unknown_reference_is_candidate() {
        assert_eq!(
            candidates("FROM centos:7\nCOPY --from=builder /go/src/app /opt/app"),
            vec!["builder", "centos:7"]
        );
    }

    #[test]
    fn alias_suppresses_internal_references() {
        let dockerfile = "FROM a AS builder\nFROM b\nCOPY --from=builder x y";
        assert_eq!(candidates(dockerfile), vec!["a", "b"]);
    }

    #[test]
    fn multiple_stages_with_copy_from() {
        let dockerfile = r#"FROM registry.svc.ci.openshift.org/openshift/release:golang-1.13 AS builder
WORKDIR /go/src/github.com/kubernetes-sigs/aws-ebs-csi-driver
COPY . .
RUN make

FROM registry.svc.ci.openshift.org/openshift/origin-v4.0:base
RUN yum update -y
COPY --from=builder /go/src/github.com/kubernetes-sigs/aws-ebs-csi-driver/bin/aws-ebs-csi-driver /usr/bin/
ENTRYPOINT ["/usr/bin/aws-ebs-csi-driver"]"#;
        assert_eq!(
            candidates(dockerfile),
            vec![
                "registry.svc.ci.openshift.org/openshift/origin-v4.0:base",
                "registry.svc.ci.openshift.org/openshift/release:golang-1.13",
            ]
        );
    }

    #[test]
    fn unrelated_directives_yield_nothing() {
        assert!(candidates("RUN somestuff\n\n\n ENV var=val").is_empty());
    }

    #[test]
    fn defunct_from_fails() {
        let err = extract_replacement_candidates("from\n\n").unwrap_err();
        assert!(
            err.to_string()
                .contains("did not yield two or four but 1 results"),
            "got: {err}"
        );
    }

    #[test]
    fn three_token_from_fails() {
        let err = extract_replacement_candidates("FROM image AS").unwrap_err();
        assert!(
            err.to_string()
                .contains("did not yield two or four but 3 results"),
            "got: {err}"
        );
    }

    #[test]
    fn parse_stages_records_aliases() {
        let stages = parse_stages("FROM a AS builder\nCOPY --from=builder x y\nFROM b").unwrap();
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0].name.as_deref(), Some("builder"));
        assert_eq!(stages[0].base_image, "a");
        assert_eq!(stages[0].copy_references, vec!["builder"]);
        assert_eq!(stages[1].name, None);
        assert_eq!(stages[1].base_image, "b");
    }

    #[test]
    fn splice_replaces_only_last_stage() {
        let dockerfile = "FROM a AS builder\nRUN make\nFROM b\nCOPY --from=builder x y";
        let spliced = splice_final_stage_base(dockerfile, "base").unwrap();
        assert_eq!(spliced, "FROM a AS builder\nRUN make\nFROM base\nCOPY --from=builder x y");
    }

    #[test]
    fn splice_preserves_alias_and_casing() {
        let spliced = splice_final_stage_base("from a as builder", "base").unwrap();
        assert_eq!(spliced, "from base as builder");
    }

    #[test]
    fn splice_without_from_is_identity() {
        assert_eq!(splice_final_stage_base("RUN make\n", "base").unwrap(), "RUN make\n");
        assert_eq!(splice_final_stage_base("", "base").unwrap(), "");
    }

    #[test]
    fn splice_malformed_from_fails() {
        assert!(splice_final_stage_base("FROM", "base").is_err());
    }
}
