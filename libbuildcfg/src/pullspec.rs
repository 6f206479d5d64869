//! Pull-spec canonicalization.
//!
//! An image pull string (`[registry/]org/repo[:tag]`) is reduced to the
//! (org, repo, tag) triple that keys both an image entry's input mapping and
//! the document's base-image table. The canonical identifier rendered by
//! [`PullSpec`]'s `Display` impl is `org_repo_tag`.

use std::fmt;

use crate::error::BuildCfgError;

/// Sentinel org recorded for single-segment pull strings such as `centos:7`.
pub const NO_ORG: &str = "_";

/// Tag applied when a pull string carries none.
pub const DEFAULT_TAG: &str = "latest";

/// The (org, repo, tag) triple extracted from an image pull string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PullSpec {
    /// Organization segment, or [`NO_ORG`] for bare repository names.
    pub org: String,
    /// Repository segment, without any tag.
    pub repo: String,
    /// Tag, defaulting to [`DEFAULT_TAG`].
    pub tag: String,
}

impl PullSpec {
    /// Parse an arbitrary slash-delimited pull string.
    ///
    /// - `repo` keeps the sentinel org `_`
    /// - `org/repo` uses both segments
    /// - `registry/org/repo` drops the leading registry host
    ///
    /// Three-segment specs index the middle segment while two-segment specs
    /// index the first; base-image keys depend on this exact behavior, so it
    /// is not normalized further.
    pub fn parse(pull_string: &str) -> Result<Self, BuildCfgError> {
        let segments: Vec<&str> = pull_string.split('/').collect();
        let (org, repo) = match segments.as_slice() {
            [repo] => (NO_ORG, *repo),
            [org, repo] => (*org, *repo),
            [_registry, org, repo] => (*org, *repo),
            _ => {
                return Err(BuildCfgError::MalformedPullSpec {
                    pull_string: pull_string.to_owned(),
                    segments: segments.len(),
                });
            }
        };

        // Exactly one colon marks a tag; a repo segment with any other colon
        // count keeps its colons and the default tag.
        let repo_tag: Vec<&str> = repo.split(':').collect();
        let (repo, tag) = if repo_tag.len() == 2 {
            (repo_tag[0], repo_tag[1])
        } else {
            (repo, DEFAULT_TAG)
        };

        Ok(Self {
            org: org.to_owned(),
            repo: repo.to_owned(),
            tag: tag.to_owned(),
        })
    }
}

impl fmt::Display for PullSpec {
    /// Renders the canonical `org_repo_tag` identifier.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.org, self.repo, self.tag)
    }
}
