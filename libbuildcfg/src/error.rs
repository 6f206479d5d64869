//! Error types for the build-configuration data model.

use thiserror::Error;

/// Unified error type for pull-spec parsing and document serialization.
#[derive(Debug, Error)]
pub enum BuildCfgError {
    /// A pull-spec string had an unexpected number of `/`-separated segments.
    #[error(
        "pull string {pull_string:?} couldn't be parsed, expected to get between one and three elements when splitting by '/', got {segments}"
    )]
    MalformedPullSpec {
        /// The offending pull string.
        pull_string: String,
        /// How many segments splitting produced.
        segments: usize,
    },

    /// The document could not be serialized to its canonical YAML form.
    #[error("failed to serialize build configuration: {0}")]
    Serialize(#[source] serde_yaml::Error),

    /// The document could not be deserialized from YAML.
    #[error("failed to deserialize build configuration: {0}")]
    Deserialize(#[source] serde_yaml::Error),
}
