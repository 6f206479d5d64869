//! # libbuildcfg — build-configuration document model
//!
//! `libbuildcfg` holds the data model for the declarative build-pipeline
//! configuration documents consumed by `rkreplace`: a list of image build
//! entries plus the base-image table that redirects externally-hosted pull
//! specs to locally-resolvable inputs.
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |---|---|
//! | [`config`] | Document model: `BuildConfig`, `ImageBuild`, input records. |
//! | [`pullspec`] | Pull-spec canonicalization into (org, repo, tag) triples. |
//! | [`error`] | [`BuildCfgError`] enum covering all failure modes. |

pub mod config;
pub mod error;
pub mod pullspec;

// Re-export the most commonly used items at crate root for convenience.
pub use config::{
    BuildConfig, ImageBuild, ImageBuildInputs, ImageStreamRef, Metadata, PromotionConfig,
    SourcePath,
};
pub use error::BuildCfgError;
pub use pullspec::PullSpec;
