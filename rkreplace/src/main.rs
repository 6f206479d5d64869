use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use rkreplace::builddata::ReleaseVersion;
use rkreplace::driver::{self, Options};
use rkreplace::promote::PromotionSettings;

/// Keeps build-configuration documents in sync with the Dockerfiles they
/// reference: discovers externally-hosted base images, records replacement
/// inputs for them, prunes stale entries, and reconciles promoted Dockerfile
/// paths against the build-data repository.
#[derive(Parser, Debug)]
#[command(name = "rkreplace")]
struct Args {
    /// Directory with the build configuration documents
    #[arg(long, value_name = "DIR")]
    config_dir: PathBuf,

    /// Registry host whose image references receive replacement entries
    #[arg(long, default_value = "registry.svc.ci.openshift.org")]
    registry_host: String,

    /// Remove replacement entries no Dockerfile references anymore
    #[arg(long)]
    prune_unused_replacements: bool,

    /// Remove replacement entries that redirect the disallowed builder pair
    #[arg(long)]
    prune_builder_replacements: bool,

    /// The org/repo pair whose redirects get pruned
    #[arg(long, value_name = "ORG/REPO", default_value = "ocp/builder")]
    disallowed_builder: String,

    /// Rewrite Dockerfile paths to match the promoted-artifact mapping
    #[arg(long)]
    ensure_correct_promotion_dockerfile: bool,

    /// Local checkout of the build-data repository
    #[arg(long, value_name = "DIR")]
    build_data_dir: Option<PathBuf>,

    /// Release the promotion mapping applies to
    #[arg(long, value_name = "MAJOR.MINOR")]
    current_release: Option<String>,

    /// Branch whose documents get their Dockerfile paths reconciled
    #[arg(long, default_value = "master")]
    integration_branch: String,

    /// Namespace promoted artifacts are published into
    #[arg(long, default_value = "ocp")]
    promotion_namespace: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let (disallowed_org, disallowed_repo) =
        args.disallowed_builder.split_once('/').with_context(|| {
            format!(
                "--disallowed-builder {:?} is not in ORG/REPO form",
                args.disallowed_builder
            )
        })?;

    let promotion = if args.ensure_correct_promotion_dockerfile {
        let release: ReleaseVersion = args
            .current_release
            .as_deref()
            .context("--current-release is required with --ensure-correct-promotion-dockerfile")?
            .parse()?;
        if args.build_data_dir.is_none() {
            bail!("--build-data-dir is required with --ensure-correct-promotion-dockerfile");
        }
        Some(PromotionSettings {
            integration_branch: args.integration_branch.clone(),
            namespace: args.promotion_namespace.clone(),
            release,
            registry_host: args.registry_host.clone(),
        })
    } else {
        None
    };

    driver::run(Options {
        config_dir: args.config_dir,
        registry_host: args.registry_host,
        prune_unused_replacements: args.prune_unused_replacements,
        prune_builder_replacements: args.prune_builder_replacements,
        disallowed_org: disallowed_org.to_owned(),
        disallowed_repo: disallowed_repo.to_owned(),
        ensure_correct_promotion_dockerfile: args.ensure_correct_promotion_dockerfile,
        build_data_dir: args.build_data_dir,
        promotion,
    })
    .await
}
