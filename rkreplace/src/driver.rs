//! Per-document pipeline and the concurrent run over a config directory.
//!
//! Each document is handled by its own task: reconcile promoted Dockerfile
//! paths, fetch every referenced Dockerfile, splice the build-time base,
//! synthesize replacements, extract candidates, prune, and write the
//! document back only when its serialized form changed. Tasks share nothing
//! but the HTTP client and the promotion mapping; their failures are
//! collected and reported together once every task has finished.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use libbuildcfg::{BuildConfig, ImageStreamRef};
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::builddata;
use crate::dockerfile;
use crate::fetch::{self, FileGetter};
use crate::info::{ConfigInfo, discover_configs};
use crate::promote::{self, PromotionSettings};
use crate::prune;
use crate::replace;
use crate::util::aggregate_errors;

/// Everything one run of the engine needs to know.
#[derive(Debug, Clone)]
pub struct Options {
    /// Directory holding the configuration documents.
    pub config_dir: PathBuf,
    /// Registry host whose image references receive replacement entries.
    pub registry_host: String,
    /// Drop replacement entries not backed by any discovered candidate.
    pub prune_unused_replacements: bool,
    /// Drop replacement entries redirecting the disallowed builder pair.
    pub prune_builder_replacements: bool,
    /// Org of the disallowed builder pair.
    pub disallowed_org: String,
    /// Repo of the disallowed builder pair.
    pub disallowed_repo: String,
    /// Reconcile Dockerfile paths against the promoted-artifact mapping.
    pub ensure_correct_promotion_dockerfile: bool,
    /// Local build-data checkout the promotion mapping is loaded from.
    pub build_data_dir: Option<PathBuf>,
    /// Promotion reconciliation settings; required when reconciling.
    pub promotion: Option<PromotionSettings>,
}

/// Processes every configuration document under the config dir, one task per
/// document. Successful documents are written even when siblings fail; all
/// failures are reported together at the end, after every task has joined.
pub async fn run(opts: Options) -> Result<()> {
    let configs = discover_configs(&opts.config_dir)?;
    info!(documents = configs.len(), "processing configuration documents");

    let promotion_mapping = load_promotion_mapping(&opts)?;
    let client = fetch::http_client()?;

    let mut tasks: JoinSet<Result<()>> = JoinSet::new();
    for config_info in configs {
        let opts = opts.clone();
        let client = client.clone();
        let mapping = Arc::clone(&promotion_mapping);
        tasks.spawn(async move { process_file(config_info, client, mapping, opts).await });
    }

    let mut errs = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(err)) => errs.push(err),
            Err(err) => errs.push(anyhow::Error::new(err).context("document task failed to join")),
        }
    }
    aggregate_errors(errs)
}

fn load_promotion_mapping(opts: &Options) -> Result<Arc<HashMap<String, String>>> {
    if !opts.ensure_correct_promotion_dockerfile {
        return Ok(Arc::new(HashMap::new()));
    }
    let (Some(build_data_dir), Some(settings)) = (&opts.build_data_dir, &opts.promotion) else {
        anyhow::bail!(
            "promotion-dockerfile reconciliation requires a build-data dir and promotion settings"
        );
    };
    let mapping = builddata::load_promotion_dockerfile_mapping(
        build_data_dir,
        &settings.release,
        &settings.namespace,
        &settings.registry_host,
    )?;
    Ok(Arc::new(mapping))
}

async fn process_file(
    config_info: ConfigInfo,
    client: reqwest::Client,
    promotion_mapping: Arc<HashMap<String, String>>,
    opts: Options,
) -> Result<()> {
    let raw = fs::read(&config_info.path)
        .with_context(|| format!("failed to read {}", config_info.path.display()))?;
    let mut config = BuildConfig::from_yaml(&raw)
        .with_context(|| format!("failed to parse {}", config_info.path.display()))?;

    let getter = fetch::github_file_getter(
        client,
        &config_info.org,
        &config_info.repo,
        &config_info.branch,
    );
    let path = config_info.path.clone();
    let mut writer = move |data: &[u8]| {
        fs::write(&path, data).with_context(|| format!("failed to write {}", path.display()))
    };

    process_document(
        &mut config,
        &config_info,
        &getter,
        &mut writer,
        &promotion_mapping,
        &opts,
    )
    .await
}

/// Runs the full pipeline over one document and invokes `writer` if and only
/// if the document's serialized form changed.
pub async fn process_document(
    config: &mut BuildConfig,
    info: &ConfigInfo,
    getter: &FileGetter,
    writer: &mut (dyn FnMut(&[u8]) -> Result<()> + Send),
    promotion_mapping: &HashMap<String, String>,
    opts: &Options,
) -> Result<()> {
    if config.images.is_empty() {
        return Ok(());
    }

    let original = config
        .to_yaml()
        .context("failed to serialize config for comparison")?;

    // Path reconciliation comes first: it decides which files get fetched.
    if opts.ensure_correct_promotion_dockerfile {
        if let Some(settings) = &opts.promotion {
            promote::reconcile_promotion_dockerfiles(config, promotion_mapping, settings);
        }
    }

    let mut candidates = BTreeSet::new();
    let mut any_dockerfile = false;
    for idx in 0..config.images.len() {
        let dockerfile_path = config.images[idx].effective_dockerfile_path();
        let data = getter.get(&dockerfile_path).await.with_context(|| {
            format!(
                "failed to get dockerfile {}/{}@{}:/{}",
                info.org, info.repo, info.branch, dockerfile_path
            )
        })?;
        let text = String::from_utf8(data)
            .with_context(|| format!("dockerfile {dockerfile_path} is not valid UTF-8"))?;
        if !text.is_empty() {
            any_dockerfile = true;
        }

        // Work on the text the build will actually see: the declared
        // internal base is spliced into the final stage up front.
        let simulated = if config.images[idx].from.is_empty() {
            text
        } else {
            dockerfile::splice_final_stage_base(&text, &config.images[idx].from).with_context(
                || format!("failed to apply build-time replacement to {dockerfile_path}"),
            )?
        };

        let touched =
            replace::ensure_replacements(&mut config.images[idx], &simulated, &opts.registry_host)
                .context("failed to ensure replacements")?;
        for spec in touched {
            config
                .base_images
                .entry(spec.to_string())
                .or_insert_with(|| ImageStreamRef {
                    namespace: spec.org.clone(),
                    name: spec.repo.clone(),
                    tag: spec.tag.clone(),
                });
        }

        candidates.extend(
            dockerfile::extract_replacement_candidates(&simulated).with_context(|| {
                format!("failed to extract replacement candidates from {dockerfile_path}")
            })?,
        );
    }

    // An all-empty fetch usually means degraded access rather than a repo
    // without Dockerfiles; wiping every replacement over it is not worth it.
    if opts.prune_unused_replacements && any_dockerfile {
        prune::prune_unused_replacements(config, &candidates)
            .context("failed to prune unused replacements")?;
    }
    if opts.prune_builder_replacements {
        prune::prune_disallowed_replacements(config, &opts.disallowed_org, &opts.disallowed_repo)
            .context("failed to prune builder replacements")?;
    }

    let updated = config
        .to_yaml()
        .context("failed to serialize updated config")?;
    if original == updated {
        debug!(document = %info.path.display(), "no changes");
        return Ok(());
    }

    writer(&updated).with_context(|| format!("failed to write {}", info.path.display()))?;
    Ok(())
}
