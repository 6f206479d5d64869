//! Raw file retrieval from the source-code host.
//!
//! Dockerfiles are fetched as single raw files over HTTP; checking out every
//! repository would not scale to thousands of documents, while the fetches
//! are cheap enough to run without a concurrency bound.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use futures::future::BoxFuture;
use reqwest::StatusCode;

/// Fetches the raw bytes of one file by repository-relative path.
///
/// A missing file is a successful empty result, so callers can tell "no
/// Dockerfile" apart from a failed fetch.
#[derive(Clone)]
pub struct FileGetter {
    inner: Arc<dyn Fn(String) -> BoxFuture<'static, Result<Vec<u8>>> + Send + Sync>,
}

impl FileGetter {
    /// Wraps a fetch closure.
    pub fn new<F>(fetch: F) -> Self
    where
        F: Fn(String) -> BoxFuture<'static, Result<Vec<u8>>> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(fetch),
        }
    }

    /// Retrieves `path`, yielding empty bytes when the file does not exist.
    pub async fn get(&self, path: &str) -> Result<Vec<u8>> {
        (self.inner)(path.to_owned()).await
    }
}

/// Builds the HTTP client shared by every getter of a run.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(300))
        .connect_timeout(Duration::from_secs(30))
        .build()
        .context("failed to build HTTP client")
}

/// Returns a [`FileGetter`] for raw files of `org/repo` at `branch` on the
/// GitHub content host.
pub fn github_file_getter(
    client: reqwest::Client,
    org: &str,
    repo: &str,
    branch: &str,
) -> FileGetter {
    let base = format!("https://raw.githubusercontent.com/{org}/{repo}/{branch}");
    FileGetter::new(move |path: String| {
        let client = client.clone();
        let url = format!("{base}/{path}");
        Box::pin(async move {
            let response = client
                .get(&url)
                .send()
                .await
                .with_context(|| format!("failed to GET {url}"))?;
            if response.status() == StatusCode::NOT_FOUND {
                return Ok(Vec::new());
            }
            let status = response.status();
            let body = response
                .bytes()
                .await
                .with_context(|| format!("failed to read response body of {url}"))?;
            if !status.is_success() {
                bail!(
                    "got unexpected http status code {status} for {url}, response body: {}",
                    String::from_utf8_lossy(&body)
                );
            }
            Ok(body.to_vec())
        })
    })
}
