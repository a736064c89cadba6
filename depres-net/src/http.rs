use std::path::Path;

use depres_common::cache::Cache;
use depres_common::config::Config;
use depres_common::error::{DepresError, Result};
use depres_common::model::Repository;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, StatusCode};
use tokio::fs::{self, File as TokioFile};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::validation::validate_url;

const USER_AGENT_STRING: &str = "depres dependency resolver (Rust)";

/// Result of a single GET against one URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Downloaded,
    NotFound,
}

/// The repository that served a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryHit {
    pub repository: Repository,
    pub url: String,
}

/// No repository had the file; every URL that was tried, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchMiss {
    pub attempted_urls: Vec<String>,
}

pub fn build_http_client(config: &Config) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_STRING));
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    Client::builder()
        .timeout(config.request_timeout)
        .connect_timeout(config.connect_timeout)
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| DepresError::HttpError(format!("Failed to build HTTP client: {e}")))
}

/// Streams `url` into `final_path`, going through a temporary sibling file.
///
/// 404 and 410 map to [`FetchStatus::NotFound`]; any other non-success status
/// is an error.
pub async fn download_to_path(client: &Client, url: &str, final_path: &Path) -> Result<FetchStatus> {
    validate_url(url)?;

    let response = client.get(url).send().await.map_err(|e| {
        debug!("HTTP request failed for {url}: {e}");
        DepresError::HttpError(format!("HTTP request failed for {url}: {e}"))
    })?;
    let status = response.status();
    debug!("Received HTTP status: {} for {}", status, url);

    match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => return Ok(FetchStatus::NotFound),
        s if !s.is_success() => {
            return Err(DepresError::HttpError(format!(
                "HTTP error {status} for URL {url}"
            )));
        }
        _ => {}
    }

    if let Some(parent) = final_path.parent() {
        fs::create_dir_all(parent).await.map_err(|e| {
            DepresError::IoError(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    let temp_path = Cache::temp_path_for(final_path);
    let write_result = stream_body(response, &temp_path).await;
    if let Err(e) = write_result {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e);
    }

    fs::rename(&temp_path, final_path).await.map_err(|e| {
        DepresError::IoError(format!(
            "Failed to move temp file {} to {}: {}",
            temp_path.display(),
            final_path.display(),
            e
        ))
    })?;
    debug!("Stored {} at {}", url, final_path.display());
    Ok(FetchStatus::Downloaded)
}

async fn stream_body(response: reqwest::Response, temp_path: &Path) -> Result<()> {
    let mut temp_file = TokioFile::create(temp_path).await.map_err(|e| {
        DepresError::IoError(format!(
            "Failed to create temp file {}: {}",
            temp_path.display(),
            e
        ))
    })?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk
            .map_err(|e| DepresError::HttpError(format!("Failed to read response body: {e}")))?;
        temp_file.write_all(&chunk).await.map_err(|e| {
            DepresError::IoError(format!(
                "Failed to write download stream to {}: {}",
                temp_path.display(),
                e
            ))
        })?;
    }
    temp_file.flush().await?;
    Ok(())
}

/// Tries `repositories` strictly in order until one serves `relative_path`.
///
/// `on_attempt` is invoked with each URL before it is requested. Transport
/// errors count as a miss for that repository and the next one is tried.
pub async fn fetch_from_repositories<F>(
    client: &Client,
    repositories: &[Repository],
    relative_path: &str,
    final_path: &Path,
    mut on_attempt: F,
) -> std::result::Result<RepositoryHit, FetchMiss>
where
    F: FnMut(&str),
{
    let mut miss = FetchMiss::default();
    for repository in repositories {
        let url = repository.join(relative_path);
        on_attempt(&url);
        match download_to_path(client, &url, final_path).await {
            Ok(FetchStatus::Downloaded) => {
                return Ok(RepositoryHit {
                    repository: repository.clone(),
                    url,
                });
            }
            Ok(FetchStatus::NotFound) => {
                debug!("Not found at {}", url);
            }
            Err(e) => {
                warn!("Download attempt failed from {}: {}", url, e);
            }
        }
        miss.attempted_urls.push(url);
    }
    Err(miss)
}
