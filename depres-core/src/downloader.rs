// depres-core/src/downloader.rs
use std::path::PathBuf;
use std::sync::Arc;

use depres_common::cache::Cache;
use depres_common::config::Config;
use depres_common::error::Result;
use depres_common::model::{Dependency, RepositoryList};
use depres_common::pipeline::{DownloadOutcome, PipelineEvent};
use depres_net::http::fetch_from_repositories;
use depres_net::validation::verify_zip_archive;
use reqwest::Client;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, instrument, warn};

use crate::baseline::BaselineFilter;
use crate::events::EventSink;
use crate::extract::extract_classes_jar;
use crate::join_error_message;

#[derive(Clone, Default)]
pub struct DownloadOptions {
    /// Hand back `classes.jar` instead of an `.aar`.
    pub jar_only: bool,
    /// Libraries the consumer already ships; never downloaded.
    pub baseline: Option<Arc<dyn BaselineFilter>>,
}

struct DownloaderInner {
    client: Client,
    cache: Cache,
    repositories: RepositoryList,
    options: DownloadOptions,
    io_permits: Arc<Semaphore>,
    events: EventSink,
}

/// Fetches the binary artifact of each dependency into the cache.
#[derive(Clone)]
pub struct ArtifactDownloader {
    inner: Arc<DownloaderInner>,
}

impl ArtifactDownloader {
    pub fn new(
        config: &Config,
        client: Client,
        repositories: RepositoryList,
        options: DownloadOptions,
        events: EventSink,
    ) -> Result<Self> {
        Ok(Self {
            inner: Arc::new(DownloaderInner {
                client,
                cache: Cache::new(config)?,
                repositories,
                options,
                io_permits: Arc::new(Semaphore::new(config.max_concurrency.max(1))),
                events,
            }),
        })
    }

    /// Downloads every dependency concurrently. The result has one slot per
    /// input, in input order; a slot is `None` when nothing was produced.
    #[instrument(skip_all, fields(count = dependencies.len()))]
    pub async fn download(&self, dependencies: &[Dependency]) -> DownloadOutcome {
        self.inner.events.send(PipelineEvent::DownloadStarted {
            total: dependencies.len(),
        });

        let mut files: Vec<Option<PathBuf>> = vec![None; dependencies.len()];
        let mut tasks = JoinSet::new();
        for (index, dependency) in dependencies.iter().cloned().enumerate() {
            let downloader = self.clone();
            tasks.spawn(async move { (index, downloader.download_one(dependency).await) });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, path)) => files[index] = path,
                Err(e) => error!("Download task failed: {}", join_error_message(e)),
            }
        }

        let outcome = DownloadOutcome { files };
        self.inner.events.send(PipelineEvent::DownloadFinished {
            downloaded: outcome.files.len() - outcome.missing_count(),
            missing: outcome.missing_count(),
        });
        outcome
    }

    fn skipped(&self, target_id: &str, reason: impl Into<String>) {
        self.inner.events.send(PipelineEvent::FileSkipped {
            target_id: target_id.to_string(),
            reason: reason.into(),
        });
    }

    async fn download_one(&self, dependency: Dependency) -> Option<PathBuf> {
        let inner = &self.inner;
        let target_id = dependency.to_string();

        if dependency.is_pom() {
            self.skipped(&target_id, "pom packaging has no artifact");
            return None;
        }
        if !dependency.has_version() {
            self.skipped(&target_id, "no version");
            return None;
        }
        if let Some(baseline) = &inner.options.baseline {
            if baseline.provides(&dependency.coordinate()) {
                self.skipped(&target_id, "already provided by the application");
                return None;
            }
        }

        let extension = dependency.artifact_extension();
        let artifact_path = inner.cache.artifact_path(&dependency, extension);
        let jar_path = inner.cache.artifact_path(&dependency, "jar");
        let unpack_aar = inner.options.jar_only && extension == "aar";

        if unpack_aar && jar_path.is_file() {
            debug!("Using extracted {} for {}", jar_path.display(), target_id);
            return Some(jar_path);
        }

        if artifact_path.is_file() {
            debug!("Artifact cache hit: {}", artifact_path.display());
        } else {
            let relative = dependency.artifact_file_path(extension);
            let fetched = {
                let Ok(_permit) = inner.io_permits.acquire().await else {
                    return None;
                };
                fetch_from_repositories(
                    &inner.client,
                    inner.repositories.as_slice(),
                    &relative,
                    &artifact_path,
                    |url| {
                        inner.events.send(PipelineEvent::FileDownloading {
                            target_id: target_id.clone(),
                            url: url.to_string(),
                        })
                    },
                )
                .await
            };
            match fetched {
                Ok(hit) => debug!("Downloaded {} from {}", target_id, hit.url),
                Err(miss) => {
                    warn!(
                        "No repository has {} ({} tried)",
                        relative,
                        miss.attempted_urls.len()
                    );
                    self.skipped(&target_id, "not found in any repository");
                    return None;
                }
            }
            if let Err(e) = verify_zip_archive(&artifact_path) {
                warn!("Discarding {}: {}", artifact_path.display(), e);
                let _ = inner.cache.clear_file(&artifact_path);
                self.skipped(&target_id, "downloaded file is not an archive");
                return None;
            }
        }

        let produced = if unpack_aar {
            match extract_classes_jar(&artifact_path, &jar_path).await {
                Ok(extraction) => {
                    if extraction.has_resources {
                        warn!("{} has Android resources; jar-only output drops them", target_id);
                        inner.events.send(PipelineEvent::warn(format!(
                            "{target_id} contains Android resources that a jar cannot carry"
                        )));
                    }
                    extraction.classes_jar
                }
                Err(e) => {
                    warn!("Could not extract classes.jar from {}: {}", target_id, e);
                    self.skipped(&target_id, "classes.jar extraction failed");
                    return None;
                }
            }
        } else {
            artifact_path
        };

        inner.events.send(PipelineEvent::FileDownloaded {
            target_id,
            path: produced.clone(),
        });
        Some(produced)
    }
}
