// depres-core/src/metadata.rs
// maven-metadata.xml parsing plus the cached fetchers for metadata and POMs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use depres_common::cache::Cache;
use depres_common::error::{DepresError, Result};
use depres_common::model::{Coordinate, Dependency, DependencyVersion, Repository, RepositoryList};
use depres_common::pipeline::PipelineEvent;
use depres_net::http::{download_to_path, FetchStatus};
use quick_xml::de::from_reader;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::events::EventSink;

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct MavenMetadata {
    #[serde(rename = "groupId", default)]
    pub group_id: Option<String>,
    #[serde(rename = "artifactId", default)]
    pub artifact_id: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    /// Pre-`<versioning>` layout written by very old deployers.
    #[serde(default)]
    pub latest: Option<String>,
    #[serde(default)]
    pub versioning: Option<Versioning>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Versioning {
    #[serde(default)]
    pub latest: Option<String>,
    #[serde(default)]
    pub release: Option<String>,
    #[serde(default)]
    pub versions: Versions,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Versions {
    #[serde(rename = "version", default)]
    pub items: Vec<String>,
}

impl MavenMetadata {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        Ok(from_reader(bytes)?)
    }

    /// Listed versions in document order.
    pub fn versions(&self) -> Vec<String> {
        self.versioning
            .as_ref()
            .map(|v| {
                v.versions
                    .items
                    .iter()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// `<latest>`, then `<release>`, then the legacy top-level tags, then the
    /// last listed version.
    pub fn latest_version(&self) -> Option<String> {
        let versioning = self.versioning.as_ref();
        [
            versioning.and_then(|v| v.latest.as_deref()),
            versioning.and_then(|v| v.release.as_deref()),
            self.latest.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| self.versions().pop())
        .or_else(|| self.version.clone().filter(|v| !v.trim().is_empty()))
    }

    pub fn to_dependency_version(&self) -> Option<DependencyVersion> {
        let latest = self.latest_version()?;
        Some(DependencyVersion::new(self.versions(), latest))
    }
}

/// Fetches POMs and version metadata through the disk cache.
///
/// Network requests hold a permit from the shared I/O semaphore for their
/// whole duration.
pub struct MetadataFetcher {
    client: Client,
    cache: Cache,
    repositories: RepositoryList,
    ttl: Duration,
    io_permits: Arc<Semaphore>,
    events: EventSink,
    memo: Mutex<HashMap<Coordinate, DependencyVersion>>,
}

impl MetadataFetcher {
    pub fn new(
        client: Client,
        cache: Cache,
        repositories: RepositoryList,
        ttl: Duration,
        io_permits: Arc<Semaphore>,
        events: EventSink,
    ) -> Self {
        Self {
            client,
            cache,
            repositories,
            ttl,
            io_permits,
            events,
            memo: Mutex::new(HashMap::new()),
        }
    }

    pub fn repositories(&self) -> &RepositoryList {
        &self.repositories
    }

    /// Returns the cached POM path, downloading it from `repository` first if
    /// needed. `Ok(None)` means the repository does not have it.
    pub async fn fetch_pom(
        &self,
        dependency: &Dependency,
        repository: &Repository,
    ) -> Result<Option<PathBuf>> {
        let path = self.cache.pom_path(dependency);
        if path.is_file() {
            debug!("POM cache hit for {}: {}", dependency, path.display());
            return Ok(Some(path));
        }

        let url = repository.join(&dependency.pom_path());
        let _permit = self
            .io_permits
            .acquire()
            .await
            .map_err(|e| DepresError::Generic(format!("I/O semaphore closed: {e}")))?;
        self.events
            .send(PipelineEvent::PomDownloading { url: url.clone() });
        match download_to_path(&self.client, &url, &path).await? {
            FetchStatus::Downloaded => {
                self.events.send(PipelineEvent::PomDownloaded { url });
                Ok(Some(path))
            }
            FetchStatus::NotFound => Ok(None),
        }
    }

    /// Version listing for `coordinate`, trying `preferred` first and then the
    /// rest of the repository list. Returns `None` when no repository has
    /// usable metadata.
    pub async fn versions(
        &self,
        coordinate: &Coordinate,
        preferred: Option<&Repository>,
    ) -> Option<DependencyVersion> {
        if let Some(known) = self.memoized(coordinate) {
            return Some(known);
        }

        let path = self.cache.metadata_path(coordinate);
        if self.cache.is_fresh(&path, self.ttl) {
            if let Some(parsed) = read_metadata(&path).await {
                return Some(self.remember(coordinate, parsed));
            }
        }

        for repository in self.repositories.preferring(preferred) {
            let url = repository.join(&coordinate.metadata_path());
            let status = {
                let Ok(_permit) = self.io_permits.acquire().await else {
                    break;
                };
                download_to_path(&self.client, &url, &path).await
            };
            match status {
                Ok(FetchStatus::Downloaded) => match read_metadata(&path).await {
                    Some(parsed) => return Some(self.remember(coordinate, parsed)),
                    None => warn!("Unusable maven-metadata.xml at {}", url),
                },
                Ok(FetchStatus::NotFound) => debug!("No metadata at {}", url),
                Err(e) => debug!("Metadata fetch failed for {}: {}", url, e),
            }
        }

        // Every repository failed; a stale copy beats nothing.
        if path.is_file() {
            if let Some(parsed) = read_metadata(&path).await {
                debug!("Using stale metadata for {}", coordinate);
                return Some(self.remember(coordinate, parsed));
            }
        }
        debug!("No version metadata for {}", coordinate);
        None
    }

    fn memoized(&self, coordinate: &Coordinate) -> Option<DependencyVersion> {
        self.memo
            .lock()
            .ok()
            .and_then(|memo| memo.get(coordinate).cloned())
    }

    fn remember(&self, coordinate: &Coordinate, versions: DependencyVersion) -> DependencyVersion {
        if let Ok(mut memo) = self.memo.lock() {
            memo.insert(coordinate.clone(), versions.clone());
        }
        versions
    }
}

async fn read_metadata(path: &Path) -> Option<DependencyVersion> {
    let bytes = tokio::fs::read(path).await.ok()?;
    match MavenMetadata::parse(&bytes) {
        Ok(metadata) => metadata.to_dependency_version(),
        Err(e) => {
            warn!("Failed to parse {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_versioning_block() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata>
  <groupId>com.squareup.okhttp3</groupId>
  <artifactId>okhttp</artifactId>
  <versioning>
    <latest>4.9.0</latest>
    <release>4.9.0</release>
    <versions>
      <version>3.12.0</version>
      <version>4.0.0</version>
      <version>4.9.0</version>
    </versions>
    <lastUpdated>20200911</lastUpdated>
  </versioning>
</metadata>"#;
        let metadata = MavenMetadata::parse(xml.as_bytes()).unwrap();
        let versions = metadata.to_dependency_version().unwrap();
        assert_eq!(versions.latest_version, "4.9.0");
        assert_eq!(versions.available_versions, vec!["3.12.0", "4.0.0", "4.9.0"]);
    }

    #[test]
    fn latest_falls_back_to_release_then_last_listed() {
        let release_only = r#"<metadata><versioning><release>2.0</release>
            <versions><version>1.0</version><version>2.0</version><version>2.1-rc</version></versions>
            </versioning></metadata>"#;
        let metadata = MavenMetadata::parse(release_only.as_bytes()).unwrap();
        assert_eq!(metadata.latest_version().as_deref(), Some("2.0"));

        let listed_only = r#"<metadata><versioning>
            <versions><version>1.0</version><version>1.1</version></versions>
            </versioning></metadata>"#;
        let metadata = MavenMetadata::parse(listed_only.as_bytes()).unwrap();
        assert_eq!(metadata.latest_version().as_deref(), Some("1.1"));
    }

    #[test]
    fn legacy_top_level_latest() {
        let legacy = r#"<metadata><groupId>g</groupId><artifactId>a</artifactId><latest>0.9</latest></metadata>"#;
        let metadata = MavenMetadata::parse(legacy.as_bytes()).unwrap();
        let versions = metadata.to_dependency_version().unwrap();
        assert_eq!(versions.latest_version, "0.9");
        assert!(versions.available_versions.is_empty());
    }

    #[test]
    fn empty_metadata_has_no_versions() {
        let metadata = MavenMetadata::parse(b"<metadata></metadata>").unwrap();
        assert!(metadata.to_dependency_version().is_none());
    }
}
