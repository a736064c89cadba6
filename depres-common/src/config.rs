// depres-common/src/config.rs
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::BaseDirs;
use tracing::debug;

use super::error::{DepresError, Result};

const APP_DIR_NAME: &str = "dependencies-resolver";
const DEFAULT_METADATA_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DENYLIST: &[&str] = &["plexus"];

/// How a bracketed version range is turned into one concrete version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangePolicy {
    /// First version listed in the metadata that lies strictly inside the range.
    #[default]
    Nearest,
    /// The metadata's `latest` version whenever any listed version lies inside the range.
    Latest,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub home: PathBuf,
    pub cache_root: PathBuf,
    pub max_concurrency: usize,
    pub metadata_ttl: Duration,
    pub range_policy: RangePolicy,
    /// Group-id substrings of artifacts known to ship unusable POMs.
    pub denylist: Vec<String>,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        debug!("Loading depres configuration");

        let home = match env::var("DEPRES_HOME").ok().filter(|s| !s.is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => BaseDirs::new()
                .map(|dirs| dirs.data_local_dir().join(APP_DIR_NAME))
                .ok_or_else(|| {
                    DepresError::Config(
                        "Could not determine a data directory; set DEPRES_HOME".to_string(),
                    )
                })?,
        };
        debug!("Effective depres home: {}", home.display());

        let cache_root = env::var("DEPRES_CACHE_DIR")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join("caches"));

        let max_concurrency = match env::var("DEPRES_MAX_CONCURRENCY") {
            Ok(raw) => raw.parse::<usize>().ok().filter(|n| *n > 0).ok_or_else(|| {
                DepresError::Config(format!(
                    "DEPRES_MAX_CONCURRENCY must be a positive integer, got '{raw}'"
                ))
            })?,
            Err(_) => default_concurrency(),
        };

        let metadata_ttl = match env::var("DEPRES_METADATA_TTL") {
            Ok(raw) => humantime::parse_duration(&raw).map_err(|e| {
                DepresError::Config(format!("Invalid DEPRES_METADATA_TTL '{raw}': {e}"))
            })?,
            Err(_) => DEFAULT_METADATA_TTL,
        };

        let range_policy = if env::var("DEPRES_LEGACY_RANGES").is_ok_and(|v| v == "1") {
            RangePolicy::Latest
        } else {
            RangePolicy::Nearest
        };

        let denylist = match env::var("DEPRES_DENYLIST") {
            Ok(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            Err(_) => default_denylist(),
        };

        debug!("Configuration loaded successfully.");
        Ok(Self {
            home,
            cache_root,
            max_concurrency,
            metadata_ttl,
            range_policy,
            denylist,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        })
    }

    /// Defaults rooted at an explicit cache directory, ignoring the environment.
    pub fn for_cache_root(cache_root: impl Into<PathBuf>) -> Self {
        let cache_root = cache_root.into();
        let home = cache_root
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| cache_root.clone());
        Self {
            home,
            cache_root,
            max_concurrency: default_concurrency(),
            metadata_ttl: DEFAULT_METADATA_TTL,
            range_policy: RangePolicy::default(),
            denylist: default_denylist(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    pub fn with_range_policy(mut self, policy: RangePolicy) -> Self {
        self.range_policy = policy;
        self
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.cache_root.clone()
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.home.join("logs")
    }

    pub fn merged_dir(&self) -> PathBuf {
        self.cache_root.join("merged")
    }

    pub fn is_denylisted(&self, group_id: &str) -> bool {
        self.denylist.iter().any(|pattern| group_id.contains(pattern.as_str()))
    }
}

fn default_concurrency() -> usize {
    (num_cpus::get() * 4).max(4)
}

fn default_denylist() -> Vec<String> {
    DEFAULT_DENYLIST.iter().map(|s| s.to_string()).collect()
}
