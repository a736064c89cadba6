// depres-common/src/cache.rs
// Deterministic on-disk layout shared by POMs, metadata and artifacts.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use rand::Rng;

use super::error::{DepresError, Result};
use crate::model::{Coordinate, Dependency};
use crate::Config;

/// Cache struct to manage cache operations
#[derive(Debug, Clone)]
pub struct Cache {
    cache_dir: PathBuf,
}

impl Cache {
    /// Create a new Cache using the config's cache root
    pub fn new(config: &Config) -> Result<Self> {
        Self::at(config.cache_dir())
    }

    pub fn at(cache_dir: impl Into<PathBuf>) -> Result<Self> {
        let cache_dir = cache_dir.into();
        if !cache_dir.exists() {
            fs::create_dir_all(&cache_dir).map_err(|e| {
                DepresError::Cache(format!(
                    "Failed to create cache directory {}: {e}",
                    cache_dir.display()
                ))
            })?;
        }
        Ok(Self { cache_dir })
    }

    pub fn get_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Maps a repository-relative path (`a/b/c.pom`) onto the cache directory.
    pub fn resolve(&self, relative_path: &str) -> PathBuf {
        relative_path
            .split('/')
            .filter(|part| !part.is_empty() && *part != "." && *part != "..")
            .fold(self.cache_dir.clone(), |path, part| path.join(part))
    }

    pub fn pom_path(&self, dependency: &Dependency) -> PathBuf {
        self.resolve(&dependency.pom_path())
    }

    pub fn metadata_path(&self, coordinate: &Coordinate) -> PathBuf {
        self.resolve(&coordinate.metadata_path())
    }

    pub fn artifact_path(&self, dependency: &Dependency, ext: &str) -> PathBuf {
        self.resolve(&dependency.artifact_file_path(ext))
    }

    /// True when `path` exists and was modified no longer than `ttl` ago.
    pub fn is_fresh(&self, path: &Path, ttl: Duration) -> bool {
        let Ok(metadata) = fs::metadata(path) else {
            return false;
        };
        let Ok(modified) = metadata.modified() else {
            return false;
        };
        match SystemTime::now().duration_since(modified) {
            Ok(age) => age <= ttl,
            // mtime in the future, treat as fresh
            Err(_) => true,
        }
    }

    /// A unique sibling of `final_path` to stream into before the rename.
    pub fn temp_path_for(final_path: &Path) -> PathBuf {
        let suffix: u64 = rand::rng().random();
        let name = final_path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        final_path.with_file_name(format!(".{name}.{suffix:016x}.download"))
    }

    /// Clears a specific cache file
    pub fn clear_file(&self, path: &Path) -> Result<()> {
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Clears all cache files
    pub fn clear_all(&self) -> Result<()> {
        if self.cache_dir.exists() {
            fs::remove_dir_all(&self.cache_dir)?;
            fs::create_dir_all(&self.cache_dir)?;
        }
        Ok(())
    }
}
