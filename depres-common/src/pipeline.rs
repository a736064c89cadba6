// depres-common/src/pipeline.rs
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::model::{Dependency, Repository};

/// Stages reported by post-processing collaborators that merge libraries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeStage {
    Start,
    MergeManifest,
    MergeManifestSuccess,
    MergeManifestFailed,
    MergeClassFiles,
    MergeClassFilesSuccess,
    MergeResources,
    MergeResourcesSuccess,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    ResolutionStarted {
        root: String,
        repositories: usize,
    },
    PomDownloading {
        url: String,
    },
    PomDownloaded {
        url: String,
    },
    PomParsing {
        url: String,
    },
    PomParsed {
        url: String,
    },
    ResolutionFinished {
        found: bool,
        dependency_count: usize,
    },
    DownloadStarted {
        total: usize,
    },
    FileDownloading {
        target_id: String,
        url: String,
    },
    FileDownloaded {
        target_id: String,
        path: PathBuf,
    },
    FileSkipped {
        target_id: String,
        reason: String,
    },
    DownloadFinished {
        downloaded: usize,
        missing: usize,
    },
    Merging {
        stage: MergeStage,
    },
    MergeFinished {
        success: bool,
    },
    LogInfo {
        message: String,
    },
    LogWarn {
        message: String,
    },
    LogError {
        message: String,
    },
}

impl PipelineEvent {
    pub fn info(message: impl Into<String>) -> Self {
        PipelineEvent::LogInfo {
            message: message.into(),
        }
    }

    pub fn warn(message: impl Into<String>) -> Self {
        PipelineEvent::LogWarn {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        PipelineEvent::LogError {
            message: message.into(),
        }
    }
}

/// Resolve-complete contract handed to collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveOutcome {
    pub found: bool,
    /// URL of the root POM (the last one attempted when not found).
    pub pom_url: String,
    /// Repository that served the root POM.
    pub repository: Option<Repository>,
    /// Every resolved dependency except the root itself and parent-only POMs,
    /// one entry per coordinate.
    pub dependencies: Vec<Dependency>,
    pub root: Dependency,
    /// Every URL tried for the root when it could not be found.
    pub attempted_urls: Vec<String>,
}

impl ResolveOutcome {
    /// The root followed by its dependencies, the set a downloader fetches.
    pub fn artifacts(&self) -> Vec<Dependency> {
        let mut all = Vec::with_capacity(self.dependencies.len() + 1);
        all.push(self.root.clone());
        all.extend(self.dependencies.iter().cloned());
        all
    }
}

/// Download-complete contract: one slot per requested dependency.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DownloadOutcome {
    pub files: Vec<Option<PathBuf>>,
}

impl DownloadOutcome {
    pub fn downloaded(&self) -> Vec<PathBuf> {
        self.files.iter().flatten().cloned().collect()
    }

    pub fn missing_count(&self) -> usize {
        self.files.iter().filter(|f| f.is_none()).count()
    }
}
