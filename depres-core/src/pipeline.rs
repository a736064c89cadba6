// depres-core/src/pipeline.rs
// Resolve, download, then hand the files to post-processing collaborators.

use std::path::PathBuf;

use depres_common::config::Config;
use depres_common::error::Result;
use depres_common::model::{Dependency, RepositoryList};
use depres_common::pipeline::{DownloadOutcome, PipelineEvent, ResolveOutcome};
use depres_net::http::build_http_client;
use tokio::sync::broadcast;
use tracing::{debug, instrument};

use crate::downloader::{ArtifactDownloader, DownloadOptions};
use crate::events::EventSink;
use crate::resolver::GraphResolver;

const EVENT_CHANNEL_SIZE: usize = 1024;

/// A collaborator that consumes the downloaded files (merging, copying,
/// packaging) and returns the files to pass on.
pub trait PostProcessor: Send + Sync {
    fn name(&self) -> &str;

    fn process(
        &self,
        root: &Dependency,
        files: Vec<PathBuf>,
        events: &EventSink,
    ) -> Result<Vec<PathBuf>>;
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub resolution: ResolveOutcome,
    pub download: DownloadOutcome,
    /// Files after every post-processor ran.
    pub files: Vec<PathBuf>,
}

pub struct Pipeline {
    resolver: GraphResolver,
    downloader: ArtifactDownloader,
    post_processors: Vec<Box<dyn PostProcessor>>,
    event_tx: broadcast::Sender<PipelineEvent>,
    events: EventSink,
}

impl Pipeline {
    pub fn new(
        config: &Config,
        repositories: RepositoryList,
        options: DownloadOptions,
    ) -> Result<Self> {
        let (event_tx, _event_rx) = broadcast::channel::<PipelineEvent>(EVENT_CHANNEL_SIZE);
        let events = EventSink::new(event_tx.clone());
        let client = build_http_client(config)?;
        let resolver =
            GraphResolver::new(config, client.clone(), repositories.clone(), events.clone())?;
        let downloader =
            ArtifactDownloader::new(config, client, repositories, options, events.clone())?;
        Ok(Self {
            resolver,
            downloader,
            post_processors: Vec::new(),
            event_tx,
            events,
        })
    }

    pub fn with_post_processor(mut self, processor: impl PostProcessor + 'static) -> Self {
        self.post_processors.push(Box::new(processor));
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.event_tx.subscribe()
    }

    /// Runs the whole pipeline for `root`. A root that cannot be found is not
    /// an error: the output carries `found == false` and nothing is downloaded.
    #[instrument(skip_all, fields(root = %root))]
    pub async fn run(&self, root: Dependency) -> Result<PipelineOutput> {
        let resolution = self.resolver.resolve(root).await;
        if !resolution.found {
            return Ok(PipelineOutput {
                resolution,
                download: DownloadOutcome::default(),
                files: Vec::new(),
            });
        }

        let download = self.downloader.download(&resolution.artifacts()).await;
        let mut files = download.downloaded();
        for processor in &self.post_processors {
            debug!("Running post-processor {}", processor.name());
            files = processor.process(&resolution.root, files, &self.events)?;
        }

        Ok(PipelineOutput {
            resolution,
            download,
            files,
        })
    }
}
