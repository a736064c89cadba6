// depres-core/src/lib.rs
pub mod baseline;
pub mod downloader;
pub mod events;
pub mod extract;
pub mod metadata;
pub mod pipeline;
pub mod pom;
pub mod registry;
pub mod resolver;
pub mod version;

pub use baseline::{BaselineFilter, StaticBaseline};
pub use downloader::{ArtifactDownloader, DownloadOptions};
pub use events::EventSink;
pub use pipeline::{Pipeline, PipelineOutput, PostProcessor};
pub use resolver::GraphResolver;
pub use version::{compare_release_versions, compare_versions, VersionRange, VersionResolver};

pub(crate) fn join_error_message(e: tokio::task::JoinError) -> String {
    if !e.is_panic() {
        return e.to_string();
    }
    let payload = e.into_panic();
    match payload.downcast_ref::<&'static str>() {
        Some(s) => (*s).to_string(),
        None => match payload.downcast_ref::<String>() {
            Some(s) => s.clone(),
            None => "Unknown panic payload".to_string(),
        },
    }
}
