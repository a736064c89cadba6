// depres-core/src/events.rs
use depres_common::pipeline::PipelineEvent;
use tokio::sync::broadcast;

/// Optional broadcast sender for progress events. Sending never fails the
/// caller; with no subscribers the event is dropped.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<broadcast::Sender<PipelineEvent>>,
}

impl EventSink {
    pub fn new(tx: broadcast::Sender<PipelineEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn send(&self, event: PipelineEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}
