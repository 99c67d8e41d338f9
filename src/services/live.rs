use crate::models::screenshot_types::ScreenshotRecord;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

const CHANNEL_CAPACITY: usize = 256;

/// Index delta pushed to live subscribers.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", content = "data")]
pub enum LiveEvent {
    #[serde(rename = "newScreenshot")]
    Added(Box<ScreenshotRecord>),
    #[serde(rename = "removeScreenshot")]
    Removed { id: String },
    /// Clients must re-fetch the listing.
    #[serde(rename = "refresh")]
    Refresh,
}

/// Fire-and-forget broadcast. Late subscribers get no backlog.
#[derive(Clone)]
pub struct LiveChannel {
    tx: broadcast::Sender<LiveEvent>,
}

impl LiveChannel {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn publish(&self, event: LiveEvent) {
        // Err only means nobody is listening
        if let Ok(n) = self.tx.send(event) {
            debug!("Live event delivered to {} subscriber(s)", n);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.tx.subscribe()
    }
}

impl Default for LiveChannel {
    fn default() -> Self {
        Self::new()
    }
}
