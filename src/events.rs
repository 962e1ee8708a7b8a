//! Broadcast hub for downloader events

use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

use crate::types::Event;

/// Fire-and-forget broadcast channel for [`Event`]s
///
/// Every subscriber sees every event emitted after it subscribed. Emitting with
/// no subscribers drops the event. Subscribers that fall more than the buffer
/// capacity behind receive `RecvError::Lagged` and skip ahead.
#[derive(Clone, Debug)]
pub struct EventHub {
    tx: broadcast::Sender<Event>,
}

impl EventHub {
    /// Create a hub buffering up to `capacity` events per subscriber
    ///
    /// A capacity of zero is raised to one; `Config::validate` rejects it earlier.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Broadcast an event to all current subscribers
    pub fn emit(&self, event: Event) {
        // send() returns Err if there are no receivers, which is fine - we just drop the event
        self.tx.send(event).ok();
    }

    /// Subscribe to events emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Subscribe as a `Stream`, silently skipping lag notifications
    pub fn stream(&self) -> impl tokio_stream::Stream<Item = Event> + Send + Unpin + 'static {
        BroadcastStream::new(self.tx.subscribe()).filter_map(|result| match result {
            Ok(event) => Some(event),
            Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event stream subscriber lagged");
                None
            }
        })
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
