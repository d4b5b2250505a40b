//! SSE Broadcaster
//!
//! Fans broadcast events out to Server-Sent Events subscribers. Unscoped
//! subscribers see every event. A room subscriber sees global events and
//! its own room's events.

use axum::response::sse::Event;
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use qcall::{BroadcastEvent, Broadcaster, Room};

#[derive(Clone)]
pub struct SseBroadcaster {
    tx: broadcast::Sender<BroadcastEvent>,
}

impl SseBroadcaster {
    /// `capacity` is how many events a slow subscriber may lag behind
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        tracing::info!("📡 SSE broadcaster initialized with capacity {}", capacity);
        Self { tx }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Raw event feed for one subscriber
    pub fn subscribe(&self, room: Option<Room>) -> impl Stream<Item = BroadcastEvent> {
        BroadcastStream::new(self.tx.subscribe()).filter_map(move |result| async move {
            match result {
                Ok(event) if event.is_visible_to(room.as_ref()) => Some(event),
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!("SSE subscriber lagged: {:?}", e);
                    None
                }
            }
        })
    }

    /// SSE-encoded feed for one subscriber
    pub fn subscribe_sse(
        &self,
        room: Option<Room>,
    ) -> impl Stream<Item = Result<Event, Infallible>> {
        self.subscribe(room).filter_map(|event| async move {
            Event::default()
                .event(event.name.as_str())
                .json_data(&event.payload)
                .map_err(|e| tracing::warn!(event = %event.name, "Failed to encode SSE event: {}", e))
                .ok()
                .map(Ok)
        })
    }
}

impl Broadcaster for SseBroadcaster {
    fn emit(&self, event: BroadcastEvent) {
        let name = event.name;
        match self.tx.send(event) {
            Ok(subscribers) => tracing::debug!(event = %name, subscribers, "Event broadcast"),
            Err(_) => tracing::debug!(event = %name, "Event dropped, no subscribers"),
        }
    }
}
