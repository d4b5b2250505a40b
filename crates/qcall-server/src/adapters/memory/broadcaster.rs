//! Broadcaster that records every event

use std::sync::Mutex;

use qcall::{BroadcastEvent, Broadcaster, EventName};

#[derive(Default)]
pub struct RecordingBroadcaster {
    events: Mutex<Vec<BroadcastEvent>>,
}

impl RecordingBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BroadcastEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn named(&self, name: EventName) -> Vec<BroadcastEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.name == name)
            .collect()
    }

    pub fn count(&self, name: EventName) -> usize {
        self.named(name).len()
    }
}

impl Broadcaster for RecordingBroadcaster {
    fn emit(&self, event: BroadcastEvent) {
        self.events.lock().unwrap().push(event);
    }
}
