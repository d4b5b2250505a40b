//! Broadcast Events
//!
//! Event names are a wire contract with the display and counter clients
//! and must not change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Named events emitted by the calling core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventName {
    #[serde(rename = "urdu-voice-announcement")]
    UrduVoiceAnnouncement,
    #[serde(rename = "ticket-status-updated")]
    TicketStatusUpdated,
    #[serde(rename = "ticket-recalled")]
    TicketRecalled,
    #[serde(rename = "call-request-added")]
    CallRequestAdded,
    #[serde(rename = "call-request-completed")]
    CallRequestCompleted,
    #[serde(rename = "reload-all-counters")]
    ReloadAllCounters,
    #[serde(rename = "print-queue-clear")]
    PrintQueueClear,
    #[serde(rename = "print-queue-recovered")]
    PrintQueueRecovered,
}

impl EventName {
    pub fn as_str(self) -> &'static str {
        match self {
            EventName::UrduVoiceAnnouncement => "urdu-voice-announcement",
            EventName::TicketStatusUpdated => "ticket-status-updated",
            EventName::TicketRecalled => "ticket-recalled",
            EventName::CallRequestAdded => "call-request-added",
            EventName::CallRequestCompleted => "call-request-completed",
            EventName::ReloadAllCounters => "reload-all-counters",
            EventName::PrintQueueClear => "print-queue-clear",
            EventName::PrintQueueRecovered => "print-queue-recovered",
        }
    }
}

impl std::fmt::Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Listener topic for scoped delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Room {
    Counter(i32),
    Department(Uuid),
}

impl std::fmt::Display for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Room::Counter(number) => write!(f, "counter-{}", number),
            Room::Department(id) => write!(f, "department-{}", id),
        }
    }
}

impl std::str::FromStr for Room {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(number) = s.strip_prefix("counter-") {
            return number
                .parse()
                .map(Room::Counter)
                .map_err(|_| format!("Invalid counter room: {}", s));
        }
        if let Some(id) = s.strip_prefix("department-") {
            return id
                .parse()
                .map(Room::Department)
                .map_err(|_| format!("Invalid department room: {}", s));
        }
        Err(format!("Unknown room: {}", s))
    }
}

/// One event on the broadcast channel
#[derive(Debug, Clone, PartialEq)]
pub struct BroadcastEvent {
    pub name: EventName,
    /// `None` delivers to every listener; a room narrows delivery for
    /// room-scoped listeners only
    pub room: Option<Room>,
    pub payload: serde_json::Value,
}

impl BroadcastEvent {
    /// Event for every connected listener
    pub fn global(name: EventName, payload: serde_json::Value) -> Self {
        Self {
            name,
            room: None,
            payload,
        }
    }

    /// Event for one room's listeners and for unscoped dashboards
    pub fn to_room(name: EventName, room: Room, payload: serde_json::Value) -> Self {
        Self {
            name,
            room: Some(room),
            payload,
        }
    }

    /// Whether a listener subscribed to `room` (or to nothing) receives this
    /// event. Unscoped listeners see every event.
    pub fn is_visible_to(&self, room: Option<&Room>) -> bool {
        match (&self.room, room) {
            (None, _) | (Some(_), None) => true,
            (Some(target), Some(subscribed)) => target == subscribed,
        }
    }
}

/// How the display should voice an announcement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnouncementType {
    /// Play a pre-rendered clip from `audioUrl`
    Mp3Announcement,
    /// Speak `message` with the client's own speech synthesis
    TtsAnnouncement,
}

/// Payload of `urdu-voice-announcement`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementPayload {
    #[serde(rename = "type")]
    pub kind: AnnouncementType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub ticket_number: String,
    pub counter_number: i32,
    pub is_recall: bool,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_names_are_stable() {
        assert_eq!(
            EventName::UrduVoiceAnnouncement.as_str(),
            "urdu-voice-announcement"
        );
        assert_eq!(EventName::TicketStatusUpdated.as_str(), "ticket-status-updated");
        assert_eq!(EventName::TicketRecalled.as_str(), "ticket-recalled");
        assert_eq!(EventName::CallRequestAdded.as_str(), "call-request-added");
        assert_eq!(EventName::CallRequestCompleted.as_str(), "call-request-completed");
        assert_eq!(EventName::ReloadAllCounters.as_str(), "reload-all-counters");
        assert_eq!(EventName::PrintQueueClear.as_str(), "print-queue-clear");
        assert_eq!(
            serde_json::to_value(EventName::ReloadAllCounters).unwrap(),
            json!("reload-all-counters")
        );
    }

    #[test]
    fn test_announcement_payload_wire_format() {
        let payload = AnnouncementPayload {
            kind: AnnouncementType::Mp3Announcement,
            audio_url: Some("/audio/A001-counter3.mp3".into()),
            message: None,
            ticket_number: "A001".into(),
            counter_number: 3,
            is_recall: false,
            timestamp: Utc::now(),
        };

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["type"], "mp3_announcement");
        assert_eq!(value["audioUrl"], "/audio/A001-counter3.mp3");
        assert_eq!(value["ticketNumber"], "A001");
        assert_eq!(value["counterNumber"], 3);
        assert_eq!(value["isRecall"], false);
        assert!(value.get("message").is_none());
    }

    #[test]
    fn test_room_round_trip_and_visibility() {
        let room: Room = "counter-3".parse().unwrap();
        assert_eq!(room, Room::Counter(3));
        assert_eq!(room.to_string(), "counter-3");
        assert!("lobby".parse::<Room>().is_err());

        let scoped = BroadcastEvent::to_room(EventName::CallRequestAdded, room, json!({}));
        assert!(scoped.is_visible_to(Some(&Room::Counter(3))));
        assert!(!scoped.is_visible_to(Some(&Room::Counter(4))));
        assert!(scoped.is_visible_to(None));

        let global = BroadcastEvent::global(EventName::ReloadAllCounters, json!({}));
        assert!(global.is_visible_to(None));
        assert!(global.is_visible_to(Some(&Room::Counter(4))));
    }
}
