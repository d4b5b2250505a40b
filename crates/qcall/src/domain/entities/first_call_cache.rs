//! FirstCallCache - Recently dispatched first calls
//!
//! Maps a ticket to the wall-clock time its most recent first call was
//! dispatched. Recalls never touch this cache. Entries expire after the
//! retention window and the cache never grows past its capacity.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use uuid::Uuid;

/// Bounded, time-indexed record of first calls
#[derive(Debug, Clone)]
pub struct FirstCallCache {
    entries: HashMap<Uuid, DateTime<Utc>>,
    retention: Duration,
    capacity: usize,
}

impl FirstCallCache {
    pub const DEFAULT_CAPACITY: usize = 1024;

    pub fn new(retention: Duration, capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            retention,
            capacity: capacity.max(1),
        }
    }

    /// Record a dispatched first call. Expired entries are evicted first;
    /// if the cache is still full the oldest entry makes room.
    pub fn record(&mut self, ticket_id: Uuid, at: DateTime<Utc>) {
        self.evict_expired(at);

        if self.entries.len() >= self.capacity && !self.entries.contains_key(&ticket_id) {
            if let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, dispatched_at)| **dispatched_at)
                .map(|(id, _)| *id)
            {
                self.entries.remove(&oldest);
            }
        }

        self.entries.insert(ticket_id, at);
    }

    /// True if a first call for this ticket was dispatched less than `window` ago
    pub fn dispatched_within(&self, ticket_id: Uuid, window: Duration, now: DateTime<Utc>) -> bool {
        self.entries
            .get(&ticket_id)
            .is_some_and(|dispatched_at| now - *dispatched_at < window)
    }

    /// True if the ticket has an unexpired entry
    pub fn contains(&self, ticket_id: Uuid, now: DateTime<Utc>) -> bool {
        self.dispatched_within(ticket_id, self.retention, now)
    }

    /// Drop entries older than the retention window. Returns how many were removed.
    pub fn evict_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        let retention = self.retention;
        self.entries
            .retain(|_, dispatched_at| now - *dispatched_at < retention);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for FirstCallCache {
    fn default() -> Self {
        Self::new(Duration::minutes(5), Self::DEFAULT_CAPACITY)
    }
}
