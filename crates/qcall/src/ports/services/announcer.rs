//! Announcer Port
//!
//! Turns a call into an audible announcement on the displays.

use async_trait::async_trait;

use crate::domain::errors::DomainError;

/// Announcement interface used by the call sequencer
#[async_trait]
pub trait Announcer: Send + Sync {
    /// Announce a ticket at a counter.
    ///
    /// Returns `true` when a rendered clip was played and `false` when the
    /// displays were asked to synthesize the phrase live.
    async fn announce(
        &self,
        ticket_number: &str,
        counter_number: i32,
        is_recall: bool,
    ) -> Result<bool, DomainError>;
}
