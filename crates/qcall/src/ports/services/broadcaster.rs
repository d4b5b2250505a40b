//! Broadcast Port
//!
//! Publish-only channel to the display boards and counter screens.

use crate::domain::BroadcastEvent;

/// Event emission interface
///
/// Emission never fails from the caller's point of view: an event with
/// no listeners is simply dropped.
pub trait Broadcaster: Send + Sync {
    fn emit(&self, event: BroadcastEvent);
}
