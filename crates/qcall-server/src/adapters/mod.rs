//! Infrastructure Adapters
//!
//! Implementations of domain ports for external systems.

pub mod broadcast;
#[cfg(test)]
pub mod memory;
pub mod postgres;
pub mod printing;
mod process;
pub mod speech;

// Re-exports
pub use broadcast::SseBroadcaster;
pub use postgres::{PgCallRequestRepository, PgCounterRepository, PgTicketRepository};
pub use printing::{AcknowledgeEcho, CommandPrinter};
pub use speech::{GoogleTranslateTts, SystemSpeech};
