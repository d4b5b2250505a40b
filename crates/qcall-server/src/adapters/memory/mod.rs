//! In-memory port implementations for tests

mod broadcaster;
mod call_request_repository;
mod ticket_repository;

pub use broadcaster::RecordingBroadcaster;
pub use call_request_repository::InMemoryCallRequestRepository;
pub use ticket_repository::InMemoryTicketStore;
