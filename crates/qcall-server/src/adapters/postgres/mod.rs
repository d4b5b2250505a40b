//! PostgreSQL Repository Implementations

mod call_request_repository;
mod ticket_repository;

pub use call_request_repository::PgCallRequestRepository;
pub use ticket_repository::{PgCounterRepository, PgTicketRepository};
