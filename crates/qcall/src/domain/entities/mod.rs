//! Domain Entities
//!
//! Pure domain models without infrastructure dependencies.
//! - CallRequest: Persisted "call ticket to counter" request
//! - Ticket / Counter: Externally owned entities this core updates
//! - FirstCallCache: Recently dispatched first calls
//! - PrintJob / PrintQueue: In-memory ticket printing work set

mod call_request;
mod first_call_cache;
mod print_job;
mod ticket;

pub use call_request::*;
pub use first_call_cache::*;
pub use print_job::*;
pub use ticket::*;
