//! qcall Domain Library
//!
//! Core domain types and interfaces for the patient-queue calling core:
//! call sequencing, spoken announcements, and ticket printing.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain/`): Pure business entities and logic
//!   - `entities/`: Core domain models (CallRequest, Ticket, Counter, PrintJob)
//!   - `value_objects/`: Immutable value types (Priority, CallKind, statuses)
//!   - `services/`: Pure functions (announcement phrasing, ticket slips)
//!   - `events`: Broadcast event contract
//!   - `errors`: Domain-specific error types
//!
//! - **Ports** (`ports/`): Abstract interfaces (traits)
//!   - `repositories/`: Data access interfaces
//!   - `services/`: Broadcast, speech synthesis, and printing interfaces
//!
//! # Usage
//!
//! ```rust,ignore
//! use qcall::domain::{CallRequest, Priority};
//! use qcall::ports::{CallRequestRepository, Broadcaster};
//! ```

pub mod domain;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    AnnouncementPayload, AnnouncementType, BroadcastEvent, CallKind, CallRequest, Counter,
    CounterStatus, DomainError, EventName, FirstCallCache, PrintJob, PrintPayload, PrintQueue,
    PrintStatus, Priority, QueueCounts, RequestStatus, RetryOutcome, Room, Ticket, TicketStatus,
};
pub use ports::{
    Announcer, Broadcaster, CallRequestRepository, CounterRepository, PrintStrategy,
    SpeechSynthesizer, TicketRepository,
};
