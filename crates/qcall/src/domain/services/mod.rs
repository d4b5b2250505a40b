//! Domain Services
//!
//! Pure functions shared by the server and its adapters.

pub mod announcement;
pub mod ticket_slip;
