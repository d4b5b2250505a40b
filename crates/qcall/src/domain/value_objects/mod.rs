//! Value Objects
//!
//! Immutable objects defined by their attributes rather than identity.

mod call_kind;
mod priority;
mod status;

pub use call_kind::*;
pub use priority::*;
pub use status::*;
