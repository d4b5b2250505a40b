//! qcall API Models
//!
//! - Call: call/recall requests and sequencer diagnostics
//! - Print: ticket slip jobs and print queue diagnostics

mod call;
mod print;

pub use call::*;
pub use print::*;
