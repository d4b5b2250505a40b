//! Service Ports
//!
//! Interfaces for broadcasting, announcing, speech synthesis and printing.

mod announcer;
mod broadcaster;
mod printer;
mod speech;

pub use announcer::*;
pub use broadcaster::*;
pub use printer::*;
pub use speech::*;
