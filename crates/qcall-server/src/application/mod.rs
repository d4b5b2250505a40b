//! Application Layer (Use Cases)
//!
//! The three long-running components of the calling core. Each owns a
//! single worker and is constructed with its ports injected.

mod announcement_resolver;
mod call_sequencer;
mod print_dispatcher;

pub use announcement_resolver::{AnnouncementResolver, ResolverConfig};
pub use call_sequencer::{CallSequencer, EnqueueOutcome, QueueStatus, SequencerConfig};
pub use print_dispatcher::{PrintDispatcher, PrintDispatcherConfig, PrintQueueStatus};

use std::future::Future;
use std::time::Duration;

use qcall::DomainError;

/// Run an external call with an upper bound
pub(crate) async fn with_timeout<T, F>(
    operation: &str,
    limit: Duration,
    future: F,
) -> Result<T, DomainError>
where
    F: Future<Output = Result<T, DomainError>>,
{
    tokio::time::timeout(limit, future)
        .await
        .map_err(|_| DomainError::Timeout(format!("{} exceeded {:?}", operation, limit)))?
}
