//! Print Port
//!
//! One adapter per OS-level way of getting a slip onto paper.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::entities::PrintPayload;
use crate::domain::errors::DomainError;

/// Print strategy
#[async_trait]
pub trait PrintStrategy: Send + Sync {
    /// Strategy name for logs
    fn name(&self) -> &str;

    /// Upper bound for one attempt
    fn timeout(&self) -> Duration {
        Duration::from_secs(10)
    }

    /// Print one ticket slip
    async fn print(&self, payload: &PrintPayload) -> Result<(), DomainError>;
}
