//! Retention Janitor - purges stale call requests
//!
//! Postgres has no TTL index, so requests older than the retention window
//! are deleted on a fixed interval whatever their status.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

use qcall::{CallRequestRepository, DomainError};

/// Janitor configuration
#[derive(Debug, Clone)]
pub struct RetentionConfig {
    /// Interval between purges
    pub interval: Duration,
    /// Requests older than this are deleted
    pub retention: Duration,
    /// Enable/disable janitor
    pub enabled: bool,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600), // 1 hour
            retention: Duration::from_secs(24 * 3600),
            enabled: true,
        }
    }
}

pub struct RetentionJanitor {
    requests: Arc<dyn CallRequestRepository>,
    config: RetentionConfig,
}

impl RetentionJanitor {
    pub fn new(requests: Arc<dyn CallRequestRepository>, config: Option<RetentionConfig>) -> Self {
        Self {
            requests,
            config: config.unwrap_or_default(),
        }
    }

    /// Start the janitor (runs in background)
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(self) {
        if !self.config.enabled {
            tracing::info!("🧹 Retention janitor disabled");
            return;
        }

        tracing::info!(
            "🧹 Retention janitor started (interval: {:?}, retention: {:?})",
            self.config.interval,
            self.config.retention
        );

        let mut ticker = interval(self.config.interval);

        loop {
            ticker.tick().await;

            match self.purge_once().await {
                Ok(0) => {}
                Ok(purged) => tracing::info!("🧹 Purged {} expired call requests", purged),
                Err(e) => tracing::warn!("🧹 Retention purge failed: {}", e),
            }
        }
    }

    /// Delete every request older than the retention window
    pub async fn purge_once(&self) -> Result<u64, DomainError> {
        let retention = chrono::Duration::from_std(self.config.retention)
            .map_err(|e| DomainError::Validation(format!("Retention out of range: {}", e)))?;
        self.requests
            .purge_requested_before(Utc::now() - retention)
            .await
    }
}
