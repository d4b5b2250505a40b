//! Print Dispatcher
//!
//! Best-effort ticket printing, decoupled from call sequencing. Jobs are
//! drained one at a time through an ordered list of print strategies; the
//! last strategy wired in production always succeeds so the drain keeps
//! moving.
//!
//! Two sweeps keep the queue healthy: a cleanup sweep drops jobs past their
//! maximum age, and a recovery sweep repairs a wedged drain.

use chrono::Utc;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::time::{interval, MissedTickBehavior};
use uuid::Uuid;

use qcall::{
    BroadcastEvent, Broadcaster, DomainError, EventName, PrintJob, PrintPayload, PrintQueue,
    PrintStatus, PrintStrategy, RetryOutcome,
};

/// Print dispatcher configuration
#[derive(Debug, Clone)]
pub struct PrintDispatcherConfig {
    /// Hard cap on queued jobs
    pub max_queue: usize,
    /// Newest jobs kept when the cap is hit
    pub retain_on_overflow: usize,
    /// Attempts per job before it is dropped
    pub max_retries: u32,
    /// Pause between jobs
    pub job_delay: Duration,
    pub cleanup_interval: Duration,
    /// Jobs older than this are removed whatever their status
    pub max_job_age: Duration,
    pub recovery_interval: Duration,
    /// A job processing longer than this is considered stuck
    pub stuck_timeout: Duration,
}

impl Default for PrintDispatcherConfig {
    fn default() -> Self {
        Self {
            max_queue: 50,
            retain_on_overflow: 10,
            max_retries: 3,
            job_delay: Duration::from_secs(1),
            cleanup_interval: Duration::from_secs(10),
            max_job_age: Duration::from_secs(300),
            recovery_interval: Duration::from_secs(15),
            stuck_timeout: Duration::from_secs(30),
        }
    }
}

/// Diagnostic snapshot
#[derive(Debug, Clone)]
pub struct PrintQueueStatus {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub failed: usize,
    pub is_processing: bool,
    pub is_running: bool,
}

struct PrintState {
    queue: PrintQueue,
    /// Set while a drain owns the queue
    busy: bool,
    /// Bumped when recovery takes the queue away from a drain
    epoch: u64,
    /// Last time the drain made progress
    heartbeat: Option<Instant>,
}

struct Inner {
    strategies: Vec<Arc<dyn PrintStrategy>>,
    broadcaster: Arc<dyn Broadcaster>,
    config: PrintDispatcherConfig,
    state: Mutex<PrintState>,
    running: AtomicBool,
    sweep_generation: AtomicU64,
}

/// Single-drain print queue. Cheap to clone.
#[derive(Clone)]
pub struct PrintDispatcher {
    inner: Arc<Inner>,
}

impl PrintDispatcher {
    /// Strategies are tried in the given order
    pub fn new(
        strategies: Vec<Arc<dyn PrintStrategy>>,
        broadcaster: Arc<dyn Broadcaster>,
        config: Option<PrintDispatcherConfig>,
    ) -> Self {
        let config = config.unwrap_or_default();
        let queue = PrintQueue::new(config.max_queue, config.retain_on_overflow);

        Self {
            inner: Arc::new(Inner {
                strategies,
                broadcaster,
                config,
                state: Mutex::new(PrintState {
                    queue,
                    busy: false,
                    epoch: 0,
                    heartbeat: None,
                }),
                running: AtomicBool::new(false),
                sweep_generation: AtomicU64::new(0),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, PrintState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue a slip and start a drain if none is active
    pub fn enqueue(&self, payload: PrintPayload) -> Uuid {
        let job = PrintJob::new(payload);
        let id = job.id;

        let drain_epoch = {
            let mut state = self.state();
            let dropped = state.queue.push(job);
            if dropped > 0 {
                tracing::warn!(
                    dropped,
                    "Print queue full, kept the {} newest jobs",
                    state.queue.len()
                );
            }
            self.claim_drain(&mut state)
        };

        tracing::info!(job_id = %id, "🖨️ Print job queued");

        if let Some(epoch) = drain_epoch {
            self.spawn_drain(epoch);
        }
        id
    }

    /// Take the drain slot if free and there is work
    fn claim_drain(&self, state: &mut PrintState) -> Option<u64> {
        if state.busy || state.queue.is_empty() {
            return None;
        }
        state.busy = true;
        state.heartbeat = Some(Instant::now());
        Some(state.epoch)
    }

    fn spawn_drain(&self, epoch: u64) {
        let this = self.clone();
        tokio::spawn(async move {
            this.drain(epoch).await;
        });
    }

    async fn drain(&self, epoch: u64) {
        loop {
            let job = {
                let mut state = self.state();
                if state.epoch != epoch {
                    return;
                }
                state.heartbeat = Some(Instant::now());
                match state.queue.claim_next(Utc::now()) {
                    Some(job) => job,
                    None => {
                        state.busy = false;
                        state.heartbeat = None;
                        return;
                    }
                }
            };

            let result = self.print(&job.payload).await;

            {
                let mut state = self.state();
                match result {
                    Ok(strategy) => {
                        state.queue.complete(job.id);
                        tracing::info!(
                            job_id = %job.id,
                            ticket = %job.payload.ticket_number,
                            strategy = %strategy,
                            "Ticket printed"
                        );
                    }
                    Err(e) => {
                        let outcome = state.queue.record_failure(
                            job.id,
                            e.to_string(),
                            self.inner.config.max_retries,
                        );
                        match outcome {
                            RetryOutcome::Requeued { retries } => tracing::warn!(
                                job_id = %job.id,
                                retries,
                                "Print failed, requeued: {}",
                                e
                            ),
                            RetryOutcome::Dropped { retries } => tracing::error!(
                                job_id = %job.id,
                                retries,
                                "Print failed, dropping job: {}",
                                e
                            ),
                            RetryOutcome::Missing => {
                                tracing::debug!(job_id = %job.id, "Print job vanished while printing")
                            }
                        }
                    }
                }

                if state.epoch != epoch {
                    return;
                }
                state.heartbeat = Some(Instant::now());
            }

            tokio::time::sleep(self.inner.config.job_delay).await;
        }
    }

    /// Try every strategy in order, returning the one that printed
    async fn print(&self, payload: &PrintPayload) -> Result<String, DomainError> {
        let mut last_error = None;

        for strategy in &self.inner.strategies {
            let result = tokio::time::timeout(strategy.timeout(), strategy.print(payload)).await;
            let error = match result {
                Ok(Ok(())) => return Ok(strategy.name().to_string()),
                Ok(Err(e)) => e,
                Err(_) => DomainError::Timeout(format!(
                    "{} exceeded {:?}",
                    strategy.name(),
                    strategy.timeout()
                )),
            };
            tracing::debug!(strategy = strategy.name(), "Print strategy failed: {}", error);
            last_error = Some(error);
        }

        Err(last_error
            .unwrap_or_else(|| DomainError::ExternalService("No print strategy configured".into())))
    }

    /// Start the cleanup and recovery sweeps. Returns `false` if already running.
    pub fn start(&self) -> bool {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            return false;
        }
        let generation = self.inner.sweep_generation.fetch_add(1, Ordering::SeqCst) + 1;

        tracing::info!(
            "🖨️ Print dispatcher started (cleanup every {:?}, recovery every {:?})",
            self.inner.config.cleanup_interval,
            self.inner.config.recovery_interval
        );

        let this = self.clone();
        tokio::spawn(async move {
            this.sweep_loop(generation, this.inner.config.cleanup_interval, |d| {
                d.cleanup();
            })
            .await;
        });

        let this = self.clone();
        tokio::spawn(async move {
            this.sweep_loop(generation, this.inner.config.recovery_interval, |d| {
                d.recover();
            })
            .await;
        });

        true
    }

    pub fn stop(&self) {
        if self.inner.running.swap(false, Ordering::SeqCst) {
            tracing::info!("🖨️ Print dispatcher sweeps stopped");
        }
    }

    async fn sweep_loop(&self, generation: u64, period: Duration, sweep: impl Fn(&Self)) {
        let mut ticker = interval(period.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if !self.inner.running.load(Ordering::SeqCst)
                || self.inner.sweep_generation.load(Ordering::SeqCst) != generation
            {
                break;
            }
            sweep(self);
        }
    }

    /// Remove jobs older than the age ceiling. Returns how many were removed.
    pub fn cleanup(&self) -> usize {
        let age = chrono::Duration::from_std(self.inner.config.max_job_age)
            .unwrap_or_else(|_| chrono::Duration::minutes(5));
        let removed = self.state().queue.remove_added_before(Utc::now() - age);
        if removed > 0 {
            tracing::info!(removed, "Removed expired print jobs");
        }
        removed
    }

    /// Repair stuck jobs and a wedged drain flag. Returns whether anything
    /// was repaired.
    pub fn recover(&self) -> bool {
        let stuck_timeout = self.inner.config.stuck_timeout;
        let stuck_after = chrono::Duration::from_std(stuck_timeout)
            .unwrap_or_else(|_| chrono::Duration::seconds(30));

        let (failed_jobs, reset_drain, queue_length, drain_epoch) = {
            let mut state = self.state();
            let failed_jobs = state
                .queue
                .fail_stuck(Utc::now(), stuck_after, self.inner.config.max_retries);

            let idle_flag = state.queue.is_empty() || !state.queue.has_processing();
            let stale = state
                .heartbeat
                .map_or(true, |beat| beat.elapsed() > stuck_timeout);
            let reset_drain = state.busy && idle_flag && stale;
            if reset_drain {
                state.busy = false;
                state.heartbeat = None;
                state.epoch += 1;
            }

            let drain_epoch = if reset_drain || !failed_jobs.is_empty() {
                self.claim_drain(&mut state)
            } else {
                None
            };
            (failed_jobs, reset_drain, state.queue.len(), drain_epoch)
        };

        let repaired = reset_drain || !failed_jobs.is_empty();
        if repaired {
            tracing::warn!(
                failed_jobs = failed_jobs.len(),
                reset_drain,
                "🩹 Print queue recovered"
            );
            self.inner.broadcaster.emit(BroadcastEvent::global(
                EventName::PrintQueueRecovered,
                json!({
                    "failedJobs": failed_jobs,
                    "resetProcessingFlag": reset_drain,
                    "queueLength": queue_length,
                }),
            ));
        }

        if let Some(epoch) = drain_epoch {
            self.spawn_drain(epoch);
        }
        repaired
    }

    pub fn status(&self) -> PrintQueueStatus {
        let state = self.state();
        PrintQueueStatus {
            total: state.queue.len(),
            pending: state.queue.count_with_status(PrintStatus::Pending),
            processing: state.queue.count_with_status(PrintStatus::Processing),
            failed: state.queue.count_with_status(PrintStatus::Failed),
            is_processing: state.busy,
            is_running: self.inner.running.load(Ordering::SeqCst),
        }
    }

    /// Drop every queued job. Returns how many were removed.
    pub fn clear_queue(&self) -> usize {
        let cleared = self.state().queue.clear();
        tracing::info!(cleared, "Print queue cleared");
        self.inner.broadcaster.emit(BroadcastEvent::global(
            EventName::PrintQueueClear,
            json!({ "cleared": cleared }),
        ));
        cleared
    }
}
