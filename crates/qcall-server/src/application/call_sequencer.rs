//! Call Sequencer
//!
//! Serializes call and recall requests from every counter into a single
//! processing slot. Requests are persisted first and then taken one at a
//! time, highest priority first and oldest first within a priority.
//!
//! A processing cycle holds the cycle lock from the store query until the
//! request is deleted, including the settle delay that lets the
//! announcement finish. Repeated failures trip a breaker that stops the
//! sequencer until it is started again.
//!
//! A request can be left in `processing` when the process dies mid-cycle or
//! the store rejects the failure mark. Such rows are put back to `pending`
//! by the first cycle after a start or after a lost failure mark, and
//! first calls ignore them once they outlive the processing lease.

use chrono::Utc;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use uuid::Uuid;

use qcall::{
    Announcer, BroadcastEvent, Broadcaster, CallKind, CallRequest, CallRequestRepository, Counter,
    CounterRepository, DomainError, EventName, FirstCallCache, Ticket, TicketRepository,
};

use super::with_timeout;

/// Sequencer configuration
#[derive(Debug, Clone)]
pub struct SequencerConfig {
    /// Interval between polls of the request store
    pub poll_interval: Duration,
    /// Pause after an announcement before the next request is taken
    pub settle_delay: Duration,
    /// A repeated first call within this window is reported as a duplicate
    pub duplicate_window: Duration,
    /// How long dispatched first calls stay in the history
    pub history_retention: Duration,
    /// Upper bound on history entries
    pub history_capacity: usize,
    /// Consecutive failed cycles before the sequencer stops itself (0 = never)
    pub failure_threshold: u32,
    /// Upper bound for each request store call
    pub store_timeout: Duration,
    /// Upper bound for one announcement
    pub announce_timeout: Duration,
}

impl SequencerConfig {
    /// Longest a healthy cycle keeps a request in `processing`
    pub fn processing_lease(&self) -> Duration {
        self.store_timeout * 4 + self.announce_timeout + self.settle_delay
    }
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            settle_delay: Duration::from_secs(3),
            duplicate_window: Duration::from_secs(120),
            history_retention: Duration::from_secs(300),
            history_capacity: FirstCallCache::DEFAULT_CAPACITY,
            failure_threshold: 3,
            store_timeout: Duration::from_secs(5),
            announce_timeout: Duration::from_secs(30),
        }
    }
}

/// Result of an enqueue
#[derive(Debug, Clone, PartialEq)]
pub enum EnqueueOutcome {
    /// A new request was persisted
    Queued(CallRequest),
    /// An identical first call is already waiting or in progress
    AlreadyQueued(CallRequest),
    /// The ticket's first call was dispatched inside the duplicate window
    Duplicate,
}

/// Result of one processing cycle
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// The sequencer is not running
    Stopped,
    /// Another cycle holds the lock
    Busy,
    /// Nothing pending
    Idle,
    /// Request announced, applied and deleted
    Dispatched(CallRequest),
    /// A first call for a ticket already in the history was discarded
    SkippedDuplicate(Uuid),
    /// The cycle failed
    Failed(String),
}

/// Diagnostic snapshot
#[derive(Debug, Clone)]
pub struct QueueStatus {
    pub pending: u64,
    pub processing: u64,
    pub failed: u64,
    pub is_running: bool,
    pub is_processing: bool,
    pub consecutive_failures: u32,
    pub first_call_records: usize,
}

struct Inner {
    requests: Arc<dyn CallRequestRepository>,
    tickets: Arc<dyn TicketRepository>,
    counters: Arc<dyn CounterRepository>,
    announcer: Arc<dyn Announcer>,
    broadcaster: Arc<dyn Broadcaster>,
    config: SequencerConfig,
    history: Mutex<FirstCallCache>,
    cycle_lock: tokio::sync::Mutex<()>,
    running: AtomicBool,
    /// Bumped by every start so a superseded poll loop exits
    generation: AtomicU64,
    consecutive_failures: AtomicU32,
    /// Requeue orphaned `processing` rows before the next cycle
    recover_orphans: AtomicBool,
}

/// Single-slot call/recall sequencer. Cheap to clone.
#[derive(Clone)]
pub struct CallSequencer {
    inner: Arc<Inner>,
}

fn chrono_duration(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::days(365))
}

impl CallSequencer {
    pub fn new(
        requests: Arc<dyn CallRequestRepository>,
        tickets: Arc<dyn TicketRepository>,
        counters: Arc<dyn CounterRepository>,
        announcer: Arc<dyn Announcer>,
        broadcaster: Arc<dyn Broadcaster>,
        config: Option<SequencerConfig>,
    ) -> Self {
        let config = config.unwrap_or_default();
        let history = FirstCallCache::new(
            chrono_duration(config.history_retention),
            config.history_capacity,
        );

        Self {
            inner: Arc::new(Inner {
                requests,
                tickets,
                counters,
                announcer,
                broadcaster,
                config,
                history: Mutex::new(history),
                cycle_lock: tokio::sync::Mutex::new(()),
                running: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                consecutive_failures: AtomicU32::new(0),
                recover_orphans: AtomicBool::new(false),
            }),
        }
    }

    fn history(&self) -> MutexGuard<'_, FirstCallCache> {
        self.inner
            .history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Enqueue a first call
    pub async fn enqueue_call(
        &self,
        ticket: &Ticket,
        counter: &Counter,
        source_label: impl Into<String>,
    ) -> Result<EnqueueOutcome, DomainError> {
        self.enqueue(ticket, counter, CallKind::Call, source_label)
            .await
    }

    /// Enqueue a recall
    pub async fn enqueue_recall(
        &self,
        ticket: &Ticket,
        counter: &Counter,
        source_label: impl Into<String>,
    ) -> Result<EnqueueOutcome, DomainError> {
        self.enqueue(ticket, counter, CallKind::Recall, source_label)
            .await
    }

    /// Persist a call request and schedule a processing attempt.
    ///
    /// First calls are suppressed while the ticket's previous first call is
    /// inside the duplicate window, and collapse onto an identical request
    /// that is still pending or processing. Recalls are always persisted.
    pub async fn enqueue(
        &self,
        ticket: &Ticket,
        counter: &Counter,
        kind: CallKind,
        source_label: impl Into<String>,
    ) -> Result<EnqueueOutcome, DomainError> {
        let config = &self.inner.config;

        if !kind.is_recall() {
            let window = chrono_duration(config.duplicate_window);
            if self
                .history()
                .dispatched_within(ticket.id, window, Utc::now())
            {
                tracing::info!(
                    ticket = %ticket.ticket_number,
                    "Duplicate first call suppressed"
                );
                return Ok(EnqueueOutcome::Duplicate);
            }

            let processing_since = Utc::now() - chrono_duration(config.processing_lease());
            let existing = with_timeout(
                "find_active",
                config.store_timeout,
                self.inner
                    .requests
                    .find_active(ticket.id, kind, processing_since),
            )
            .await?;
            if let Some(existing) = existing {
                tracing::debug!(
                    request_id = %existing.id,
                    ticket = %ticket.ticket_number,
                    "First call already queued"
                );
                return Ok(EnqueueOutcome::AlreadyQueued(existing));
            }
        }

        let request = CallRequest::new(ticket, counter, kind, source_label.into());
        let saved = with_timeout(
            "insert",
            config.store_timeout,
            self.inner.requests.insert(&request),
        )
        .await?;

        tracing::info!(
            request_id = %saved.id,
            ticket = %saved.ticket_number,
            counter = saved.counter_number,
            kind = %saved.kind,
            priority = %saved.priority,
            source = %saved.source_label,
            "Call request queued"
        );

        self.inner.broadcaster.emit(BroadcastEvent::to_room(
            EventName::CallRequestAdded,
            saved.counter_room(),
            json!({
                "requestId": saved.id,
                "ticketNumber": saved.ticket_number,
                "counterNumber": saved.counter_number,
                "isRecall": saved.is_recall,
                "priority": saved.priority,
                "requestedAt": saved.requested_at,
            }),
        ));

        self.kick();

        Ok(EnqueueOutcome::Queued(saved))
    }

    /// Fire-and-forget processing attempt
    fn kick(&self) {
        if !self.is_running() {
            return;
        }
        let this = self.clone();
        tokio::spawn(async move {
            this.process_next().await;
        });
    }

    /// Start polling. Returns `false` if already running.
    ///
    /// The first poll happens immediately.
    pub fn start(&self) -> bool {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            tracing::debug!("Call sequencer already running");
            return false;
        }

        self.inner.consecutive_failures.store(0, Ordering::SeqCst);
        self.inner.recover_orphans.store(true, Ordering::SeqCst);
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;

        tracing::info!(
            "📣 Call sequencer started (poll interval: {:?})",
            self.inner.config.poll_interval
        );

        let this = self.clone();
        tokio::spawn(async move {
            this.poll_loop(generation).await;
        });

        true
    }

    /// Stop polling. An in-flight cycle runs to completion.
    pub fn stop(&self) {
        if self.inner.running.swap(false, Ordering::SeqCst) {
            tracing::info!("📣 Call sequencer stopped");
        }
    }

    async fn poll_loop(self, generation: u64) {
        let period = self
            .inner
            .config
            .poll_interval
            .max(Duration::from_millis(1));
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if !self.is_running() || self.inner.generation.load(Ordering::SeqCst) != generation {
                break;
            }

            self.process_next().await;
        }
    }

    /// Run one processing cycle if the slot is free
    pub async fn process_next(&self) -> CycleOutcome {
        if !self.is_running() {
            return CycleOutcome::Stopped;
        }

        let Ok(_slot) = self.inner.cycle_lock.try_lock() else {
            return CycleOutcome::Busy;
        };

        let mut in_flight = None;
        match self.run_cycle(&mut in_flight).await {
            Ok(outcome) => {
                self.inner.consecutive_failures.store(0, Ordering::SeqCst);
                outcome
            }
            Err(e) => {
                self.record_failure(in_flight, &e).await;
                CycleOutcome::Failed(e.to_string())
            }
        }
    }

    async fn record_failure(&self, in_flight: Option<CallRequest>, error: &DomainError) {
        let config = &self.inner.config;

        if let Some(mut request) = in_flight {
            tracing::error!(
                request_id = %request.id,
                ticket = %request.ticket_number,
                transient = error.is_transient(),
                "Call request failed: {}",
                error
            );
            request.fail(error.to_string());
            if let Err(e) = with_timeout(
                "update",
                config.store_timeout,
                self.inner.requests.update(&request),
            )
            .await
            {
                tracing::warn!(request_id = %request.id, "Failed to mark request failed: {}", e);
                self.inner.recover_orphans.store(true, Ordering::SeqCst);
            }
        } else {
            tracing::error!(transient = error.is_transient(), "Call cycle failed: {}", error);
        }

        let failures = self.inner.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
        if config.failure_threshold > 0 && failures >= config.failure_threshold {
            tracing::error!(
                "🛑 Call sequencer stopping after {} consecutive failures; restart required",
                failures
            );
            self.stop();
        }
    }

    async fn run_cycle(
        &self,
        in_flight: &mut Option<CallRequest>,
    ) -> Result<CycleOutcome, DomainError> {
        let inner = &self.inner;
        let config = &inner.config;

        // the cycle lock is held, so no processing row belongs to a live cycle
        if inner.recover_orphans.swap(false, Ordering::SeqCst) {
            let requeued = with_timeout(
                "reset_processing",
                config.store_timeout,
                inner.requests.reset_processing(),
            )
            .await
            .inspect_err(|_| inner.recover_orphans.store(true, Ordering::SeqCst))?;
            if requeued > 0 {
                tracing::warn!(requeued, "Requeued call requests left in processing");
            }
        }

        let next = with_timeout(
            "find_next_pending",
            config.store_timeout,
            inner.requests.find_next_pending(),
        )
        .await?;
        let Some(mut request) = next else {
            return Ok(CycleOutcome::Idle);
        };
        *in_flight = Some(request.clone());

        let now = Utc::now();
        if !request.is_recall && self.history().contains(request.ticket_id, now) {
            tracing::warn!(
                request_id = %request.id,
                ticket = %request.ticket_number,
                "Discarding first call for a ticket that was just called"
            );
            with_timeout(
                "delete",
                config.store_timeout,
                inner.requests.delete(request.id),
            )
            .await?;
            return Ok(CycleOutcome::SkippedDuplicate(request.id));
        }

        request.start_processing(now);
        let mut request = with_timeout(
            "update",
            config.store_timeout,
            inner.requests.update(&request),
        )
        .await?;
        *in_flight = Some(request.clone());

        if !request.is_recall {
            let mut history = self.history();
            history.record(request.ticket_id, now);
            history.evict_expired(now);
        }

        tracing::info!(
            request_id = %request.id,
            ticket = %request.ticket_number,
            counter = request.counter_number,
            kind = %request.kind,
            "Processing call request"
        );

        self.announce(&request).await;

        let at = Utc::now();
        if request.is_recall {
            with_timeout(
                "touch_counter",
                config.store_timeout,
                inner.counters.touch(request.counter_id, at),
            )
            .await?;

            inner.broadcaster.emit(BroadcastEvent::global(
                EventName::TicketRecalled,
                json!({
                    "ticketId": request.ticket_id,
                    "ticketNumber": request.ticket_number,
                    "counterId": request.counter_id,
                    "counterNumber": request.counter_number,
                    "departmentId": request.department_id,
                    "recalledAt": at,
                }),
            ));
        } else {
            let ticket = with_timeout(
                "mark_called",
                config.store_timeout,
                inner
                    .tickets
                    .mark_called(request.ticket_id, request.counter_id, at),
            )
            .await?;
            with_timeout(
                "assign_ticket",
                config.store_timeout,
                inner
                    .counters
                    .assign_ticket(request.counter_id, request.ticket_id, at),
            )
            .await?;

            inner.broadcaster.emit(BroadcastEvent::global(
                EventName::TicketStatusUpdated,
                json!({
                    "ticketId": ticket.id,
                    "ticketNumber": ticket.ticket_number,
                    "status": ticket.status,
                    "counterId": request.counter_id,
                    "counterNumber": request.counter_number,
                    "departmentId": ticket.department_id,
                    "calledAt": ticket.called_at,
                }),
            ));
        }

        tokio::time::sleep(config.settle_delay).await;

        with_timeout(
            "delete",
            config.store_timeout,
            inner.requests.delete(request.id),
        )
        .await?;
        *in_flight = None;
        request.completed_at = Some(Utc::now());

        inner.broadcaster.emit(BroadcastEvent::to_room(
            EventName::CallRequestCompleted,
            request.counter_room(),
            json!({
                "requestId": request.id,
                "ticketNumber": request.ticket_number,
                "counterNumber": request.counter_number,
                "isRecall": request.is_recall,
                "completedAt": request.completed_at,
            }),
        ));
        inner
            .broadcaster
            .emit(BroadcastEvent::global(EventName::ReloadAllCounters, json!({})));

        tracing::info!(
            request_id = %request.id,
            ticket = %request.ticket_number,
            "Call request completed"
        );

        Ok(CycleOutcome::Dispatched(request))
    }

    /// Voice failures are logged and never block the state transition
    async fn announce(&self, request: &CallRequest) {
        let result = tokio::time::timeout(
            self.inner.config.announce_timeout,
            self.inner.announcer.announce(
                &request.ticket_number,
                request.counter_number,
                request.is_recall,
            ),
        )
        .await;

        match result {
            Ok(Ok(true)) => {
                tracing::debug!(ticket = %request.ticket_number, "Announcement played from clip");
            }
            Ok(Ok(false)) => {
                tracing::info!(ticket = %request.ticket_number, "Announcement fell back to live speech");
            }
            Ok(Err(e)) => {
                tracing::warn!(ticket = %request.ticket_number, "Announcement failed: {}", e);
            }
            Err(_) => {
                tracing::warn!(
                    ticket = %request.ticket_number,
                    "Announcement timed out after {:?}",
                    self.inner.config.announce_timeout
                );
            }
        }
    }

    /// Diagnostic snapshot of the queue
    pub async fn status(&self) -> Result<QueueStatus, DomainError> {
        let counts = with_timeout(
            "count_by_status",
            self.inner.config.store_timeout,
            self.inner.requests.count_by_status(),
        )
        .await?;

        Ok(QueueStatus {
            pending: counts.pending,
            processing: counts.processing,
            failed: counts.failed,
            is_running: self.is_running(),
            is_processing: self.inner.cycle_lock.try_lock().is_err(),
            consecutive_failures: self.inner.consecutive_failures.load(Ordering::SeqCst),
            first_call_records: self.history().len(),
        })
    }

    /// Forget every dispatched first call. Returns how many were dropped.
    pub fn clear_first_call_history(&self) -> usize {
        let mut history = self.history();
        let cleared = history.len();
        history.clear();
        tracing::info!("First call history cleared ({} entries)", cleared);
        cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryCallRequestRepository, InMemoryTicketStore, RecordingBroadcaster,
    };
    use async_trait::async_trait;
    use qcall::{CounterStatus, Priority, RequestStatus, Room, TicketStatus};

    #[derive(Default)]
    struct RecordingAnnouncer {
        calls: Mutex<Vec<(String, i32, bool)>>,
        fail: AtomicBool,
    }

    impl RecordingAnnouncer {
        fn calls(&self) -> Vec<(String, i32, bool)> {
            self.calls.lock().unwrap().clone()
        }

        fn count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Announcer for RecordingAnnouncer {
        async fn announce(
            &self,
            ticket_number: &str,
            counter_number: i32,
            is_recall: bool,
        ) -> Result<bool, DomainError> {
            self.calls
                .lock()
                .unwrap()
                .push((ticket_number.to_string(), counter_number, is_recall));
            if self.fail.load(Ordering::SeqCst) {
                return Err(DomainError::ExternalService("speaker offline".into()));
            }
            Ok(true)
        }
    }

    struct Fixture {
        sequencer: CallSequencer,
        requests: Arc<InMemoryCallRequestRepository>,
        store: Arc<InMemoryTicketStore>,
        announcer: Arc<RecordingAnnouncer>,
        broadcaster: Arc<RecordingBroadcaster>,
        department: Uuid,
    }

    impl Fixture {
        fn new() -> Self {
            let requests = Arc::new(InMemoryCallRequestRepository::new());
            let store = Arc::new(InMemoryTicketStore::new());
            let announcer = Arc::new(RecordingAnnouncer::default());
            let broadcaster = Arc::new(RecordingBroadcaster::new());

            let sequencer = CallSequencer::new(
                requests.clone(),
                store.clone(),
                store.clone(),
                announcer.clone(),
                broadcaster.clone(),
                Some(fast_config()),
            );

            Self {
                sequencer,
                requests,
                store,
                announcer,
                broadcaster,
                department: Uuid::new_v4(),
            }
        }

        fn ticket(&self, number: &str, priority: Priority) -> Ticket {
            self.store
                .add_ticket(Ticket::new(number, priority, self.department))
        }

        fn counter(&self, number: i32) -> Counter {
            self.store.add_counter(Counter::new(number, self.department))
        }
    }

    fn fast_config() -> SequencerConfig {
        SequencerConfig {
            poll_interval: Duration::from_millis(10),
            settle_delay: Duration::from_millis(5),
            store_timeout: Duration::from_secs(1),
            announce_timeout: Duration::from_secs(1),
            ..SequencerConfig::default()
        }
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(
                tokio::time::Instant::now() < deadline,
                "condition not reached in time"
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn test_higher_priority_is_dispatched_first() {
        let fx = Fixture::new();
        let counter = fx.counter(1);
        let normal = fx.ticket("A001", Priority::Normal);
        let emergency = fx.ticket("E001", Priority::Emergency);

        fx.sequencer
            .enqueue_call(&normal, &counter, "counter-1")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
        fx.sequencer
            .enqueue_call(&emergency, &counter, "counter-1")
            .await
            .unwrap();

        assert!(fx.sequencer.start());
        wait_until(|| fx.announcer.count() == 2).await;

        let order: Vec<String> = fx.announcer.calls().into_iter().map(|c| c.0).collect();
        assert_eq!(order, vec!["E001", "A001"]);
        fx.sequencer.stop();
    }

    #[tokio::test]
    async fn test_equal_priority_is_fifo() {
        let fx = Fixture::new();
        let counter = fx.counter(2);
        let first = fx.ticket("B001", Priority::Senior);
        let second = fx.ticket("B002", Priority::Senior);

        fx.sequencer.enqueue_call(&first, &counter, "kiosk").await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
        fx.sequencer.enqueue_call(&second, &counter, "kiosk").await.unwrap();

        fx.sequencer.start();
        wait_until(|| fx.announcer.count() == 2).await;

        let order: Vec<String> = fx.announcer.calls().into_iter().map(|c| c.0).collect();
        assert_eq!(order, vec!["B001", "B002"]);
        fx.sequencer.stop();
    }

    #[tokio::test]
    async fn test_first_call_applies_state_and_suppresses_repeat() {
        let fx = Fixture::new();
        let counter = fx.counter(3);
        let ticket = fx.ticket("A001", Priority::Normal);
        fx.sequencer.start();

        let outcome = fx
            .sequencer
            .enqueue_call(&ticket, &counter, "counter-3")
            .await
            .unwrap();
        assert!(matches!(outcome, EnqueueOutcome::Queued(_)));

        wait_until(|| fx.requests.all().is_empty() && fx.announcer.count() == 1).await;

        let again = fx
            .sequencer
            .enqueue_call(&ticket, &counter, "counter-3")
            .await
            .unwrap();
        assert_eq!(again, EnqueueOutcome::Duplicate);
        assert_eq!(fx.requests.insert_count(), 1);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(fx.announcer.count(), 1);
        assert_eq!(fx.broadcaster.count(EventName::TicketStatusUpdated), 1);

        let ticket = fx.store.ticket(ticket.id).unwrap();
        assert_eq!(ticket.status, TicketStatus::Called);
        assert_eq!(ticket.assigned_counter, Some(counter.id));
        assert!(ticket.called_at.is_some());

        let counter = fx.store.counter(counter.id).unwrap();
        assert_eq!(counter.status, CounterStatus::Busy);
        assert_eq!(counter.current_ticket, Some(ticket.id));

        assert_eq!(fx.broadcaster.count(EventName::CallRequestCompleted), 1);
        assert_eq!(fx.broadcaster.count(EventName::ReloadAllCounters), 1);

        // queue changes reach the counter room and unscoped dashboards
        for name in [EventName::CallRequestAdded, EventName::CallRequestCompleted] {
            let event = fx.broadcaster.named(name).pop().unwrap();
            assert!(event.is_visible_to(Some(&Room::Counter(3))));
            assert!(event.is_visible_to(None));
            assert!(!event.is_visible_to(Some(&Room::Counter(4))));
        }
        fx.sequencer.stop();
    }

    #[tokio::test]
    async fn test_pending_first_call_is_not_queued_twice() {
        let fx = Fixture::new();
        let counter = fx.counter(1);
        let ticket = fx.ticket("A002", Priority::Normal);

        let first = fx
            .sequencer
            .enqueue_call(&ticket, &counter, "counter-1")
            .await
            .unwrap();
        let second = fx
            .sequencer
            .enqueue_call(&ticket, &counter, "counter-1")
            .await
            .unwrap();

        let EnqueueOutcome::Queued(queued) = first else {
            panic!("expected a new request");
        };
        assert_eq!(second, EnqueueOutcome::AlreadyQueued(queued));
        assert_eq!(fx.requests.insert_count(), 1);
    }

    #[tokio::test]
    async fn test_recalls_are_never_deduplicated() {
        let fx = Fixture::new();
        let counter = fx.counter(5);
        let ticket = fx.ticket("C010", Priority::Normal);
        fx.sequencer.start();

        for _ in 0..3 {
            let outcome = fx
                .sequencer
                .enqueue_recall(&ticket, &counter, "counter-5")
                .await
                .unwrap();
            assert!(matches!(outcome, EnqueueOutcome::Queued(_)));
        }

        wait_until(|| fx.announcer.count() == 3).await;
        wait_until(|| fx.broadcaster.count(EventName::TicketRecalled) == 3).await;

        assert!(fx.announcer.calls().iter().all(|(_, _, recall)| *recall));
        assert_eq!(fx.broadcaster.count(EventName::TicketStatusUpdated), 0);
        assert_eq!(
            fx.store.ticket(ticket.id).unwrap().status,
            TicketStatus::Waiting
        );
        assert!(fx.store.counter(counter.id).unwrap().last_activity.is_some());
        fx.sequencer.stop();
    }

    #[tokio::test]
    async fn test_concurrent_burst_keeps_single_request_in_flight() {
        let fx = Fixture::new();
        let counter = fx.counter(1);
        fx.sequencer.start();

        let mut handles = Vec::new();
        for n in 0..10 {
            let ticket = fx.ticket(&format!("A{:03}", n), Priority::Normal);
            let sequencer = fx.sequencer.clone();
            let counter = counter.clone();
            handles.push(tokio::spawn(async move {
                sequencer.enqueue_call(&ticket, &counter, "burst").await
            }));
        }
        for handle in handles {
            assert!(matches!(
                handle.await.unwrap().unwrap(),
                EnqueueOutcome::Queued(_)
            ));
        }

        wait_until(|| fx.announcer.count() == 10).await;
        wait_until(|| fx.requests.all().is_empty()).await;

        assert_eq!(fx.requests.max_processing_observed(), 1);
        fx.sequencer.stop();
    }

    #[tokio::test]
    async fn test_slipped_through_first_call_is_discarded() {
        let fx = Fixture::new();
        let counter = fx.counter(2);
        let ticket = fx.ticket("D004", Priority::Normal);
        fx.sequencer.start();

        fx.sequencer
            .enqueue_call(&ticket, &counter, "counter-2")
            .await
            .unwrap();
        wait_until(|| fx.requests.all().is_empty() && fx.announcer.count() == 1).await;

        let stale = CallRequest::new(&ticket, &counter, CallKind::Call, "race".into());
        fx.requests.insert(&stale).await.unwrap();

        wait_until(|| fx.requests.get(stale.id).is_none()).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(fx.announcer.count(), 1);
        fx.sequencer.stop();
    }

    #[tokio::test]
    async fn test_announcement_failure_does_not_block_transition() {
        let fx = Fixture::new();
        fx.announcer.fail.store(true, Ordering::SeqCst);
        let counter = fx.counter(7);
        let ticket = fx.ticket("F001", Priority::Child);
        fx.sequencer.start();

        fx.sequencer
            .enqueue_call(&ticket, &counter, "counter-7")
            .await
            .unwrap();

        wait_until(|| fx.requests.all().is_empty()).await;
        assert_eq!(
            fx.store.ticket(ticket.id).unwrap().status,
            TicketStatus::Called
        );
        assert_eq!(fx.sequencer.status().await.unwrap().consecutive_failures, 0);
        fx.sequencer.stop();
    }

    #[tokio::test]
    async fn test_failed_cycle_marks_request_failed() {
        let fx = Fixture::new();
        let counter = fx.counter(1);
        // ticket unknown to the store, so the state transition fails
        let ticket = Ticket::new("X999", Priority::Normal, fx.department);
        fx.sequencer.start();

        let EnqueueOutcome::Queued(request) = fx
            .sequencer
            .enqueue_call(&ticket, &counter, "counter-1")
            .await
            .unwrap()
        else {
            panic!("expected a new request");
        };

        wait_until(|| {
            fx.requests
                .get(request.id)
                .is_some_and(|r| r.status == RequestStatus::Failed)
        })
        .await;

        let failed = fx.requests.get(request.id).unwrap();
        assert!(failed.error.unwrap().contains("not found"));
        assert!(fx.sequencer.is_running());
        fx.sequencer.stop();
    }

    #[tokio::test]
    async fn test_circuit_breaker_stops_after_consecutive_failures() {
        let fx = Fixture::new();
        let counter = fx.counter(1);
        let ticket = fx.ticket("G001", Priority::Normal);
        fx.requests.set_fail_queries(true);

        fx.sequencer.start();
        wait_until(|| !fx.sequencer.is_running()).await;
        assert_eq!(fx.sequencer.status().await.unwrap().consecutive_failures, 3);

        let outcome = fx
            .sequencer
            .enqueue_call(&ticket, &counter, "counter-1")
            .await
            .unwrap();
        assert!(matches!(outcome, EnqueueOutcome::Queued(_)));
        assert_eq!(fx.sequencer.process_next().await, CycleOutcome::Stopped);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fx.announcer.count(), 0);
        assert_eq!(fx.sequencer.status().await.unwrap().pending, 1);

        fx.requests.set_fail_queries(false);
        assert!(fx.sequencer.start());
        wait_until(|| fx.announcer.count() == 1).await;
        fx.sequencer.stop();
    }

    #[tokio::test]
    async fn test_start_is_idempotent_and_history_can_be_cleared() {
        let fx = Fixture::new();
        let counter = fx.counter(4);
        let ticket = fx.ticket("H001", Priority::Normal);

        assert!(fx.sequencer.start());
        assert!(!fx.sequencer.start());

        fx.sequencer
            .enqueue_call(&ticket, &counter, "counter-4")
            .await
            .unwrap();
        wait_until(|| fx.requests.all().is_empty() && fx.announcer.count() == 1).await;

        let status = fx.sequencer.status().await.unwrap();
        assert!(status.is_running);
        assert_eq!(status.first_call_records, 1);
        assert_eq!(status.pending, 0);

        assert_eq!(fx.sequencer.clear_first_call_history(), 1);
        let outcome = fx
            .sequencer
            .enqueue_call(&ticket, &counter, "counter-4")
            .await
            .unwrap();
        assert!(matches!(outcome, EnqueueOutcome::Queued(_)));
        wait_until(|| fx.announcer.count() == 2).await;
        fx.sequencer.stop();
    }

    #[tokio::test]
    async fn test_start_requeues_request_left_in_processing() {
        let fx = Fixture::new();
        let counter = fx.counter(1);
        let ticket = fx.ticket("J001", Priority::Normal);

        let mut orphan = CallRequest::new(&ticket, &counter, CallKind::Call, "counter-1".into());
        orphan.start_processing(Utc::now());
        fx.requests.insert(&orphan).await.unwrap();

        assert!(fx.sequencer.start());
        wait_until(|| fx.requests.all().is_empty() && fx.announcer.count() == 1).await;

        assert_eq!(
            fx.store.ticket(ticket.id).unwrap().status,
            TicketStatus::Called
        );
        let again = fx
            .sequencer
            .enqueue_call(&ticket, &counter, "counter-1")
            .await
            .unwrap();
        assert_eq!(again, EnqueueOutcome::Duplicate);
        fx.sequencer.stop();
    }

    #[tokio::test]
    async fn test_expired_processing_row_does_not_swallow_first_call() {
        let fx = Fixture::new();
        let counter = fx.counter(2);
        let stranded = fx.ticket("K001", Priority::Normal);
        let live = fx.ticket("K002", Priority::Normal);
        let lease = chrono_duration(fast_config().processing_lease());

        let mut orphan = CallRequest::new(&stranded, &counter, CallKind::Call, "counter-2".into());
        orphan.start_processing(Utc::now() - lease - chrono::Duration::seconds(1));
        fx.requests.insert(&orphan).await.unwrap();

        let mut in_progress = CallRequest::new(&live, &counter, CallKind::Call, "counter-2".into());
        in_progress.start_processing(Utc::now());
        fx.requests.insert(&in_progress).await.unwrap();

        let outcome = fx
            .sequencer
            .enqueue_call(&stranded, &counter, "counter-2")
            .await
            .unwrap();
        assert!(matches!(outcome, EnqueueOutcome::Queued(_)));

        let outcome = fx
            .sequencer
            .enqueue_call(&live, &counter, "counter-2")
            .await
            .unwrap();
        assert_eq!(outcome, EnqueueOutcome::AlreadyQueued(in_progress));
    }
}
