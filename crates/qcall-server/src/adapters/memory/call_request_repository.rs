//! In-memory CallRequestRepository with failure injection

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use qcall::{CallKind, CallRequest, CallRequestRepository, DomainError, QueueCounts, RequestStatus};

#[derive(Default)]
pub struct InMemoryCallRequestRepository {
    /// Insertion sequence breaks `requested_at` ties
    requests: Mutex<HashMap<Uuid, (u64, CallRequest)>>,
    next_seq: AtomicUsize,
    fail_queries: AtomicBool,
    max_processing: AtomicUsize,
    inserts: AtomicUsize,
}

impl InMemoryCallRequestRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `find_next_pending` fail until switched off
    pub fn set_fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    /// Highest number of simultaneously `processing` requests ever observed
    pub fn max_processing_observed(&self) -> usize {
        self.max_processing.load(Ordering::SeqCst)
    }

    pub fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub fn all(&self) -> Vec<CallRequest> {
        let requests = self.requests.lock().unwrap();
        let mut all: Vec<_> = requests.values().cloned().collect();
        all.sort_by_key(|(seq, _)| *seq);
        all.into_iter().map(|(_, request)| request).collect()
    }

    pub fn get(&self, id: Uuid) -> Option<CallRequest> {
        self.requests
            .lock()
            .unwrap()
            .get(&id)
            .map(|(_, request)| request.clone())
    }
}

#[async_trait]
impl CallRequestRepository for InMemoryCallRequestRepository {
    async fn insert(&self, request: &CallRequest) -> Result<CallRequest, DomainError> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) as u64;
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .insert(request.id, (seq, request.clone()));
        Ok(request.clone())
    }

    async fn find_active(
        &self,
        ticket_id: Uuid,
        kind: CallKind,
        processing_since: DateTime<Utc>,
    ) -> Result<Option<CallRequest>, DomainError> {
        let requests = self.requests.lock().unwrap();
        Ok(requests
            .values()
            .map(|(_, request)| request)
            .find(|r| {
                r.ticket_id == ticket_id && r.kind == kind && r.is_active_since(processing_since)
            })
            .cloned())
    }

    async fn find_next_pending(&self) -> Result<Option<CallRequest>, DomainError> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(DomainError::Repository("store unreachable".to_string()));
        }

        let requests = self.requests.lock().unwrap();
        Ok(requests
            .values()
            .filter(|(_, r)| r.status == RequestStatus::Pending)
            .min_by(|(a_seq, a), (b_seq, b)| {
                b.priority
                    .cmp(&a.priority)
                    .then(a.requested_at.cmp(&b.requested_at))
                    .then(a_seq.cmp(b_seq))
            })
            .map(|(_, r)| r.clone()))
    }

    async fn update(&self, request: &CallRequest) -> Result<CallRequest, DomainError> {
        let mut requests = self.requests.lock().unwrap();
        let entry = requests
            .get_mut(&request.id)
            .ok_or_else(|| DomainError::not_found("CallRequest", request.id))?;
        entry.1 = request.clone();

        let processing = requests
            .values()
            .filter(|(_, r)| r.status == RequestStatus::Processing)
            .count();
        self.max_processing.fetch_max(processing, Ordering::SeqCst);

        Ok(request.clone())
    }

    async fn reset_processing(&self) -> Result<u64, DomainError> {
        let mut requests = self.requests.lock().unwrap();
        let mut reset = 0;
        for (_, request) in requests.values_mut() {
            if request.status == RequestStatus::Processing {
                request.requeue();
                reset += 1;
            }
        }
        Ok(reset)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        Ok(self.requests.lock().unwrap().remove(&id).is_some())
    }

    async fn count_by_status(&self) -> Result<QueueCounts, DomainError> {
        let requests = self.requests.lock().unwrap();
        let mut counts = QueueCounts::default();
        for (_, request) in requests.values() {
            match request.status {
                RequestStatus::Pending => counts.pending += 1,
                RequestStatus::Processing => counts.processing += 1,
                RequestStatus::Failed => counts.failed += 1,
            }
        }
        Ok(counts)
    }

    async fn purge_requested_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DomainError> {
        let mut requests = self.requests.lock().unwrap();
        let before = requests.len();
        requests.retain(|_, (_, r)| r.requested_at >= cutoff);
        Ok((before - requests.len()) as u64)
    }
}
