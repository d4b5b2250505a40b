//! PrintJob and PrintQueue
//!
//! Ticket printing is best effort and lives only in memory. The queue is
//! capped: on overflow only the newest jobs survive.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

use crate::domain::value_objects::PrintStatus;

/// What goes on the printed slip
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrintPayload {
    pub ticket_number: String,
    pub department_name: String,
    pub department_code: String,
    pub date: String,
    pub time: String,
}

/// A ticket slip waiting to be printed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrintJob {
    pub id: Uuid,
    pub payload: PrintPayload,
    pub status: PrintStatus,
    pub retries: u32,
    pub added_at: DateTime<Utc>,
    pub processing_started_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl PrintJob {
    pub fn new(payload: PrintPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload,
            status: PrintStatus::Pending,
            retries: 0,
            added_at: Utc::now(),
            processing_started_at: None,
            last_error: None,
        }
    }

    /// When the job entered `processing` (falls back to `added_at`)
    fn processing_since(&self) -> DateTime<Utc> {
        self.processing_started_at.unwrap_or(self.added_at)
    }
}

/// Result of recording a failed print attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    /// Moved to the tail for another attempt
    Requeued { retries: u32 },
    /// Retry budget exhausted, job removed
    Dropped { retries: u32 },
    /// Job was already gone (cleared or swept)
    Missing,
}

/// Bounded FIFO of print jobs with retry-to-tail
#[derive(Debug, Clone)]
pub struct PrintQueue {
    jobs: VecDeque<PrintJob>,
    max_len: usize,
    retain_on_overflow: usize,
}

impl PrintQueue {
    pub fn new(max_len: usize, retain_on_overflow: usize) -> Self {
        let max_len = max_len.max(1);
        Self {
            jobs: VecDeque::new(),
            max_len,
            retain_on_overflow: retain_on_overflow.min(max_len - 1),
        }
    }

    /// Append a job. A full queue is first cut down to its newest
    /// `retain_on_overflow` jobs. Returns how many jobs were dropped.
    pub fn push(&mut self, job: PrintJob) -> usize {
        let mut dropped = 0;
        if self.jobs.len() >= self.max_len {
            while self.jobs.len() > self.retain_on_overflow {
                self.jobs.pop_front();
                dropped += 1;
            }
        }
        self.jobs.push_back(job);
        dropped
    }

    /// Claim the first job not already being printed
    pub fn claim_next(&mut self, now: DateTime<Utc>) -> Option<PrintJob> {
        let job = self
            .jobs
            .iter_mut()
            .find(|job| job.status != PrintStatus::Processing)?;
        job.status = PrintStatus::Processing;
        job.processing_started_at = Some(now);
        Some(job.clone())
    }

    /// Remove a printed job
    pub fn complete(&mut self, id: Uuid) -> bool {
        self.take(id).is_some()
    }

    /// Count a failed attempt; requeue to the tail or drop at `max_retries`
    pub fn record_failure(&mut self, id: Uuid, error: String, max_retries: u32) -> RetryOutcome {
        let Some(mut job) = self.take(id) else {
            return RetryOutcome::Missing;
        };

        job.retries += 1;
        job.last_error = Some(error);

        if job.retries < max_retries {
            let retries = job.retries;
            job.status = PrintStatus::Pending;
            job.processing_started_at = None;
            self.jobs.push_back(job);
            RetryOutcome::Requeued { retries }
        } else {
            RetryOutcome::Dropped {
                retries: job.retries,
            }
        }
    }

    /// Remove every job added before `cutoff`, whatever its status
    pub fn remove_added_before(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|job| job.added_at >= cutoff);
        before - self.jobs.len()
    }

    /// Force jobs stuck in `processing` longer than `timeout` to `failed`.
    ///
    /// A forced failure counts as an attempt: jobs that reach `max_retries`
    /// are removed instead of being handed back to `claim_next`.
    pub fn fail_stuck(
        &mut self,
        now: DateTime<Utc>,
        timeout: Duration,
        max_retries: u32,
    ) -> Vec<Uuid> {
        let mut recovered = Vec::new();
        for job in self.jobs.iter_mut() {
            if job.status == PrintStatus::Processing && now - job.processing_since() > timeout {
                job.status = PrintStatus::Failed;
                job.retries += 1;
                job.processing_started_at = None;
                job.last_error = Some("stuck in processing".to_string());
                recovered.push(job.id);
            }
        }
        self.jobs.retain(|job| {
            !(job.status == PrintStatus::Failed && job.retries >= max_retries)
        });
        recovered
    }

    pub fn has_processing(&self) -> bool {
        self.jobs
            .iter()
            .any(|job| job.status == PrintStatus::Processing)
    }

    pub fn count_with_status(&self, status: PrintStatus) -> usize {
        self.jobs.iter().filter(|job| job.status == status).count()
    }

    pub fn clear(&mut self) -> usize {
        let removed = self.jobs.len();
        self.jobs.clear();
        removed
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn jobs(&self) -> impl Iterator<Item = &PrintJob> {
        self.jobs.iter()
    }

    fn take(&mut self, id: Uuid) -> Option<PrintJob> {
        let position = self.jobs.iter().position(|job| job.id == id)?;
        self.jobs.remove(position)
    }
}

impl Default for PrintQueue {
    fn default() -> Self {
        Self::new(50, 10)
    }
}
