//! qcall API Client

use anyhow::{bail, Context, Result};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// API Client for qcall
pub struct QcallClient {
    client: Client,
    base_url: String,
}

// ============================================
// API Types
// ============================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueCallRequest {
    pub ticket_id: Uuid,
    pub counter_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_label: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequestView {
    pub ticket_number: String,
    pub counter_number: i32,
    pub is_recall: bool,
    pub priority: String,
}

#[derive(Debug, Deserialize)]
pub struct EnqueueCallResponse {
    pub result: String,
    pub request: Option<CallRequestView>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    pub pending: u64,
    pub processing: u64,
    pub failed: u64,
    pub is_running: bool,
    pub is_processing: bool,
    pub consecutive_failures: u32,
    pub first_call_records: usize,
}

#[derive(Debug, Deserialize)]
pub struct SequencerState {
    pub running: bool,
    pub changed: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintStatus {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub failed: usize,
    pub is_processing: bool,
    pub is_running: bool,
}

#[derive(Debug, Deserialize)]
pub struct Cleared {
    pub cleared: usize,
}

impl QcallClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let resp = request
            .send()
            .await
            .context("Failed to connect to qcall API")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("API error ({}): {}", status, body);
        }

        resp.json().await.context("Failed to parse response")
    }

    /// Test connection with health check
    pub async fn health(&self) -> Result<bool> {
        let resp = self.client.get(self.url("/health")).send().await?;
        Ok(resp.status().is_success())
    }

    /// Queue a first call
    pub async fn call(&self, request: &EnqueueCallRequest) -> Result<EnqueueCallResponse> {
        self.send(self.client.post(self.url("/api/calls")).json(request))
            .await
    }

    /// Queue a recall
    pub async fn recall(&self, request: &EnqueueCallRequest) -> Result<EnqueueCallResponse> {
        self.send(self.client.post(self.url("/api/calls/recall")).json(request))
            .await
    }

    pub async fn status(&self) -> Result<QueueStatus> {
        self.send(self.client.get(self.url("/api/calls/status")))
            .await
    }

    pub async fn start(&self) -> Result<SequencerState> {
        self.send(self.client.post(self.url("/api/calls/start")))
            .await
    }

    pub async fn stop(&self) -> Result<SequencerState> {
        self.send(self.client.post(self.url("/api/calls/stop")))
            .await
    }

    /// Forget dispatched first calls
    pub async fn clear_history(&self) -> Result<Cleared> {
        self.send(self.client.delete(self.url("/api/calls/history")))
            .await
    }

    pub async fn print_status(&self) -> Result<PrintStatus> {
        self.send(self.client.get(self.url("/api/print/status")))
            .await
    }

    pub async fn clear_print_queue(&self) -> Result<Cleared> {
        self.send(self.client.delete(self.url("/api/print/jobs")))
            .await
    }
}
