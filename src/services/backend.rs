use crate::models::{IcpSearchRequest, IcpSearchResponse};
use crate::services::retry::{call_with_retry, RetryPolicy};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    /// 4xx: the request itself is wrong, retrying will not help
    #[error("Backend rejected the request ({status}): {message}")]
    Client { status: u16, message: String },

    #[error("Backend error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, BackendError::Server { .. } | BackendError::Network(_))
    }
}

/// Client the extraction agent uses to call the ICP search endpoint
pub struct BackendClient {
    base_url: String,
    actor_version: String,
    client: Client,
    retry: RetryPolicy,
}

impl BackendClient {
    pub fn new(base_url: String, actor_version: String, timeout: Duration, retry: RetryPolicy) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { base_url, actor_version, client, retry }
    }

    async fn post_once(&self, request: &IcpSearchRequest, run_id: &str) -> Result<IcpSearchResponse, BackendError> {
        let url = format!("{}/api/v1/icp-search", self.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("X-Actor-Version", &self.actor_version)
            .header("X-Apify-Run-Id", run_id)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if status.is_client_error() {
            return Err(BackendError::Client { status: status.as_u16(), message: text });
        }
        if !status.is_success() {
            return Err(BackendError::Server { status: status.as_u16(), message: text });
        }

        serde_json::from_str(&text).map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }

    /// POST the search, retrying server and network failures
    pub async fn run_icp_search(&self, request: &IcpSearchRequest) -> Result<IcpSearchResponse, BackendError> {
        let run_id = request.apify_run_id.clone().unwrap_or_else(|| "local".to_string());

        tracing::info!(run_id = %run_id, titles = request.job_titles.len(), "Calling ICP search backend");

        call_with_retry(&self.retry, "icp search", BackendError::is_retryable, || {
            self.post_once(request, &run_id)
        })
        .await
    }
}
