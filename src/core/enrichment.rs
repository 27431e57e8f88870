use crate::models::{EnrichmentRequest, EnrichmentResult};
use crate::services::provider::{DirectoryProvider, ProviderError};
use crate::services::retry::{call_with_retry, RetryPolicy};
use futures::future::join_all;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Batch pacing for the contact reveal endpoint
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EnrichmentSettings {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
}

fn default_batch_size() -> usize { 3 }
fn default_batch_delay_ms() -> u64 { 1500 }

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self { batch_size: default_batch_size(), batch_delay_ms: default_batch_delay_ms() }
    }
}

/// Reveals contact fields in small concurrent batches.
///
/// Batches run sequentially with a fixed pause between them (none after the
/// last). Items inside a batch run concurrently. A failed item is logged and
/// left out of the result; it never aborts the batch.
pub struct ContactEnricher {
    provider: Arc<dyn DirectoryProvider>,
    batch_size: usize,
    batch_delay: Duration,
    retry: RetryPolicy,
}

impl ContactEnricher {
    pub fn new(provider: Arc<dyn DirectoryProvider>, settings: &EnrichmentSettings, retry: RetryPolicy) -> Self {
        Self {
            provider,
            batch_size: settings.batch_size.max(1),
            batch_delay: Duration::from_millis(settings.batch_delay_ms),
            retry,
        }
    }

    async fn enrich_one(&self, request: &EnrichmentRequest) -> Result<Option<EnrichmentResult>, ProviderError> {
        call_with_retry(&self.retry, "people match", ProviderError::is_retryable, || {
            self.provider.enrich_contact(request)
        })
        .await
    }

    /// Enrich every request, keyed by candidate id. Only successes are present.
    pub async fn enrich(&self, requests: &[EnrichmentRequest]) -> HashMap<String, EnrichmentResult> {
        let mut results = HashMap::with_capacity(requests.len());
        if requests.is_empty() {
            return results;
        }

        let total_batches = requests.len().div_ceil(self.batch_size);
        let mut failed = 0usize;
        let mut unmatched = 0usize;

        for (index, batch) in requests.chunks(self.batch_size).enumerate() {
            if index > 0 && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }

            tracing::debug!(batch = index + 1, total_batches, size = batch.len(), "Enriching batch");

            let outcomes = join_all(batch.iter().map(|request| self.enrich_one(request))).await;

            for (request, outcome) in batch.iter().zip(outcomes) {
                match outcome {
                    Ok(Some(result)) => {
                        results.insert(request.id.clone(), result);
                    }
                    Ok(None) => unmatched += 1,
                    Err(e) => {
                        failed += 1;
                        tracing::warn!(candidate_id = %request.id, error = %e, "Contact enrichment failed");
                    }
                }
            }
        }

        let emails = results.values().filter(|r| r.email.as_deref().is_some_and(|e| !e.is_empty())).count();
        let phones = results
            .values()
            .filter(|r| r.best_phone.is_some() || !r.phone_numbers.is_empty())
            .count();

        tracing::info!(
            provider = %self.provider.kind(),
            enriched = results.len(),
            total = requests.len(),
            emails_revealed = emails,
            phones_found = phones,
            unmatched,
            failed,
            "Contact enrichment complete"
        );

        results
    }
}
