use crate::core::contact::{merge_enrichment, needs_email_unlock};
use crate::core::dedup::{DedupGate, Partition};
use crate::core::enrichment::{ContactEnricher, EnrichmentSettings};
use crate::core::qualification::Qualifier;
use crate::core::ranker::{Ceilings, Ranker};
use crate::core::scoring::FallbackWeights;
use crate::core::verification::MatchPolicy;
use crate::models::{
    IcpProfile, PipelineLimits, ProviderKind, QualifiedLead, RankedBatch, SearchFilter,
};
use crate::services::openai::ReasoningService;
use crate::services::probe::ProfileProbe;
use crate::services::provider::{DirectoryProvider, ProviderError};
use crate::services::retry::{call_with_retry, RetryPolicy};
use crate::services::store::LeadStore;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Caller-facing pipeline failure
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid search: {0}")]
    Validation(String),

    #[error("Provider authentication failed: {0}")]
    ProviderAuth(String),

    #[error("Provider access denied: {0}")]
    ProviderPermission(String),

    #[error("Provider quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Provider unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl From<ProviderError> for PipelineError {
    fn from(error: ProviderError) -> Self {
        let message = error.to_string();
        match error {
            ProviderError::Auth { .. } => PipelineError::ProviderAuth(message),
            ProviderError::Permission { .. } => PipelineError::ProviderPermission(message),
            ProviderError::Validation { .. } => PipelineError::Validation(message),
            ProviderError::CreditsExhausted { .. } | ProviderError::RateLimited { .. } => {
                PipelineError::QuotaExceeded(message)
            }
            ProviderError::Upstream { .. } | ProviderError::Network(_) | ProviderError::InvalidResponse(_) => {
                PipelineError::UpstreamUnavailable(message)
            }
        }
    }
}

/// Tunables shared by every pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineSettings {
    pub enrichment: EnrichmentSettings,
    pub retry: RetryPolicy,
    pub ceilings: Ceilings,
    pub fallback: FallbackWeights,
    pub match_policy: MatchPolicy,
    /// In-flight qualifications; `None` runs them all at once
    pub qualification_concurrency: Option<usize>,
}

/// Provider-independent collaborators, shared across requests
#[derive(Clone)]
pub struct PipelineComponents {
    pub reasoner: Arc<dyn ReasoningService>,
    pub probe: Option<Arc<dyn ProfileProbe>>,
    pub store: Option<Arc<dyn LeadStore>>,
    pub settings: PipelineSettings,
}

/// Search, dedup, enrich, qualify and rank one page of candidates
pub struct LeadPipeline {
    provider: Arc<dyn DirectoryProvider>,
    enricher: ContactEnricher,
    qualifier: Qualifier,
    dedup: Option<DedupGate>,
    ranker: Ranker,
    retry: RetryPolicy,
    qualification_concurrency: Option<usize>,
}

impl LeadPipeline {
    /// Bind the shared components to the provider chosen for this run
    pub fn new(provider: Arc<dyn DirectoryProvider>, components: &PipelineComponents) -> Self {
        let settings = &components.settings;
        Self {
            enricher: ContactEnricher::new(provider.clone(), &settings.enrichment, settings.retry.clone()),
            qualifier: Qualifier::new(
                components.reasoner.clone(),
                components.probe.clone(),
                settings.fallback.clone(),
                settings.match_policy,
            ),
            dedup: components.store.clone().map(DedupGate::new),
            ranker: Ranker::new(settings.ceilings),
            retry: settings.retry.clone(),
            qualification_concurrency: settings.qualification_concurrency,
            provider,
        }
    }

    pub fn provider_kind(&self) -> ProviderKind {
        self.provider.kind()
    }

    /// Run the pipeline for one filter against one ICP.
    ///
    /// With an owner, candidates the owner already saved bypass enrichment
    /// and qualification and come back flagged `already_saved`. Without one
    /// every candidate is processed.
    pub async fn run_pipeline(
        &self,
        filter: &SearchFilter,
        icp: &IcpProfile,
        owner: Option<&str>,
        limits: PipelineLimits,
    ) -> Result<RankedBatch, PipelineError> {
        let started = Instant::now();
        let limits = self.ranker.clamp_limits(limits);
        let page_cap = self.provider.max_page_size().min(limits.max_considered.max(1) as u32);
        let filter = filter.clamped(page_cap);
        let provider = self.provider.kind();

        let page = call_with_retry(&self.retry, "people search", ProviderError::is_retryable, || {
            self.provider.search(&filter)
        })
        .await
        .map_err(|e| {
            tracing::error!(%provider, error = %e, "Candidate search failed");
            PipelineError::from(e)
        })?;

        let mut candidates = page.candidates;
        candidates.truncate(limits.max_considered);
        let fetched = candidates.len();
        tracing::info!(%provider, fetched, page = filter.page, "Candidates fetched");

        let partition = match (owner, &self.dedup) {
            (Some(owner), Some(gate)) => gate.partition(candidates, owner).await,
            _ => Partition::all_new(candidates),
        };
        let Partition { new, already_saved } = partition;

        let mut fresh = new;
        if self.provider.supports_enrichment() {
            let requests: Vec<_> = fresh
                .iter()
                .filter(|(_, c)| needs_email_unlock(c.email.as_deref()))
                .map(|(_, c)| c.enrichment_request())
                .collect();
            let enriched = self.enricher.enrich(&requests).await;
            for (_, candidate) in fresh.iter_mut() {
                merge_enrichment(candidate, enriched.get(&candidate.id));
            }
        } else {
            for (_, candidate) in fresh.iter_mut() {
                merge_enrichment(candidate, None);
            }
        }

        let width = self.qualification_concurrency.unwrap_or(fresh.len()).max(1);
        let qualified: Vec<(usize, QualifiedLead)> = stream::iter(fresh)
            .map(|(position, candidate)| async move {
                let qualification = self.qualifier.qualify(&candidate, icp).await;
                (position, QualifiedLead { candidate, qualification, already_saved: false })
            })
            .buffered(width)
            .collect()
            .await;

        let fallback_scored = qualified.iter().filter(|(_, l)| l.qualification.is_degraded()).count();

        let mut combined: Vec<(usize, QualifiedLead)> = qualified.into_iter().chain(already_saved).collect();
        combined.sort_by_key(|(position, _)| *position);
        let leads: Vec<QualifiedLead> = combined.into_iter().map(|(_, lead)| lead).collect();

        let mut batch = self.ranker.select(leads, limits);
        batch.pagination = page.pagination;

        tracing::info!(
            %provider,
            owner = owner.unwrap_or("-"),
            fetched,
            fallback_scored,
            returned = batch.summary.count_returned,
            average_score = batch.summary.average_score,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Lead pipeline complete"
        );

        Ok(batch)
    }
}
