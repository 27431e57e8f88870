// End-to-end pipeline tests with in-memory collaborators

use async_trait::async_trait;
use leadflow::core::{Ceilings, EnrichmentSettings, LeadPipeline, PipelineComponents, PipelineError, PipelineSettings};
use leadflow::models::{
    CandidateRecord, EnrichmentRequest, EnrichmentResult, FitLabel, IcpProfile, Location, Organization,
    Pagination, PipelineLimits, ProfileVerification, ProviderKind, QualificationResult, QualifiedLead,
    ScoreSource, SearchFilter, SearchPage,
};
use leadflow::services::{
    ApolloClient, DirectoryProvider, LeadListCriteria, LeadPage, LeadStore, ProbeOutcome, ProfileProbe,
    ProviderError, ReasoningError, ReasoningService, RetryPolicy, StoreError,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const LOCKED_EMAIL: &str = "email_not_unlocked@domain.com";

fn candidate(i: usize) -> CandidateRecord {
    CandidateRecord {
        id: format!("lead-{}", i),
        provider: ProviderKind::Apollo,
        full_name: format!("Lead {}", i),
        first_name: "Lead".to_string(),
        last_name: i.to_string(),
        title: if i % 2 == 0 { "VP Engineering".to_string() } else { "Office Manager".to_string() },
        organization: Organization {
            name: format!("Company {}", i),
            website: format!("company{}.io", i),
            industry: "Computer Software".to_string(),
            employee_count: Some(120),
        },
        location: Location {
            city: "Austin".to_string(),
            region: "Texas".to_string(),
            country: "United States".to_string(),
        },
        linkedin_url: (i % 3 != 0).then(|| format!("https://www.linkedin.com/in/lead-{}", i)),
        email: Some(if i % 2 == 0 { LOCKED_EMAIL.to_string() } else { format!("lead{}@company{}.io", i, i) }),
        email_status: None,
        phone: None,
        phone_numbers: vec![],
        raw: None,
    }
}

fn icp() -> IcpProfile {
    IcpProfile {
        description: "Engineering leaders at mid-sized software companies".to_string(),
        industries: vec!["software".to_string()],
        locations: vec!["United States".to_string()],
        role_titles: vec!["VP Engineering".to_string(), "CTO".to_string()],
        min_employees: Some(50),
        max_employees: Some(500),
    }
}

fn filter() -> SearchFilter {
    SearchFilter {
        job_titles: vec!["VP Engineering".to_string()],
        per_page: 25,
        ..Default::default()
    }
}

fn limits(top_n: usize, max_considered: usize) -> PipelineLimits {
    PipelineLimits { top_n, max_considered }
}

struct FakeProvider {
    candidates: Vec<CandidateRecord>,
    enrichment: bool,
    failing_enrichment: HashSet<String>,
    search_calls: AtomicUsize,
    enrich_calls: AtomicUsize,
}

impl FakeProvider {
    fn new(candidates: Vec<CandidateRecord>) -> Self {
        Self {
            candidates,
            enrichment: true,
            failing_enrichment: HashSet::new(),
            search_calls: AtomicUsize::new(0),
            enrich_calls: AtomicUsize::new(0),
        }
    }

    fn without_enrichment(mut self) -> Self {
        self.enrichment = false;
        self
    }

    fn failing_for(mut self, id: &str) -> Self {
        self.failing_enrichment.insert(id.to_string());
        self
    }
}

#[async_trait]
impl DirectoryProvider for FakeProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Apollo
    }

    fn max_page_size(&self) -> u32 {
        25
    }

    async fn search(&self, filter: &SearchFilter) -> Result<SearchPage, ProviderError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        Ok(SearchPage {
            candidates: self.candidates.clone(),
            pagination: Pagination::new(filter.page, filter.per_page, self.candidates.len() as u64),
        })
    }

    fn supports_enrichment(&self) -> bool {
        self.enrichment
    }

    async fn enrich_contact(&self, request: &EnrichmentRequest) -> Result<Option<EnrichmentResult>, ProviderError> {
        self.enrich_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_enrichment.contains(&request.id) {
            return Err(ProviderError::Validation {
                provider: ProviderKind::Apollo,
                message: "match rejected".to_string(),
            });
        }
        Ok(Some(EnrichmentResult {
            email: Some(format!("{}@revealed.io", request.id)),
            email_status: "verified".to_string(),
            phone_numbers: vec![],
            best_phone: Some("+15125550100".to_string()),
        }))
    }
}

/// Answers with a fixed score per prospect name, fails every call, or replies with garbage
struct ScriptedReasoner {
    scores: HashMap<String, f64>,
    fail: bool,
    malformed: bool,
    calls: AtomicUsize,
}

impl ScriptedReasoner {
    fn scoring(scores: &[(usize, f64)]) -> Self {
        Self {
            scores: scores.iter().map(|(i, s)| (format!("Lead {}", i), *s)).collect(),
            fail: false,
            malformed: false,
            calls: AtomicUsize::new(0),
        }
    }

    fn failing() -> Self {
        Self { fail: true, ..Self::scoring(&[]) }
    }

    fn malformed() -> Self {
        Self { malformed: true, ..Self::scoring(&[]) }
    }
}

#[async_trait]
impl ReasoningService for ScriptedReasoner {
    async fn complete(&self, _system: &str, prompt: &str) -> Result<String, ReasoningError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ReasoningError::Api { status: 503, message: "model overloaded".to_string() });
        }
        if self.malformed {
            return Ok("not json".to_string());
        }
        let name = prompt.lines().find_map(|line| line.strip_prefix("Name: ")).unwrap_or_default();
        let score = self.scores.get(name).copied().unwrap_or(50.0);
        Ok(format!(r#"{{"score": {}, "label": "bad", "reason": "Scored {}", "tags": ["icp"]}}"#, score, name))
    }
}

struct VerifiedProbe;

#[async_trait]
impl ProfileProbe for VerifiedProbe {
    async fn probe(&self, _url: &str) -> ProbeOutcome {
        ProbeOutcome::status_only(ProfileVerification::Verified)
    }
}

/// Every profile answers as missing or private
struct UnverifiedProbe;

#[async_trait]
impl ProfileProbe for UnverifiedProbe {
    async fn probe(&self, _url: &str) -> ProbeOutcome {
        ProbeOutcome::status_only(ProfileVerification::Unverified)
    }
}

#[derive(Default)]
struct MemoryStore {
    saved: HashMap<String, QualifiedLead>,
    unavailable: bool,
    lookups: AtomicUsize,
}

#[async_trait]
impl LeadStore for MemoryStore {
    async fn find_saved(
        &self,
        _owner: &str,
        _provider: ProviderKind,
        provider_id: &str,
    ) -> Result<Option<QualifiedLead>, StoreError> {
        Ok(self.saved.get(provider_id).cloned())
    }

    async fn find_saved_many(
        &self,
        _owner: &str,
        _provider: ProviderKind,
        provider_ids: &[String],
    ) -> Result<HashMap<String, QualifiedLead>, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(StoreError::InvalidRecord("connection pool timed out".to_string()));
        }
        Ok(provider_ids
            .iter()
            .filter_map(|id| self.saved.get(id).map(|lead| (id.clone(), lead.clone())))
            .collect())
    }

    async fn save(&self, _owner: &str, _lead: &QualifiedLead) -> Result<(), StoreError> {
        Ok(())
    }

    async fn list(&self, _owner: &str, _criteria: &LeadListCriteria) -> Result<LeadPage, StoreError> {
        Ok(LeadPage::default())
    }

    async fn get_icp(&self, _owner: &str) -> Result<Option<IcpProfile>, StoreError> {
        Ok(Some(icp()))
    }

    async fn upsert_icp(&self, _owner: &str, _icp: &IcpProfile) -> Result<(), StoreError> {
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

fn settings() -> PipelineSettings {
    PipelineSettings {
        enrichment: EnrichmentSettings { batch_size: 3, batch_delay_ms: 0 },
        retry: RetryPolicy::fixed(2, Duration::ZERO),
        ..Default::default()
    }
}

fn components(
    reasoner: Arc<dyn ReasoningService>,
    probe: Option<Arc<dyn ProfileProbe>>,
    store: Option<Arc<dyn LeadStore>>,
) -> PipelineComponents {
    PipelineComponents { reasoner, probe, store, settings: settings() }
}

fn saved_lead(i: usize, score: u8) -> QualifiedLead {
    QualifiedLead {
        candidate: candidate(i),
        qualification: QualificationResult {
            score,
            label: FitLabel::Good,
            reason: "Saved earlier".to_string(),
            tags: vec!["saved".to_string()],
            source: ScoreSource::Model,
            linkedin_verified: true,
            data_accuracy: None,
            discrepancies: vec![],
        },
        already_saved: false,
    }
}

#[tokio::test]
async fn test_fetch_enrich_score_rank() {
    let provider = Arc::new(FakeProvider::new((1..=10).map(candidate).collect()));
    let scores: Vec<(usize, f64)> = (1..=10).map(|i| (i, (i * 9) as f64)).collect();
    let reasoner = Arc::new(ScriptedReasoner::scoring(&scores));
    let pipeline = LeadPipeline::new(
        provider.clone(),
        &components(reasoner.clone(), Some(Arc::new(VerifiedProbe)), None),
    );

    let batch = pipeline.run_pipeline(&filter(), &icp(), None, limits(5, 10)).await.unwrap();

    assert_eq!(provider.search_calls.load(Ordering::SeqCst), 1);
    // Only the five locked emails are sent for enrichment
    assert_eq!(provider.enrich_calls.load(Ordering::SeqCst), 5);
    assert_eq!(reasoner.calls.load(Ordering::SeqCst), 10);

    let returned: Vec<u8> = batch.leads.iter().map(|l| l.score()).collect();
    assert_eq!(returned, vec![90, 81, 72, 63, 54]);
    assert_eq!(batch.summary.count_considered, 10);
    assert_eq!(batch.summary.count_returned, 5);
    assert!((batch.summary.average_score - 72.0).abs() < f64::EPSILON);

    for lead in &batch.leads {
        assert_eq!(lead.qualification.source, ScoreSource::Model);
        assert_eq!(lead.qualification.label, leadflow::core::label_for_score(lead.score()));
        let email = lead.candidate.email.as_deref().unwrap();
        assert!(!email.contains("not_unlocked"));
    }

    let lead_10 = batch.leads.iter().find(|l| l.candidate.id == "lead-10").unwrap();
    assert_eq!(lead_10.candidate.email.as_deref(), Some("lead-10@revealed.io"));
    assert_eq!(lead_10.candidate.email_status.as_deref(), Some("verified"));
    assert_eq!(lead_10.candidate.phone.as_deref(), Some("+15125550100"));

    assert_eq!(batch.pagination.total_entries, 10);
}

#[tokio::test]
async fn test_enrichment_failure_keeps_candidate() {
    let provider = Arc::new(FakeProvider::new((1..=10).map(candidate).collect()).failing_for("lead-8"));
    let reasoner = Arc::new(ScriptedReasoner::scoring(&[(8, 95.0)]));
    let pipeline = LeadPipeline::new(provider.clone(), &components(reasoner, None, None));

    let batch = pipeline.run_pipeline(&filter(), &icp(), None, limits(10, 10)).await.unwrap();

    assert_eq!(batch.leads.len(), 10);
    // Validation errors are not retried
    assert_eq!(provider.enrich_calls.load(Ordering::SeqCst), 5);

    let failed = &batch.leads[0];
    assert_eq!(failed.candidate.id, "lead-8");
    assert_eq!(failed.candidate.email, None);
    assert_eq!(failed.score(), 95);

    let enriched = batch.leads.iter().find(|l| l.candidate.id == "lead-2").unwrap();
    assert_eq!(enriched.candidate.email.as_deref(), Some("lead-2@revealed.io"));
}

#[tokio::test]
async fn test_reasoner_failure_uses_fallback() {
    let provider = Arc::new(FakeProvider::new((1..=6).map(candidate).collect()).without_enrichment());
    let reasoner = Arc::new(ScriptedReasoner::failing());
    let pipeline = LeadPipeline::new(provider, &components(reasoner, Some(Arc::new(VerifiedProbe)), None));

    let batch = pipeline.run_pipeline(&filter(), &icp(), None, limits(10, 10)).await.unwrap();

    assert_eq!(batch.leads.len(), 6);
    assert_eq!(batch.summary.fallback_scored, 6);

    for lead in &batch.leads {
        let q = &lead.qualification;
        assert_eq!(q.source, ScoreSource::Fallback);
        assert!(q.score <= 100);
        assert!(q.tags.iter().any(|t| t == "no-linkedin" || t == "linkedin-verified"));
        if lead.candidate.linkedin_url.is_none() {
            assert!(q.tags.contains(&"no-linkedin".to_string()));
            assert!(!q.linkedin_verified);
        } else {
            assert!(q.linkedin_verified);
        }
    }

    // VP Engineering with a verified profile: 50 + 20 title + 20 industry
    let lead_2 = batch.leads.iter().find(|l| l.candidate.id == "lead-2").unwrap();
    assert_eq!(lead_2.score(), 90);
    assert_eq!(lead_2.qualification.label, FitLabel::Good);

    // Office manager without a profile: 50 - 15 + 20 industry
    let lead_3 = batch.leads.iter().find(|l| l.candidate.id == "lead-3").unwrap();
    assert_eq!(lead_3.score(), 55);
    assert_eq!(lead_3.qualification.label, FitLabel::Maybe);
}

#[tokio::test]
async fn test_malformed_verdict_uses_fallback() {
    let provider = Arc::new(FakeProvider::new((1..=6).map(candidate).collect()).without_enrichment());
    let reasoner = Arc::new(ScriptedReasoner::malformed());
    let pipeline = LeadPipeline::new(
        provider,
        &components(reasoner.clone(), Some(Arc::new(VerifiedProbe)), None),
    );

    let batch = pipeline.run_pipeline(&filter(), &icp(), None, limits(10, 10)).await.unwrap();

    assert_eq!(reasoner.calls.load(Ordering::SeqCst), 6);
    assert_eq!(batch.leads.len(), 6);
    assert_eq!(batch.summary.fallback_scored, 6);
    assert!(batch.leads.iter().all(|l| l.qualification.source == ScoreSource::Fallback));

    let lead_2 = batch.leads.iter().find(|l| l.candidate.id == "lead-2").unwrap();
    assert_eq!(lead_2.score(), 90);
}

#[tokio::test]
async fn test_inaccessible_profile_is_penalized() {
    let provider = Arc::new(FakeProvider::new((1..=3).map(candidate).collect()).without_enrichment());
    let reasoner = Arc::new(ScriptedReasoner::failing());
    let pipeline = LeadPipeline::new(provider, &components(reasoner, Some(Arc::new(UnverifiedProbe)), None));

    let batch = pipeline.run_pipeline(&filter(), &icp(), None, limits(10, 10)).await.unwrap();

    for lead in &batch.leads {
        assert!(!lead.qualification.linkedin_verified);
        assert!(lead.qualification.tags.contains(&"no-linkedin".to_string()));
    }

    // 50 - 15 + 20 title + 20 industry, despite a LinkedIn URL on record
    let lead_2 = batch.leads.iter().find(|l| l.candidate.id == "lead-2").unwrap();
    assert!(lead_2.candidate.linkedin_url.is_some());
    assert_eq!(lead_2.score(), 75);
    assert_eq!(lead_2.qualification.label, FitLabel::Maybe);

    // 50 - 15 + 20 industry
    let lead_1 = batch.leads.iter().find(|l| l.candidate.id == "lead-1").unwrap();
    assert_eq!(lead_1.score(), 55);
}

#[tokio::test]
async fn test_limits_clamped_to_ceilings() {
    let provider = Arc::new(FakeProvider::new((1..=1200).map(candidate).collect()).without_enrichment());
    let reasoner = Arc::new(ScriptedReasoner::scoring(&[]));
    let pipeline = LeadPipeline::new(provider, &components(reasoner.clone(), None, None));

    let batch = pipeline.run_pipeline(&filter(), &icp(), None, limits(10_000, 50_000)).await.unwrap();

    let ceilings = Ceilings::default();
    assert_eq!(batch.summary.count_considered, ceilings.max_considered);
    assert_eq!(batch.summary.count_returned, ceilings.max_returned);
    assert_eq!(reasoner.calls.load(Ordering::SeqCst), ceilings.max_considered);
}

#[tokio::test]
async fn test_equal_scores_keep_provider_order() {
    let provider = Arc::new(FakeProvider::new((1..=5).map(candidate).collect()).without_enrichment());
    let reasoner = Arc::new(ScriptedReasoner::scoring(&[(4, 90.0)]));
    let pipeline = LeadPipeline::new(provider, &components(reasoner, None, None));

    let first = pipeline.run_pipeline(&filter(), &icp(), None, limits(5, 5)).await.unwrap();
    let ids: Vec<&str> = first.leads.iter().map(|l| l.candidate.id.as_str()).collect();
    assert_eq!(ids, vec!["lead-4", "lead-1", "lead-2", "lead-3", "lead-5"]);

    let second = pipeline.run_pipeline(&filter(), &icp(), None, limits(5, 5)).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_saved_leads_skip_enrichment_and_scoring() {
    let mut store = MemoryStore::default();
    store.saved.insert("lead-2".to_string(), saved_lead(2, 88));
    let store = Arc::new(store);

    let provider = Arc::new(FakeProvider::new((1..=4).map(candidate).collect()));
    let reasoner = Arc::new(ScriptedReasoner::scoring(&[(1, 70.0), (3, 60.0), (4, 40.0)]));
    let pipeline = LeadPipeline::new(
        provider.clone(),
        &components(reasoner.clone(), None, Some(store.clone())),
    );

    let batch = pipeline.run_pipeline(&filter(), &icp(), Some("owner-1"), limits(10, 10)).await.unwrap();

    assert_eq!(batch.leads.len(), 4);
    assert_eq!(store.lookups.load(Ordering::SeqCst), 1);
    assert_eq!(reasoner.calls.load(Ordering::SeqCst), 3);
    // lead-4 is the only new lead with a locked email
    assert_eq!(provider.enrich_calls.load(Ordering::SeqCst), 1);

    let saved = &batch.leads[0];
    assert_eq!(saved.candidate.id, "lead-2");
    assert!(saved.already_saved);
    assert_eq!(saved.qualification.reason, "Saved earlier");
    assert_eq!(batch.summary.already_saved, 1);

    assert!(batch.leads[1..].iter().all(|l| !l.already_saved));
}

#[tokio::test]
async fn test_failed_saved_lookup_treats_batch_as_new() {
    let mut store = MemoryStore::default();
    store.saved.insert("lead-2".to_string(), saved_lead(2, 88));
    store.unavailable = true;
    let store = Arc::new(store);

    let provider = Arc::new(FakeProvider::new((1..=4).map(candidate).collect()));
    let reasoner = Arc::new(ScriptedReasoner::scoring(&[]));
    let pipeline = LeadPipeline::new(
        provider.clone(),
        &components(reasoner.clone(), None, Some(store.clone())),
    );

    let batch = pipeline.run_pipeline(&filter(), &icp(), Some("owner-1"), limits(10, 10)).await.unwrap();

    assert_eq!(store.lookups.load(Ordering::SeqCst), 1);
    assert_eq!(batch.leads.len(), 4);
    assert_eq!(batch.summary.already_saved, 0);
    assert_eq!(reasoner.calls.load(Ordering::SeqCst), 4);
    assert_eq!(provider.enrich_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_without_owner_dedup_is_skipped() {
    let mut store = MemoryStore::default();
    store.saved.insert("lead-1".to_string(), saved_lead(1, 88));

    let provider = Arc::new(FakeProvider::new(vec![candidate(1)]).without_enrichment());
    let reasoner = Arc::new(ScriptedReasoner::scoring(&[(1, 30.0)]));
    let pipeline = LeadPipeline::new(provider, &components(reasoner, None, Some(Arc::new(store))));

    let batch = pipeline.run_pipeline(&filter(), &icp(), None, limits(10, 10)).await.unwrap();

    assert_eq!(batch.leads.len(), 1);
    assert!(!batch.leads[0].already_saved);
    assert_eq!(batch.leads[0].score(), 30);
    assert_eq!(batch.leads[0].qualification.label, FitLabel::Bad);
}

#[tokio::test]
async fn test_empty_search_returns_empty_batch() {
    let provider = Arc::new(FakeProvider::new(vec![]));
    let reasoner = Arc::new(ScriptedReasoner::scoring(&[]));
    let pipeline = LeadPipeline::new(provider.clone(), &components(reasoner, None, None));

    let batch = pipeline.run_pipeline(&filter(), &icp(), None, limits(10, 10)).await.unwrap();

    assert!(batch.leads.is_empty());
    assert_eq!(batch.summary.count_considered, 0);
    assert_eq!(batch.summary.average_score, 0.0);
    assert_eq!(provider.enrich_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_provider_auth_failure_is_not_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/mixed_people/search")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":"Invalid access credentials."}"#)
        .expect(1)
        .create_async()
        .await;

    let provider = Arc::new(ApolloClient::new(server.url(), "bad-key".to_string(), Duration::from_secs(5)));
    let reasoner = Arc::new(ScriptedReasoner::scoring(&[]));
    let pipeline = LeadPipeline::new(provider, &components(reasoner.clone(), None, None));

    let result = pipeline.run_pipeline(&filter(), &icp(), None, limits(10, 10)).await;

    assert!(matches!(result, Err(PipelineError::ProviderAuth(_))));
    assert_eq!(reasoner.calls.load(Ordering::SeqCst), 0);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_rate_limit_exhaustion_is_quota_error() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/mixed_people/search")
        .with_status(429)
        .with_body(r#"{"message":"Too many requests"}"#)
        .expect(3)
        .create_async()
        .await;

    let provider = Arc::new(ApolloClient::new(server.url(), "key".to_string(), Duration::from_secs(5)));
    let pipeline = LeadPipeline::new(
        provider,
        &components(Arc::new(ScriptedReasoner::scoring(&[])), None, None),
    );

    let result = pipeline.run_pipeline(&filter(), &icp(), None, limits(10, 10)).await;

    assert!(matches!(result, Err(PipelineError::QuotaExceeded(_))));
    mock.assert_async().await;
}
