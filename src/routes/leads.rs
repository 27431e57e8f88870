use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use validator::Validate;
use crate::core::company_size::parse_size;
use crate::core::{LeadPipeline, PipelineComponents, PipelineError};
use crate::models::{
    CompanySize, ErrorResponse, FitLabel, HealthResponse, ListLeadsQuery, ListLeadsResponse,
    PipelineLimits, ProviderKind, SearchFilter, SearchLeadsRequest, SearchLeadsResponse,
};
use crate::services::{DirectoryProvider, LeadListCriteria, LeadStore};
use std::collections::HashMap;
use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub providers: HashMap<ProviderKind, Arc<dyn DirectoryProvider>>,
    pub default_provider: ProviderKind,
    pub components: PipelineComponents,
    pub store: Arc<dyn LeadStore>,
    pub default_top_n: usize,
}

impl AppState {
    /// Pipeline bound to the requested provider, or the configured default
    pub fn pipeline(&self, requested: Option<&str>) -> Result<LeadPipeline, HttpResponse> {
        let kind = match requested.map(str::parse::<ProviderKind>) {
            None => self.default_provider,
            Some(Ok(kind)) => kind,
            Some(Err(message)) => {
                return Err(error_response(StatusCode::BAD_REQUEST, "Invalid provider", message));
            }
        };

        match self.providers.get(&kind) {
            Some(provider) => Ok(LeadPipeline::new(provider.clone(), &self.components)),
            None => Err(error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "Provider not configured",
                format!("no API key configured for provider {}", kind),
            )),
        }
    }
}

/// Configure all lead-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/leads/search", web::post().to(search_leads))
        .route("/leads", web::get().to(list_leads));
}

pub(crate) fn error_response(status: StatusCode, error: &str, message: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message: message.into(),
        status_code: status.as_u16(),
    })
}

/// Map a fatal pipeline error onto an HTTP status
pub(crate) fn pipeline_error_response(e: &PipelineError) -> HttpResponse {
    let (status, error) = match e {
        PipelineError::Validation(_) => (StatusCode::BAD_REQUEST, "Invalid search"),
        PipelineError::QuotaExceeded(_) => (StatusCode::PAYMENT_REQUIRED, "Provider quota exceeded"),
        PipelineError::ProviderAuth(_) | PipelineError::ProviderPermission(_) => {
            (StatusCode::BAD_GATEWAY, "Provider access error")
        }
        PipelineError::UpstreamUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "Provider unavailable"),
    };
    error_response(status, error, e.to_string())
}

pub(crate) fn parse_company_sizes(values: &[String]) -> Vec<CompanySize> {
    values
        .iter()
        .filter(|v| !v.trim().is_empty())
        .map(|v| parse_size(v))
        .collect()
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let db_healthy = state.store.health_check().await.is_ok();

    let status = if db_healthy { "healthy" } else { "degraded" };
    let mut providers: Vec<ProviderKind> = state.providers.keys().copied().collect();
    providers.sort_by_key(|p| p.as_str());

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if db_healthy { "up" } else { "down" }.to_string(),
        providers,
        timestamp: chrono::Utc::now(),
    })
}

/// Search, enrich and qualify leads against the owner's ICP
///
/// POST /api/v1/leads/search
///
/// Request body:
/// ```json
/// {
///   "ownerId": "string",
///   "jobTitles": ["CTO"],
///   "locations": ["United States"],
///   "companySizes": ["51-200"],
///   "industries": [],
///   "page": 1,
///   "perPage": 10,
///   "provider": "apollo"
/// }
/// ```
async fn search_leads(
    state: web::Data<AppState>,
    req: web::Json<SearchLeadsRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for search_leads request: {:?}", errors);
        return error_response(StatusCode::BAD_REQUEST, "Validation failed", errors.to_string());
    }

    let company_sizes = parse_company_sizes(&req.company_sizes);

    let filter = SearchFilter {
        job_titles: req.job_titles.clone(),
        locations: req.locations.clone(),
        company_sizes,
        industries: req.industries.clone(),
        page: req.page,
        per_page: req.per_page,
    };

    if filter.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Validation failed",
            "at least one search filter is required",
        );
    }

    let owner = req.owner_id.as_str();
    let icp = match state.store.get_icp(owner).await {
        Ok(Some(icp)) => icp,
        Ok(None) => {
            return error_response(StatusCode::BAD_REQUEST, "ICP missing", "Please create an ICP profile first");
        }
        Err(e) => {
            tracing::error!("Failed to load ICP for {}: {}", owner, e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load ICP", e.to_string());
        }
    };

    let pipeline = match state.pipeline(req.provider.as_deref()) {
        Ok(pipeline) => pipeline,
        Err(response) => return response,
    };

    let limits = PipelineLimits {
        top_n: req.top_n.map(|n| n as usize).unwrap_or(req.per_page as usize),
        max_considered: state.components.settings.ceilings.max_considered,
    };

    tracing::info!(owner, provider = %pipeline.provider_kind(), page = req.page, "Searching leads");

    let batch = match pipeline.run_pipeline(&filter, &icp, Some(owner), limits).await {
        Ok(batch) => batch,
        Err(e) => {
            tracing::error!(owner, error = %e, "Lead search failed");
            return pipeline_error_response(&e);
        }
    };

    for lead in batch.leads.iter().filter(|l| !l.already_saved) {
        if let Err(e) = state.store.save(owner, lead).await {
            tracing::warn!(owner, candidate_id = %lead.candidate.id, error = %e, "Failed to save lead");
        }
    }

    HttpResponse::Ok().json(SearchLeadsResponse {
        provider: pipeline.provider_kind(),
        leads: batch.leads,
        summary: batch.summary,
        pagination: batch.pagination,
    })
}

/// List saved leads
///
/// GET /api/v1/leads?ownerId={ownerId}&label=good&minScore=60&search=acme&page=1&limit=20
async fn list_leads(
    state: web::Data<AppState>,
    query: web::Query<ListLeadsQuery>,
) -> impl Responder {
    if let Err(errors) = query.validate() {
        return error_response(StatusCode::BAD_REQUEST, "Validation failed", errors.to_string());
    }

    let label = match query.label.as_deref().map(str::parse::<FitLabel>) {
        None => None,
        Some(Ok(label)) => Some(label),
        Some(Err(message)) => return error_response(StatusCode::BAD_REQUEST, "Validation failed", message),
    };

    let criteria = LeadListCriteria {
        label,
        min_score: query.min_score,
        search: query.search.clone(),
        page: query.page,
        limit: query.limit,
    };

    match state.store.list(&query.owner_id, &criteria).await {
        Ok(page) => {
            let pages = page.total.div_ceil(criteria.limit.max(1) as u64);
            HttpResponse::Ok().json(ListLeadsResponse {
                leads: page.leads,
                page: criteria.page,
                limit: criteria.limit,
                total: page.total,
                pages,
            })
        }
        Err(e) => {
            tracing::error!("Failed to list leads for {}: {}", query.owner_id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to list leads", e.to_string())
        }
    }
}
