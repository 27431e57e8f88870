use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, Responder};
use validator::Validate;
use crate::core::company_size::band_for_employees;
use crate::models::{
    ExtractedLead, IcpProfile, IcpResponse, IcpSearchRequest, IcpSearchResponse, IcpSearchSummary,
    OwnerQuery, PipelineLimits, QualifiedLead, SearchFilter, UpsertIcpRequest,
};
use crate::routes::leads::{error_response, parse_company_sizes, pipeline_error_response, AppState};
use std::time::Instant;

/// Configure ICP routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/icp", web::get().to(get_icp))
        .route("/icp", web::put().to(upsert_icp))
        .route("/icp-search", web::post().to(icp_search));
}

/// GET /api/v1/icp?ownerId={ownerId}
async fn get_icp(state: web::Data<AppState>, query: web::Query<OwnerQuery>) -> impl Responder {
    if let Err(errors) = query.validate() {
        return error_response(StatusCode::BAD_REQUEST, "Validation failed", errors.to_string());
    }

    match state.store.get_icp(&query.owner_id).await {
        Ok(Some(icp)) => HttpResponse::Ok().json(IcpResponse { owner_id: query.owner_id.clone(), icp }),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "ICP not found", "No ICP profile for this owner"),
        Err(e) => {
            tracing::error!("Failed to load ICP for {}: {}", query.owner_id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load ICP", e.to_string())
        }
    }
}

/// PUT /api/v1/icp
async fn upsert_icp(state: web::Data<AppState>, req: web::Json<UpsertIcpRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return error_response(StatusCode::BAD_REQUEST, "Validation failed", errors.to_string());
    }

    if let (Some(min), Some(max)) = (req.min_employees, req.max_employees) {
        if min > max {
            return error_response(
                StatusCode::BAD_REQUEST,
                "Validation failed",
                "minEmployees must not exceed maxEmployees",
            );
        }
    }

    let req = req.into_inner();
    let icp = IcpProfile {
        description: req.description,
        industries: req.industries,
        locations: req.locations,
        role_titles: req.role_titles,
        min_employees: req.min_employees,
        max_employees: req.max_employees,
    };

    match state.store.upsert_icp(&req.owner_id, &icp).await {
        Ok(()) => HttpResponse::Ok().json(IcpResponse { owner_id: req.owner_id, icp }),
        Err(e) => {
            tracing::error!("Failed to save ICP for {}: {}", req.owner_id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save ICP", e.to_string())
        }
    }
}

/// ICP description with keyword guidance appended for the reasoning prompt
fn describe_icp(req: &IcpSearchRequest) -> String {
    let mut description = req.icp_description.trim().to_string();
    let include: Vec<&str> = req.keywords_include.iter().map(|k| k.trim()).filter(|k| !k.is_empty()).collect();
    let exclude: Vec<&str> = req.keywords_exclude.iter().map(|k| k.trim()).filter(|k| !k.is_empty()).collect();

    if !include.is_empty() {
        description.push_str(&format!("\nPrefer prospects related to: {}", include.join(", ")));
    }
    if !exclude.is_empty() {
        description.push_str(&format!("\nAvoid prospects related to: {}", exclude.join(", ")));
    }
    description
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Flatten a qualified lead into the row shape the extraction agent stores
pub fn extracted_lead(lead: &QualifiedLead) -> ExtractedLead {
    let c = &lead.candidate;
    let q = &lead.qualification;
    ExtractedLead {
        full_name: c.full_name.clone(),
        job_title: c.title.clone(),
        company_name: c.organization.name.clone(),
        company_website: non_empty(&c.organization.website),
        company_size: c.organization.employee_count.map(|n| band_for_employees(n).to_string()),
        industry: non_empty(&c.organization.industry),
        location: c.location.display(),
        email: c.email.clone(),
        phone: c.phone.clone(),
        linkedin_url: c.linkedin_url.clone(),
        fit_score: q.score,
        fit_reason: q.reason.clone(),
        fit_label: q.label,
    }
}

/// Search on behalf of the extraction agent
///
/// POST /api/v1/icp-search
async fn icp_search(
    state: web::Data<AppState>,
    req: web::Json<IcpSearchRequest>,
    http_req: HttpRequest,
) -> impl Responder {
    let started = Instant::now();

    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for icp_search request: {:?}", errors);
        return error_response(StatusCode::BAD_REQUEST, "Validation failed", errors.to_string());
    }

    let company_sizes = parse_company_sizes(&req.company_sizes);

    let ceilings = state.components.settings.ceilings;
    let max_raw = req.max_raw_leads.map(|n| n as usize).unwrap_or(ceilings.max_considered);
    let limits = PipelineLimits {
        top_n: req.top_n.map(|n| n as usize).unwrap_or(state.default_top_n),
        max_considered: max_raw,
    };

    let filter = SearchFilter {
        job_titles: req.job_titles.clone(),
        locations: req.locations.clone(),
        company_sizes,
        industries: req.industries.clone(),
        page: 1,
        per_page: max_raw.min(u32::MAX as usize) as u32,
    };

    let icp = IcpProfile {
        description: describe_icp(&req),
        industries: req.industries.clone(),
        locations: req.locations.clone(),
        role_titles: req.job_titles.clone(),
        min_employees: None,
        max_employees: None,
    };

    let pipeline = match state.pipeline(req.provider.as_deref()) {
        Ok(pipeline) => pipeline,
        Err(response) => return response,
    };

    let actor_version = http_req
        .headers()
        .get("X-Actor-Version")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    let run_id = req.apify_run_id.clone().unwrap_or_else(|| "direct".to_string());

    tracing::info!(
        run_id = %run_id,
        actor_version,
        provider = %pipeline.provider_kind(),
        titles = req.job_titles.len(),
        max_raw,
        "ICP search started"
    );

    let batch = match pipeline.run_pipeline(&filter, &icp, req.owner_id.as_deref(), limits).await {
        Ok(batch) => batch,
        Err(e) => {
            tracing::error!(run_id = %run_id, error = %e, "ICP search failed");
            return pipeline_error_response(&e);
        }
    };

    let processing_time_ms = started.elapsed().as_millis() as u64;
    let response = IcpSearchResponse {
        job_id: format!("apify_{}_{}", run_id, chrono::Utc::now().timestamp_millis()),
        summary: IcpSearchSummary {
            raw_leads_fetched: batch.summary.count_considered,
            leads_returned: batch.summary.count_returned,
            icp_description: req.icp_description.clone(),
            average_fit_score: (batch.summary.average_score * 10.0).round() / 10.0,
            credits_used: batch.summary.count_considered,
            processing_time_ms,
        },
        leads: batch.leads.iter().map(extracted_lead).collect(),
    };

    tracing::info!(
        target: "usage",
        run_id = %run_id,
        source = req.source.as_deref().unwrap_or("api"),
        raw_leads = response.summary.raw_leads_fetched,
        returned = response.summary.leads_returned,
        credits_used = response.summary.credits_used,
        processing_time_ms,
        "ICP search usage"
    );

    HttpResponse::Ok().json(response)
}
