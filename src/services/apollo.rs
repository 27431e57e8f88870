use crate::core::company_size::to_apollo_range;
use crate::core::contact::{best_phone, split_name};
use crate::models::{
    CandidateRecord, EnrichmentRequest, EnrichmentResult, Location, Organization, Pagination,
    PhoneNumber, ProviderKind, SearchFilter, SearchPage,
};
use crate::services::provider::{error_message, DirectoryProvider, ProviderError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.apollo.io/api/v1";

/// Apollo serves at most 25 people per search page on most plans
pub const MAX_PAGE_SIZE: u32 = 25;

#[derive(Debug, Serialize)]
struct PeopleSearchBody {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    person_titles: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    person_locations: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    organization_num_employees_ranges: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    q_organization_keyword_tags: Vec<String>,
    page: u32,
    per_page: u32,
    reveal_personal_emails: bool,
    reveal_phone_number: bool,
    contact_email_status: [&'static str; 3],
}

#[derive(Debug, Deserialize)]
struct PeopleSearchResponse {
    #[serde(default)]
    people: Vec<Value>,
    #[serde(default)]
    contacts: Vec<Value>,
    pagination: Option<ApolloPagination>,
}

#[derive(Debug, Deserialize)]
struct ApolloPagination {
    #[serde(default)]
    page: u32,
    #[serde(default)]
    per_page: u32,
    #[serde(default)]
    total_entries: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApolloPerson {
    id: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    name: Option<String>,
    title: Option<String>,
    email: Option<String>,
    email_status: Option<String>,
    linkedin_url: Option<String>,
    city: Option<String>,
    state: Option<String>,
    country: Option<String>,
    phone_numbers: Vec<PhoneNumber>,
    organization: Option<ApolloOrganization>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApolloOrganization {
    name: Option<String>,
    website_url: Option<String>,
    primary_domain: Option<String>,
    industry: Option<String>,
    estimated_num_employees: Option<u64>,
}

#[derive(Debug, Serialize)]
struct PeopleMatchBody<'a> {
    #[serde(flatten)]
    person: &'a EnrichmentRequest,
    reveal_personal_emails: bool,
}

#[derive(Debug, Deserialize)]
struct PeopleMatchResponse {
    person: Option<ApolloPerson>,
}

/// Apollo people search and match client
pub struct ApolloClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl ApolloClient {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { base_url, api_key, client }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(self.url(path))
            .header("X-Api-Key", &self.api_key)
            .header("Cache-Control", "no-cache")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(classify_error(status.as_u16(), &text));
        }

        Ok(text)
    }
}

/// Apollo-specific refinement of the generic status classification
fn classify_error(status: u16, body: &str) -> ProviderError {
    let provider = ProviderKind::Apollo;
    let detail = error_message(body);

    match status {
        401 => ProviderError::Auth {
            provider,
            message: format!("invalid Apollo API key ({})", detail),
        },
        403 => {
            let lowered = body.to_lowercase();
            let message = if lowered.contains("free plan") || lowered.contains("upgrade") {
                "people search is not available on the current Apollo plan; upgrade to a paid plan".to_string()
            } else if lowered.contains("master") {
                "this endpoint requires an Apollo master API key".to_string()
            } else {
                detail
            };
            ProviderError::Permission { provider, message }
        }
        422 => ProviderError::Validation {
            provider,
            message: format!("invalid search parameters: {}", detail),
        },
        _ => ProviderError::from_status(provider, status, detail),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn map_person(person: ApolloPerson, raw: Value) -> Option<CandidateRecord> {
    let id = non_empty(person.id)?;

    let full_name = non_empty(person.name).unwrap_or_else(|| {
        format!(
            "{} {}",
            person.first_name.as_deref().unwrap_or_default(),
            person.last_name.as_deref().unwrap_or_default()
        )
        .trim()
        .to_string()
    });
    let (split_first, split_last) = split_name(&full_name);
    let first_name = non_empty(person.first_name).unwrap_or(split_first);
    let last_name = non_empty(person.last_name).unwrap_or(split_last);

    let org = person.organization.unwrap_or_default();
    let organization = Organization {
        name: non_empty(org.name).unwrap_or_else(|| "Unknown Company".to_string()),
        website: non_empty(org.website_url).or(non_empty(org.primary_domain)).unwrap_or_default(),
        industry: non_empty(org.industry).unwrap_or_default(),
        employee_count: org.estimated_num_employees,
    };

    let phone = best_phone(&person.phone_numbers);

    Some(CandidateRecord {
        id,
        provider: ProviderKind::Apollo,
        full_name,
        first_name,
        last_name,
        title: non_empty(person.title).unwrap_or_else(|| "Not specified".to_string()),
        organization,
        location: Location {
            city: person.city.unwrap_or_default(),
            region: person.state.unwrap_or_default(),
            country: person.country.unwrap_or_default(),
        },
        linkedin_url: non_empty(person.linkedin_url),
        email: non_empty(person.email),
        email_status: non_empty(person.email_status),
        phone,
        phone_numbers: person.phone_numbers,
        raw: Some(raw),
    })
}

#[async_trait]
impl DirectoryProvider for ApolloClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Apollo
    }

    fn max_page_size(&self) -> u32 {
        MAX_PAGE_SIZE
    }

    async fn search(&self, filter: &SearchFilter) -> Result<SearchPage, ProviderError> {
        let filter = filter.clamped(MAX_PAGE_SIZE);
        let body = PeopleSearchBody {
            person_titles: filter.job_titles.clone(),
            person_locations: filter.locations.clone(),
            organization_num_employees_ranges: filter.company_sizes.iter().map(to_apollo_range).collect(),
            q_organization_keyword_tags: filter.industries.clone(),
            page: filter.page,
            per_page: filter.per_page,
            reveal_personal_emails: true,
            reveal_phone_number: true,
            contact_email_status: ["verified", "guessed", "unavailable"],
        };

        tracing::info!(
            page = filter.page,
            per_page = filter.per_page,
            titles = filter.job_titles.len(),
            "Searching Apollo people"
        );

        let text = self.post_json("/mixed_people/search", &body).await?;
        let parsed: PeopleSearchResponse = serde_json::from_str(&text)
            .map_err(|e| ProviderError::InvalidResponse(format!("Apollo search: {}", e)))?;

        let candidates: Vec<CandidateRecord> = parsed
            .people
            .into_iter()
            .chain(parsed.contacts)
            .filter_map(|raw| {
                let person: ApolloPerson = match serde_json::from_value(raw.clone()) {
                    Ok(p) => p,
                    Err(e) => {
                        tracing::warn!("Skipping malformed Apollo person: {}", e);
                        return None;
                    }
                };
                map_person(person, raw)
            })
            .collect();

        let pagination = match parsed.pagination {
            Some(p) => Pagination::new(
                if p.page == 0 { filter.page } else { p.page },
                if p.per_page == 0 { filter.per_page } else { p.per_page },
                p.total_entries,
            ),
            None => Pagination::new(filter.page, filter.per_page, candidates.len() as u64),
        };

        tracing::info!(
            returned = candidates.len(),
            total_entries = pagination.total_entries,
            "Apollo search complete"
        );

        Ok(SearchPage { candidates, pagination })
    }

    fn supports_enrichment(&self) -> bool {
        true
    }

    async fn enrich_contact(
        &self,
        request: &EnrichmentRequest,
    ) -> Result<Option<EnrichmentResult>, ProviderError> {
        let body = PeopleMatchBody {
            person: request,
            reveal_personal_emails: true,
        };

        let text = self.post_json("/people/match", &body).await?;
        let parsed: PeopleMatchResponse = serde_json::from_str(&text)
            .map_err(|e| ProviderError::InvalidResponse(format!("Apollo match: {}", e)))?;

        let Some(person) = parsed.person else {
            tracing::debug!(person_id = %request.id, "Apollo match returned no person");
            return Ok(None);
        };

        let best = best_phone(&person.phone_numbers);
        Ok(Some(EnrichmentResult {
            email: non_empty(person.email),
            email_status: non_empty(person.email_status).unwrap_or_else(|| "unknown".to_string()),
            phone_numbers: person.phone_numbers,
            best_phone: best,
        }))
    }
}
