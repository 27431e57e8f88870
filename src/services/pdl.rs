use crate::core::company_size::{employees_from_band, to_pdl_band};
use crate::core::contact::{best_phone, split_name};
use crate::models::{
    CandidateRecord, Location, Organization, Pagination, PhoneNumber, ProviderKind, SearchFilter,
    SearchPage,
};
use crate::services::provider::{error_message, DirectoryProvider, ProviderError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.peopledatalabs.com/v5";

pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Serialize)]
struct PersonSearchBody {
    sql: String,
    size: u32,
    dataset: &'static str,
}

#[derive(Debug, Deserialize)]
struct PersonSearchResponse {
    #[serde(default)]
    data: Vec<Value>,
    #[serde(default)]
    total: u64,
}

/// People Data Labs person search client (search only, no contact reveal)
pub struct PdlClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl PdlClient {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { base_url, api_key, client }
    }
}

fn quote(value: &str) -> String {
    value.trim().replace('\'', "''")
}

/// Translate a canonical filter into a PDL SQL query
pub fn build_sql(filter: &SearchFilter) -> String {
    let mut clauses: Vec<String> = Vec::new();

    let titles: Vec<String> = filter
        .job_titles
        .iter()
        .filter(|t| !t.trim().is_empty())
        .map(|t| format!("job_title LIKE '%{}%'", quote(&t.to_lowercase())))
        .collect();
    if !titles.is_empty() {
        clauses.push(format!("({})", titles.join(" OR ")));
    }

    let locations: Vec<String> = filter
        .locations
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| {
            let l = quote(&l.to_lowercase());
            format!(
                "(location_locality='{0}' OR location_region='{0}' OR location_country='{0}')",
                l
            )
        })
        .collect();
    if !locations.is_empty() {
        clauses.push(format!("({})", locations.join(" OR ")));
    }

    let sizes: Vec<String> = filter
        .company_sizes
        .iter()
        .map(|s| format!("job_company_size='{}'", quote(&to_pdl_band(s))))
        .collect();
    if !sizes.is_empty() {
        clauses.push(format!("({})", sizes.join(" OR ")));
    }

    let industries: Vec<String> = filter
        .industries
        .iter()
        .filter(|i| !i.trim().is_empty())
        .map(|i| format!("job_company_industry='{}'", quote(&i.to_lowercase())))
        .collect();
    if !industries.is_empty() {
        clauses.push(format!("({})", industries.join(" OR ")));
    }

    if clauses.is_empty() {
        "SELECT * FROM person".to_string()
    } else {
        format!("SELECT * FROM person WHERE {}", clauses.join(" AND "))
    }
}

fn str_field<'a>(person: &'a Value, key: &str) -> Option<&'a str> {
    person
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Prefer a professional/work address, then the first listed one, then a direct field
fn pick_email(person: &Value) -> Option<String> {
    let emails = person.get("emails").and_then(Value::as_array);

    if let Some(emails) = emails {
        let professional = emails.iter().find_map(|e| {
            let kind = e.get("type").and_then(Value::as_str).unwrap_or_default();
            matches!(kind, "professional" | "work" | "current_professional")
                .then(|| e.get("address").and_then(Value::as_str))
                .flatten()
        });
        if let Some(address) = professional {
            return Some(address.to_string());
        }

        let first = emails.first().and_then(|e| match e {
            Value::String(s) => Some(s.as_str()),
            other => other.get("address").and_then(Value::as_str),
        });
        if let Some(address) = first.filter(|a| !a.trim().is_empty()) {
            return Some(address.to_string());
        }
    }

    str_field(person, "email")
        .or_else(|| str_field(person, "work_email"))
        .or_else(|| str_field(person, "recommended_personal_email"))
        .map(str::to_string)
}

fn phone_numbers(person: &Value) -> Vec<PhoneNumber> {
    let mut phones: Vec<PhoneNumber> = Vec::new();

    if let Some(mobile) = str_field(person, "mobile_phone") {
        phones.push(PhoneNumber {
            raw_number: Some(mobile.to_string()),
            phone_type: Some("mobile".to_string()),
            ..Default::default()
        });
    }

    if let Some(list) = person.get("phone_numbers").and_then(Value::as_array) {
        phones.extend(list.iter().filter_map(Value::as_str).map(|n| PhoneNumber {
            raw_number: Some(n.to_string()),
            ..Default::default()
        }));
    }

    phones
}

fn normalize_linkedin(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

fn map_person(person: Value) -> CandidateRecord {
    let full_name = str_field(&person, "full_name").unwrap_or_default().to_string();
    let (split_first, split_last) = split_name(&full_name);

    let company_size = str_field(&person, "job_company_size");
    let employee_count = person
        .get("job_company_employee_count")
        .and_then(Value::as_u64)
        .or_else(|| company_size.and_then(employees_from_band));

    let phone_numbers = phone_numbers(&person);

    CandidateRecord {
        id: str_field(&person, "id")
            .map(str::to_string)
            .unwrap_or_else(|| format!("pdl-{}", uuid::Uuid::new_v4())),
        provider: ProviderKind::Pdl,
        first_name: str_field(&person, "first_name").map(str::to_string).unwrap_or(split_first),
        last_name: str_field(&person, "last_name").map(str::to_string).unwrap_or(split_last),
        full_name,
        title: str_field(&person, "job_title").unwrap_or("Not specified").to_string(),
        organization: Organization {
            name: str_field(&person, "job_company_name").unwrap_or("Unknown Company").to_string(),
            website: str_field(&person, "job_company_website").unwrap_or_default().to_string(),
            industry: str_field(&person, "job_company_industry")
                .or_else(|| str_field(&person, "industry"))
                .unwrap_or_default()
                .to_string(),
            employee_count,
        },
        location: Location {
            city: str_field(&person, "location_locality").unwrap_or_default().to_string(),
            region: str_field(&person, "location_region").unwrap_or_default().to_string(),
            country: str_field(&person, "location_country").unwrap_or_default().to_string(),
        },
        linkedin_url: str_field(&person, "linkedin_url").map(normalize_linkedin),
        email: pick_email(&person),
        email_status: None,
        phone: best_phone(&phone_numbers),
        phone_numbers,
        raw: Some(person),
    }
}

#[async_trait]
impl DirectoryProvider for PdlClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Pdl
    }

    fn max_page_size(&self) -> u32 {
        MAX_PAGE_SIZE
    }

    async fn search(&self, filter: &SearchFilter) -> Result<SearchPage, ProviderError> {
        let filter = filter.clamped(MAX_PAGE_SIZE);
        let body = PersonSearchBody {
            sql: build_sql(&filter),
            size: filter.per_page,
            dataset: "all",
        };

        tracing::info!(size = body.size, "Searching PDL persons");
        tracing::debug!("PDL query: {}", body.sql);

        let url = format!("{}/person/search", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("X-Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if let Some(remaining) = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
        {
            tracing::debug!(remaining, "PDL rate limit remaining");
        }

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            let detail = error_message(&text);
            let provider = ProviderKind::Pdl;
            return Err(match status.as_u16() {
                // PDL answers 404 when the query matched nobody
                404 => {
                    tracing::info!("PDL search matched no records");
                    return Ok(SearchPage {
                        candidates: Vec::new(),
                        pagination: Pagination::new(filter.page, filter.per_page, 0),
                    });
                }
                401 => ProviderError::Auth { provider, message: format!("invalid PDL API key ({})", detail) },
                402 => ProviderError::CreditsExhausted {
                    provider,
                    message: format!("PDL account is out of credits ({})", detail),
                },
                code => ProviderError::from_status(provider, code, detail),
            });
        }

        let parsed: PersonSearchResponse = serde_json::from_str(&text)
            .map_err(|e| ProviderError::InvalidResponse(format!("PDL search: {}", e)))?;

        let candidates: Vec<CandidateRecord> = parsed.data.into_iter().map(map_person).collect();
        let pagination = Pagination::new(filter.page, filter.per_page, parsed.total.max(candidates.len() as u64));

        tracing::info!(
            returned = candidates.len(),
            total_entries = pagination.total_entries,
            "PDL search complete"
        );

        Ok(SearchPage { candidates, pagination })
    }
}
