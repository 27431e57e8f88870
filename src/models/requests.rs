use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to search, enrich and qualify leads for an owner
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SearchLeadsRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "owner_id", rename = "ownerId")]
    pub owner_id: String,
    #[serde(default, alias = "job_titles", rename = "jobTitles")]
    pub job_titles: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    /// Size bands such as "11-50", "10000+" or provider ranges like "11,50"
    #[serde(default, alias = "company_sizes", rename = "companySizes")]
    pub company_sizes: Vec<String>,
    #[serde(default)]
    pub industries: Vec<String>,
    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub page: u32,
    #[serde(default = "default_per_page", alias = "per_page", rename = "perPage")]
    #[validate(range(min = 1, max = 100))]
    pub per_page: u32,
    /// Provider override ("apollo" or "pdl")
    pub provider: Option<String>,
    #[serde(alias = "top_n", rename = "topN")]
    pub top_n: Option<u32>,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    10
}

/// Request to create or replace the owner's ICP
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpsertIcpRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "owner_id", rename = "ownerId")]
    pub owner_id: String,
    #[validate(length(min = 1, max = 5000))]
    pub description: String,
    #[serde(default)]
    pub industries: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default, alias = "role_titles", rename = "roleTitles")]
    pub role_titles: Vec<String>,
    #[serde(alias = "min_employees", rename = "minEmployees")]
    pub min_employees: Option<u64>,
    #[serde(alias = "max_employees", rename = "maxEmployees")]
    pub max_employees: Option<u64>,
}

/// Owner lookup for GET /icp and GET /leads
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OwnerQuery {
    #[validate(length(min = 1))]
    #[serde(alias = "owner_id", rename = "ownerId")]
    pub owner_id: String,
}

/// Filters for listing previously saved leads
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ListLeadsQuery {
    #[validate(length(min = 1))]
    #[serde(alias = "owner_id", rename = "ownerId")]
    pub owner_id: String,
    pub label: Option<String>,
    #[serde(alias = "min_score", rename = "minScore")]
    #[validate(range(max = 100))]
    pub min_score: Option<u8>,
    pub search: Option<String>,
    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub page: u32,
    #[serde(default = "default_list_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: u32,
}

fn default_list_limit() -> u32 {
    20
}

/// Payload of the extraction agent, also accepted by POST /icp-search
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IcpSearchRequest {
    #[validate(length(min = 50, message = "ICP description must be at least 50 characters"))]
    pub icp_description: String,
    #[validate(length(min = 1, max = 20, message = "Provide between 1 and 20 job titles"))]
    pub job_titles: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub industries: Vec<String>,
    #[serde(default)]
    pub company_sizes: Vec<String>,
    #[serde(default)]
    pub keywords_include: Vec<String>,
    #[serde(default)]
    pub keywords_exclude: Vec<String>,
    pub max_raw_leads: Option<u32>,
    pub top_n: Option<u32>,
    /// Owner whose saved leads are skipped; none disables dedup
    pub owner_id: Option<String>,
    pub provider: Option<String>,
    pub apify_run_id: Option<String>,
    pub source: Option<String>,
}
