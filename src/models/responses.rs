use serde::{Deserialize, Serialize};
use crate::models::domain::{BatchSummary, FitLabel, IcpProfile, Pagination, ProviderKind, QualifiedLead};

/// Response for the lead search endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchLeadsResponse {
    pub provider: ProviderKind,
    pub leads: Vec<QualifiedLead>,
    pub summary: BatchSummary,
    pub pagination: Pagination,
}

/// Page of saved leads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListLeadsResponse {
    pub leads: Vec<QualifiedLead>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IcpResponse {
    pub owner_id: String,
    pub icp: IcpProfile,
}

/// Lead as returned to the extraction agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedLead {
    pub full_name: String,
    pub job_title: String,
    pub company_name: String,
    pub company_website: Option<String>,
    pub company_size: Option<String>,
    pub industry: Option<String>,
    pub location: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linkedin_url: Option<String>,
    pub fit_score: u8,
    pub fit_reason: String,
    pub fit_label: FitLabel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IcpSearchSummary {
    pub raw_leads_fetched: usize,
    pub leads_returned: usize,
    pub icp_description: String,
    pub average_fit_score: f64,
    pub credits_used: usize,
    pub processing_time_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IcpSearchResponse {
    pub job_id: String,
    pub summary: IcpSearchSummary,
    pub leads: Vec<ExtractedLead>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
    pub providers: Vec<ProviderKind>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
