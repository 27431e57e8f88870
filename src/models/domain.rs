use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Directory provider that produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Rich provider: search with contact reveal plus a match/enrich endpoint
    Apollo,
    /// Basic provider: search only
    Pdl,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Apollo => "apollo",
            ProviderKind::Pdl => "pdl",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "apollo" => Ok(ProviderKind::Apollo),
            "pdl" | "peopledatalabs" => Ok(ProviderKind::Pdl),
            other => Err(format!("unknown provider '{}' (expected apollo or pdl)", other)),
        }
    }
}

/// Closed employee-count interval. `max = None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanySizeRange {
    pub min: u64,
    pub max: Option<u64>,
}

impl CompanySizeRange {
    pub fn new(min: u64, max: Option<u64>) -> Self {
        Self { min, max }
    }
}

/// Company-size filter value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanySize {
    Range(CompanySizeRange),
    /// Unrecognised value, forwarded to the provider unchanged
    Raw(String),
}

/// Canonical, provider-agnostic search filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilter {
    #[serde(default)]
    pub job_titles: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub company_sizes: Vec<CompanySize>,
    #[serde(default)]
    pub industries: Vec<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 { 1 }
fn default_per_page() -> u32 { 10 }

impl Default for SearchFilter {
    fn default() -> Self {
        Self {
            job_titles: Vec::new(),
            locations: Vec::new(),
            company_sizes: Vec::new(),
            industries: Vec::new(),
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl SearchFilter {
    /// True when no filter dimension is set
    pub fn is_empty(&self) -> bool {
        self.job_titles.is_empty()
            && self.locations.is_empty()
            && self.company_sizes.is_empty()
            && self.industries.is_empty()
    }

    /// Copy of this filter with page >= 1 and page size within `1..=max`
    pub fn clamped(&self, max_page_size: u32) -> Self {
        let mut filter = self.clone();
        filter.page = filter.page.max(1);
        filter.per_page = filter.per_page.clamp(1, max_page_size.max(1));
        filter
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub name: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub employee_count: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub country: String,
}

impl Location {
    /// "City, Region" (or "City, Country"), falling back to country, then "Unknown"
    pub fn display(&self) -> String {
        if !self.city.is_empty() {
            let second = if !self.region.is_empty() { &self.region } else { &self.country };
            if second.is_empty() {
                self.city.clone()
            } else {
                format!("{}, {}", self.city, second)
            }
        } else if !self.country.is_empty() {
            self.country.clone()
        } else {
            "Unknown".to_string()
        }
    }
}

/// Phone number entry as reported by a provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhoneNumber {
    #[serde(default)]
    pub raw_number: Option<String>,
    #[serde(default)]
    pub sanitized_number: Option<String>,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(rename = "type", default)]
    pub phone_type: Option<String>,
}

/// Canonical candidate record. `id` is scoped to `provider`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecord {
    pub id: String,
    pub provider: ProviderKind,
    pub full_name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub title: String,
    pub organization: Organization,
    pub location: Location,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    /// May hold a provider sentinel meaning "locked"
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_status: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phone_numbers: Vec<PhoneNumber>,
    /// Opaque provider payload kept for debugging only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

impl CandidateRecord {
    pub fn linkedin(&self) -> Option<&str> {
        self.linkedin_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Person fragment sent to a match/enrich endpoint
    pub fn enrichment_request(&self) -> EnrichmentRequest {
        fn non_empty(value: &str) -> Option<String> {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }

        EnrichmentRequest {
            id: self.id.clone(),
            first_name: non_empty(&self.first_name),
            last_name: non_empty(&self.last_name),
            organization_name: non_empty(&self.organization.name),
            domain: non_empty(&self.organization.website),
            linkedin_url: self.linkedin().map(str::to_string),
        }
    }
}

/// Person fragment for the match/enrich endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentRequest {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
}

/// Contact fields revealed for one candidate. Transient: merged, then dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichmentResult {
    pub email: Option<String>,
    pub email_status: String,
    pub phone_numbers: Vec<PhoneNumber>,
    pub best_phone: Option<String>,
}

/// Ideal Customer Profile, one per owner
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IcpProfile {
    pub description: String,
    #[serde(default)]
    pub industries: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub role_titles: Vec<String>,
    #[serde(default)]
    pub min_employees: Option<u64>,
    #[serde(default)]
    pub max_employees: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitLabel {
    Good,
    Maybe,
    Bad,
}

impl FitLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FitLabel::Good => "good",
            FitLabel::Maybe => "maybe",
            FitLabel::Bad => "bad",
        }
    }
}

impl FromStr for FitLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "good" => Ok(FitLabel::Good),
            "maybe" => Ok(FitLabel::Maybe),
            "bad" => Ok(FitLabel::Bad),
            other => Err(format!("unknown fit label '{}'", other)),
        }
    }
}

/// Which scorer produced a qualification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreSource {
    Model,
    Fallback,
}

impl ScoreSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreSource::Model => "model",
            ScoreSource::Fallback => "fallback",
        }
    }
}

/// Outcome of the social-profile existence check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileVerification {
    Verified,
    Unverified,
    /// Probe could not reach a verdict (timeout, network error, probing disabled)
    Unknown,
    NotProvided,
}

/// Profile data read back from the social network, when a probe can supply it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub full_name: Option<String>,
    pub headline: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualificationResult {
    /// Always within [0, 100]
    pub score: u8,
    pub label: FitLabel,
    pub reason: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub source: ScoreSource,
    #[serde(default)]
    pub linkedin_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_accuracy: Option<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub discrepancies: Vec<String>,
}

impl QualificationResult {
    pub fn is_degraded(&self) -> bool {
        self.source == ScoreSource::Fallback
    }
}

/// Candidate plus its qualification. Lives for one search response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualifiedLead {
    #[serde(flatten)]
    pub candidate: CandidateRecord,
    #[serde(flatten)]
    pub qualification: QualificationResult,
    #[serde(default)]
    pub already_saved: bool,
}

impl QualifiedLead {
    pub fn score(&self) -> u8 {
        self.qualification.score
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    pub total_entries: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(page: u32, per_page: u32, total_entries: u64) -> Self {
        let total_pages = if per_page == 0 {
            0
        } else {
            total_entries.div_ceil(per_page as u64)
        };
        Self { page, per_page, total_entries, total_pages }
    }
}

/// One page of canonical candidates from a provider
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub candidates: Vec<CandidateRecord>,
    pub pagination: Pagination,
}

/// Caller-requested volume limits (clamped to absolute ceilings before use)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineLimits {
    pub top_n: usize,
    pub max_considered: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub count_considered: usize,
    pub count_returned: usize,
    /// Mean score of the returned leads; 0 when none are returned
    pub average_score: f64,
    pub already_saved: usize,
    pub fallback_scored: usize,
}

/// Leads ordered by descending score (stable on input order)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedBatch {
    pub leads: Vec<QualifiedLead>,
    pub summary: BatchSummary,
    #[serde(default)]
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!("Apollo".parse::<ProviderKind>(), Ok(ProviderKind::Apollo));
        assert_eq!("pdl".parse::<ProviderKind>(), Ok(ProviderKind::Pdl));
        assert!("linkedin".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_filter_clamped_to_provider_page_size() {
        let filter = SearchFilter { per_page: 250, page: 0, ..Default::default() };
        let clamped = filter.clamped(25);
        assert_eq!(clamped.per_page, 25);
        assert_eq!(clamped.page, 1);
    }

    #[test]
    fn test_location_display() {
        let loc = Location { city: "Austin".into(), region: "Texas".into(), country: "United States".into() };
        assert_eq!(loc.display(), "Austin, Texas");

        let loc = Location { city: "".into(), region: "".into(), country: "Germany".into() };
        assert_eq!(loc.display(), "Germany");

        assert_eq!(Location::default().display(), "Unknown");
    }

    #[test]
    fn test_pagination_pages() {
        assert_eq!(Pagination::new(1, 10, 95).total_pages, 10);
        assert_eq!(Pagination::new(1, 10, 0).total_pages, 0);
    }
}
