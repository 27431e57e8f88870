// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    BatchSummary, CandidateRecord, CompanySize, CompanySizeRange, EnrichmentRequest, EnrichmentResult, FitLabel,
    IcpProfile, Location, Organization, Pagination, PhoneNumber, PipelineLimits, ProfileSnapshot,
    ProfileVerification, ProviderKind, QualificationResult, QualifiedLead, RankedBatch, ScoreSource,
    SearchFilter, SearchPage,
};
pub use requests::{IcpSearchRequest, ListLeadsQuery, OwnerQuery, SearchLeadsRequest, UpsertIcpRequest};
pub use responses::{
    ErrorResponse, ExtractedLead, HealthResponse, IcpResponse, IcpSearchResponse, IcpSearchSummary,
    ListLeadsResponse, SearchLeadsResponse,
};
