// Core pipeline exports
pub mod company_size;
pub mod contact;
pub mod dedup;
pub mod enrichment;
pub mod pipeline;
pub mod qualification;
pub mod ranker;
pub mod scoring;
pub mod verification;

pub use contact::{best_phone, merge_enrichment, needs_email_unlock, split_name};
pub use dedup::{DedupGate, Partition};
pub use enrichment::{ContactEnricher, EnrichmentSettings};
pub use pipeline::{LeadPipeline, PipelineComponents, PipelineError, PipelineSettings};
pub use qualification::Qualifier;
pub use ranker::{average_score, Ceilings, Ranker};
pub use scoring::{fallback_score, label_for_score, FallbackWeights, LinkedInSignal};
pub use verification::{compare_profile, MatchPolicy, ProfileComparison};
