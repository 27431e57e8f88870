//! Leadflow - B2B lead sourcing, enrichment and qualification service
//!
//! Searches a people directory for candidates matching a filter, reveals
//! their contact details, scores each one against an Ideal Customer Profile
//! and returns the best matches.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{LeadPipeline, PipelineComponents, PipelineError, PipelineSettings};
pub use models::{CandidateRecord, IcpProfile, QualifiedLead, RankedBatch, SearchFilter};
