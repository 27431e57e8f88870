// Service exports
pub mod apollo;
pub mod backend;
pub mod openai;
pub mod pdl;
pub mod postgres;
pub mod probe;
pub mod provider;
pub mod retry;
pub mod store;

pub use apollo::ApolloClient;
pub use backend::{BackendClient, BackendError};
pub use openai::{OpenAiReasoner, ReasoningError, ReasoningService};
pub use pdl::PdlClient;
pub use postgres::PostgresLeadStore;
pub use probe::{LinkedInProbe, ProbeOutcome, ProfileProbe};
pub use provider::{DirectoryProvider, ProviderError};
pub use retry::{call_with_retry, Backoff, RetryPolicy};
pub use store::{LeadListCriteria, LeadPage, LeadStore, StoreError};
