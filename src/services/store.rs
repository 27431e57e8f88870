use crate::models::{FitLabel, IcpProfile, ProviderKind, QualifiedLead};
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Invalid stored record: {0}")]
    InvalidRecord(String),
}

/// Filters for listing an owner's saved leads
#[derive(Debug, Clone, PartialEq)]
pub struct LeadListCriteria {
    pub label: Option<FitLabel>,
    pub min_score: Option<u8>,
    /// Case-insensitive substring over name, company, title and email
    pub search: Option<String>,
    pub page: u32,
    pub limit: u32,
}

impl Default for LeadListCriteria {
    fn default() -> Self {
        Self { label: None, min_score: None, search: None, page: 1, limit: 20 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LeadPage {
    pub leads: Vec<QualifiedLead>,
    pub total: u64,
}

/// Persistent store of saved leads and per-owner ICPs.
///
/// Leads are unique per (owner, provider, provider id).
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Previously saved lead for this owner, if any
    async fn find_saved(
        &self,
        owner: &str,
        provider: ProviderKind,
        provider_id: &str,
    ) -> Result<Option<QualifiedLead>, StoreError>;

    /// Saved leads among `provider_ids`, keyed by provider id
    async fn find_saved_many(
        &self,
        owner: &str,
        provider: ProviderKind,
        provider_ids: &[String],
    ) -> Result<HashMap<String, QualifiedLead>, StoreError> {
        let mut found = HashMap::new();
        for id in provider_ids {
            if let Some(lead) = self.find_saved(owner, provider, id).await? {
                found.insert(id.clone(), lead);
            }
        }
        Ok(found)
    }

    async fn exists(&self, owner: &str, provider: ProviderKind, provider_id: &str) -> Result<bool, StoreError> {
        Ok(self.find_saved(owner, provider, provider_id).await?.is_some())
    }

    /// Insert or refresh a lead
    async fn save(&self, owner: &str, lead: &QualifiedLead) -> Result<(), StoreError>;

    async fn list(&self, owner: &str, criteria: &LeadListCriteria) -> Result<LeadPage, StoreError>;

    async fn get_icp(&self, owner: &str) -> Result<Option<IcpProfile>, StoreError>;

    async fn upsert_icp(&self, owner: &str, icp: &IcpProfile) -> Result<(), StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}
