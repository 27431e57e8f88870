use crate::models::{CandidateRecord, ProviderKind, QualifiedLead};
use crate::services::store::LeadStore;
use std::collections::HashMap;
use std::sync::Arc;

/// Candidates split by whether the owner already saved them.
///
/// Both sides keep each entry's position in the input list.
#[derive(Debug, Default)]
pub struct Partition {
    pub new: Vec<(usize, CandidateRecord)>,
    /// Stored leads, flagged `already_saved`
    pub already_saved: Vec<(usize, QualifiedLead)>,
}

impl Partition {
    /// Everything treated as new, used when there is no owner to dedup against
    pub fn all_new(candidates: Vec<CandidateRecord>) -> Self {
        Self { new: candidates.into_iter().enumerate().collect(), already_saved: Vec::new() }
    }
}

/// Skips enrichment and scoring for leads an owner already has
pub struct DedupGate {
    store: Arc<dyn LeadStore>,
}

impl DedupGate {
    pub fn new(store: Arc<dyn LeadStore>) -> Self {
        Self { store }
    }

    /// One lookup per provider; a failed lookup is logged and its candidates treated as new
    pub async fn partition(&self, candidates: Vec<CandidateRecord>, owner: &str) -> Partition {
        let mut ids_by_provider: HashMap<ProviderKind, Vec<String>> = HashMap::new();
        for candidate in &candidates {
            ids_by_provider.entry(candidate.provider).or_default().push(candidate.id.clone());
        }

        let mut saved: HashMap<(ProviderKind, String), QualifiedLead> = HashMap::new();
        for (provider, ids) in ids_by_provider {
            match self.store.find_saved_many(owner, provider, &ids).await {
                Ok(found) => saved.extend(found.into_iter().map(|(id, lead)| ((provider, id), lead))),
                Err(e) => tracing::warn!(
                    owner,
                    provider = provider.as_str(),
                    candidates = ids.len(),
                    error = %e,
                    "Saved-lead lookup failed, treating candidates as new"
                ),
            }
        }

        let mut partition = Partition::default();

        for (position, candidate) in candidates.into_iter().enumerate() {
            match saved.get(&(candidate.provider, candidate.id.clone())) {
                Some(lead) => {
                    let mut lead = lead.clone();
                    lead.already_saved = true;
                    partition.already_saved.push((position, lead));
                }
                None => partition.new.push((position, candidate)),
            }
        }

        tracing::info!(
            owner,
            already_saved = partition.already_saved.len(),
            new = partition.new.len(),
            "Dedup gate applied"
        );

        partition
    }
}
