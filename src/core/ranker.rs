use crate::models::{BatchSummary, PipelineLimits, QualifiedLead, RankedBatch};
use serde::Deserialize;

/// Absolute volume ceilings no caller can exceed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Ceilings {
    #[serde(default = "default_max_considered")]
    pub max_considered: usize,
    #[serde(default = "default_max_returned")]
    pub max_returned: usize,
}

fn default_max_considered() -> usize { 1000 }
fn default_max_returned() -> usize { 500 }

impl Default for Ceilings {
    fn default() -> Self {
        Self { max_considered: default_max_considered(), max_returned: default_max_returned() }
    }
}

/// Orders qualified leads by score and keeps the top N
#[derive(Debug, Clone, Default)]
pub struct Ranker {
    ceilings: Ceilings,
}

impl Ranker {
    pub fn new(ceilings: Ceilings) -> Self {
        Self { ceilings }
    }

    /// Clamp requested limits to the ceilings
    pub fn clamp_limits(&self, requested: PipelineLimits) -> PipelineLimits {
        PipelineLimits {
            top_n: requested.top_n.min(self.ceilings.max_returned),
            max_considered: requested.max_considered.min(self.ceilings.max_considered),
        }
    }

    /// Rank the first `max_considered` leads and return the best `top_n`.
    ///
    /// The sort is stable: equal scores keep their input order.
    pub fn select(&self, qualified: Vec<QualifiedLead>, limits: PipelineLimits) -> RankedBatch {
        let limits = self.clamp_limits(limits);

        let mut leads = qualified;
        leads.truncate(limits.max_considered);
        let count_considered = leads.len();

        leads.sort_by(|a, b| b.score().cmp(&a.score()));
        leads.truncate(limits.top_n);

        let summary = BatchSummary {
            count_considered,
            count_returned: leads.len(),
            average_score: average_score(&leads),
            already_saved: leads.iter().filter(|l| l.already_saved).count(),
            fallback_scored: leads.iter().filter(|l| l.qualification.is_degraded()).count(),
        };

        RankedBatch { leads, summary, pagination: Default::default() }
    }
}

/// Mean score, 0 for an empty slice
pub fn average_score(leads: &[QualifiedLead]) -> f64 {
    if leads.is_empty() {
        return 0.0;
    }
    let total: u64 = leads.iter().map(|l| l.score() as u64).sum();
    total as f64 / leads.len() as f64
}
