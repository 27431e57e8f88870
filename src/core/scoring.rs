use crate::core::verification::ProfileComparison;
use crate::models::{CandidateRecord, FitLabel, IcpProfile, ProfileVerification, QualificationResult, ScoreSource};
use serde::Deserialize;

pub const GOOD_THRESHOLD: u8 = 80;
pub const MAYBE_THRESHOLD: u8 = 50;

/// Label for a clamped score: >= 80 good, >= 50 maybe, else bad
#[inline]
pub fn label_for_score(score: u8) -> FitLabel {
    if score >= GOOD_THRESHOLD {
        FitLabel::Good
    } else if score >= MAYBE_THRESHOLD {
        FitLabel::Maybe
    } else {
        FitLabel::Bad
    }
}

/// Round and clamp a raw score into [0, 100]. Non-finite input yields `None`.
#[inline]
pub fn clamp_score(raw: f64) -> Option<u8> {
    if !raw.is_finite() {
        return None;
    }
    Some(raw.round().min(100.0).max(0.0) as u8)
}

/// What the qualification stage knows about a candidate's social profile
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedInSignal {
    pub status: ProfileVerification,
    pub comparison: Option<ProfileComparison>,
}

impl LinkedInSignal {
    pub fn not_provided() -> Self {
        Self { status: ProfileVerification::NotProvided, comparison: None }
    }

    /// Verified profiles count, and so do well-formed URLs the probe could not settle
    pub fn is_verifiable(&self) -> bool {
        matches!(self.status, ProfileVerification::Verified | ProfileVerification::Unknown)
    }
}

/// Deterministic scoring weights
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FallbackWeights {
    #[serde(default = "default_baseline")]
    pub baseline: i32,
    #[serde(default = "default_title_bonus")]
    pub title_bonus: i32,
    #[serde(default = "default_industry_bonus")]
    pub industry_bonus: i32,
    #[serde(default = "default_linkedin_penalty")]
    pub linkedin_penalty: i32,
    #[serde(default = "default_accuracy_bonus")]
    pub accuracy_bonus: i32,
    #[serde(default = "default_discrepancy_base")]
    pub discrepancy_base: i32,
    #[serde(default = "default_discrepancy_step")]
    pub discrepancy_step: i32,
}

fn default_baseline() -> i32 { 50 }
fn default_title_bonus() -> i32 { 20 }
fn default_industry_bonus() -> i32 { 20 }
fn default_linkedin_penalty() -> i32 { 15 }
fn default_accuracy_bonus() -> i32 { 10 }
fn default_discrepancy_base() -> i32 { 10 }
fn default_discrepancy_step() -> i32 { 5 }

impl Default for FallbackWeights {
    fn default() -> Self {
        Self {
            baseline: default_baseline(),
            title_bonus: default_title_bonus(),
            industry_bonus: default_industry_bonus(),
            linkedin_penalty: default_linkedin_penalty(),
            accuracy_bonus: default_accuracy_bonus(),
            discrepancy_base: default_discrepancy_base(),
            discrepancy_step: default_discrepancy_step(),
        }
    }
}

/// Accuracy at or above which profile data counts as confirmed
pub const ACCURATE_THRESHOLD: u8 = 90;

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    let haystack = haystack.to_lowercase();
    !haystack.trim().is_empty()
        && needles
            .iter()
            .map(|n| n.trim().to_lowercase())
            .any(|n| !n.is_empty() && haystack.contains(&n))
}

/// Rule-based qualification used whenever the reasoning service cannot answer
pub fn fallback_score(
    candidate: &CandidateRecord,
    icp: &IcpProfile,
    signal: &LinkedInSignal,
    weights: &FallbackWeights,
) -> QualificationResult {
    let mut score = weights.baseline;
    let mut tags: Vec<String> = Vec::new();

    if signal.is_verifiable() {
        tags.push("linkedin-verified".to_string());
        if let Some(comparison) = &signal.comparison {
            if comparison.accuracy >= ACCURATE_THRESHOLD {
                score += weights.accuracy_bonus;
                tags.push("data-accurate".to_string());
            } else if !comparison.discrepancies.is_empty() {
                let n = comparison.discrepancies.len() as i32;
                score -= weights.discrepancy_base + weights.discrepancy_step * n;
                tags.push("data-discrepancy".to_string());
            }
        }
    } else {
        score -= weights.linkedin_penalty;
        tags.push("no-linkedin".to_string());
    }

    if contains_any(&candidate.title, &icp.role_titles) {
        score += weights.title_bonus;
        tags.push("matching-title".to_string());
    }

    if contains_any(&candidate.organization.industry, &icp.industries) {
        score += weights.industry_bonus;
        tags.push("target-industry".to_string());
    }

    let score = score.clamp(0, 100) as u8;
    let reason = format!(
        "AI qualification unavailable, using rule-based scoring. {}",
        if signal.is_verifiable() { "LinkedIn verified." } else { "No verified LinkedIn profile." }
    );

    QualificationResult {
        score,
        label: label_for_score(score),
        reason,
        tags,
        source: ScoreSource::Fallback,
        linkedin_verified: signal.is_verifiable(),
        data_accuracy: signal.comparison.as_ref().map(|c| c.accuracy),
        discrepancies: signal
            .comparison
            .as_ref()
            .map(|c| c.discrepancies.clone())
            .unwrap_or_default(),
    }
}
