use crate::models::{CandidateRecord, ProfileSnapshot};
use serde::Deserialize;
use std::collections::HashSet;

/// How two free-text profile fields are judged to agree
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Either value contains the other, case-insensitively
    Substring,
    /// Share of common word tokens, relative to the shorter value
    TokenOverlap {
        #[serde(default = "default_overlap_threshold")]
        threshold: f64,
    },
    /// Jaro-Winkler similarity of the lowercase values
    JaroWinkler {
        #[serde(default = "default_jaro_threshold")]
        threshold: f64,
    },
}

fn default_overlap_threshold() -> f64 { 0.5 }
fn default_jaro_threshold() -> f64 { 0.85 }

impl Default for MatchPolicy {
    fn default() -> Self {
        MatchPolicy::TokenOverlap { threshold: default_overlap_threshold() }
    }
}

fn tokens(value: &str) -> HashSet<String> {
    value
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

impl MatchPolicy {
    pub fn matches(&self, left: &str, right: &str) -> bool {
        let left = left.trim().to_lowercase();
        let right = right.trim().to_lowercase();
        if left.is_empty() || right.is_empty() {
            return false;
        }

        match *self {
            MatchPolicy::Substring => left.contains(&right) || right.contains(&left),
            MatchPolicy::TokenOverlap { threshold } => {
                let a = tokens(&left);
                let b = tokens(&right);
                let smaller = a.len().min(b.len());
                if smaller == 0 {
                    return false;
                }
                let shared = a.intersection(&b).count();
                shared as f64 / smaller as f64 >= threshold
            }
            MatchPolicy::JaroWinkler { threshold } => strsim::jaro_winkler(&left, &right) >= threshold,
        }
    }
}

/// Agreement between provider data and the live profile
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileComparison {
    /// Matched checks as a percentage of performed checks
    pub accuracy: u8,
    pub discrepancies: Vec<String>,
}

/// Compare a candidate against a profile snapshot.
///
/// Only fields present on both sides are checked. Returns `None` when
/// nothing could be compared.
pub fn compare_profile(
    candidate: &CandidateRecord,
    snapshot: &ProfileSnapshot,
    policy: MatchPolicy,
) -> Option<ProfileComparison> {
    let location = candidate.location.display();
    let pairs: [(&str, &str, Option<&str>); 4] = [
        ("Name", candidate.full_name.as_str(), snapshot.full_name.as_deref()),
        ("Title", candidate.title.as_str(), snapshot.headline.as_deref()),
        ("Company", candidate.organization.name.as_str(), snapshot.company.as_deref()),
        ("Location", location.as_str(), snapshot.location.as_deref()),
    ];

    let mut checks = 0usize;
    let mut matched = 0usize;
    let mut discrepancies = Vec::new();

    for (field, ours, theirs) in pairs {
        let Some(theirs) = theirs.map(str::trim).filter(|t| !t.is_empty()) else {
            continue;
        };
        if ours.trim().is_empty() || ours == "Unknown" {
            continue;
        }

        checks += 1;
        if policy.matches(ours, theirs) {
            matched += 1;
        } else {
            discrepancies.push(format!("{} mismatch: provider has \"{}\", profile shows \"{}\"", field, ours, theirs));
        }
    }

    if checks == 0 {
        return None;
    }

    let accuracy = ((matched as f64 / checks as f64) * 100.0).round() as u8;
    Some(ProfileComparison { accuracy, discrepancies })
}
