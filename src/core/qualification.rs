use crate::core::scoring::{clamp_score, fallback_score, label_for_score, FallbackWeights, LinkedInSignal};
use crate::core::verification::{compare_profile, MatchPolicy};
use crate::models::{CandidateRecord, IcpProfile, ProfileVerification, QualificationResult, ScoreSource};
use crate::services::openai::ReasoningService;
use crate::services::probe::{is_valid_profile_url, ProfileProbe};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

pub const SYSTEM_PROMPT: &str = "You are a lead qualification AI that responds only with valid JSON.";

const MAX_TAGS: usize = 5;
const DEFAULT_REASON: &str = "Scored against the ideal customer profile.";

#[derive(Debug, Error, PartialEq)]
pub enum VerdictError {
    #[error("verdict is not valid JSON: {0}")]
    Json(String),

    #[error("verdict score is missing or not a finite number")]
    BadScore,
}

#[derive(Debug, Deserialize)]
struct ModelVerdict {
    score: Option<f64>,
    label: Option<String>,
    reason: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim().to_string();
        if !tag.is_empty() && !normalized.contains(&tag) {
            normalized.push(tag);
        }
        if normalized.len() == MAX_TAGS {
            break;
        }
    }
    normalized
}

/// Parse the reasoning service reply into a qualification.
///
/// The label is always derived from the clamped score; a disagreeing
/// label in the reply is ignored.
pub fn parse_verdict(content: &str, signal: &LinkedInSignal) -> Result<QualificationResult, VerdictError> {
    let verdict: ModelVerdict =
        serde_json::from_str(strip_code_fences(content)).map_err(|e| VerdictError::Json(e.to_string()))?;

    let score = verdict.score.and_then(clamp_score).ok_or(VerdictError::BadScore)?;
    let label = label_for_score(score);

    if let Some(proposed) = verdict.label.as_deref() {
        if !proposed.eq_ignore_ascii_case(label.as_str()) {
            tracing::debug!(proposed, derived = label.as_str(), score, "Model label disagrees with score");
        }
    }

    Ok(QualificationResult {
        score,
        label,
        reason: verdict
            .reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_REASON.to_string()),
        tags: normalize_tags(verdict.tags),
        source: ScoreSource::Model,
        linkedin_verified: signal.is_verifiable(),
        data_accuracy: signal.comparison.as_ref().map(|c| c.accuracy),
        discrepancies: signal
            .comparison
            .as_ref()
            .map(|c| c.discrepancies.clone())
            .unwrap_or_default(),
    })
}

fn list_or_any(values: &[String]) -> String {
    let joined = values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    if joined.is_empty() { "Any".to_string() } else { joined }
}

fn linkedin_line(signal: &LinkedInSignal) -> String {
    let status = match signal.status {
        ProfileVerification::Verified => "VERIFIED - profile exists and is reachable",
        ProfileVerification::Unknown => "UNCONFIRMED - profile URL is well-formed but could not be checked",
        ProfileVerification::Unverified => "NOT VERIFIED - profile may not exist or is not reachable",
        ProfileVerification::NotProvided => "NOT PROVIDED - no LinkedIn profile on record",
    };

    match &signal.comparison {
        Some(c) if c.discrepancies.is_empty() => {
            format!("{}\nProfile data accuracy: {}%", status, c.accuracy)
        }
        Some(c) => format!(
            "{}\nProfile data accuracy: {}%\nDiscrepancies:\n- {}",
            status,
            c.accuracy,
            c.discrepancies.join("\n- ")
        ),
        None => status.to_string(),
    }
}

/// Prompt describing the ICP, the candidate and the scoring rubric
pub fn build_prompt(candidate: &CandidateRecord, icp: &IcpProfile, signal: &LinkedInSignal) -> String {
    let employees = candidate
        .organization
        .employee_count
        .map(|n| n.to_string())
        .unwrap_or_else(|| "Unknown".to_string());

    format!(
        r#"Evaluate how well this prospect fits the Ideal Customer Profile.

IDEAL CUSTOMER PROFILE:
Description: {description}
Target industries: {industries}
Target locations: {locations}
Target roles: {roles}
Company size: {min_employees} to {max_employees} employees

PROSPECT:
Name: {name}
Title: {title}
Company: {company}
Industry: {industry}
Company size: {employees} employees
Location: {location}
Email: {email}

LINKEDIN STATUS:
{linkedin}

SCORING GUIDELINES:
- 80-100: strong fit, role and company match the profile
- 50-79: partial fit, worth a closer look
- 0-49: weak fit
- Penalize prospects without a verified LinkedIn profile
- Penalize data that disagrees with the LinkedIn profile

Respond with JSON only:
{{"score": <0-100>, "label": "good" | "maybe" | "bad", "reason": "<one or two sentences>", "tags": ["<up to 5 short tags>"]}}"#,
        description = icp.description.trim(),
        industries = list_or_any(&icp.industries),
        locations = list_or_any(&icp.locations),
        roles = list_or_any(&icp.role_titles),
        min_employees = icp.min_employees.map(|n| n.to_string()).unwrap_or_else(|| "Any".into()),
        max_employees = icp.max_employees.map(|n| n.to_string()).unwrap_or_else(|| "Any".into()),
        name = candidate.full_name,
        title = candidate.title,
        company = candidate.organization.name,
        industry = if candidate.organization.industry.is_empty() { "Unknown" } else { candidate.organization.industry.as_str() },
        employees = employees,
        location = candidate.location.display(),
        email = candidate.email.as_deref().unwrap_or("Not available"),
        linkedin = linkedin_line(signal),
    )
}

/// Scores candidates with the reasoning service, falling back to rules
pub struct Qualifier {
    reasoner: Arc<dyn ReasoningService>,
    probe: Option<Arc<dyn ProfileProbe>>,
    weights: FallbackWeights,
    match_policy: MatchPolicy,
}

impl Qualifier {
    pub fn new(
        reasoner: Arc<dyn ReasoningService>,
        probe: Option<Arc<dyn ProfileProbe>>,
        weights: FallbackWeights,
        match_policy: MatchPolicy,
    ) -> Self {
        Self { reasoner, probe, weights, match_policy }
    }

    async fn linkedin_signal(&self, candidate: &CandidateRecord) -> LinkedInSignal {
        let Some(url) = candidate.linkedin() else {
            return LinkedInSignal::not_provided();
        };

        if !is_valid_profile_url(url) {
            return LinkedInSignal { status: ProfileVerification::Unverified, comparison: None };
        }

        let Some(probe) = &self.probe else {
            return LinkedInSignal { status: ProfileVerification::Unknown, comparison: None };
        };

        let outcome = probe.probe(url).await;
        let comparison = outcome
            .snapshot
            .as_ref()
            .and_then(|snapshot| compare_profile(candidate, snapshot, self.match_policy));

        LinkedInSignal { status: outcome.status, comparison }
    }

    /// Always yields a result; reasoning failures degrade to the rule-based score
    pub async fn qualify(&self, candidate: &CandidateRecord, icp: &IcpProfile) -> QualificationResult {
        let signal = self.linkedin_signal(candidate).await;
        let prompt = build_prompt(candidate, icp, &signal);

        let verdict = match self.reasoner.complete(SYSTEM_PROMPT, &prompt).await {
            Ok(content) => parse_verdict(&content, &signal).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match verdict {
            Ok(result) => result,
            Err(error) => {
                tracing::warn!(candidate_id = %candidate.id, error = %error, "Qualification degraded to rule-based scoring");
                fallback_score(candidate, icp, &signal, &self.weights)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FitLabel;

    fn signal() -> LinkedInSignal {
        LinkedInSignal { status: ProfileVerification::Verified, comparison: None }
    }

    #[test]
    fn test_parse_verdict_recomputes_label() {
        let result = parse_verdict(r#"{"score": 85, "label": "maybe", "reason": "Strong fit", "tags": ["cto"]}"#, &signal()).unwrap();
        assert_eq!(result.score, 85);
        assert_eq!(result.label, FitLabel::Good);
        assert_eq!(result.source, ScoreSource::Model);
        assert!(result.linkedin_verified);
    }

    #[test]
    fn test_parse_verdict_clamps_score() {
        let result = parse_verdict(r#"{"score": 150, "reason": "x"}"#, &signal()).unwrap();
        assert_eq!(result.score, 100);
        let result = parse_verdict(r#"{"score": -20}"#, &signal()).unwrap();
        assert_eq!(result.score, 0);
        assert_eq!(result.label, FitLabel::Bad);
        assert_eq!(result.reason, DEFAULT_REASON);
    }

    #[test]
    fn test_parse_verdict_strips_code_fences() {
        let content = "```json\n{\"score\": 60, \"reason\": \"ok\"}\n```";
        assert_eq!(parse_verdict(content, &signal()).unwrap().score, 60);
    }

    #[test]
    fn test_parse_verdict_rejects_missing_score() {
        assert_eq!(parse_verdict(r#"{"reason": "no score"}"#, &signal()), Err(VerdictError::BadScore));
        assert!(matches!(parse_verdict("not json", &signal()), Err(VerdictError::Json(_))));
        assert!(matches!(parse_verdict(r#"{"score": "85"}"#, &signal()), Err(VerdictError::Json(_))));
    }

    #[test]
    fn test_tags_are_trimmed_deduped_and_capped() {
        let content = r#"{"score": 70, "tags": [" a ", "a", "", "b", "c", "d", "e", "f"]}"#;
        let result = parse_verdict(content, &signal()).unwrap();
        assert_eq!(result.tags, vec!["a", "b", "c", "d", "e"]);
    }

    struct Unreachable;

    #[async_trait::async_trait]
    impl ReasoningService for Unreachable {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, crate::services::ReasoningError> {
            Err(crate::services::ReasoningError::Api { status: 503, message: "down".into() })
        }
    }

    fn candidate_with(linkedin_url: Option<&str>) -> CandidateRecord {
        CandidateRecord {
            id: "1".into(),
            provider: crate::models::ProviderKind::Pdl,
            full_name: "Lee Park".into(),
            first_name: "Lee".into(),
            last_name: "Park".into(),
            title: "CFO".into(),
            organization: Default::default(),
            location: Default::default(),
            linkedin_url: linkedin_url.map(str::to_string),
            email: None,
            email_status: None,
            phone: None,
            phone_numbers: vec![],
            raw: None,
        }
    }

    #[tokio::test]
    async fn test_malformed_url_is_not_credited_without_probe() {
        let qualifier = Qualifier::new(Arc::new(Unreachable), None, FallbackWeights::default(), MatchPolicy::default());
        let icp = IcpProfile::default();

        let malformed = qualifier
            .qualify(&candidate_with(Some("https://linkedin.com/company/acme")), &icp)
            .await;
        assert!(!malformed.linkedin_verified);
        assert!(malformed.tags.contains(&"no-linkedin".to_string()));

        let well_formed = qualifier
            .qualify(&candidate_with(Some("https://www.linkedin.com/in/leepark")), &icp)
            .await;
        assert!(well_formed.linkedin_verified);
        assert_eq!(well_formed.score, malformed.score + 15);
    }

    #[test]
    fn test_prompt_uses_any_for_missing_bounds() {
        let icp = IcpProfile { description: "Fintech buyers".into(), ..Default::default() };
        let candidate = crate::models::CandidateRecord {
            id: "1".into(),
            provider: crate::models::ProviderKind::Pdl,
            full_name: "Lee Park".into(),
            first_name: "Lee".into(),
            last_name: "Park".into(),
            title: "CFO".into(),
            organization: Default::default(),
            location: Default::default(),
            linkedin_url: None,
            email: None,
            email_status: None,
            phone: None,
            phone_numbers: vec![],
            raw: None,
        };
        let prompt = build_prompt(&candidate, &icp, &LinkedInSignal::not_provided());
        assert!(prompt.contains("Company size: Any to Any employees"));
        assert!(prompt.contains("Target industries: Any"));
        assert!(prompt.contains("NOT PROVIDED"));
    }
}
