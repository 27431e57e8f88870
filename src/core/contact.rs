//! Contact field helpers: locked-email detection, phone selection,
//! name splitting and merging enrichment results into candidates.

use crate::models::{CandidateRecord, EnrichmentResult, PhoneNumber};

/// Placeholder values providers return instead of a revealed address
const LOCKED_EMAIL_MARKERS: &[&str] = &["email_not_unlocked", "not_unlocked", "@domain.com", "unavailable"];

/// Phone types in preference order
const PHONE_TYPE_PRIORITY: &[&str] = &[
    "mobile",
    "current_mobile",
    "work_mobile",
    "work_hq",
    "current_work_direct",
    "work_direct",
    "other",
];

/// True when an email is missing or a provider "locked" sentinel
pub fn needs_email_unlock(email: Option<&str>) -> bool {
    let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) else {
        return true;
    };
    let lowered = email.to_lowercase();
    LOCKED_EMAIL_MARKERS.iter().any(|marker| lowered.contains(marker))
}

fn phone_value(phone: &PhoneNumber) -> Option<&str> {
    [&phone.sanitized_number, &phone.raw_number, &phone.number]
        .into_iter()
        .filter_map(|v| v.as_deref())
        .map(str::trim)
        .find(|v| !v.is_empty())
}

/// Best phone from a provider list, by type priority, then first usable entry
pub fn best_phone(phones: &[PhoneNumber]) -> Option<String> {
    for wanted in PHONE_TYPE_PRIORITY {
        let hit = phones.iter().find(|p| {
            p.phone_type
                .as_deref()
                .map(|t| t.to_lowercase().contains(wanted))
                .unwrap_or(false)
        });
        if let Some(value) = hit.and_then(phone_value) {
            return Some(value.to_string());
        }
    }

    phones.iter().find_map(phone_value).map(str::to_string)
}

/// Split a full name into (first, rest)
pub fn split_name(full_name: &str) -> (String, String) {
    let mut parts = full_name.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let rest = parts.collect::<Vec<_>>().join(" ");
    (first, rest)
}

/// Fold an enrichment into a candidate.
///
/// A non-empty enriched email overwrites email and status. The phone is the
/// best search-time number, then any phone already on the record, then the
/// enriched one. Locked email sentinels never survive the merge.
pub fn merge_enrichment(candidate: &mut CandidateRecord, enrichment: Option<&EnrichmentResult>) {
    if let Some(enriched) = enrichment {
        if let Some(email) = enriched.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            candidate.email = Some(email.to_string());
            candidate.email_status = Some(enriched.email_status.clone());
        }
    }

    let existing = candidate
        .phone
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string);
    let enriched_phone = enrichment.and_then(|e| {
        e.best_phone
            .clone()
            .filter(|p| !p.trim().is_empty())
            .or_else(|| best_phone(&e.phone_numbers))
    });

    candidate.phone = best_phone(&candidate.phone_numbers)
        .or(existing)
        .or(enriched_phone);

    if needs_email_unlock(candidate.email.as_deref()) {
        candidate.email = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Location, Organization, ProviderKind};

    fn phone(kind: &str, sanitized: Option<&str>, raw: Option<&str>) -> PhoneNumber {
        PhoneNumber {
            raw_number: raw.map(String::from),
            sanitized_number: sanitized.map(String::from),
            number: None,
            phone_type: Some(kind.to_string()),
        }
    }

    fn candidate() -> CandidateRecord {
        CandidateRecord {
            id: "p1".into(),
            provider: ProviderKind::Apollo,
            full_name: "Ada Lovelace".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            title: "CTO".into(),
            organization: Organization { name: "Analytical".into(), ..Default::default() },
            location: Location::default(),
            linkedin_url: None,
            email: Some("email_not_unlocked@domain.com".into()),
            email_status: Some("unavailable".into()),
            phone: None,
            phone_numbers: vec![],
            raw: None,
        }
    }

    #[test]
    fn test_needs_email_unlock() {
        assert!(needs_email_unlock(None));
        assert!(needs_email_unlock(Some("  ")));
        assert!(needs_email_unlock(Some("email_not_unlocked@domain.com")));
        assert!(needs_email_unlock(Some("Unavailable")));
        assert!(!needs_email_unlock(Some("ada@analytical.io")));
    }

    #[test]
    fn test_best_phone_prefers_mobile() {
        let phones = vec![
            phone("work_hq", Some("+1 555 0100"), None),
            phone("Mobile", None, Some("(555) 0199")),
        ];
        assert_eq!(best_phone(&phones).as_deref(), Some("(555) 0199"));
    }

    #[test]
    fn test_best_phone_falls_back_to_first_usable() {
        let phones = vec![
            phone("fax", None, None),
            phone("landline", Some("+44 20 7946 0000"), None),
        ];
        assert_eq!(best_phone(&phones).as_deref(), Some("+44 20 7946 0000"));
        assert_eq!(best_phone(&[]), None);
    }

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("Jean Claude Van Damme"), ("Jean".into(), "Claude Van Damme".into()));
        assert_eq!(split_name("Cher"), ("Cher".into(), String::new()));
        assert_eq!(split_name(""), (String::new(), String::new()));
    }

    #[test]
    fn test_merge_overwrites_locked_email() {
        let mut c = candidate();
        let enrichment = EnrichmentResult {
            email: Some("ada@analytical.io".into()),
            email_status: "verified".into(),
            phone_numbers: vec![],
            best_phone: Some("+1 555 0142".into()),
        };
        merge_enrichment(&mut c, Some(&enrichment));
        assert_eq!(c.email.as_deref(), Some("ada@analytical.io"));
        assert_eq!(c.email_status.as_deref(), Some("verified"));
        assert_eq!(c.phone.as_deref(), Some("+1 555 0142"));
    }

    #[test]
    fn test_merge_without_enrichment_clears_sentinel() {
        let mut c = candidate();
        merge_enrichment(&mut c, None);
        assert_eq!(c.email, None);
        assert_eq!(c.phone, None);
    }

    #[test]
    fn test_search_phone_wins_over_enriched_phone() {
        let mut c = candidate();
        c.phone_numbers = vec![phone("mobile", Some("+1 555 0001"), None)];
        let enrichment = EnrichmentResult { best_phone: Some("+1 555 0002".into()), ..Default::default() };
        merge_enrichment(&mut c, Some(&enrichment));
        assert_eq!(c.phone.as_deref(), Some("+1 555 0001"));
    }
}
