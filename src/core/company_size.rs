use crate::models::{CompanySize, CompanySizeRange};

/// Upper bound Apollo expects for an open-ended range
pub const APOLLO_UNBOUNDED_MAX: u64 = 10_000_000_000;

/// Labelled bands shared by both providers
const BANDS: &[(&str, u64, Option<u64>)] = &[
    ("1-10", 1, Some(10)),
    ("11-50", 11, Some(50)),
    ("51-200", 51, Some(200)),
    ("201-500", 201, Some(500)),
    ("501-1000", 501, Some(1000)),
    ("1001-5000", 1001, Some(5000)),
    ("5001-10000", 5001, Some(10000)),
    ("10000+", 10001, None),
];

/// Parse a size filter value. Anything unreadable is kept verbatim.
pub fn parse_size(value: &str) -> CompanySize {
    let value = value.trim();
    match parse_range(value) {
        Some(range) => CompanySize::Range(range),
        None => CompanySize::Raw(value.to_string()),
    }
}

/// Parse a labelled band ("11-50", "10000+") or a numeric "min,max" / "min-max" pair.
///
/// Returns `None` for anything else.
pub fn parse_range(value: &str) -> Option<CompanySizeRange> {
    let value = value.trim();
    if let Some(&(_, min, max)) = BANDS.iter().find(|(label, _, _)| *label == value) {
        return Some(CompanySizeRange::new(min, max));
    }

    let (min, max) = value.split_once(',').or_else(|| value.split_once('-'))?;
    let min: u64 = min.trim().parse().ok()?;
    let max: u64 = max.trim().parse().ok()?;
    if max < min {
        return None;
    }

    let max = if max >= APOLLO_UNBOUNDED_MAX { None } else { Some(max) };
    Some(CompanySizeRange::new(min, max))
}

/// Apollo's `organization_num_employees_ranges` entry
pub fn to_apollo_range(size: &CompanySize) -> String {
    match size {
        CompanySize::Range(range) => {
            format!("{},{}", range.min, range.max.unwrap_or(APOLLO_UNBOUNDED_MAX))
        }
        CompanySize::Raw(raw) => raw.clone(),
    }
}

/// PDL's `job_company_size` band
pub fn to_pdl_band(size: &CompanySize) -> String {
    let range = match size {
        CompanySize::Range(range) => range,
        CompanySize::Raw(raw) => return raw.clone(),
    };

    if let Some((label, _, _)) = BANDS
        .iter()
        .find(|(_, min, max)| *min == range.min && *max == range.max)
    {
        return label.to_string();
    }
    match range.max {
        Some(max) => format!("{}-{}", range.min, max),
        None => format!("{}+", range.min),
    }
}

/// Display band for a head count
pub fn band_for_employees(employees: u64) -> &'static str {
    match employees {
        0..=10 => "1-10",
        11..=50 => "11-50",
        51..=200 => "51-200",
        201..=500 => "201-500",
        501..=1000 => "501-1000",
        1001..=5000 => "1001-5000",
        5001..=10000 => "5001-10000",
        _ => "10000+",
    }
}

/// Head count estimate from a band string: its first number
pub fn employees_from_band(band: &str) -> Option<u64> {
    let digits: String = band
        .trim()
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
