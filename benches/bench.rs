// Criterion benchmarks for Leadflow

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use leadflow::core::{fallback_score, FallbackWeights, LinkedInSignal, Ranker};
use leadflow::models::{
    CandidateRecord, IcpProfile, Location, Organization, PipelineLimits, ProfileVerification, ProviderKind,
    QualificationResult, QualifiedLead, ScoreSource,
};
use leadflow::services::pdl::build_sql;
use leadflow::models::SearchFilter;

fn create_candidate(id: usize) -> CandidateRecord {
    CandidateRecord {
        id: format!("lead-{}", id),
        provider: ProviderKind::Apollo,
        full_name: format!("Lead {}", id),
        first_name: "Lead".to_string(),
        last_name: id.to_string(),
        title: if id % 3 == 0 { "VP Sales" } else { "Account Executive" }.to_string(),
        organization: Organization {
            name: format!("Company {}", id),
            website: String::new(),
            industry: if id % 2 == 0 { "Computer Software" } else { "Retail" }.to_string(),
            employee_count: Some(50 + (id % 500) as u64),
        },
        location: Location {
            city: "Chicago".to_string(),
            region: "Illinois".to_string(),
            country: "United States".to_string(),
        },
        linkedin_url: (id % 4 != 0).then(|| format!("https://www.linkedin.com/in/lead-{}", id)),
        email: None,
        email_status: None,
        phone: None,
        phone_numbers: vec![],
        raw: None,
    }
}

fn create_icp() -> IcpProfile {
    IcpProfile {
        description: "Sales leaders at software companies".to_string(),
        industries: vec!["software".to_string(), "saas".to_string()],
        locations: vec!["United States".to_string()],
        role_titles: vec!["VP Sales".to_string(), "Head of Sales".to_string()],
        min_employees: Some(50),
        max_employees: Some(1000),
    }
}

fn create_leads(count: usize) -> Vec<QualifiedLead> {
    (0..count)
        .map(|i| {
            let score = ((i * 37) % 101) as u8;
            QualifiedLead {
                candidate: create_candidate(i),
                qualification: QualificationResult {
                    score,
                    label: leadflow::core::label_for_score(score),
                    reason: String::new(),
                    tags: vec![],
                    source: ScoreSource::Model,
                    linkedin_verified: true,
                    data_accuracy: None,
                    discrepancies: vec![],
                },
                already_saved: false,
            }
        })
        .collect()
}

fn bench_ranker(c: &mut Criterion) {
    let ranker = Ranker::default();
    let mut group = c.benchmark_group("ranker_select");

    for size in [100, 500, 1000].iter() {
        let leads = create_leads(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &leads, |b, leads| {
            b.iter(|| {
                ranker.select(
                    black_box(leads.clone()),
                    black_box(PipelineLimits { top_n: 300, max_considered: 1000 }),
                )
            });
        });
    }

    group.finish();
}

fn bench_fallback_score(c: &mut Criterion) {
    let icp = create_icp();
    let weights = FallbackWeights::default();
    let candidate = create_candidate(3);
    let signal = LinkedInSignal { status: ProfileVerification::Verified, comparison: None };

    c.bench_function("fallback_score", |b| {
        b.iter(|| fallback_score(black_box(&candidate), black_box(&icp), black_box(&signal), &weights));
    });
}

fn bench_build_sql(c: &mut Criterion) {
    let filter = SearchFilter {
        job_titles: vec!["VP Sales".to_string(), "Head of Sales".to_string(), "CRO".to_string()],
        locations: vec!["Chicago".to_string(), "Illinois".to_string()],
        industries: vec!["computer software".to_string()],
        ..Default::default()
    };

    c.bench_function("pdl_build_sql", |b| {
        b.iter(|| build_sql(black_box(&filter)));
    });
}

criterion_group!(benches, bench_ranker, bench_fallback_score, bench_build_sql);
criterion_main!(benches);
