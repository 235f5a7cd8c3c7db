// Criterion benchmarks for Job Alerts

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use job_alerts::core::{Matcher, ShardRouter};
use job_alerts::models::{EmploymentType, JobPostingEvent, SearchProfile};
use std::collections::BTreeSet;

const COUNTRIES: [&str; 8] = ["VN", "TH", "SG", "DE", "US", "JP", "IN", "AU"];
const SKILLS: [&str; 6] = ["Go", "Rust", "Java", "Kafka", "Postgres", "React"];

fn create_candidate(id: usize) -> SearchProfile {
    SearchProfile {
        id: id.to_string(),
        user_id: format!("user-{}", id),
        desired_skills: SKILLS
            .iter()
            .skip(id % SKILLS.len())
            .take(1 + id % 3)
            .map(|s| s.to_string())
            .collect(),
        employment_types: if id % 4 == 0 {
            BTreeSet::new()
        } else {
            [EmploymentType::FullTime].into_iter().collect()
        },
        job_titles: if id % 5 == 0 {
            ["engineer".to_string()].into_iter().collect()
        } else {
            BTreeSet::new()
        },
        desired_country: Some(COUNTRIES[id % COUNTRIES.len()].to_string()),
        min_salary: Some(30_000 + (id % 10) as i64 * 5_000),
        max_salary: None,
    }
}

fn create_event() -> JobPostingEvent {
    JobPostingEvent {
        job_id: "bench-job".to_string(),
        title: "Senior Backend Engineer".to_string(),
        skills: ["Go", "Kafka", "Postgres"].iter().map(|s| s.to_string()).collect(),
        employment_types: [EmploymentType::FullTime].into_iter().collect(),
        min_salary: Some(50_000),
        max_salary: Some(80_000),
        currency: Some("USD".to_string()),
        country_code: "VN".to_string(),
        is_active: true,
        posted_at: None,
    }
}

fn bench_region_for(c: &mut Criterion) {
    let router = ShardRouter::default();

    c.bench_function("region_for", |b| {
        b.iter(|| router.region_for(black_box("vn")));
    });
}

fn bench_evaluate(c: &mut Criterion) {
    let matcher = Matcher::default();
    let event = create_event();
    let profile = create_candidate(1);

    c.bench_function("evaluate_single", |b| {
        b.iter(|| matcher.evaluate(black_box(&event), black_box(&profile)));
    });
}

fn bench_evaluate_all(c: &mut Criterion) {
    let matcher = Matcher::default();
    let event = create_event();

    let mut group = c.benchmark_group("evaluate_all");

    for size in [100, 1_000, 10_000].iter() {
        let candidates: Vec<SearchProfile> = (0..*size).map(create_candidate).collect();

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| matcher.evaluate_all(black_box(&event), black_box(candidates.clone())));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_region_for, bench_evaluate, bench_evaluate_all);
criterion_main!(benches);
