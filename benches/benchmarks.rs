//! Performance benchmarks for gsd-council.
//!
//! This module contains benchmarks for:
//! - Plan parsing with growing task counts
//! - Structural verification of parsed plans
//! - Consensus scoring over many raters
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gsd_council::workflow::{parse_plan, CouncilResponse, RaterRanking, Verifier};

// ============================================================================
// Mock Data Fixtures
// ============================================================================

mod fixtures {
    use super::*;

    /// Generate a plan document with `num_tasks` task blocks.
    pub fn generate_plan(num_tasks: usize) -> String {
        let mut plan = String::from("---\nphase: 01-bench\nname: Bench Plan\n---\n\n");
        plan.push_str("## Objective\nExercise the parser on a large plan.\n\n");
        plan.push_str("## Context Files\n- src/lib.rs\n- src/main.rs\n\n");

        for i in 0..num_tasks {
            plan.push_str(&format!(
                "<task type=\"auto\">\n  <name>Task {i}</name>\n  <files>src/mod_{i}.rs, src/lib.rs</files>\n  <action>Implement module {i}</action>\n  <verify>cargo test mod_{i}</verify>\n  <done>module {i} works</done>\n</task>\n\n"
            ));
        }

        plan.push_str("## Success Criteria\n- [ ] All modules build\n- [ ] Tests pass\n");
        plan
    }

    /// Generate rankings where every third rater disagrees.
    pub fn generate_rankings(num_raters: usize) -> Vec<RaterRanking> {
        (0..num_raters)
            .map(|i| {
                let first = if i % 3 == 0 { "Response B" } else { "Response A" };
                let ranking = vec![first.to_string(), "Response C".to_string()];
                RaterRanking::new(format!("rater-{i}"), ranking)
            })
            .collect()
    }

    pub fn responses() -> Vec<CouncilResponse> {
        vec![CouncilResponse { model: "m1".to_string(), response: "answer".to_string() }]
    }
}

// ============================================================================
// Plan Benchmarks
// ============================================================================

fn bench_plan_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan/parse");

    for num_tasks in [1, 4, 20, 100].iter() {
        let plan = fixtures::generate_plan(*num_tasks);

        group.throughput(Throughput::Bytes(plan.len() as u64));
        group.bench_with_input(BenchmarkId::new("tasks", num_tasks), &plan, |b, plan| {
            b.iter(|| black_box(parse_plan(black_box(plan))));
        });
    }

    group.finish();
}

fn bench_plan_verification(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan/verify");
    let verifier = Verifier::default();

    for num_tasks in [1, 4, 20, 100].iter() {
        let plan = parse_plan(&fixtures::generate_plan(*num_tasks));

        group.bench_with_input(BenchmarkId::new("tasks", num_tasks), &plan, |b, plan| {
            b.iter(|| black_box(verifier.verify_plan_structure(black_box(plan))));
        });
    }

    group.finish();
}

// ============================================================================
// Scoring Benchmarks
// ============================================================================

fn bench_consensus(c: &mut Criterion) {
    let mut group = c.benchmark_group("scoring/consensus");
    let verifier = Verifier::default();
    let responses = fixtures::responses();

    for num_raters in [3, 10, 100].iter() {
        let rankings = fixtures::generate_rankings(*num_raters);

        group.bench_with_input(BenchmarkId::new("raters", num_raters), &rankings, |b, rankings| {
            b.iter(|| black_box(verifier.verify_council_consensus(&responses, black_box(rankings))));
        });
    }

    group.finish();
}

criterion_group!(plan_benches, bench_plan_parsing, bench_plan_verification,);

criterion_group!(scoring_benches, bench_consensus,);

criterion_main!(plan_benches, scoring_benches,);
