//! Library integration tests: parse, verify, score and persist across modules.

use std::fs;

use gsd_council::core::{Config, VerifierConfig};
use gsd_council::workflow::{
    execution_prompt, parse_plan, ContextManager, CouncilResponse, FileOutcome, PlanParser,
    QualityTier, RaterRanking, StateStore, TagPlanParser, VerificationStatus, Verifier,
    NO_MORE_TASKS,
};
use gsd_council::WorkflowError;
use tempfile::TempDir;

const PLAN: &str = r#"---
phase: 03-search
name: Search Index
---

# Objective
Index documents for full-text search.

## Context
@src/index.rs
@docs/search.md

<task type="auto">
  <name>Tokenizer</name>
  <files>src/tokenize.rs</files>
  <action>Split text on unicode word boundaries</action>
  <verify>cargo test tokenize</verify>
  <done>tokenizer handles unicode input</done>
</task>

<task type="checkpoint">
  <name>Inverted index</name>
  <files>src/index.rs</files>
  <action>Map terms to posting lists</action>
  <verify>cargo test index</verify>
  <done>queries return matching documents</done>
</task>

<success_criteria>
- Queries under 10ms
- Index survives restart
</success_criteria>
"#;

// ============================================================================
// Parse -> Verify
// ============================================================================

#[test]
fn test_parse_then_verify_passes() {
    let plan = parse_plan(PLAN);

    assert_eq!(plan.name, "Search Index");
    assert_eq!(plan.phase.as_deref(), Some("03-search"));
    assert_eq!(plan.objective, "Index documents for full-text search.");
    assert_eq!(plan.context_files, vec!["src/index.rs", "docs/search.md"]);
    assert_eq!(plan.success_criteria, vec!["Queries under 10ms", "Index survives restart"]);
    assert_eq!(plan.tasks[1].task_type, "checkpoint");

    let report = Verifier::default().verify_plan_structure(&plan);
    assert_eq!(report.overall_status, VerificationStatus::Passed);
    assert_eq!(report.failed_count(), 0);
    assert_eq!(report.passed_count(), report.results.len());
}

#[test]
fn test_trait_parser_matches_free_function() {
    assert_eq!(TagPlanParser::new().parse(PLAN), parse_plan(PLAN));
}

#[test]
fn test_execution_round() {
    let plan = parse_plan(PLAN);
    let verifier = Verifier::new(VerifierConfig::default());

    let prompt = execution_prompt(&plan, 0);
    assert!(prompt.contains("### Current Task: Tokenizer"));
    assert_eq!(execution_prompt(&plan, plan.tasks.len()), NO_MORE_TASKS);

    let response = "The tokenizer now handles unicode input, split on word boundaries with tests.";
    let result = verifier.verify_execution_response(&plan.tasks[0], response);
    assert_eq!(result.status, VerificationStatus::Passed);
}

#[test]
fn test_council_round() {
    let responses: Vec<CouncilResponse> = serde_json::from_str(
        r#"[{"model": "m1", "response": "plan one"}, {"model": "m2", "response": "plan two"}]"#,
    )
    .unwrap();
    let rankings: Vec<RaterRanking> = serde_json::from_str(
        r#"[
            {"model": "m1", "parsed_ranking": ["Response B", "Response A"]},
            {"model": "m2", "parsed_ranking": ["Response B", "Response A"]},
            {"model": "m3", "parsed_ranking": null}
        ]"#,
    )
    .unwrap();

    let result = Verifier::default().verify_council_consensus(&responses, &rankings);
    assert_eq!(result.status, VerificationStatus::Passed);
    assert_eq!(result.details["top_choice"], "Response B");
    assert_eq!(result.details["total_votes"], 2);
}

// ============================================================================
// Context & State
// ============================================================================

#[test]
fn test_session_state_carries_over() {
    let temp = TempDir::new().unwrap();
    let config = Config::default();

    {
        let mut manager = ContextManager::new(temp.path(), &config).unwrap();
        let store = manager.store_mut();
        store.update_position("Phase 3, task 1").unwrap();
        for i in 1..=7 {
            store.add_decision(format!("decision {i}")).unwrap();
        }
    }

    let state_path = temp.path().join(".planning").join("STATE.md");
    assert!(state_path.exists());

    fs::create_dir_all(temp.path().join("src")).unwrap();
    fs::write(temp.path().join("src/index.rs"), "pub struct Index;\n").unwrap();

    let manager = ContextManager::new(temp.path(), &config).unwrap();
    let context = manager.minimal_context(
        "Build the inverted index",
        &["src/index.rs".to_string(), "src/gone.rs".to_string()],
    );

    assert_eq!(context.position, "Phase 3, task 1");
    assert_eq!(context.decisions.len(), 5);
    assert_eq!(context.decisions[0], "decision 3");
    assert_eq!(context.skipped_count(), 1);
    assert!(matches!(context.files[0].outcome, FileOutcome::Loaded { truncated: false, .. }));
}

#[test]
fn test_usage_drives_checkpoint() {
    let temp = TempDir::new().unwrap();
    let mut manager = ContextManager::new(temp.path(), &Config::default()).unwrap();

    manager.update_context_usage(60_000);
    assert_eq!(manager.quality_status().quality_tier, QualityTier::Peak);
    assert!(!manager.quality_status().should_checkpoint);

    manager.update_context_usage(150_000);
    let status = manager.quality_status();
    assert_eq!(status.quality_tier, QualityTier::Poor);
    assert!(status.should_checkpoint);
}

#[test]
fn test_zero_budget_rejected() {
    let temp = TempDir::new().unwrap();
    let mut config = Config::default();
    config.context.max_tokens = 0;

    let err = ContextManager::new(temp.path(), &config).unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidBudget(0)));
}

#[test]
fn test_hand_edited_state_loads() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("STATE.md");
    fs::write(
        &path,
        "# Project State\n\n## Position\nReviewing\n\n## Notes\nignored\n\n## Concerns\n* Flaky CI\n",
    )
    .unwrap();

    let mut store = StateStore::open(&path).unwrap();
    assert_eq!(store.state().current_position, "Reviewing");
    assert_eq!(store.state().concerns, vec!["Flaky CI"]);

    store.add_blocker("Disk full").unwrap();
    let written = fs::read_to_string(&path).unwrap();
    assert!(written.contains("## Blockers\n- Disk full"));
    assert!(written.contains("## Concerns\n- Flaky CI"));
    assert!(!written.contains("ignored"));
}
