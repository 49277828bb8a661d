//! Plan and execution verification.
//!
//! Three kinds of checks produce [`VerificationResult`]s:
//!
//! - structural checks over a parsed [`GsdPlan`] (objective, tasks, task count,
//!   per-task fields), collected into a [`VerificationReport`];
//! - a keyword heuristic scoring a free-text execution response against a
//!   task's done criteria;
//! - an agreement score over raters' first choices.
//!
//! A failed check is data, not an error. None of these operations return
//! `Result`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::documents::{GsdPlan, GsdTask};
use crate::core::VerifierConfig;

/// Status of a verification check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Passed,
    Failed,
    Skipped,
    Partial,
}

impl VerificationStatus {
    /// Lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Partial => "partial",
        }
    }

    /// Emoji used in markdown reports.
    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Passed => "✅",
            Self::Failed => "❌",
            Self::Skipped => "⏭️",
            Self::Partial => "⚠️",
        }
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a set of check statuses into an overall status.
///
/// No checks is `skipped`, all passed is `passed`, all failed is `failed`, and
/// anything else is `partial`. One failure among many passes is still
/// `partial`.
pub fn classify_overall<I>(statuses: I) -> VerificationStatus
where
    I: IntoIterator<Item = VerificationStatus>,
{
    let mut seen_any = false;
    let mut all_passed = true;
    let mut all_failed = true;

    for status in statuses {
        seen_any = true;
        all_passed &= status == VerificationStatus::Passed;
        all_failed &= status == VerificationStatus::Failed;
    }

    match (seen_any, all_passed, all_failed) {
        (false, _, _) => VerificationStatus::Skipped,
        (true, true, _) => VerificationStatus::Passed,
        (true, _, true) => VerificationStatus::Failed,
        _ => VerificationStatus::Partial,
    }
}

/// Result of a single verification check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Check name
    pub name: String,

    /// Outcome
    pub status: VerificationStatus,

    /// Human-readable explanation, may be empty
    #[serde(default)]
    pub message: String,

    /// Supporting values (counts, ratios, choices)
    #[serde(default)]
    pub details: BTreeMap<String, Value>,
}

impl VerificationResult {
    /// Create a result with no message or details.
    pub fn new(name: impl Into<String>, status: VerificationStatus) -> Self {
        Self { name: name.into(), status, message: String::new(), details: BTreeMap::new() }
    }

    /// Create a passed result.
    pub fn passed(name: impl Into<String>) -> Self {
        Self::new(name, VerificationStatus::Passed)
    }

    /// Create a failed result.
    pub fn failed(name: impl Into<String>) -> Self {
        Self::new(name, VerificationStatus::Failed)
    }

    /// Create a partial result.
    pub fn partial(name: impl Into<String>) -> Self {
        Self::new(name, VerificationStatus::Partial)
    }

    /// Set the message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add a detail entry.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Look up a detail entry.
    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.get(key)
    }
}

/// Verification report for a plan or an execution run.
///
/// Owned by the caller that built it; not shared between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Plan the checks ran against
    pub plan_name: String,

    /// Check results, in the order they ran
    pub results: Vec<VerificationResult>,

    /// Aggregate status, see [`classify_overall`]
    pub overall_status: VerificationStatus,
}

impl VerificationReport {
    /// Create an empty report.
    pub fn new(plan_name: impl Into<String>) -> Self {
        Self {
            plan_name: plan_name.into(),
            results: Vec::new(),
            overall_status: VerificationStatus::Skipped,
        }
    }

    /// Append a result.
    pub fn push(&mut self, result: VerificationResult) {
        self.results.push(result);
    }

    /// Count of passed checks.
    pub fn passed_count(&self) -> usize {
        self.count(VerificationStatus::Passed)
    }

    /// Count of failed checks.
    pub fn failed_count(&self) -> usize {
        self.count(VerificationStatus::Failed)
    }

    fn count(&self, status: VerificationStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    /// Recompute and store the overall status from the results.
    pub fn calculate_overall_status(&mut self) -> VerificationStatus {
        self.overall_status = classify_overall(self.results.iter().map(|r| r.status));
        self.overall_status
    }

    /// Convert report to markdown format.
    pub fn to_markdown(&self) -> String {
        let mut md = format!("# Verification Report: {}\n", self.plan_name);

        md.push_str(&format!(
            "\n**Overall Status:** {} {}\n",
            self.overall_status.emoji(),
            self.overall_status.as_str().to_uppercase()
        ));
        md.push_str(&format!(
            "\n**Summary:** {} passed, {} failed\n",
            self.passed_count(),
            self.failed_count()
        ));

        md.push_str("\n## Results\n\n");
        for result in &self.results {
            md.push_str(&format!("### {} {}\n", result.status.emoji(), result.name));
            if !result.message.is_empty() {
                md.push_str(&format!("\n{}\n", result.message));
            }
            if !result.details.is_empty() {
                md.push_str("\n**Details:**\n");
                for (key, value) in &result.details {
                    md.push_str(&format!("- {key}: {}\n", display_value(value)));
                }
            }
            md.push('\n');
        }

        md
    }
}

/// One council member's answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouncilResponse {
    /// Model or member identifier
    #[serde(default)]
    pub model: String,

    /// Response text
    #[serde(default)]
    pub response: String,
}

/// One rater's ranking of the candidate responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaterRanking {
    /// Rater identifier
    #[serde(default)]
    pub model: String,

    /// Candidate identifiers, most preferred first; absent when unparseable
    #[serde(default)]
    pub parsed_ranking: Option<Vec<String>>,
}

impl RaterRanking {
    /// Create a ranking record.
    pub fn new(model: impl Into<String>, ranking: Vec<String>) -> Self {
        Self { model: model.into(), parsed_ranking: Some(ranking) }
    }

    /// The rater's first choice, if one can be extracted.
    pub fn first_choice(&self) -> Option<&str> {
        self.parsed_ranking
            .as_ref()
            .and_then(|r| r.first())
            .map(|choice| choice.trim())
            .filter(|choice| !choice.is_empty())
    }
}

const CONSENSUS_CHECK: &str = "Council Consensus";

/// Runs structural and semantic checks.
#[derive(Debug, Clone, Default)]
pub struct Verifier {
    config: VerifierConfig,
}

impl Verifier {
    /// Create a verifier with the given thresholds.
    pub fn new(config: VerifierConfig) -> Self {
        Self { config }
    }

    /// Thresholds in use.
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Verify a plan has proper GSD structure.
    ///
    /// "Task Count Optimal" is only checked when the plan has tasks. A plan
    /// with no tasks fails "Has Tasks" and gets no second, partial result
    /// for its count, so an empty plan without an objective is `failed`
    /// rather than `partial`.
    pub fn verify_plan_structure(&self, plan: &GsdPlan) -> VerificationReport {
        let mut report = VerificationReport::new(&plan.name);

        report.push(if plan.objective.trim().is_empty() {
            VerificationResult::failed("Has Objective").with_message("Plan is missing an objective")
        } else {
            VerificationResult::passed("Has Objective").with_message("Plan has a clear objective")
        });

        let task_count = plan.tasks.len();
        if task_count == 0 {
            report.push(
                VerificationResult::failed("Has Tasks").with_message("Plan has no tasks defined"),
            );
        } else {
            report.push(
                VerificationResult::passed("Has Tasks")
                    .with_message(format!("Plan has {task_count} tasks")),
            );
            report.push(self.check_task_count(task_count));
        }

        for (i, task) in plan.tasks.iter().enumerate() {
            for result in verify_task_structure(task, i + 1) {
                report.push(result);
            }
        }

        report.calculate_overall_status();

        tracing::debug!(
            plan = %plan.name,
            checks = report.results.len(),
            status = %report.overall_status,
            "Verified plan structure"
        );

        report
    }

    /// An oversized plan is a warning, never a failure.
    fn check_task_count(&self, task_count: usize) -> VerificationResult {
        let (min, max) = (self.config.min_tasks, self.config.max_tasks);
        let recommended = format!("{min}-{max}");

        if (min..=max).contains(&task_count) {
            VerificationResult::passed("Task Count Optimal")
                .with_message(format!("Plan has {task_count} tasks (optimal: {recommended})"))
        } else {
            VerificationResult::partial("Task Count Optimal")
                .with_message(format!(
                    "Plan has {task_count} tasks (recommended: {recommended})"
                ))
                .with_detail("task_count", task_count)
                .with_detail("recommended", recommended)
        }
    }

    /// Score an execution response against the task's done criteria.
    ///
    /// This is a keyword heuristic: missing keywords make the result `partial`,
    /// never `failed`, because absence of a word does not prove the task failed.
    pub fn verify_execution_response(&self, task: &GsdTask, response: &str) -> VerificationResult {
        let name = format!("Task Execution: {}", task.name);

        if response.trim().chars().count() < self.config.min_response_length {
            return VerificationResult::failed(name)
                .with_message("Response is too short or empty")
                .with_detail("min_length", self.config.min_response_length);
        }

        let done = task.done.to_lowercase();
        let keywords: Vec<&str> = done.split_whitespace().collect();
        if keywords.is_empty() {
            return VerificationResult::passed(name)
                .with_message("Task executed (no specific success criteria to check)");
        }

        let response = response.to_lowercase();
        let matched = keywords.iter().filter(|kw| response.contains(*kw)).count();
        let ratio = matched as f64 / keywords.len() as f64;

        let result = if ratio >= self.config.keyword_match_threshold {
            VerificationResult::passed(name).with_message("Response addresses success criteria")
        } else {
            VerificationResult::partial(name)
                .with_message("Response may not fully address success criteria")
        };

        result
            .with_detail("keyword_match_ratio", format_ratio(ratio))
            .with_detail("keywords_matched", matched)
            .with_detail("keywords_total", keywords.len())
    }

    /// Score how strongly raters agree on their first choice.
    ///
    /// Ties between equally frequent first choices go to the candidate that
    /// appeared first in rating order.
    pub fn verify_council_consensus(
        &self,
        responses: &[CouncilResponse],
        rankings: &[RaterRanking],
    ) -> VerificationResult {
        if responses.is_empty() {
            return VerificationResult::failed(CONSENSUS_CHECK)
                .with_message("No responses to evaluate");
        }

        if rankings.is_empty() {
            return VerificationResult::failed(CONSENSUS_CHECK)
                .with_message("No rankings available");
        }

        let valid: Vec<&RaterRanking> = rankings
            .iter()
            .filter(|r| r.parsed_ranking.as_ref().is_some_and(|p| !p.is_empty()))
            .collect();
        if valid.is_empty() {
            return VerificationResult::partial(CONSENSUS_CHECK)
                .with_message("Rankings could not be parsed - consensus unclear");
        }

        let first_choices: Vec<&str> = valid.iter().filter_map(|r| r.first_choice()).collect();
        let Some((top_choice, votes)) = most_common(&first_choices) else {
            return VerificationResult::partial(CONSENSUS_CHECK)
                .with_message("Could not determine first choices");
        };

        let total = first_choices.len();
        let ratio = votes as f64 / total as f64;
        let agreement = format_ratio(ratio);

        let result = if ratio >= self.config.strong_consensus_threshold {
            VerificationResult::passed(CONSENSUS_CHECK)
                .with_message(format!("Strong consensus: {agreement} agreement on {top_choice}"))
        } else if ratio >= self.config.moderate_consensus_threshold {
            VerificationResult::partial(CONSENSUS_CHECK)
                .with_message(format!("Moderate consensus: {agreement} agreement"))
        } else {
            VerificationResult::failed(CONSENSUS_CHECK)
                .with_message(format!("Weak consensus: {agreement} agreement"))
        };

        tracing::debug!(top_choice, votes, total, status = %result.status, "Scored consensus");

        result
            .with_detail("top_choice", top_choice)
            .with_detail("agreement_ratio", agreement)
            .with_detail("total_votes", total)
    }
}

fn verify_task_structure(task: &GsdTask, task_number: usize) -> Vec<VerificationResult> {
    let check = |label: &str| format!("Task {task_number}: {label}");
    let mut results = Vec::with_capacity(3);

    results.push(if task.name.trim().is_empty() {
        VerificationResult::failed(check("Has Name")).with_message("Task is missing a name")
    } else {
        VerificationResult::passed(check("Has Name"))
    });

    results.push(if task.action.trim().is_empty() {
        VerificationResult::failed(check("Has Action")).with_message("Task is missing an action")
    } else {
        VerificationResult::passed(check("Has Action"))
    });

    // Verification text is recommended, not required.
    results.push(if task.verify.trim().is_empty() {
        VerificationResult::partial(check("Has Verification"))
            .with_message("Task is missing verification criteria (recommended)")
    } else {
        VerificationResult::passed(check("Has Verification"))
    });

    results
}

/// Most frequent item; ties go to the earliest first appearance.
fn most_common<'a>(items: &[&'a str]) -> Option<(&'a str, usize)> {
    let mut counts: Vec<(&'a str, usize)> = Vec::new();
    for &item in items {
        match counts.iter().position(|(candidate, _)| *candidate == item) {
            Some(i) => counts[i].1 += 1,
            None => counts.push((item, 1)),
        }
    }

    counts.into_iter().fold(None, |best, (item, count)| match best {
        Some((_, best_count)) if best_count >= count => best,
        _ => Some((item, count)),
    })
}

/// Format a ratio as a whole percentage, e.g. `0.25` -> `"25%"`.
pub fn format_ratio(ratio: f64) -> String {
    format!("{:.0}%", ratio * 100.0)
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
