//! GSD plan and verification engine.
//!
//! Plans are markdown documents with YAML-ish frontmatter, an objective and
//! `<task>` blocks. The engine parses them, checks their structure, scores
//! execution responses and council agreement, tracks context-window usage,
//! and persists project state between sessions.
//!
//! ## Documents
//!
//! - `PLAN.md` - Objective, context files, tasks, success criteria
//! - `STATE.md` - Current position, decisions, blockers, concerns

mod context;
mod documents;
mod parser;
mod prompts;
mod state;
mod verifier;

pub use context::{
    ContextFile, ContextManager, ContextWindow, FileOutcome, MinimalContext, QualityStatus,
    QualityTier, CHECKPOINT_PERCENT, TRUNCATION_MARKER,
};
pub use documents::{GsdPlan, GsdTask, ProjectState, DEFAULT_PLAN_NAME};
pub use parser::{parse_plan, PlanParser, TagPlanParser, DEFAULT_TASK_TYPE};
pub use prompts::{
    execution_prompt, planning_prompt, verification_prompt, AgentTemplates, EXECUTOR_AGENT,
    NO_MORE_TASKS, PLANNER_AGENT, VERIFIER_AGENT,
};
pub use state::StateStore;
pub use verifier::{
    classify_overall, format_ratio, CouncilResponse, RaterRanking, VerificationReport,
    VerificationResult, VerificationStatus, Verifier,
};
