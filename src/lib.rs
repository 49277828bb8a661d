#![allow(clippy::format_push_string)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]

//! # GSD Council
//!
//! Plan and verification engine for multi-model council workflows.
//!
//! A council of models drafts GSD ("Get Shit Done") plans, executes their
//! atomic tasks and rates each other's work. This crate provides the
//! plumbing around that loop.
//!
//! ## Features
//!
//! - **Plan Parsing**: Markdown plans with frontmatter and `<task>` blocks
//! - **Structural Checks**: Objective, task count and per-task field checks
//! - **Response Scoring**: Keyword heuristic against a task's done criteria
//! - **Consensus**: Agreement score over raters' first choices
//! - **Context Tracking**: Token usage, quality tiers and checkpoint signals
//! - **Project State**: `STATE.md` persisted across sessions
//!
//! ## Quick Start
//!
//! ```bash
//! # Check a plan
//! gsd-council verify .planning/PLAN.md
//!
//! # Record a decision
//! gsd-council state decide "Use an LRU cache"
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::redundant_closure_for_method_calls)]

pub mod core;
pub mod workflow;

// Re-export commonly used types
pub use core::{Config, WorkflowError, WorkflowResult};
pub use workflow::{
    parse_plan, ContextManager, GsdPlan, GsdTask, ProjectState, StateStore, VerificationReport,
    VerificationResult, VerificationStatus, Verifier,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "gsd-council";
