//! Error types for the plan/verification engine.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for workflow operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Errors that can occur while loading, tracking, or persisting workflow state.
///
/// Parsing and scoring never produce these: malformed plan text degrades to
/// defaults, and failed checks are reported as `VerificationResult`s.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Context budget must be a positive token count.
    #[error("Invalid context budget: max_tokens must be positive, got {0}")]
    InvalidBudget(u64),

    /// A required file could not be read or written.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration values are out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration could not be rendered.
    #[error("Configuration error: {0}")]
    ConfigRender(#[from] toml::ser::Error),

    /// JSON payload could not be decoded or encoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A state entry was empty once whitespace was collapsed.
    #[error("Cannot record an empty {0}")]
    EmptyEntry(&'static str),

    /// Task index is outside the plan's task list.
    #[error("Task {index} does not exist (plan has {count} tasks)")]
    TaskIndex { index: usize, count: usize },
}

impl WorkflowError {
    /// Wrap an IO error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
