//! Context window tracking and minimal context assembly.
//!
//! Output quality drops as the context window fills, so usage is mapped to a
//! discrete tier:
//!
//! | Usage      | Tier        |
//! |------------|-------------|
//! | 0-30%      | `peak`      |
//! | 30-50%     | `good`      |
//! | 50-70%     | `degrading` |
//! | above 70%  | `poor`      |
//!
//! Boundaries belong to the lower tier: exactly 30% is still `peak`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::documents::ProjectState;
use super::state::StateStore;
use crate::core::{Config, ContextConfig, WorkflowError, WorkflowResult};

/// Usage percentage at which a checkpoint should be taken.
pub const CHECKPOINT_PERCENT: f64 = 50.0;

/// Suffix appended to file contents cut at the size limit.
pub const TRUNCATION_MARKER: &str = "\n... [truncated]";

/// Expected output quality for a given context usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Peak,
    Good,
    Degrading,
    Poor,
}

impl QualityTier {
    /// Classify a usage percentage.
    pub fn from_usage(usage_percent: f64) -> Self {
        if usage_percent <= 30.0 {
            Self::Peak
        } else if usage_percent <= 50.0 {
            Self::Good
        } else if usage_percent <= 70.0 {
            Self::Degrading
        } else {
            Self::Poor
        }
    }

    /// Lowercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Peak => "peak",
            Self::Good => "good",
            Self::Degrading => "degrading",
            Self::Poor => "poor",
        }
    }
}

impl std::fmt::Display for QualityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token usage against a fixed budget.
///
/// Only the current value is kept; callers that want a running total must
/// accumulate before calling [`ContextWindow::set_tokens`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContextWindow {
    max_tokens: u64,
    current_tokens: u64,
}

impl ContextWindow {
    /// Create a window with a positive token budget.
    pub fn new(max_tokens: u64) -> WorkflowResult<Self> {
        if max_tokens == 0 {
            return Err(WorkflowError::InvalidBudget(max_tokens));
        }
        Ok(Self { max_tokens, current_tokens: 0 })
    }

    /// Token budget.
    pub fn max_tokens(&self) -> u64 {
        self.max_tokens
    }

    /// Tokens currently in use.
    pub fn current_tokens(&self) -> u64 {
        self.current_tokens
    }

    /// Replace the current token count.
    pub fn set_tokens(&mut self, tokens: u64) {
        self.current_tokens = tokens;
    }

    /// Usage as a percentage of the budget.
    pub fn usage_percent(&self) -> f64 {
        // Multiply first so round budgets give exact boundaries (300/1000 -> 30.0).
        (self.current_tokens as f64 * 100.0) / self.max_tokens as f64
    }

    /// Quality tier for the current usage.
    pub fn quality_tier(&self) -> QualityTier {
        QualityTier::from_usage(self.usage_percent())
    }

    /// Whether state should be checkpointed before quality degrades further.
    pub fn should_checkpoint(&self) -> bool {
        self.usage_percent() >= CHECKPOINT_PERCENT
    }

    /// Snapshot of the derived values.
    pub fn status(&self) -> QualityStatus {
        QualityStatus {
            usage_percent: self.usage_percent(),
            quality_tier: self.quality_tier(),
            should_checkpoint: self.should_checkpoint(),
            tokens_used: self.current_tokens,
            max_tokens: self.max_tokens,
        }
    }
}

/// Serializable view of the context window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityStatus {
    pub usage_percent: f64,
    pub quality_tier: QualityTier,
    pub should_checkpoint: bool,
    pub tokens_used: u64,
    pub max_tokens: u64,
}

/// Outcome of loading one file into a minimal context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FileOutcome {
    /// File was read, possibly truncated.
    Loaded { content: String, truncated: bool },
    /// File was left out.
    Skipped { reason: String },
}

/// A requested file and what happened to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextFile {
    pub path: String,
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

/// Smallest useful context for executing one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinimalContext {
    /// Task description
    pub task: String,

    /// Current project position
    pub position: String,

    /// Most recent decisions, oldest first
    pub decisions: Vec<String>,

    /// One entry per requested file, in request order
    pub files: Vec<ContextFile>,
}

impl MinimalContext {
    /// Files that were loaded, with their content.
    pub fn loaded(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().filter_map(|f| match &f.outcome {
            FileOutcome::Loaded { content, .. } => Some((f.path.as_str(), content.as_str())),
            FileOutcome::Skipped { .. } => None,
        })
    }

    /// Number of requested files that were left out.
    pub fn skipped_count(&self) -> usize {
        self.files.iter().filter(|f| matches!(f.outcome, FileOutcome::Skipped { .. })).count()
    }
}

/// Manages the context window and project state for a session.
#[derive(Debug)]
pub struct ContextManager {
    root: PathBuf,
    config: ContextConfig,
    window: ContextWindow,
    store: StateStore,
}

impl ContextManager {
    /// Create a manager for a project root, loading any existing state document.
    pub fn new(root: impl Into<PathBuf>, config: &Config) -> WorkflowResult<Self> {
        let root = root.into();
        let window = ContextWindow::new(config.context.max_tokens)?;
        let store = StateStore::open(config.paths.state_path_in(&root))?;
        Ok(Self { root, config: config.context.clone(), window, store })
    }

    /// Project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Context window.
    pub fn window(&self) -> &ContextWindow {
        &self.window
    }

    /// Current project state.
    pub fn state(&self) -> &ProjectState {
        self.store.state()
    }

    /// State store, for mutations.
    pub fn store_mut(&mut self) -> &mut StateStore {
        &mut self.store
    }

    /// Record the tokens currently in use.
    pub fn update_context_usage(&mut self, tokens_used: u64) {
        self.window.set_tokens(tokens_used);
        if self.window.should_checkpoint() {
            tracing::debug!(
                usage = self.window.usage_percent(),
                tier = %self.window.quality_tier(),
                "Context usage past checkpoint threshold"
            );
        }
    }

    /// Snapshot of the context window.
    pub fn quality_status(&self) -> QualityStatus {
        self.window.status()
    }

    /// Assemble the minimal context for a task.
    ///
    /// Paths are relative to the project root. Files past the configured limit,
    /// missing files and unreadable files are reported as skipped rather than
    /// dropped silently.
    pub fn minimal_context(&self, task: &str, relevant_files: &[String]) -> MinimalContext {
        let state = self.store.state();
        let files = relevant_files
            .iter()
            .enumerate()
            .map(|(i, path)| {
                let outcome = if i >= self.config.max_context_files {
                    FileOutcome::Skipped {
                        reason: format!(
                            "file limit of {} reached",
                            self.config.max_context_files
                        ),
                    }
                } else {
                    load_context_file(&self.root.join(path), self.config.max_file_size)
                };

                if let FileOutcome::Skipped { reason } = &outcome {
                    tracing::warn!(path = %path, reason = %reason, "Skipped context file");
                }
                ContextFile { path: path.clone(), outcome }
            })
            .collect();

        MinimalContext {
            task: task.to_string(),
            position: state.current_position.clone(),
            decisions: state.recent_decisions(self.config.recent_decisions).to_vec(),
            files,
        }
    }
}

fn load_context_file(path: &Path, max_chars: usize) -> FileOutcome {
    if !path.exists() {
        return FileOutcome::Skipped { reason: "file does not exist".to_string() };
    }
    if !path.is_file() {
        return FileOutcome::Skipped { reason: "not a regular file".to_string() };
    }

    match std::fs::read_to_string(path) {
        Ok(content) => {
            let (content, truncated) = truncate_chars(content, max_chars);
            FileOutcome::Loaded { content, truncated }
        }
        Err(e) => FileOutcome::Skipped { reason: format!("unreadable: {e}") },
    }
}

fn truncate_chars(content: String, max_chars: usize) -> (String, bool) {
    match content.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            let mut truncated = content[..cut].to_string();
            truncated.push_str(TRUNCATION_MARKER);
            (truncated, true)
        }
        None => (content, false),
    }
}
