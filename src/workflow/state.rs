//! Project state persistence.
//!
//! Round-trips a [`ProjectState`] through a single `STATE.md` document. Every
//! mutation stamps `last_updated` and writes the document immediately.
//!
//! The document is assumed to have a single writer; concurrent sessions must
//! serialize access themselves.

use std::path::{Path, PathBuf};

use chrono::Utc;

use super::documents::{flatten_entry, ProjectState};
use crate::core::{WorkflowError, WorkflowResult};

/// Reads and writes the project state document.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
    state: ProjectState,
}

impl StateStore {
    /// Open the store at `path`, loading the document if it exists.
    ///
    /// A missing document yields an empty state; an unreadable one is an error.
    pub fn open(path: impl Into<PathBuf>) -> WorkflowResult<Self> {
        let path = path.into();
        let state = if path.exists() { Self::read(&path)? } else { ProjectState::default() };
        Ok(Self { path, state })
    }

    /// Create a store with an empty state without touching the file system.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), state: ProjectState::default() }
    }

    /// Location of the state document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current in-memory state.
    pub fn state(&self) -> &ProjectState {
        &self.state
    }

    /// Re-read the document from disk, replacing the in-memory state.
    pub fn reload(&mut self) -> WorkflowResult<&ProjectState> {
        self.state =
            if self.path.exists() { Self::read(&self.path)? } else { ProjectState::default() };
        Ok(&self.state)
    }

    /// Stamp `last_updated` and write the document.
    pub fn save(&mut self) -> WorkflowResult<()> {
        self.state.last_updated = Some(Utc::now());

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| WorkflowError::io(parent, e))?;
        }
        std::fs::write(&self.path, self.state.to_markdown())
            .map_err(|e| WorkflowError::io(&self.path, e))?;

        tracing::info!(
            path = %self.path.display(),
            decisions = self.state.accumulated_decisions.len(),
            blockers = self.state.blockers.len(),
            "Saved project state"
        );
        Ok(())
    }

    /// Record a decision.
    ///
    /// Entries are stored on a single line; an empty entry is rejected.
    pub fn add_decision(&mut self, decision: impl AsRef<str>) -> WorkflowResult<()> {
        let entry = entry_line(decision.as_ref(), "decision")?;
        self.state.accumulated_decisions.push(entry);
        self.save()
    }

    /// Record a blocker.
    pub fn add_blocker(&mut self, blocker: impl AsRef<str>) -> WorkflowResult<()> {
        let entry = entry_line(blocker.as_ref(), "blocker")?;
        self.state.blockers.push(entry);
        self.save()
    }

    /// Record a concern.
    pub fn add_concern(&mut self, concern: impl AsRef<str>) -> WorkflowResult<()> {
        let entry = entry_line(concern.as_ref(), "concern")?;
        self.state.concerns.push(entry);
        self.save()
    }

    /// Replace the current position.
    pub fn update_position(&mut self, position: impl AsRef<str>) -> WorkflowResult<()> {
        self.state.current_position = position.as_ref().trim().to_string();
        self.save()
    }

    fn read(path: &Path) -> WorkflowResult<ProjectState> {
        let content = std::fs::read_to_string(path).map_err(|e| WorkflowError::io(path, e))?;
        tracing::debug!(path = %path.display(), "Loaded project state");
        Ok(ProjectState::parse(&content))
    }
}

fn entry_line(entry: &str, kind: &'static str) -> WorkflowResult<String> {
    let line = flatten_entry(entry);
    if line.is_empty() {
        return Err(WorkflowError::EmptyEntry(kind));
    }
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_missing_document_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::open(dir.path().join("STATE.md")).unwrap();
        assert_eq!(store.state(), &ProjectState::default());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_mutations_persist_immediately() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".planning").join("STATE.md");

        let mut store = StateStore::open(&path).unwrap();
        store.update_position("Phase 1, task 2").unwrap();
        store.add_decision("Use regex for tag scanning").unwrap();
        store.add_decision("Keep state in markdown").unwrap();
        store.add_blocker("Missing fixtures").unwrap();
        store.add_concern("Parser brittleness").unwrap();

        assert!(path.exists());
        assert!(store.state().last_updated.is_some());

        let reopened = StateStore::open(&path).unwrap();
        let state = reopened.state();
        assert_eq!(state.current_position, "Phase 1, task 2");
        assert_eq!(
            state.accumulated_decisions,
            vec!["Use regex for tag scanning", "Keep state in markdown"]
        );
        assert_eq!(state.blockers, vec!["Missing fixtures"]);
        assert_eq!(state.concerns, vec!["Parser brittleness"]);
        assert!(state.last_updated.is_some());
    }

    #[test]
    fn test_reload_picks_up_external_edits() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("STATE.md");

        let mut store = StateStore::open(&path).unwrap();
        store.update_position("Before").unwrap();

        std::fs::write(&path, "# Project State\n\n## Current Position\nAfter\n").unwrap();
        assert_eq!(store.reload().unwrap().current_position, "After");
    }

    #[test]
    fn test_empty_entries_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("STATE.md");

        let mut store = StateStore::open(&path).unwrap();
        assert!(matches!(store.add_decision(""), Err(WorkflowError::EmptyEntry("decision"))));
        assert!(matches!(store.add_blocker(" \n "), Err(WorkflowError::EmptyEntry("blocker"))));
        assert!(matches!(store.add_concern("\t"), Err(WorkflowError::EmptyEntry("concern"))));
        assert!(store.state().accumulated_decisions.is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn test_entries_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("STATE.md");

        let mut store = StateStore::open(&path).unwrap();
        store.update_position("#42 parser rewrite\n---\nthen docs\n").unwrap();
        store.add_decision("keep\nmultiline").unwrap();
        store.add_concern("# not a heading").unwrap();

        let reopened = StateStore::open(&path).unwrap();
        assert_eq!(reopened.state().current_position, "#42 parser rewrite\n---\nthen docs");
        assert_eq!(reopened.state().accumulated_decisions, vec!["keep multiline"]);
        assert_eq!(reopened.state().concerns, vec!["# not a heading"]);
    }

    #[test]
    fn test_unreadable_document_is_io_error() {
        let dir = TempDir::new().unwrap();
        // A directory where the document should be cannot be read as text.
        let path = dir.path().join("STATE.md");
        std::fs::create_dir(&path).unwrap();

        let err = StateStore::open(&path).unwrap_err();
        assert!(matches!(err, WorkflowError::Io { .. }));
    }
}
