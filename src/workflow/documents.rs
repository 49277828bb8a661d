//! Workflow document structures.
//!
//! Defines the plan, task and project-state records shared by the parser,
//! the state store and the verifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default plan name when the frontmatter does not provide one.
pub const DEFAULT_PLAN_NAME: &str = "Parsed Plan";

/// A single GSD-style atomic task.
///
/// Tasks have no identity beyond their position in the owning plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GsdTask {
    /// Task name
    pub name: String,

    /// Task type tag (`auto`, `manual`, `checkpoint`, ...), not validated
    pub task_type: String,

    /// Files touched by the task
    pub files: Vec<String>,

    /// Instruction body
    pub action: String,

    /// How to verify the task, may be empty
    pub verify: String,

    /// Success criterion, may be empty
    pub done: String,
}

impl GsdTask {
    /// Create a task with a name and type.
    pub fn new(name: impl Into<String>, task_type: impl Into<String>) -> Self {
        Self { name: name.into(), task_type: task_type.into(), ..Self::default() }
    }

    /// Set the action text.
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }

    /// Set the verification text.
    pub fn with_verify(mut self, verify: impl Into<String>) -> Self {
        self.verify = verify.into();
        self
    }

    /// Set the success criterion.
    pub fn with_done(mut self, done: impl Into<String>) -> Self {
        self.done = done.into();
        self
    }

    /// Set the files list.
    pub fn with_files(mut self, files: Vec<String>) -> Self {
        self.files = files;
        self
    }
}

/// A parsed plan: frontmatter, objective and an ordered task list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GsdPlan {
    /// Plan name
    pub name: String,

    /// Phase label from the frontmatter
    pub phase: Option<String>,

    /// Objective text
    pub objective: String,

    /// Context files referenced by the plan
    pub context_files: Vec<String>,

    /// Tasks, in execution order
    pub tasks: Vec<GsdTask>,

    /// Plan-level success criteria
    pub success_criteria: Vec<String>,
}

impl GsdPlan {
    /// Create an empty plan with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phase: None,
            objective: String::new(),
            context_files: Vec::new(),
            tasks: Vec::new(),
            success_criteria: Vec::new(),
        }
    }

    /// Get a task by zero-based position.
    pub fn task(&self, index: usize) -> Option<&GsdTask> {
        self.tasks.get(index)
    }
}

impl Default for GsdPlan {
    fn default() -> Self {
        Self::new(DEFAULT_PLAN_NAME)
    }
}

/// Current state of a GSD-managed project (the `STATE.md` document).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectState {
    /// Where the project currently stands
    pub current_position: String,

    /// Decisions taken so far, append-only
    pub accumulated_decisions: Vec<String>,

    /// Open blockers
    pub blockers: Vec<String>,

    /// Open concerns
    pub concerns: Vec<String>,

    /// Time of the last mutation
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum StateSection {
    None,
    Position,
    Decisions,
    Blockers,
    Concerns,
}

impl ProjectState {
    /// Parse from markdown content.
    ///
    /// Unknown sections are ignored, so a hand-edited document still loads.
    /// Only markdown headings (`#` markers followed by a space) switch
    /// sections, and `---` is a separator only right before the trailer.
    pub fn parse(content: &str) -> Self {
        let mut state = Self::default();
        let mut section = StateSection::None;
        let mut position_lines: Vec<&str> = Vec::new();
        let lines: Vec<&str> = content.lines().collect();

        for (i, raw) in lines.iter().enumerate() {
            let line = raw.trim();

            if let Some(title) = heading_title(line) {
                section = match title.as_str() {
                    "current position" | "position" => StateSection::Position,
                    "decisions" | "accumulated decisions" => StateSection::Decisions,
                    "blockers" | "blocked" => StateSection::Blockers,
                    "concerns" => StateSection::Concerns,
                    _ => StateSection::None,
                };
                continue;
            }

            if line == "---" && precedes_trailer(&lines[i + 1..]) {
                section = StateSection::None;
                continue;
            }

            if let Some(stamp) = parse_timestamp_line(line) {
                state.last_updated = Some(stamp);
                continue;
            }

            match section {
                StateSection::Position => position_lines.push(unescape_line(raw.trim_end())),
                StateSection::Decisions => {
                    state.accumulated_decisions.extend(parse_list_item(line));
                }
                StateSection::Blockers => state.blockers.extend(parse_list_item(line)),
                StateSection::Concerns => state.concerns.extend(parse_list_item(line)),
                StateSection::None => {}
            }
        }

        state.current_position = position_lines.join("\n").trim().to_string();
        state
    }

    /// Convert to markdown.
    ///
    /// Position lines that would read back as structure (headings, the
    /// trailer, separators) are escaped with a leading backslash.
    pub fn to_markdown(&self) -> String {
        let mut md = String::from("# Project State\n");

        md.push_str("\n## Current Position\n");
        for line in self.current_position.lines() {
            md.push_str(&escape_line(line));
            md.push('\n');
        }

        for (heading, items) in [
            ("Decisions", &self.accumulated_decisions),
            ("Blockers", &self.blockers),
            ("Concerns", &self.concerns),
        ] {
            if items.is_empty() {
                continue;
            }
            md.push_str(&format!("\n## {heading}\n"));
            for item in items {
                md.push_str(&format!("- {}\n", flatten_entry(item)));
            }
        }

        if let Some(updated) = self.last_updated {
            md.push_str(&format!("\n---\n*Last updated: {}*\n", updated.to_rfc3339()));
        }

        md
    }

    /// The most recent `count` decisions, oldest first.
    pub fn recent_decisions(&self, count: usize) -> &[String] {
        let start = self.accumulated_decisions.len().saturating_sub(count);
        &self.accumulated_decisions[start..]
    }
}

/// Collapse a list entry onto one line, as stored in the state document.
pub(crate) fn flatten_entry(entry: &str) -> String {
    entry.split_whitespace().collect::<Vec<_>>().join(" ")
}

// Helper functions

/// Lowercased title of a markdown heading line, if it is one.
fn heading_title(line: &str) -> Option<String> {
    let rest = line.trim_start_matches('#');
    let level = line.len() - rest.len();
    if level == 0 || level > 6 || !(rest.is_empty() || rest.starts_with([' ', '\t'])) {
        return None;
    }
    Some(rest.trim().to_lowercase())
}

fn precedes_trailer(rest: &[&str]) -> bool {
    rest.iter()
        .map(|line| line.trim())
        .find(|line| !line.is_empty())
        .is_some_and(|line| parse_timestamp_line(line).is_some())
}

fn needs_escape(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with('#')
        || trimmed.starts_with('\\')
        || trimmed == "---"
        || trimmed.starts_with("*Last updated:")
}

fn escape_line(line: &str) -> String {
    if needs_escape(line) {
        format!("\\{line}")
    } else {
        line.to_string()
    }
}

fn unescape_line(line: &str) -> &str {
    line.strip_prefix('\\').unwrap_or(line)
}

fn parse_list_item(line: &str) -> Option<String> {
    line.strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
}

fn parse_timestamp_line(line: &str) -> Option<DateTime<Utc>> {
    let value = line.strip_prefix("*Last updated:")?.trim().trim_end_matches('*').trim();
    DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.with_timezone(&Utc))
}
