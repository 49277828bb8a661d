//! Council prompt rendering.
//!
//! Turns plans and tasks into the text handed to council members, and loads
//! the GSD agent templates (`gsd-planner`, `gsd-executor`, `gsd-verifier`)
//! from a templates directory.

use std::path::{Path, PathBuf};

use super::documents::{GsdPlan, GsdTask};
use crate::core::{WorkflowError, WorkflowResult};

/// Returned by [`execution_prompt`] when the index is past the last task.
pub const NO_MORE_TASKS: &str = "No more tasks to execute.";

const NO_CRITERIA: &str = "No specific criteria provided";

impl GsdTask {
    /// Render the task as a prompt section. Empty fields are omitted.
    pub fn to_prompt(&self) -> String {
        let mut parts = vec![format!("## Task: {}", self.name)];

        if !self.files.is_empty() {
            parts.push(format!("\n**Files:** {}", self.files.join(", ")));
        }
        if !self.action.is_empty() {
            parts.push(format!("\n**Action:**\n{}", self.action));
        }
        if !self.verify.is_empty() {
            parts.push(format!("\n**Verification:**\n{}", self.verify));
        }
        if !self.done.is_empty() {
            parts.push(format!("\n**Success Criteria:**\n{}", self.done));
        }

        parts.join("\n")
    }
}

impl GsdPlan {
    /// Render the whole plan for council discussion.
    pub fn to_council_prompt(&self) -> String {
        let mut parts = vec![format!("# {}", self.name)];

        if !self.objective.is_empty() {
            parts.push(format!("\n## Objective\n{}", self.objective));
        }
        if !self.context_files.is_empty() {
            parts.push(format!("\n## Context Files\n{}", bullet_list(&self.context_files)));
        }
        if !self.tasks.is_empty() {
            parts.push("\n## Tasks".to_string());
            parts.extend(self.tasks.iter().map(|task| format!("\n{}", task.to_prompt())));
        }
        if !self.success_criteria.is_empty() {
            parts.push(format!("\n## Success Criteria\n{}", bullet_list(&self.success_criteria)));
        }

        parts.join("\n")
    }
}

/// Prompt asking council members to draft an atomic plan for `request`.
pub fn planning_prompt(request: &str, context: Option<&str>) -> String {
    let mut prompt = String::from(
        "You are participating in a council session to plan implementation for the following request:\n\n",
    );
    prompt.push_str(&format!("## Request\n{request}\n\n"));

    if let Some(context) = context.filter(|c| !c.trim().is_empty()) {
        prompt.push_str(&format!("## Context\n{context}\n\n"));
    }

    prompt.push_str("## Your Task\n");
    prompt.push_str("Create an atomic, executable plan following GSD (Get Shit Done) methodology:\n\n");
    prompt.push_str("1. **Objective**: Clear statement of what will be achieved\n");
    prompt.push_str("2. **Tasks**: 2-3 atomic tasks, each with:\n");
    prompt.push_str("   - Name\n");
    prompt.push_str("   - Files to modify\n");
    prompt.push_str("   - Specific action to take\n");
    prompt.push_str("   - Verification criteria\n");
    prompt.push_str("   - Success criteria\n");
    prompt.push_str("3. **Success Criteria**: Measurable outcomes\n\n");

    prompt.push_str("Use XML format for tasks:\n");
    prompt.push_str("```xml\n");
    prompt.push_str("<task type=\"auto\">\n");
    prompt.push_str("  <name>Task name</name>\n");
    prompt.push_str("  <files>file1.rs, file2.rs</files>\n");
    prompt.push_str("  <action>Specific implementation instructions</action>\n");
    prompt.push_str("  <verify>How to verify this task completed correctly</verify>\n");
    prompt.push_str("  <done>Success criteria for this task</done>\n");
    prompt.push_str("</task>\n");
    prompt.push_str("```\n\n");

    prompt.push_str("Be specific and atomic. Each task should complete in a single focused session.\n");
    prompt
}

/// Prompt asking council members to execute the task at `index` (zero-based).
///
/// Past the last task this returns [`NO_MORE_TASKS`].
pub fn execution_prompt(plan: &GsdPlan, index: usize) -> String {
    let Some(task) = plan.task(index) else {
        return NO_MORE_TASKS.to_string();
    };

    let mut prompt = format!("## Executing Plan: {}\n\n", plan.name);
    prompt.push_str(&format!("### Current Task: {}\n\n", task.name));
    prompt.push_str(&task.to_prompt());
    prompt.push_str("\n\n### Instructions\n");
    prompt.push_str("1. Execute the task as specified\n");
    prompt.push_str("2. Make actual code changes where indicated\n");
    prompt.push_str("3. Verify your changes meet the success criteria\n");
    prompt.push_str("4. Report completion with any relevant notes\n");
    prompt
}

/// Prompt asking council members to review completed work for `task`.
pub fn verification_prompt(task: &GsdTask) -> String {
    let or_default = |s: &str| if s.trim().is_empty() { NO_CRITERIA.to_string() } else { s.to_string() };

    let mut prompt = String::from("## Verification Task\n\n");
    prompt.push_str("Please verify the following work was completed correctly:\n\n");
    prompt.push_str(&format!("### Task: {}\n\n", task.name));
    prompt.push_str(&format!("**Expected Action:**\n{}\n\n", task.action));
    prompt.push_str(&format!("**Verification Criteria:**\n{}\n\n", or_default(&task.verify)));
    prompt.push_str(&format!("**Success Criteria:**\n{}\n\n", or_default(&task.done)));

    prompt.push_str("### Your Verification Task\n\n");
    prompt.push_str("1. Check if the work was completed as specified\n");
    prompt.push_str("2. Verify any code changes are correct\n");
    prompt.push_str("3. Confirm success criteria are met\n");
    prompt.push_str("4. Report any issues or concerns\n\n");

    prompt.push_str("Provide your verification in this format:\n");
    prompt.push_str("- **Status**: PASSED | FAILED | PARTIAL\n");
    prompt.push_str("- **Summary**: Brief summary of findings\n");
    prompt.push_str("- **Issues**: List any issues found (if applicable)\n");
    prompt.push_str("- **Suggestions**: Any improvement suggestions\n");
    prompt
}

fn bullet_list(items: &[String]) -> String {
    items.iter().map(|item| format!("- {item}")).collect::<Vec<_>>().join("\n")
}

/// GSD agent names with bundled templates.
pub const PLANNER_AGENT: &str = "gsd-planner";
pub const EXECUTOR_AGENT: &str = "gsd-executor";
pub const VERIFIER_AGENT: &str = "gsd-verifier";

/// Loads agent templates from `<root>/agents/<name>.md`.
#[derive(Debug, Clone)]
pub struct AgentTemplates {
    root: PathBuf,
}

impl AgentTemplates {
    /// Create a loader rooted at a GSD templates directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Templates directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the template for `agent`.
    pub fn template_path(&self, agent: &str) -> PathBuf {
        self.root.join("agents").join(format!("{agent}.md"))
    }

    /// Load a template by agent name.
    ///
    /// A missing template is `Ok(None)`; one that exists but cannot be read
    /// is an error.
    pub fn load(&self, agent: &str) -> WorkflowResult<Option<String>> {
        let path = self.template_path(agent);
        if !path.exists() {
            tracing::debug!(agent, path = %path.display(), "Agent template not found");
            return Ok(None);
        }

        std::fs::read_to_string(&path).map(Some).map_err(|e| WorkflowError::io(path, e))
    }

    /// Load the `gsd-planner` template, if present.
    pub fn planner(&self) -> WorkflowResult<Option<String>> {
        self.load(PLANNER_AGENT)
    }

    /// Load the `gsd-executor` template, if present.
    pub fn executor(&self) -> WorkflowResult<Option<String>> {
        self.load(EXECUTOR_AGENT)
    }

    /// Load the `gsd-verifier` template, if present.
    pub fn verifier(&self) -> WorkflowResult<Option<String>> {
        self.load(VERIFIER_AGENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_task() -> GsdTask {
        GsdTask::new("Add cache", "auto")
            .with_files(vec!["src/cache.rs".to_string(), "src/lib.rs".to_string()])
            .with_action("Wrap lookups in an LRU cache")
            .with_verify("cargo test cache")
            .with_done("Repeated lookups hit the cache")
    }

    #[test]
    fn test_task_prompt_sections() {
        let prompt = sample_task().to_prompt();
        assert!(prompt.starts_with("## Task: Add cache"));
        assert!(prompt.contains("**Files:** src/cache.rs, src/lib.rs"));
        assert!(prompt.contains("**Action:**\nWrap lookups in an LRU cache"));
        assert!(prompt.contains("**Verification:**\ncargo test cache"));
        assert!(prompt.contains("**Success Criteria:**\nRepeated lookups hit the cache"));
    }

    #[test]
    fn test_task_prompt_omits_empty_fields() {
        let prompt = GsdTask::new("Bare", "manual").to_prompt();
        assert_eq!(prompt, "## Task: Bare");
    }

    #[test]
    fn test_council_prompt() {
        let mut plan = GsdPlan::new("Cache Plan");
        plan.objective = "Speed up lookups".to_string();
        plan.context_files = vec!["src/lookup.rs".to_string()];
        plan.tasks.push(sample_task());
        plan.success_criteria = vec!["p99 under 5ms".to_string()];

        let prompt = plan.to_council_prompt();
        assert!(prompt.starts_with("# Cache Plan"));
        assert!(prompt.contains("## Objective\nSpeed up lookups"));
        assert!(prompt.contains("## Context Files\n- src/lookup.rs"));
        assert!(prompt.contains("## Tasks"));
        assert!(prompt.contains("## Task: Add cache"));
        assert!(prompt.contains("## Success Criteria\n- p99 under 5ms"));
    }

    #[test]
    fn test_planning_prompt() {
        let prompt = planning_prompt("Add a cache", Some("Lookups are slow"));
        assert!(prompt.contains("## Request\nAdd a cache"));
        assert!(prompt.contains("## Context\nLookups are slow"));
        assert!(prompt.contains("<task type=\"auto\">"));

        let without = planning_prompt("Add a cache", None);
        assert!(!without.contains("## Context"));
    }

    #[test]
    fn test_execution_prompt() {
        let mut plan = GsdPlan::new("Cache Plan");
        plan.tasks.push(sample_task());

        let prompt = execution_prompt(&plan, 0);
        assert!(prompt.starts_with("## Executing Plan: Cache Plan"));
        assert!(prompt.contains("### Current Task: Add cache"));
        assert!(prompt.contains("### Instructions"));

        assert_eq!(execution_prompt(&plan, 1), NO_MORE_TASKS);
    }

    #[test]
    fn test_verification_prompt_defaults() {
        let task = GsdTask::new("Bare", "auto").with_action("Do the thing");
        let prompt = verification_prompt(&task);
        assert!(prompt.contains("**Expected Action:**\nDo the thing"));
        assert_eq!(prompt.matches(NO_CRITERIA).count(), 2);

        let full = verification_prompt(&sample_task());
        assert!(!full.contains(NO_CRITERIA));
        assert!(full.contains("**Verification Criteria:**\ncargo test cache"));
    }

    #[test]
    fn test_agent_templates() {
        let dir = TempDir::new().unwrap();
        let agents = dir.path().join("agents");
        std::fs::create_dir_all(&agents).unwrap();
        std::fs::write(agents.join("gsd-planner.md"), "# Planner\n").unwrap();

        let templates = AgentTemplates::new(dir.path());
        assert_eq!(templates.planner().unwrap().as_deref(), Some("# Planner\n"));
        assert_eq!(templates.executor().unwrap(), None);
    }

    #[test]
    fn test_unreadable_template_is_error() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("agents").join("gsd-verifier.md")).unwrap();

        let err = AgentTemplates::new(dir.path()).verifier().unwrap_err();
        assert!(matches!(err, WorkflowError::Io { .. }));
    }
}
