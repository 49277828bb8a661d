//! Plan document parser.
//!
//! Turns a `PLAN.md`-style document into a [`GsdPlan`]. Parsing never fails:
//! every section is optional and missing sections leave their defaults.
//!
//! ```text
//! ---
//! phase: 02-auth
//! name: Session tokens
//! ---
//!
//! ## Objective
//! Issue and validate session tokens.
//!
//! <task type="auto">
//!   <name>Token model</name>
//!   <files>src/token.rs, src/lib.rs</files>
//!   <action>Add the token struct</action>
//!   <verify>cargo test token</verify>
//!   <done>Tokens round-trip</done>
//! </task>
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

use super::documents::{GsdPlan, GsdTask};

static FRONTMATTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\A---\r?\n(?s:(.*?))\r?\n---").expect("valid frontmatter regex"));

static OBJECTIVE_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*#{1,2}[ \t]*objective[ \t]*\r?$").expect("valid objective regex")
});

static TASK_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<task\b([^>]*)>").expect("valid task regex"));

static TASK_TYPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\btype\s*=\s*"([^"]*)""#).expect("valid type regex"));

/// Task type used when a `<task>` tag carries no `type` attribute.
pub const DEFAULT_TASK_TYPE: &str = "auto";

/// Converts plan document text into a [`GsdPlan`].
///
/// Callers depend on this trait rather than a concrete scanner so a
/// grammar-based parser can replace the tag scanner later.
pub trait PlanParser {
    /// Parse plan text. Must not fail on malformed input.
    fn parse(&self, text: &str) -> GsdPlan;
}

/// Regex-backed scanner for frontmatter, headings and `<task>` blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagPlanParser;

impl TagPlanParser {
    /// Create a new parser.
    pub fn new() -> Self {
        Self
    }
}

impl PlanParser for TagPlanParser {
    fn parse(&self, text: &str) -> GsdPlan {
        let mut plan = GsdPlan::default();

        apply_frontmatter(text, &mut plan);

        if let Some(objective) = parse_objective(text) {
            plan.objective = objective;
        }

        plan.context_files = parse_context_files(text);
        plan.success_criteria = parse_success_criteria(text);
        plan.tasks = parse_tasks(text);

        tracing::debug!(
            plan = %plan.name,
            tasks = plan.tasks.len(),
            has_objective = !plan.objective.is_empty(),
            "Parsed plan"
        );

        plan
    }
}

/// Parse plan text with the default [`TagPlanParser`].
pub fn parse_plan(text: &str) -> GsdPlan {
    TagPlanParser.parse(text)
}

fn apply_frontmatter(text: &str, plan: &mut GsdPlan) {
    let Some(caps) = FRONTMATTER.captures(text) else {
        return;
    };

    for line in caps[1].lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim().to_lowercase().as_str() {
            "phase" => plan.phase = Some(value.to_string()),
            "name" => plan.name = value.to_string(),
            _ => {}
        }
    }
}

fn parse_objective(text: &str) -> Option<String> {
    let heading = OBJECTIVE_HEADING.find(text)?;
    let body = section_body(&text[heading.end()..]);
    Some(body.join("\n").trim().to_string())
}

fn parse_context_files(text: &str) -> Vec<String> {
    let mut references = heading_section(text, &["context", "context files"]);
    references.extend(tag_section(text, "context"));

    // `@path` references anywhere in a context section, plain list items
    // only under an explicit "Context Files" heading.
    let listed = list_items(&heading_section(text, &["context files"]));
    let referenced = references.into_iter().filter_map(|line| {
        let line = line.trim();
        let item = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")).unwrap_or(line);
        item.trim().strip_prefix('@').map(str::to_string)
    });

    let mut files: Vec<String> = Vec::new();
    for item in referenced.chain(listed) {
        let item = item.trim().trim_matches('`').to_string();
        if !item.is_empty() && !item.starts_with('@') && !files.contains(&item) {
            files.push(item);
        }
    }
    files
}

fn parse_success_criteria(text: &str) -> Vec<String> {
    let mut lines = heading_section(text, &["success criteria"]);
    lines.extend(tag_section(text, "success_criteria"));
    list_items(&lines)
}

fn parse_tasks(text: &str) -> Vec<GsdTask> {
    let opens: Vec<_> = TASK_OPEN.captures_iter(text).collect();
    let mut tasks = Vec::with_capacity(opens.len());

    for (i, caps) in opens.iter().enumerate() {
        let Some(open) = caps.get(0) else {
            continue;
        };

        // A block ends at `</task>` only if no other `<task` opens first.
        let limit =
            opens.get(i + 1).and_then(|next| next.get(0)).map_or(text.len(), |m| m.start());
        let window = &text[open.end()..limit];
        let Some(close) = window.find("</task>") else {
            continue;
        };
        let body = &window[..close];

        let task_type = TASK_TYPE
            .captures(&caps[1])
            .map(|t| t[1].trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_TASK_TYPE.to_string());

        tasks.push(GsdTask {
            name: inner_tag(body, "name").unwrap_or_default(),
            task_type,
            files: inner_tag(body, "files").map(|f| split_files(&f)).unwrap_or_default(),
            action: inner_tag(body, "action").unwrap_or_default(),
            verify: inner_tag(body, "verify").unwrap_or_default(),
            done: inner_tag(body, "done").unwrap_or_default(),
        });
    }

    if opens.len() > tasks.len() {
        tracing::warn!(
            opened = opens.len(),
            parsed = tasks.len(),
            "Some <task> blocks were not terminated and were ignored"
        );
    }

    tasks
}

/// Trimmed text between `<tag>` and `</tag>` inside a task body.
fn inner_tag(body: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = body.find(&open)? + open.len();
    let end = body[start..].find(&close)? + start;
    Some(body[start..end].trim().to_string())
}

fn split_files(files: &str) -> Vec<String> {
    files.split(',').map(str::trim).filter(|f| !f.is_empty()).map(str::to_string).collect()
}

/// Lines following a heading, up to the next heading or tag line.
fn section_body(rest: &str) -> Vec<&str> {
    rest.lines()
        .skip(1)
        .take_while(|line| {
            let line = line.trim_start();
            !line.starts_with('#') && !line.starts_with('<')
        })
        .collect()
}

/// Body lines of every heading whose title matches one of `names`.
fn heading_section<'a>(text: &'a str, names: &[&str]) -> Vec<&'a str> {
    let mut lines = Vec::new();
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let trimmed = line.trim();
        if trimmed.starts_with('#') {
            let title = trimmed.trim_start_matches('#').trim().to_lowercase();
            if names.contains(&title.as_str()) {
                lines.extend(section_body(&text[offset..]));
            }
        }
        offset += line.len();
    }

    lines
}

/// Lines inside a `<tag>...</tag>` block at document level.
fn tag_section<'a>(text: &'a str, tag: &str) -> Vec<&'a str> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let Some(start) = text.find(&open).map(|i| i + open.len()) else {
        return Vec::new();
    };
    let end = text[start..].find(&close).map_or(text.len(), |i| i + start);
    text[start..end].lines().collect()
}

fn list_items(lines: &[&str]) -> Vec<String> {
    lines
        .iter()
        .filter_map(|line| {
            let line = line.trim();
            line.strip_prefix("- ")
                .or_else(|| line.strip_prefix("* "))
                .map(|item| item.trim_start_matches("[ ] ").trim().to_string())
        })
        .filter(|item| !item.is_empty())
        .collect()
}
