//! Configuration management for GSD Council.
//!
//! Handles loading and saving configuration from TOML files. Every engine
//! component takes its section at construction; nothing is read from
//! process-wide state.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::{WorkflowError, WorkflowResult};

/// Name of the project-local config file.
pub const LOCAL_CONFIG_FILE: &str = ".gsd-council.toml";

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Context budget settings
    pub context: ContextConfig,

    /// Verifier thresholds
    pub verifier: VerifierConfig,

    /// File locations
    pub paths: PathsConfig,
}

/// Context budget and minimal-context assembly settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Token budget of the context window
    pub max_tokens: u64,

    /// Maximum files included in a minimal context
    pub max_context_files: usize,

    /// Maximum characters per file before truncation
    pub max_file_size: usize,

    /// Number of most recent decisions carried into a minimal context
    pub recent_decisions: usize,
}

/// Verification thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Minimum characters for an execution response to be considered
    pub min_response_length: usize,

    /// Fraction of done-criteria keywords a response must mention
    pub keyword_match_threshold: f64,

    /// Agreement ratio at or above which consensus is strong
    pub strong_consensus_threshold: f64,

    /// Agreement ratio at or above which consensus is moderate
    pub moderate_consensus_threshold: f64,

    /// Smallest task count considered optimal
    pub min_tasks: usize,

    /// Largest task count considered optimal
    pub max_tasks: usize,
}

/// File location settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Planning directory, relative to the project root
    pub planning_dir: PathBuf,

    /// State document name inside the planning directory
    pub state_file: String,

    /// Directory holding GSD agent templates (`agents/<name>.md`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub templates_dir: Option<String>,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Looks for config in:
    /// 1. `.gsd-council.toml` in current directory
    /// 2. `~/.config/gsd-council/config.toml`
    /// 3. Falls back to defaults
    pub fn load() -> WorkflowResult<Self> {
        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(global_config) = Self::config_dir().map(|d| d.join("config.toml")) {
            if global_config.exists() {
                return Self::load_from_file(&global_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> WorkflowResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| WorkflowError::io(path, e))?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Check that thresholds and limits are usable.
    pub fn validate(&self) -> WorkflowResult<()> {
        if self.context.max_tokens == 0 {
            return Err(WorkflowError::InvalidBudget(0));
        }

        let v = &self.verifier;
        for (name, value) in [
            ("keyword_match_threshold", v.keyword_match_threshold),
            ("strong_consensus_threshold", v.strong_consensus_threshold),
            ("moderate_consensus_threshold", v.moderate_consensus_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(WorkflowError::InvalidConfig(format!(
                    "{name} must be between 0 and 1, got {value}"
                )));
            }
        }

        if v.moderate_consensus_threshold > v.strong_consensus_threshold {
            return Err(WorkflowError::InvalidConfig(
                "moderate_consensus_threshold cannot exceed strong_consensus_threshold"
                    .to_string(),
            ));
        }

        if v.min_tasks > v.max_tasks {
            return Err(WorkflowError::InvalidConfig(format!(
                "min_tasks ({}) cannot exceed max_tasks ({})",
                v.min_tasks, v.max_tasks
            )));
        }

        Ok(())
    }

    /// Render configuration as TOML.
    pub fn to_toml(&self) -> WorkflowResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("gsd-council"))
    }
}

impl PathsConfig {
    /// Planning directory resolved against a project root.
    pub fn planning_dir_in(&self, root: &Path) -> PathBuf {
        root.join(&self.planning_dir)
    }

    /// State document path resolved against a project root.
    pub fn state_path_in(&self, root: &Path) -> PathBuf {
        self.planning_dir_in(root).join(&self.state_file)
    }

    /// Templates directory with `~` and environment variables expanded.
    pub fn templates_dir(&self) -> Option<PathBuf> {
        self.templates_dir.as_deref().map(|dir| {
            let expanded = shellexpand::full(dir).unwrap_or_else(|_| dir.into());
            PathBuf::from(expanded.as_ref())
        })
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_tokens: 200_000,
            max_context_files: 5,
            max_file_size: 10_000,
            recent_decisions: 5,
        }
    }
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            min_response_length: 50,
            keyword_match_threshold: 0.3,
            strong_consensus_threshold: 0.6,
            moderate_consensus_threshold: 0.4,
            min_tasks: 1,
            max_tasks: 4,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            planning_dir: PathBuf::from(".planning"),
            state_file: "STATE.md".to_string(),
            templates_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.context.max_tokens, 200_000);
        assert_eq!(config.context.max_context_files, 5);
        assert_eq!(config.context.max_file_size, 10_000);
        assert_eq!(config.verifier.min_response_length, 50);
        assert!((config.verifier.keyword_match_threshold - 0.3).abs() < f64::EPSILON);
        assert_eq!((config.verifier.min_tasks, config.verifier.max_tasks), (1, 4));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let toml_str = Config::default().to_toml().unwrap();
        assert!(toml_str.contains("[context]"));
        assert!(toml_str.contains("[verifier]"));
        assert!(toml_str.contains("[paths]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [context]
            max_tokens = 100000

            [verifier]
            min_response_length = 20
            max_tasks = 6
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.context.max_tokens, 100_000);
        assert_eq!(config.context.max_context_files, 5);
        assert_eq!(config.verifier.min_response_length, 20);
        assert_eq!(config.verifier.max_tasks, 6);
        assert_eq!(config.paths.state_file, "STATE.md");
    }

    #[test]
    fn test_validate_rejects_zero_budget() {
        let mut config = Config::default();
        config.context.max_tokens = 0;
        assert!(matches!(config.validate(), Err(WorkflowError::InvalidBudget(0))));
    }

    #[test]
    fn test_validate_rejects_inverted_thresholds() {
        let mut config = Config::default();
        config.verifier.moderate_consensus_threshold = 0.8;
        assert!(matches!(config.validate(), Err(WorkflowError::InvalidConfig(_))));

        let mut config = Config::default();
        config.verifier.keyword_match_threshold = 1.5;
        assert!(matches!(config.validate(), Err(WorkflowError::InvalidConfig(_))));

        let mut config = Config::default();
        config.verifier.min_tasks = 5;
        assert!(matches!(config.validate(), Err(WorkflowError::InvalidConfig(_))));
    }

    #[test]
    fn test_state_path_resolution() {
        let paths = PathsConfig::default();
        assert_eq!(
            paths.state_path_in(Path::new("/work/project")),
            PathBuf::from("/work/project/.planning/STATE.md")
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[paths]\nplanning_dir = \"plans\"\n").unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.paths.planning_dir, PathBuf::from("plans"));
    }

    #[test]
    fn test_load_from_missing_file_is_io_error() {
        let err = Config::load_from_file(Path::new("/nonexistent/gsd.toml")).unwrap_err();
        assert!(matches!(err, WorkflowError::Io { .. }));
    }
}
