//! Configuration for the StoryTree narrative model.
//!
//! Maps directly to `storytree.toml`. Every section and field is
//! optional; missing values fall back to the defaults below.

use serde::{Deserialize, Serialize};

/// Top-level StoryTree configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoryConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Per-character transition history.
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Character database and option selection.
    #[serde(default)]
    pub story: StorySettings,
}

impl StoryConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `StoryError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        toml::from_str(toml_str).map_err(|e| crate::StoryError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General system settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level hint for the host's subscriber: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Transition history kept in each character's memory bank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Oldest transitions are evicted past this count. `0` keeps everything.
    #[serde(default = "default_256")]
    pub max_transitions: usize,
    /// Also record pure comparisons, not just mutations.
    #[serde(default = "default_true")]
    pub record_comparisons: bool,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_transitions: 256,
            record_comparisons: true,
        }
    }
}

/// Character database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorySettings {
    /// Characters every story starts with.
    #[serde(default = "default_builtin_characters")]
    pub builtin_characters: Vec<String>,
    /// How many options [`Story::default_options`](crate::Story::default_options) returns.
    #[serde(default = "default_4")]
    pub default_option_count: usize,
}

impl Default for StorySettings {
    fn default() -> Self {
        Self {
            builtin_characters: default_builtin_characters(),
            default_option_count: 4,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_builtin_characters() -> Vec<String> { vec!["World".to_string(), "Player".to_string()] }
fn default_4() -> usize { 4 }
fn default_256() -> usize { 256 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = StoryConfig::from_toml("").expect("empty is valid");
        assert_eq!(config.memory.max_transitions, 256);
        assert!(config.memory.record_comparisons);
        assert_eq!(config.story.builtin_characters, vec!["World", "Player"]);
        assert_eq!(config.story.default_option_count, 4);
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn partial_sections_override() {
        let config = StoryConfig::from_toml(
            r#"
            [memory]
            max_transitions = 8

            [story]
            builtin_characters = ["Narrator"]
            "#,
        )
        .expect("valid toml");
        assert_eq!(config.memory.max_transitions, 8);
        assert!(config.memory.record_comparisons);
        assert_eq!(config.story.builtin_characters, vec!["Narrator"]);
        assert_eq!(config.story.default_option_count, 4);
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = StoryConfig::from_toml("[memory\nmax_transitions = ");
        assert!(matches!(err, Err(crate::StoryError::Config(_))));
    }

    #[test]
    fn from_file_reads_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("storytree.toml");
        std::fs::write(&path, "[general]\nlog_level = \"debug\"\n").expect("write");
        let config = StoryConfig::from_file(&path).expect("load");
        assert_eq!(config.general.log_level, "debug");
    }
}
