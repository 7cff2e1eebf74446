use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::{AnalysisCriteria, AnalysisMode};

pub const CONFIG_FILE: &str = ".rolemap.toml";

/// Default cap on how many bytes of a single file are loaded for inspection.
pub const DEFAULT_MAX_CONTENT_BYTES: u64 = 100_000;

/// Top-level configuration from `.rolemap.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub criteria: Vec<AnalysisCriteria>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
}

pub fn default_extensions() -> Vec<String> {
    [".cs", ".razor", ".cshtml", ".json", ".config", ".xml"]
        .iter()
        .map(|e| e.to_string())
        .collect()
}

fn default_exclude_patterns() -> Vec<String> {
    vec![
        "**/bin/**".to_string(),
        "**/obj/**".to_string(),
        "**/node_modules/**".to_string(),
    ]
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            exclude_patterns: default_exclude_patterns(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub mode: AnalysisMode,
    #[serde(default = "default_max_content_bytes")]
    pub max_content_bytes: u64,
}

fn default_max_content_bytes() -> u64 {
    DEFAULT_MAX_CONTENT_BYTES
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            mode: AnalysisMode::default(),
            max_content_bytes: default_max_content_bytes(),
        }
    }
}

impl Config {
    /// Load configuration from a `.rolemap.toml` file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        let config: Config = toml::from_str(&content).with_context(|| {
            format!(
                "failed to parse '{}'. Run `rolemap init` to create a valid config file",
                path.display()
            )
        })?;
        Ok(config)
    }

    /// Load from `.rolemap.toml` in the given directory or any ancestor, or return defaults.
    pub fn load_or_default(dir: &Path) -> Self {
        let start = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
        let mut current = start.as_path();
        loop {
            let config_path = current.join(CONFIG_FILE);
            if config_path.exists() {
                return match Self::load(&config_path) {
                    Ok(config) => config,
                    Err(e) => {
                        tracing::warn!(
                            "failed to load config from '{}': {e:#}. Using defaults.",
                            config_path.display()
                        );
                        Self::default()
                    }
                };
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }
        Self::default()
    }

    /// Generate default TOML content for `rolemap init`.
    pub fn default_toml() -> String {
        r#"# rolemap - file role classification and structural criteria

[project]
# Extensions to scan (case-insensitive, dot-prefixed)
extensions = [".cs", ".razor", ".cshtml", ".json", ".config", ".xml"]
exclude_patterns = ["**/bin/**", "**/obj/**", "**/node_modules/**"]

[analysis]
# "structural" reads only page templates; "full-content" reads every file
mode = "structural"
max_content_bytes = 100000

# Criteria are checked by `rolemap check`. Every rule must pass.
# Operators: equals, greater_than, greater_than_or_equal, less_than,
# less_than_or_equal, exists
[[criteria]]
id = "has-controllers"
name = "At least one controller"
description = "The project exposes HTTP endpoints through controllers"
type = "structural"

[[criteria.rules]]
property = "controllers_count"
operator = "greater_than_or_equal"
value = "1"

# [[criteria]]
# id = "single-dbcontext"
# name = "Exactly one data context"
# type = "full_content"
#
# [[criteria.rules]]
# property = "dbcontext_count"
# operator = "equals"
# value = "1"
# error_message = "Split data contexts must be justified"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CriteriaType;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.project.extensions.len(), 6);
        assert!(config.project.extensions.contains(&".razor".to_string()));
        assert_eq!(config.analysis.mode, AnalysisMode::Structural);
        assert_eq!(config.analysis.max_content_bytes, 100_000);
        assert!(config.criteria.is_empty());
    }

    #[test]
    fn test_deserialize_config() {
        let toml_str = r#"
[project]
extensions = [".cs"]

[analysis]
mode = "full-content"
max_content_bytes = 2048

[[criteria]]
id = "c1"
name = "One context"
type = "full_content"

[[criteria.rules]]
property = "dbcontext_count"
operator = "equals"
value = "1"
error_message = "expected a single context"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.project.extensions, vec![".cs"]);
        assert_eq!(config.analysis.mode, AnalysisMode::FullContent);
        assert_eq!(config.analysis.max_content_bytes, 2048);
        assert_eq!(config.criteria.len(), 1);
        assert_eq!(config.criteria[0].criteria_type, CriteriaType::FullContent);
        assert_eq!(
            config.criteria[0].rules[0].error_message.as_deref(),
            Some("expected a single context")
        );
        // omitted section keeps its defaults
        assert!(!config.project.exclude_patterns.is_empty());
    }

    #[test]
    fn test_default_toml_is_valid() {
        let config: Config = toml::from_str(&Config::default_toml()).unwrap();
        assert_eq!(config.criteria.len(), 1);
        assert_eq!(config.criteria[0].rules[0].property, "controllers_count");
    }

    #[test]
    fn test_load_or_default_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[analysis]\nmode = \"full-content\"\n",
        )
        .unwrap();
        let nested = dir.path().join("src/Web");
        std::fs::create_dir_all(&nested).unwrap();

        let config = Config::load_or_default(&nested);
        assert_eq!(config.analysis.mode, AnalysisMode::FullContent);
    }

    #[test]
    fn test_load_or_default_broken_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[analysis\nmode = ").unwrap();
        let config = Config::load_or_default(dir.path());
        assert_eq!(config.analysis.mode, AnalysisMode::Structural);
    }
}
