use serde::{Deserialize, Serialize};
use std::fmt;

/// Architectural role a file plays in the project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Unknown,
    Controller,
    BaseController,
    Page,
    Model,
    DbContext,
    Migration,
    Config,
    Service,
    Program,
    Entity,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Unknown => "unknown",
            Role::Controller => "controller",
            Role::BaseController => "base_controller",
            Role::Page => "page",
            Role::Model => "model",
            Role::DbContext => "db_context",
            Role::Migration => "migration",
            Role::Config => "config",
            Role::Service => "service",
            Role::Program => "program",
            Role::Entity => "entity",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much of the project the analysis reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisMode {
    /// Names and paths only; page templates are still read to confirm routes.
    #[default]
    Structural,
    /// Every matching file is read and inspected.
    FullContent,
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisMode::Structural => write!(f, "structural"),
            AnalysisMode::FullContent => write!(f, "full-content"),
        }
    }
}

impl std::str::FromStr for AnalysisMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "structural" => Ok(AnalysisMode::Structural),
            "full-content" | "full" => Ok(AnalysisMode::FullContent),
            _ => Err(anyhow::anyhow!("unknown analysis mode: {s}")),
        }
    }
}

/// Outcome of trying to load a file's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum ContentStatus {
    Loaded,
    NotRequested,
    TooLarge,
    Unreadable(String),
    NotUtf8,
}

impl ContentStatus {
    /// True when the file was meant to be read but could not be.
    pub fn is_degraded(&self) -> bool {
        matches!(
            self,
            ContentStatus::TooLarge | ContentStatus::Unreadable(_) | ContentStatus::NotUtf8
        )
    }
}

/// One role held by a file, with the classifier's confidence in it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub role: Role,
    pub confidence: f64,
}

/// A discovered file and everything the classifier concluded about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    /// Root-relative path with `/` separators.
    pub path: String,
    pub name: String,
    /// Lowercased, dot-prefixed (".cs").
    pub extension: String,
    pub size: u64,
    /// Root-relative containing directory; empty for files at the root.
    pub directory: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<RoleAssignment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub content_status: ContentStatus,
    pub found_patterns: Vec<String>,
    pub confidence: f64,
}

impl ProjectFile {
    pub fn new(
        path: String,
        name: String,
        extension: String,
        size: u64,
        directory: String,
    ) -> Self {
        Self {
            path,
            name,
            extension,
            size,
            directory,
            role: Role::Unknown,
            roles: Vec::new(),
            content: None,
            content_status: ContentStatus::NotRequested,
            found_patterns: Vec::new(),
            confidence: 0.0,
        }
    }

    /// File name without its extension.
    pub fn stem(&self) -> &str {
        match self.name.rfind('.') {
            Some(idx) if idx > 0 => &self.name[..idx],
            _ => &self.name,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.iter().any(|r| r.role == role)
    }

    /// Confidence in `role`, if the file holds it.
    pub fn confidence_for(&self, role: Role) -> Option<f64> {
        self.roles.iter().find(|r| r.role == role).map(|r| r.confidence)
    }
}

/// Type tag on a criterion controlling whether it can run without content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriteriaType {
    #[default]
    Structural,
    FullContent,
}

/// A single `property operator value` check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriteriaRule {
    pub property: String,
    pub operator: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// A named group of rules that must all pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisCriteria {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "type")]
    pub criteria_type: CriteriaType,
    #[serde(default)]
    pub rules: Vec<CriteriaRule>,
}

/// Outcome of evaluating one criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriteriaCheckResult {
    pub criteria_id: String,
    pub criteria_name: String,
    pub passed: bool,
    pub message: String,
    pub evidence: Vec<String>,
}
