use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::{AnalysisMode, ProjectFile, Role};
use crate::walker::FileWalker;

/// Database driver calls and config keys that carry a connection string.
/// The first capture group is the recorded value.
const CONNECTION_PATTERNS: &[&str] = &[
    r#"\bUse(?:SqlServer|Npgsql|MySql|Sqlite|Oracle|InMemoryDatabase)\s*\(\s*@?"([^"]+)""#,
    r#""[A-Za-z]*Connection[A-Za-z]*"\s*:\s*"([^"]+)""#,
    r#"\bconnectionString\s*=\s*"([^"]+)""#,
    r#"\bGetConnectionString\s*\(\s*"([^"]+)"\s*\)"#,
];

/// Idioms that apply migrations at startup.
const MIGRATION_COMMAND_PATTERNS: &[&str] = &[
    r"\.Database\.Migrate\s*\(\s*\)",
    r"\.Database\.MigrateAsync\s*\(",
    r"\.Database\.EnsureCreated(?:Async)?\s*\(",
    r"\.Database\.GetPendingMigrations(?:Async)?\s*\(",
    r"IMigrator>\s*\(\s*\)\s*\.Migrate(?:Async)?\s*\(",
];

/// Aggregated snapshot of one analysis run.
///
/// Role collections hold indices into `files`, in insertion order. A file can
/// appear in several collections; base controllers are also controllers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectStructure {
    pub root_path: String,
    pub mode: AnalysisMode,
    pub files: Vec<ProjectFile>,
    pub controllers: Vec<usize>,
    pub base_controllers: Vec<usize>,
    pub pages: Vec<usize>,
    pub models: Vec<usize>,
    pub entities: Vec<usize>,
    pub db_contexts: Vec<usize>,
    pub migrations: Vec<usize>,
    pub config_files: Vec<usize>,
    pub services: Vec<usize>,
    pub entry_points: Vec<usize>,
    pub connection_strings: Vec<String>,
    pub migration_commands: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Roles that have a collection, in report order.
pub const COLLECTION_ROLES: &[Role] = &[
    Role::Controller,
    Role::BaseController,
    Role::Page,
    Role::Model,
    Role::Entity,
    Role::DbContext,
    Role::Migration,
    Role::Config,
    Role::Service,
    Role::Program,
];

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

impl ProjectStructure {
    pub fn new(root_path: impl Into<String>, mode: AnalysisMode) -> Self {
        Self {
            root_path: root_path.into(),
            mode,
            ..Self::default()
        }
    }

    /// A run that failed as a whole: no files, no collections.
    pub fn failed(
        root_path: impl Into<String>,
        mode: AnalysisMode,
        error: impl Into<String>,
    ) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(root_path, mode)
        }
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }

    pub fn total_files(&self) -> usize {
        self.files.len()
    }

    /// Controllers that are not base controllers.
    pub fn total_controllers(&self) -> usize {
        self.files_in(Role::Controller)
            .filter(|f| !is_base_controller(f))
            .count()
    }

    pub fn collection(&self, role: Role) -> &[usize] {
        match role {
            Role::Controller => &self.controllers,
            Role::BaseController => &self.base_controllers,
            Role::Page => &self.pages,
            Role::Model => &self.models,
            Role::Entity => &self.entities,
            Role::DbContext => &self.db_contexts,
            Role::Migration => &self.migrations,
            Role::Config => &self.config_files,
            Role::Service => &self.services,
            Role::Program => &self.entry_points,
            Role::Unknown => &[],
        }
    }

    fn collection_mut(&mut self, role: Role) -> Option<&mut Vec<usize>> {
        match role {
            Role::Controller => Some(&mut self.controllers),
            Role::BaseController => Some(&mut self.base_controllers),
            Role::Page => Some(&mut self.pages),
            Role::Model => Some(&mut self.models),
            Role::Entity => Some(&mut self.entities),
            Role::DbContext => Some(&mut self.db_contexts),
            Role::Migration => Some(&mut self.migrations),
            Role::Config => Some(&mut self.config_files),
            Role::Service => Some(&mut self.services),
            Role::Program => Some(&mut self.entry_points),
            Role::Unknown => None,
        }
    }

    /// Files filed under `role`, in insertion order.
    pub fn files_in(&self, role: Role) -> impl Iterator<Item = &ProjectFile> + '_ {
        self.collection(role).iter().map(move |&idx| &self.files[idx])
    }

    /// Files whose primary role is `Unknown`.
    pub fn unclassified(&self) -> impl Iterator<Item = &ProjectFile> + '_ {
        self.files.iter().filter(|f| f.role == Role::Unknown)
    }

    /// Append a classified file and file it under every role it holds.
    pub fn add_file(&mut self, file: ProjectFile) {
        let idx = self.files.len();
        let roles: Vec<Role> = file.roles.iter().map(|r| r.role).collect();
        self.files.push(file);

        for role in roles {
            let targets: &[Role] = match role {
                Role::BaseController => &[Role::Controller, Role::BaseController],
                _ => std::slice::from_ref(&role),
            };
            for target in targets {
                if let Some(list) = self.collection_mut(*target) {
                    if list.last() != Some(&idx) {
                        list.push(idx);
                    }
                }
            }
        }
    }

    /// Drop loaded file text, keeping everything the classifier derived.
    pub fn strip_content(&mut self) {
        for file in &mut self.files {
            file.content = None;
        }
    }
}

/// Whether a controller-collection member is really a base controller.
pub fn is_base_controller(file: &ProjectFile) -> bool {
    file.role == Role::BaseController
        || file.has_role(Role::BaseController)
        || file.name.to_lowercase().contains("base")
}

/// Regex scan for connection strings and migration invocations.
pub struct EvidenceScanner {
    connection_patterns: Vec<Regex>,
    migration_patterns: Vec<Regex>,
}

impl EvidenceScanner {
    pub fn new() -> Result<Self, regex::Error> {
        let compile = |patterns: &[&str]| -> Result<Vec<Regex>, regex::Error> {
            patterns.iter().map(|p| Regex::new(p)).collect()
        };
        Ok(Self {
            connection_patterns: compile(CONNECTION_PATTERNS)?,
            migration_patterns: compile(MIGRATION_COMMAND_PATTERNS)?,
        })
    }

    /// Add every distinct connection string in `content` to `out`.
    pub fn scan_connection_strings(&self, content: &str, out: &mut Vec<String>) {
        for pattern in &self.connection_patterns {
            for caps in pattern.captures_iter(content) {
                if let Some(value) = caps.get(1).or_else(|| caps.get(0)) {
                    push_unique(out, value.as_str());
                }
            }
        }
    }

    /// Add every distinct source line that applies migrations to `out`.
    pub fn scan_migration_commands(&self, content: &str, out: &mut Vec<String>) {
        for line in content.lines() {
            if self.migration_patterns.iter().any(|p| p.is_match(line)) {
                push_unique(out, line.trim());
            }
        }
    }
}

/// Builds a [`ProjectStructure`] from classified files.
pub struct StructureAggregator {
    scanner: EvidenceScanner,
}

impl StructureAggregator {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            scanner: EvidenceScanner::new()?,
        })
    }

    /// File every classified file and scan the entry point and config files
    /// for connection strings and migration calls. Files that were not loaded
    /// are read on demand; any that cannot be read are logged and skipped.
    pub fn aggregate(
        &self,
        root: &Path,
        mode: AnalysisMode,
        files: Vec<ProjectFile>,
        walker: &FileWalker,
    ) -> ProjectStructure {
        let mut structure = ProjectStructure::new(root.display().to_string(), mode);
        for file in files {
            structure.add_file(file);
        }

        let mut connection_strings = Vec::new();
        let mut migration_commands = Vec::new();
        for file in &structure.files {
            if !(file.has_role(Role::Program) || file.has_role(Role::Config)) {
                continue;
            }

            // Degraded files were already reported when content was loaded.
            if file.content_status.is_degraded() {
                tracing::debug!("skipping evidence scan of {}", file.path);
                continue;
            }

            let loaded;
            let content = match file.content.as_deref() {
                Some(text) => text,
                None => match walker.read_content(&root.join(&file.path), file.size) {
                    (Some(text), _) => {
                        loaded = text;
                        loaded.as_str()
                    }
                    (None, status) => {
                        tracing::warn!("skipping evidence scan of {}: {:?}", file.path, status);
                        continue;
                    }
                },
            };

            self.scanner.scan_connection_strings(content, &mut connection_strings);
            self.scanner.scan_migration_commands(content, &mut migration_commands);
        }

        structure.connection_strings = connection_strings;
        structure.migration_commands = migration_commands;
        structure
    }
}
