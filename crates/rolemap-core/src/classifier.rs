use crate::content::ContentClassifier;
use crate::types::{ProjectFile, Role, RoleAssignment};

/// Extension of the project's primary source language.
pub const PRIMARY_SOURCE_EXTENSION: &str = ".cs";

/// Conventional entry-point file name.
pub const ENTRY_POINT_FILE: &str = "Program.cs";

/// Template extensions whose files may be routed pages.
pub const PAGE_EXTENSIONS: &[&str] = &[".razor", ".cshtml"];

const CONFIG_EXTENSIONS: &[&str] = &[".json", ".config"];
const MODEL_DIRECTORIES: &[&str] = &["models", "viewmodels", "dtos"];
const ENTITY_DIRECTORIES: &[&str] = &["entities", "domain"];

pub fn is_page_extension(extension: &str) -> bool {
    PAGE_EXTENSIONS.contains(&extension)
}

/// Per-file record of role evidence gathered across both passes.
///
/// A role's confidence only ever rises through [`raise`](Self::raise). The
/// content pass has three explicit overrides: `supersede`, `promote` and
/// `withdraw`. Nothing is written to the file until [`apply`](Self::apply).
#[derive(Debug, Clone, Default)]
pub struct RoleAccumulator {
    entries: Vec<RoleAssignment>,
    evidence: Vec<String>,
}

impl RoleAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `role` or lift its confidence to at least `confidence`.
    pub fn raise(&mut self, role: Role, confidence: f64, evidence: impl Into<String>) {
        match self.entries.iter_mut().find(|e| e.role == role) {
            Some(entry) => entry.confidence = entry.confidence.max(confidence),
            None => self.entries.push(RoleAssignment { role, confidence }),
        }
        self.evidence.push(evidence.into());
    }

    pub fn contains(&self, role: Role) -> bool {
        self.entries.iter().any(|e| e.role == role)
    }

    pub fn confidence(&self, role: Role) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.role == role)
            .map(|e| e.confidence)
    }

    /// Replace a weaker `old` guess with `new`, keeping old's position so the
    /// primary role stays where the first guess put it.
    pub fn supersede(
        &mut self,
        old: Role,
        new: Role,
        confidence: f64,
        evidence: impl Into<String>,
    ) {
        if self.contains(new) {
            self.entries.retain(|e| e.role != old);
            self.raise(new, confidence, evidence);
            return;
        }
        match self.entries.iter_mut().find(|e| e.role == old) {
            Some(entry) if entry.confidence <= confidence => {
                entry.role = new;
                entry.confidence = confidence;
                self.evidence.push(evidence.into());
            }
            _ => self.raise(new, confidence, evidence),
        }
    }

    /// Make `role` the primary role.
    pub fn promote(&mut self, role: Role) {
        if let Some(idx) = self.entries.iter().position(|e| e.role == role) {
            let entry = self.entries.remove(idx);
            self.entries.insert(0, entry);
        }
    }

    /// Drop a tentative role.
    pub fn withdraw(&mut self, role: Role, evidence: impl Into<String>) {
        self.entries.retain(|e| e.role != role);
        self.evidence.push(evidence.into());
    }

    pub fn primary(&self) -> Role {
        self.entries.first().map(|e| e.role).unwrap_or(Role::Unknown)
    }

    /// Write the final roles, primary role, confidence and evidence into `file`.
    pub fn apply(self, file: &mut ProjectFile) {
        let (role, confidence) = self
            .entries
            .first()
            .map(|e| (e.role, e.confidence))
            .unwrap_or((Role::Unknown, 0.0));
        file.role = role;
        file.confidence = confidence;
        file.roles = self.entries;
        file.found_patterns.extend(self.evidence);
    }
}

/// First pass: assign roles from the file's name, extension and directory.
///
/// `content_available` decides how much a page template is trusted before its
/// directive has been checked.
pub fn classify_by_name(file: &ProjectFile, content_available: bool, acc: &mut RoleAccumulator) {
    let stem = file.stem();
    let stem_lower = stem.to_lowercase();
    let dir_lower = file.directory.to_lowercase();
    let is_source = file.extension == PRIMARY_SOURCE_EXTENSION;

    if is_source {
        if stem_lower.contains("basecontroller") {
            acc.raise(Role::BaseController, 0.3, "base controller name match");
        } else if stem_lower.ends_with("controller")
            || (stem.contains("Controller") && !stem.contains("Base"))
        {
            acc.raise(Role::Controller, 0.9, "controller name match");
        }

        if stem.ends_with("Context") {
            acc.raise(Role::DbContext, 0.95, "context name suffix");
        } else if stem.contains("Context") {
            acc.raise(Role::DbContext, 0.7, "context name match");
        }

        if dir_lower.contains("migration") || stem_lower.contains("migration") {
            acc.raise(Role::Migration, 0.9, "migration path match");
        }
    }

    if file.name.eq_ignore_ascii_case(ENTRY_POINT_FILE) {
        acc.raise(Role::Program, 1.0, "entry point file");
    }

    if is_page_extension(&file.extension) {
        if content_available {
            acc.raise(Role::Page, 0.3, "page template, directive pending");
        } else {
            acc.raise(Role::Page, 0.95, "page template extension");
        }
    }

    if file.name.to_lowercase().contains("appsettings")
        || CONFIG_EXTENSIONS.contains(&file.extension.as_str())
    {
        acc.raise(Role::Config, 0.9, "configuration file");
    }

    if is_source {
        if stem.ends_with("Service") || dir_lower.contains("service") {
            acc.raise(Role::Service, 0.8, "service name match");
        }

        let in_dir = |names: &[&str]| {
            file.directory
                .split('/')
                .any(|segment| names.iter().any(|n| segment.eq_ignore_ascii_case(n)))
        };
        if in_dir(MODEL_DIRECTORIES) {
            acc.raise(Role::Model, 0.6, "model directory");
        }
        if in_dir(ENTITY_DIRECTORIES) {
            acc.raise(Role::Entity, 0.6, "entity directory");
        }
    }
}

/// Runs both classification passes over a file.
pub struct FileClassifier {
    content: ContentClassifier,
}

impl FileClassifier {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            content: ContentClassifier::new()?,
        })
    }

    pub fn classify(&self, file: &mut ProjectFile) {
        let mut acc = RoleAccumulator::new();
        classify_by_name(file, file.content.is_some(), &mut acc);
        if file.content.is_some() {
            self.content.classify(file, &mut acc);
        }
        acc.apply(file);
    }
}
