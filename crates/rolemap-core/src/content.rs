//! Second classification pass: structural markers found in file text.
//!
//! Markers are regular expressions over source text, not a parse. Rules raise
//! confidence with `max()`; DbContext inheritance also takes the primary role.

use regex::{Regex, RegexBuilder};

use crate::classifier::{is_page_extension, RoleAccumulator};
use crate::types::{ProjectFile, Role};

// A class head is the name, optional generic parameters and an optional
// primary-constructor parameter list, followed by the base list.
const ABSTRACT_CONTROLLER: &str = concat!(
    r"\babstract\s+(?:partial\s+)?class\s+\w+(?:<[^>]*>)?(?:\s*\([^)]*\))?",
    r"\s*:\s*(?:[\w.]+\.)?\w*Controller(?:Base)?\b",
);
const CONTROLLER_BASE: &str = concat!(
    r"\bclass\s+\w+(?:<[^>]*>)?(?:\s*\([^)]*\))?",
    r"\s*:\s*(?:[\w.]+\.)?\w*Controller(?:Base)?\b",
);
const API_CONTROLLER_ATTRIBUTE: &str = r"\[\s*ApiController\s*[\],(]";
const DB_CONTEXT_BASE: &str = concat!(
    r"\bclass\s+\w+(?:<[^>]*>)?(?:\s*\([^)]*\))?",
    r"\s*:\s*(?:[\w.]+\.)?\w*DbContext\b",
);
const MIGRATION_FRAMEWORK: &str = concat!(
    r"Microsoft\.EntityFrameworkCore\.Migrations|\[\s*Migration\s*\(",
    r"|\bclass\s+\w+\s*:\s*(?:[\w.]+\.)?Migration\b",
);
const PARTIAL_CLASS: &str = r"\bpartial\s+class\b";
const ENTITY_ATTRIBUTE: &str = r"\[\s*(?:Table\s*\(|Key\s*\])";
const PAGE_DIRECTIVE: &str = r#"^[ \t]*@page\b(?:[ \t]+"([^"]*)")?"#;

pub struct ContentClassifier {
    abstract_controller: Regex,
    controller_base: Regex,
    api_controller: Regex,
    db_context: Regex,
    migration: Regex,
    partial_class: Regex,
    entity: Regex,
    page_directive: Regex,
}

impl ContentClassifier {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            abstract_controller: Regex::new(ABSTRACT_CONTROLLER)?,
            controller_base: Regex::new(CONTROLLER_BASE)?,
            api_controller: Regex::new(API_CONTROLLER_ATTRIBUTE)?,
            db_context: Regex::new(DB_CONTEXT_BASE)?,
            migration: Regex::new(MIGRATION_FRAMEWORK)?,
            partial_class: Regex::new(PARTIAL_CLASS)?,
            entity: Regex::new(ENTITY_ATTRIBUTE)?,
            page_directive: RegexBuilder::new(PAGE_DIRECTIVE)
                .multi_line(true)
                .case_insensitive(true)
                .build()?,
        })
    }

    /// Refine `acc` from the file's loaded content. No-op without content.
    pub fn classify(&self, file: &ProjectFile, acc: &mut RoleAccumulator) {
        let Some(content) = file.content.as_deref() else {
            return;
        };

        if self.abstract_controller.is_match(content) {
            acc.supersede(
                Role::Controller,
                Role::BaseController,
                0.9,
                "abstract controller base type",
            );
        } else if !acc.contains(Role::BaseController) {
            if self.api_controller.is_match(content) {
                acc.raise(Role::Controller, 0.95, "[ApiController] attribute");
            } else if self.controller_base.is_match(content) {
                acc.raise(Role::Controller, 0.95, "derives from controller base type");
            }
        }

        if self.db_context.is_match(content) {
            acc.raise(Role::DbContext, 0.99, "derives from DbContext");
            acc.promote(Role::DbContext);
        }

        if self.migration.is_match(content) {
            acc.raise(Role::Migration, 0.98, "migration framework marker");
        } else if self.partial_class.is_match(content) && content.contains("Migration") {
            acc.raise(Role::Migration, 0.98, "partial migration class");
        }

        if self.entity.is_match(content) {
            acc.raise(Role::Entity, 0.85, "entity mapping attribute");
        }

        if is_page_extension(&file.extension) && acc.contains(Role::Page) {
            match self.page_directive.captures(content) {
                Some(caps) => {
                    acc.raise(Role::Page, 0.95, "confirmed page directive");
                    if let Some(route) = caps.get(1) {
                        acc.raise(Role::Page, 0.95, format!("page route \"{}\"", route.as_str()));
                    }
                }
                None => acc.withdraw(Role::Page, "template file, not a routed page"),
            }
        }
    }
}
