use std::fmt;
use std::str::FromStr;

use crate::structure::{is_base_controller, ProjectStructure};
use crate::types::{
    AnalysisCriteria, AnalysisMode, CriteriaCheckResult, CriteriaRule, CriteriaType, Role,
};

const REQUIRES_FULL_CONTENT: &str = "requires full content analysis";

/// Scalar a rule can read from a [`ProjectStructure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructureProperty {
    ControllersCount,
    ControllersCountExcludingBaseAbstract,
    BaseControllersCount,
    DbContextCount,
    MigrationsCount,
    ServicesCount,
    FilesCount,
    PagesCount,
    ConfigFilesCount,
    ModelsCount,
    EntitiesCount,
    HasEntryPoint,
    HasDatabaseConnection,
    DatabaseConnectionsCount,
    MigrationCommandsCount,
}

impl StructureProperty {
    pub const ALL: &'static [StructureProperty] = &[
        StructureProperty::ControllersCount,
        StructureProperty::ControllersCountExcludingBaseAbstract,
        StructureProperty::BaseControllersCount,
        StructureProperty::DbContextCount,
        StructureProperty::MigrationsCount,
        StructureProperty::ServicesCount,
        StructureProperty::FilesCount,
        StructureProperty::PagesCount,
        StructureProperty::ConfigFilesCount,
        StructureProperty::ModelsCount,
        StructureProperty::EntitiesCount,
        StructureProperty::HasEntryPoint,
        StructureProperty::HasDatabaseConnection,
        StructureProperty::DatabaseConnectionsCount,
        StructureProperty::MigrationCommandsCount,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            StructureProperty::ControllersCount => "controllers_count",
            StructureProperty::ControllersCountExcludingBaseAbstract => {
                "controllers_count_excluding_base_abstract"
            }
            StructureProperty::BaseControllersCount => "base_controllers_count",
            StructureProperty::DbContextCount => "dbcontext_count",
            StructureProperty::MigrationsCount => "migrations_count",
            StructureProperty::ServicesCount => "services_count",
            StructureProperty::FilesCount => "files_count",
            StructureProperty::PagesCount => "pages_count",
            StructureProperty::ConfigFilesCount => "config_files_count",
            StructureProperty::ModelsCount => "models_count",
            StructureProperty::EntitiesCount => "entities_count",
            StructureProperty::HasEntryPoint => "has_entry_point",
            StructureProperty::HasDatabaseConnection => "has_database_connection",
            StructureProperty::DatabaseConnectionsCount => "database_connections_count",
            StructureProperty::MigrationCommandsCount => "migration_commands_count",
        }
    }

    /// Case-insensitive lookup by property name.
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().to_lowercase();
        Self::ALL.iter().copied().find(|p| p.key() == key)
    }

    pub fn resolve(&self, structure: &ProjectStructure) -> i64 {
        let count = match self {
            StructureProperty::ControllersCount => structure.total_controllers(),
            StructureProperty::ControllersCountExcludingBaseAbstract => structure
                .files_in(Role::Controller)
                .filter(|f| {
                    let name = f.name.to_lowercase();
                    !f.has_role(Role::BaseController)
                        && !["base", "abstract", "generic"]
                            .iter()
                            .any(|marker| name.contains(marker))
                })
                .count(),
            StructureProperty::BaseControllersCount => structure
                .files_in(Role::Controller)
                .filter(|f| is_base_controller(f))
                .count(),
            StructureProperty::DbContextCount => structure.db_contexts.len(),
            StructureProperty::MigrationsCount => structure.migrations.len(),
            StructureProperty::ServicesCount => structure.services.len(),
            StructureProperty::FilesCount => structure.total_files(),
            StructureProperty::PagesCount => structure.pages.len(),
            StructureProperty::ConfigFilesCount => structure.config_files.len(),
            StructureProperty::ModelsCount => structure.models.len(),
            StructureProperty::EntitiesCount => structure.entities.len(),
            StructureProperty::HasEntryPoint => usize::from(!structure.entry_points.is_empty()),
            StructureProperty::HasDatabaseConnection => {
                usize::from(!structure.connection_strings.is_empty())
            }
            StructureProperty::DatabaseConnectionsCount => structure.connection_strings.len(),
            StructureProperty::MigrationCommandsCount => structure.migration_commands.len(),
        };
        i64::try_from(count).unwrap_or(i64::MAX)
    }
}

/// Resolve a property by name. Unknown names resolve to 0.
pub fn resolve_property(structure: &ProjectStructure, key: &str) -> i64 {
    StructureProperty::from_key(key)
        .map(|p| p.resolve(structure))
        .unwrap_or(0)
}

/// Comparison a rule applies between the resolved property and its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equals,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Exists,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Equals => "==",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqual => ">=",
            Operator::LessThan => "<",
            Operator::LessThanOrEqual => "<=",
            Operator::Exists => "exists",
        }
    }

    fn compare(&self, actual: i64, expected: i64) -> bool {
        match self {
            Operator::Equals => actual == expected,
            Operator::GreaterThan => actual > expected,
            Operator::GreaterThanOrEqual => actual >= expected,
            Operator::LessThan => actual < expected,
            Operator::LessThanOrEqual => actual <= expected,
            Operator::Exists => actual > 0,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Operator {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "equals" => Ok(Operator::Equals),
            "greater_than" => Ok(Operator::GreaterThan),
            "greater_than_or_equal" => Ok(Operator::GreaterThanOrEqual),
            "less_than" => Ok(Operator::LessThan),
            "less_than_or_equal" => Ok(Operator::LessThanOrEqual),
            "exists" => Ok(Operator::Exists),
            _ => Err(anyhow::anyhow!("unknown operator: {s}")),
        }
    }
}

/// Result of a single rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOutcome {
    pub passed: bool,
    pub evidence: String,
}

impl RuleOutcome {
    fn fail(evidence: String) -> Self {
        Self {
            passed: false,
            evidence,
        }
    }
}

/// `exists` takes a boolean; an integer is tolerated since it is ignored anyway.
fn parse_flag(value: &str) -> bool {
    let value = value.trim();
    value.eq_ignore_ascii_case("true")
        || value.eq_ignore_ascii_case("false")
        || value.parse::<i64>().is_ok()
}

/// Evaluate one rule against the structure.
pub fn evaluate_rule(structure: &ProjectStructure, rule: &CriteriaRule) -> RuleOutcome {
    let actual = resolve_property(structure, &rule.property);

    let operator: Operator = match rule.operator.parse() {
        Ok(op) => op,
        Err(_) => return RuleOutcome::fail(format!("unknown operator: {}", rule.operator)),
    };

    if operator == Operator::Exists {
        if !parse_flag(&rule.value) {
            return RuleOutcome::fail(format!("invalid value: {}", rule.value));
        }
        return RuleOutcome {
            passed: operator.compare(actual, 0),
            evidence: format!("{}: {} (must exist)", rule.property, actual),
        };
    }

    let expected: i64 = match rule.value.trim().parse() {
        Ok(v) => v,
        Err(_) => return RuleOutcome::fail(format!("invalid value: {}", rule.value)),
    };

    RuleOutcome {
        passed: operator.compare(actual, expected),
        evidence: format!(
            "{}: {} {} {}",
            rule.property,
            actual,
            operator.symbol(),
            expected
        ),
    }
}

/// Evaluate every rule of a criterion; it passes only if all rules do.
pub fn evaluate_criterion(
    structure: &ProjectStructure,
    criteria: &AnalysisCriteria,
    mode: AnalysisMode,
) -> CriteriaCheckResult {
    if mode == AnalysisMode::Structural && criteria.criteria_type == CriteriaType::FullContent {
        return CriteriaCheckResult {
            criteria_id: criteria.id.clone(),
            criteria_name: criteria.name.clone(),
            passed: false,
            message: format!("Criterion '{}' {REQUIRES_FULL_CONTENT}", criteria.name),
            evidence: vec![REQUIRES_FULL_CONTENT.to_string()],
        };
    }

    let mut evidence = Vec::with_capacity(criteria.rules.len());
    let mut failed = 0usize;
    for rule in &criteria.rules {
        let outcome = evaluate_rule(structure, rule);
        evidence.push(outcome.evidence);
        if !outcome.passed {
            failed += 1;
            if let Some(ref message) = rule.error_message {
                evidence.push(message.clone());
            }
        }
    }

    let total = criteria.rules.len();
    let message = if failed == 0 {
        format!("All {total} rule(s) passed")
    } else {
        format!("{failed} of {total} rule(s) failed")
    };

    CriteriaCheckResult {
        criteria_id: criteria.id.clone(),
        criteria_name: criteria.name.clone(),
        passed: failed == 0,
        message,
        evidence,
    }
}

/// Evaluate a list of criteria in order. A failed run fails every criterion.
pub fn evaluate_criteria(
    structure: &ProjectStructure,
    criteria: &[AnalysisCriteria],
    mode: AnalysisMode,
) -> Vec<CriteriaCheckResult> {
    criteria
        .iter()
        .map(|c| match structure.error {
            Some(ref error) => CriteriaCheckResult {
                criteria_id: c.id.clone(),
                criteria_name: c.name.clone(),
                passed: false,
                message: "Analysis failed".to_string(),
                evidence: vec![format!("analysis failed: {error}")],
            },
            None => evaluate_criterion(structure, c, mode),
        })
        .collect()
}
