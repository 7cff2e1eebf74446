use colored::Colorize;

use rolemap_core::pipeline::AnalysisOutcome;
use rolemap_core::structure::{ProjectStructure, COLLECTION_ROLES};
use rolemap_core::types::{CriteriaCheckResult, Role};

use crate::role_heading;

/// Format a full analysis report for terminal output.
pub fn format_report(outcome: &AnalysisOutcome) -> String {
    let structure = &outcome.structure;
    let mut out = String::new();

    out.push_str(&format!("\n{}\n", "rolemap - Project Structure".bold()));
    out.push_str(&format!("{}\n\n", "=".repeat(40)));
    out.push_str(&format!("{}: {}\n", "Root".bold(), structure.root_path));
    out.push_str(&format!("{}: {}\n", "Mode".bold(), structure.mode));

    if let Some(ref error) = structure.error {
        out.push_str(&format!("\n{}: {}\n", "Analysis failed".red().bold(), error));
        out.push_str(&format_criteria(&outcome.results));
        out.push('\n');
        return out;
    }

    out.push_str(&format!(
        "\n{}: {} files, {} controllers, {} unclassified\n",
        "Summary".bold(),
        structure.total_files(),
        structure.total_controllers(),
        structure.unclassified().count(),
    ));

    out.push_str(&format_roles(structure));

    if !structure.connection_strings.is_empty() {
        out.push_str(&format!("\n{}\n", "Connection strings".bold()));
        for conn in &structure.connection_strings {
            out.push_str(&format!("  {conn}\n"));
        }
    }

    if !structure.migration_commands.is_empty() {
        out.push_str(&format!("\n{}\n", "Migration commands".bold()));
        for cmd in &structure.migration_commands {
            out.push_str(&format!("  {cmd}\n"));
        }
    }

    out.push_str(&format_criteria(&outcome.results));
    out.push('\n');
    out
}

fn format_roles(structure: &ProjectStructure) -> String {
    let mut out = format!("\n{}\n{}\n", "Roles".bold(), "-".repeat(40));

    for role in COLLECTION_ROLES {
        let files: Vec<_> = structure.files_in(*role).collect();
        if files.is_empty() {
            continue;
        }
        out.push_str(&format!("  {} ({})\n", role_heading(*role), files.len()));
        for file in files {
            // base controllers are filed under Controllers too
            let held = match *role {
                Role::Controller if !file.has_role(Role::Controller) => Role::BaseController,
                other => other,
            };
            let value = file.confidence_for(held).unwrap_or(file.confidence);
            let confidence = format!("{value:.2}");
            let confidence = if value >= 0.9 {
                confidence.green()
            } else if value >= 0.5 {
                confidence.yellow()
            } else {
                confidence.red()
            };
            out.push_str(&format!("    {} [{}] {}\n", file.path, held, confidence));
        }
    }

    out
}

fn format_criteria(results: &[CriteriaCheckResult]) -> String {
    if results.is_empty() {
        return String::new();
    }

    let mut out = format!(
        "\n{} ({} checked)\n{}\n",
        "Criteria".bold(),
        results.len(),
        "-".repeat(40)
    );
    for result in results {
        let status = if result.passed {
            "PASS".green().bold().to_string()
        } else {
            "FAIL".red().bold().to_string()
        };
        out.push_str(&format!(
            "\n  {} {} - {}\n",
            status, result.criteria_name, result.message
        ));
        for line in &result.evidence {
            out.push_str(&format!("    {line}\n"));
        }
    }
    out
}

/// Format a check result for CI use. Returns (text, passed).
pub fn format_check(outcome: &AnalysisOutcome) -> (String, bool) {
    let failing = outcome.results.iter().filter(|r| !r.passed).count();
    let passed = outcome.passed();

    let mut out = format_report(outcome);

    if passed {
        out.push_str(&format!("{}\n", "CHECK PASSED".green().bold()));
    } else if !outcome.structure.is_valid() {
        out.push_str(&format!(
            "{}: analysis did not complete\n",
            "CHECK FAILED".red().bold()
        ));
    } else {
        out.push_str(&format!(
            "{}: {} of {} criteria failed\n",
            "CHECK FAILED".red().bold(),
            failing,
            outcome.results.len(),
        ));
    }

    (out, passed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolemap_core::types::{AnalysisMode, ProjectFile, RoleAssignment};

    fn sample_outcome(passed: bool) -> AnalysisOutcome {
        colored::control::set_override(false);
        let mut structure = ProjectStructure::new("/src/shop", AnalysisMode::Structural);
        let mut file = ProjectFile::new(
            "Controllers/OrdersController.cs".into(),
            "OrdersController.cs".into(),
            ".cs".into(),
            12,
            "Controllers".into(),
        );
        file.role = Role::Controller;
        file.confidence = 0.9;
        file.roles = vec![RoleAssignment {
            role: Role::Controller,
            confidence: 0.9,
        }];
        structure.add_file(file);
        structure.connection_strings.push("Server=.;Database=Shop".into());

        AnalysisOutcome {
            structure,
            results: vec![CriteriaCheckResult {
                criteria_id: "c1".into(),
                criteria_name: "Has migrations".into(),
                passed,
                message: if passed {
                    "All 1 rule(s) passed".into()
                } else {
                    "1 of 1 rule(s) failed".into()
                },
                evidence: vec!["migrations_count: 0 >= 1".into()],
            }],
        }
    }

    #[test]
    fn test_format_report_lists_roles_and_evidence() {
        let report = format_report(&sample_outcome(false));
        assert!(report.contains("Controllers (1)"));
        assert!(report.contains("Controllers/OrdersController.cs [controller] 0.90"));
        assert!(report.contains("Server=.;Database=Shop"));
        assert!(report.contains("FAIL Has migrations"));
        assert!(report.contains("migrations_count: 0 >= 1"));
    }

    #[test]
    fn test_format_roles_uses_collection_confidence() {
        colored::control::set_override(false);
        let mut structure = ProjectStructure::new("/src/shop", AnalysisMode::Structural);
        let mut file = ProjectFile::new(
            "Services/PaymentController.cs".into(),
            "PaymentController.cs".into(),
            ".cs".into(),
            12,
            "Services".into(),
        );
        file.role = Role::Controller;
        file.confidence = 0.9;
        file.roles = vec![
            RoleAssignment {
                role: Role::Controller,
                confidence: 0.9,
            },
            RoleAssignment {
                role: Role::Service,
                confidence: 0.8,
            },
        ];
        structure.add_file(file);

        let roles = format_roles(&structure);
        assert!(roles.contains(concat!(
            "Controllers (1)\n",
            "    Services/PaymentController.cs [controller] 0.90",
        )));
        assert!(roles.contains("Services (1)\n    Services/PaymentController.cs [service] 0.80"));
    }

    #[test]
    fn test_format_roles_lists_base_controller_under_controllers() {
        colored::control::set_override(false);
        let mut structure = ProjectStructure::new("/src/shop", AnalysisMode::FullContent);
        let mut file = ProjectFile::new(
            "Controllers/BaseController.cs".into(),
            "BaseController.cs".into(),
            ".cs".into(),
            12,
            "Controllers".into(),
        );
        file.role = Role::BaseController;
        file.confidence = 0.9;
        file.roles = vec![RoleAssignment {
            role: Role::BaseController,
            confidence: 0.9,
        }];
        structure.add_file(file);

        let roles = format_roles(&structure);
        assert!(roles.contains(concat!(
            "Controllers (1)\n",
            "    Controllers/BaseController.cs [base_controller] 0.90",
        )));
        assert!(roles.contains("Base controllers (1)"));
    }

    #[test]
    fn test_format_check_passed() {
        let (report, passed) = format_check(&sample_outcome(true));
        assert!(passed);
        assert!(report.contains("CHECK PASSED"));
    }

    #[test]
    fn test_format_check_failed() {
        let (report, passed) = format_check(&sample_outcome(false));
        assert!(!passed);
        assert!(report.contains("CHECK FAILED: 1 of 1 criteria failed"));
    }

    #[test]
    fn test_format_report_error() {
        colored::control::set_override(false);
        let outcome = AnalysisOutcome {
            structure: ProjectStructure::failed(
                "/missing",
                AnalysisMode::Structural,
                "directory not found: /missing",
            ),
            results: vec![],
        };
        let (report, passed) = format_check(&outcome);
        assert!(!passed);
        assert!(report.contains("Analysis failed: directory not found: /missing"));
        assert!(report.contains("analysis did not complete"));
    }
}
