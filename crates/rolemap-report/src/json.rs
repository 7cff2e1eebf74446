use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use rolemap_core::pipeline::AnalysisOutcome;
use rolemap_core::structure::ProjectStructure;
use rolemap_core::types::CriteriaCheckResult;

/// Serialized form of an analysis run.
#[derive(Debug, Serialize)]
pub struct ReportOutput<'a> {
    pub generated_at: DateTime<Utc>,
    pub structure: &'a ProjectStructure,
    pub results: &'a [CriteriaCheckResult],
}

impl<'a> ReportOutput<'a> {
    fn new(outcome: &'a AnalysisOutcome) -> Self {
        Self {
            generated_at: Utc::now(),
            structure: &outcome.structure,
            results: &outcome.results,
        }
    }
}

/// Wrapper for check output that adds pass/fail metadata.
#[derive(Debug, Serialize)]
pub struct CheckOutput<'a> {
    #[serde(flatten)]
    pub report: ReportOutput<'a>,
    pub check: CheckStatus,
}

#[derive(Debug, Serialize)]
pub struct CheckStatus {
    pub passed: bool,
    pub total_criteria: usize,
    pub failing_criteria_count: usize,
}

fn to_json<T: Serialize>(value: &T, compact: bool) -> Result<String> {
    let json = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    };
    json.context("failed to serialize report")
}

/// Format a full analysis report as JSON.
pub fn format_report(outcome: &AnalysisOutcome, compact: bool) -> Result<String> {
    to_json(&ReportOutput::new(outcome), compact)
}

/// Format a check result as JSON. Returns (json_string, passed).
pub fn format_check(outcome: &AnalysisOutcome, compact: bool) -> Result<(String, bool)> {
    let passed = outcome.passed();
    let output = CheckOutput {
        report: ReportOutput::new(outcome),
        check: CheckStatus {
            passed,
            total_criteria: outcome.results.len(),
            failing_criteria_count: outcome.results.iter().filter(|r| !r.passed).count(),
        },
    };
    Ok((to_json(&output, compact)?, passed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolemap_core::types::{AnalysisMode, ProjectFile, Role, RoleAssignment};

    fn sample_outcome(passed: bool) -> AnalysisOutcome {
        let mut structure = ProjectStructure::new("/src/shop", AnalysisMode::Structural);
        let mut file = ProjectFile::new(
            "Program.cs".into(),
            "Program.cs".into(),
            ".cs".into(),
            40,
            String::new(),
        );
        file.role = Role::Program;
        file.confidence = 1.0;
        file.roles = vec![RoleAssignment {
            role: Role::Program,
            confidence: 1.0,
        }];
        structure.add_file(file);

        AnalysisOutcome {
            structure,
            results: vec![CriteriaCheckResult {
                criteria_id: "entry".into(),
                criteria_name: "Has entry point".into(),
                passed,
                message: "All 1 rule(s) passed".into(),
                evidence: vec!["has_entry_point: 1 == 1".into()],
            }],
        }
    }

    #[test]
    fn test_format_report_pretty() {
        let json = format_report(&sample_outcome(true), false).unwrap();
        assert!(json.contains('\n'));
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed.get("generated_at").is_some());
        assert_eq!(parsed["structure"]["root_path"], "/src/shop");
        assert_eq!(parsed["structure"]["entry_points"][0], 0);
        assert_eq!(parsed["structure"]["files"][0]["role"], "program");
        assert_eq!(parsed["results"][0]["criteria_id"], "entry");
    }

    #[test]
    fn test_format_report_compact() {
        let json = format_report(&sample_outcome(true), true).unwrap();
        assert!(!json.contains('\n'));
    }

    #[test]
    fn test_format_check_passed() {
        let (json, passed) = format_check(&sample_outcome(true), false).unwrap();
        assert!(passed);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["check"]["passed"], true);
        assert_eq!(parsed["check"]["failing_criteria_count"], 0);
        // report fields are flattened next to the check status
        assert!(parsed.get("structure").is_some());
    }

    #[test]
    fn test_format_check_failed() {
        let (json, passed) = format_check(&sample_outcome(false), true).unwrap();
        assert!(!passed);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["check"]["passed"], false);
        assert_eq!(parsed["check"]["total_criteria"], 1);
        assert_eq!(parsed["check"]["failing_criteria_count"], 1);
    }
}
