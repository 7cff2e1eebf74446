use rolemap_core::pipeline::AnalysisOutcome;
use rolemap_core::structure::COLLECTION_ROLES;

use crate::role_heading;

/// Format a full analysis report as Markdown.
pub fn format_report(outcome: &AnalysisOutcome) -> String {
    let structure = &outcome.structure;
    let mut out = String::new();

    out.push_str("# rolemap - Project Structure\n\n");
    out.push_str(&format!(
        "- **Root:** `{}`\n- **Mode:** {}\n",
        structure.root_path, structure.mode
    ));

    if let Some(ref error) = structure.error {
        out.push_str(&format!("\n> **Analysis failed:** {error}\n"));
    } else {
        out.push_str(&format!(
            "- **Files:** {}\n- **Controllers:** {}\n",
            structure.total_files(),
            structure.total_controllers(),
        ));

        // Role counts
        out.push_str("\n## Roles\n\n");
        out.push_str("| Role | Count |\n");
        out.push_str("|------|-------|\n");
        for role in COLLECTION_ROLES {
            out.push_str(&format!(
                "| {} | {} |\n",
                role_heading(*role),
                structure.collection(*role).len()
            ));
        }
        out.push_str(&format!(
            "| {} | {} |\n",
            role_heading(rolemap_core::types::Role::Unknown),
            structure.unclassified().count()
        ));

        // Files
        if !structure.files.is_empty() {
            out.push_str("\n## Files\n\n");
            out.push_str("| Path | Role | Confidence | Evidence |\n");
            out.push_str("|------|------|------------|----------|\n");
            for file in &structure.files {
                out.push_str(&format!(
                    "| `{}` | {} | {:.2} | {} |\n",
                    file.path,
                    file.role,
                    file.confidence,
                    file.found_patterns.join("; ").replace('|', "\\|"),
                ));
            }
        }

        if !structure.connection_strings.is_empty() {
            out.push_str("\n## Connection Strings\n\n");
            for conn in &structure.connection_strings {
                out.push_str(&format!("- `{conn}`\n"));
            }
        }

        if !structure.migration_commands.is_empty() {
            out.push_str("\n## Migration Commands\n\n");
            for cmd in &structure.migration_commands {
                out.push_str(&format!("- `{cmd}`\n"));
            }
        }
    }

    if !outcome.results.is_empty() {
        out.push_str(&format!(
            "\n## Criteria ({} checked)\n\n",
            outcome.results.len()
        ));
        out.push_str("| Status | Criterion | Result | Evidence |\n");
        out.push_str("|--------|-----------|--------|----------|\n");
        for result in &outcome.results {
            let status = if result.passed { "PASS" } else { "FAIL" };
            out.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                status,
                result.criteria_name,
                result.message,
                result.evidence.join("<br>").replace('|', "\\|"),
            ));
        }
    }

    out.push('\n');
    out
}

/// Format a check result as Markdown. Returns (markdown, passed).
pub fn format_check(outcome: &AnalysisOutcome) -> (String, bool) {
    let passed = outcome.passed();
    let mut out = format_report(outcome);

    if passed {
        out.push_str("**CHECK PASSED**\n");
    } else {
        let failing = outcome.results.iter().filter(|r| !r.passed).count();
        out.push_str(&format!(
            "**CHECK FAILED**: {} of {} criteria failed\n",
            failing,
            outcome.results.len()
        ));
    }

    (out, passed)
}
