use std::path::Path;
use std::process::Command;

fn rolemap_cmd() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_rolemap"));
    cmd.env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

/// Small web project: one controller, one data context, a config file and
/// an entry point that runs migrations at startup.
fn sample_project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let root = dir.path();
    write(
        root,
        "Controllers/OrdersController.cs",
        "[ApiController]\npublic class OrdersController : ControllerBase { }\n",
    );
    write(
        root,
        "Data/AppDbContext.cs",
        "public class AppDbContext : DbContext { }\n",
    );
    write(
        root,
        "appsettings.json",
        concat!(
            "{\n",
            "  \"ConnectionStrings\": {\n",
            "    \"DefaultConnection\": \"Server=.;Database=Shop\"\n",
            "  }\n",
            "}\n",
        ),
    );
    write(
        root,
        "Program.cs",
        concat!(
            "var app = builder.Build();\n",
            "app.Services.GetRequiredService<AppDbContext>().Database.Migrate();\n",
            "app.Run();\n",
        ),
    );
    write(root, "bin/Debug/Leftover.cs", "class Leftover { }\n");
    dir
}

fn write_config(root: &Path, rules: &str) {
    let config = format!(
        r#"
[[criteria]]
id = "shape"
name = "Expected shape"
type = "structural"
{rules}
"#
    );
    std::fs::write(root.join(".rolemap.toml"), config).unwrap();
}

#[test]
fn test_analyze_sample_project() {
    let project = sample_project();
    let output = rolemap_cmd()
        .args(["analyze", &project.path().to_string_lossy()])
        .output()
        .expect("failed to run rolemap analyze");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(
        output.status.success(),
        "rolemap analyze failed: stdout={stdout}, stderr={stderr}"
    );
    assert!(stdout.contains("4 files"), "bin/ should be excluded: {stdout}");
    assert!(stdout.contains("Controllers/OrdersController.cs [controller] 0.90"));
    assert!(stdout.contains("Server=.;Database=Shop"));
    assert!(stdout.contains("Database.Migrate();"));
}

#[test]
fn test_analyze_json_output() {
    let project = sample_project();
    let output = rolemap_cmd()
        .args([
            "analyze",
            &project.path().to_string_lossy(),
            "--format",
            "json",
            "--mode",
            "full-content",
        ])
        .output()
        .expect("failed to run rolemap analyze --format json");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "analyze --format json should succeed: {stdout}");

    let parsed: serde_json::Value =
        serde_json::from_str(stdout.trim()).expect("output should be valid JSON");
    let structure = &parsed["structure"];
    assert_eq!(structure["mode"], "full-content");
    assert_eq!(structure["files"].as_array().unwrap().len(), 4);
    assert_eq!(structure["db_contexts"].as_array().unwrap().len(), 1);
    // loaded text is never emitted
    for file in structure["files"].as_array().unwrap() {
        assert!(file["content"].is_null(), "content should be stripped: {file}");
    }
}

#[test]
fn test_analyze_json_compact() {
    let project = sample_project();
    let output = rolemap_cmd()
        .args([
            "analyze",
            &project.path().to_string_lossy(),
            "--format",
            "json",
            "--compact",
        ])
        .output()
        .expect("failed to run rolemap analyze --format json --compact");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());

    let json_line = stdout.trim();
    assert!(!json_line.contains('\n'), "compact JSON should be one line");
    let _: serde_json::Value =
        serde_json::from_str(json_line).expect("compact output should be valid JSON");
}

#[test]
fn test_check_passes() {
    let project = sample_project();
    write_config(
        project.path(),
        r#"
[[criteria.rules]]
property = "controllers_count"
operator = "equals"
value = "1"

[[criteria.rules]]
property = "has_database_connection"
operator = "equals"
value = "1"
"#,
    );

    let output = rolemap_cmd()
        .args(["check", &project.path().to_string_lossy()])
        .output()
        .expect("failed to run rolemap check");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(0), "check should pass: {stdout}");
    assert!(stdout.contains("CHECK PASSED"), "should say CHECK PASSED: {stdout}");
}

#[test]
fn test_check_fails_with_evidence() {
    let project = sample_project();
    write_config(
        project.path(),
        r#"
[[criteria.rules]]
property = "migrations_count"
operator = "greater_than_or_equal"
value = "1"
error_message = "Add an initial migration"
"#,
    );

    let output = rolemap_cmd()
        .args(["check", &project.path().to_string_lossy()])
        .output()
        .expect("failed to run rolemap check");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        output.status.code(),
        Some(1),
        "expected exit code 1 for a failing criterion: {stdout}"
    );
    assert!(stdout.contains("CHECK FAILED"), "should say CHECK FAILED: {stdout}");
    assert!(stdout.contains("migrations_count: 0 >= 1"));
    assert!(stdout.contains("Add an initial migration"));
}

#[test]
fn test_check_json_with_store() {
    let project = sample_project();
    let state = tempfile::tempdir().unwrap();
    let store = state.path().join("criteria.json");
    let store_arg = store.to_string_lossy().to_string();

    let added = rolemap_cmd()
        .args([
            "criteria",
            "add",
            "--store",
            &store_arg,
            "--id",
            "pages",
            "--name",
            "Has pages",
            "--rule",
            "pages_count:greater_than:0",
        ])
        .output()
        .expect("failed to run rolemap criteria add");
    assert!(added.status.success());

    let output = rolemap_cmd()
        .args([
            "check",
            &project.path().to_string_lossy(),
            "--criteria",
            &store_arg,
            "--format",
            "json",
        ])
        .output()
        .expect("failed to run rolemap check --format json");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(1), "no pages exist: {stdout}");

    let parsed: serde_json::Value =
        serde_json::from_str(stdout.trim()).expect("output should be valid JSON");
    assert_eq!(parsed["check"]["passed"], false);
    assert_eq!(parsed["check"]["failing_criteria_count"], 1);
    assert_eq!(parsed["results"][0]["evidence"][0], "pages_count: 0 > 0");
}

#[test]
fn test_criteria_list_and_remove() {
    let state = tempfile::tempdir().unwrap();
    let store = state.path().join("criteria.json");
    let store_arg = store.to_string_lossy().to_string();

    let added = rolemap_cmd()
        .args([
            "criteria",
            "add",
            "--store",
            &store_arg,
            "--owner",
            "ci",
            "--id",
            "ctx",
            "--name",
            "One data context",
            "--full-content",
            "--rule",
            "dbcontext_count:equals:1",
        ])
        .output()
        .unwrap();
    assert!(added.status.success());

    let listed = rolemap_cmd()
        .args(["criteria", "list", "--store", &store_arg, "--owner", "ci", "--json"])
        .output()
        .unwrap();
    let parsed: serde_json::Value =
        serde_json::from_str(String::from_utf8_lossy(&listed.stdout).trim()).unwrap();
    assert_eq!(parsed[0]["id"], "ctx");
    assert_eq!(parsed[0]["type"], "full_content");

    let removed = rolemap_cmd()
        .args(["criteria", "remove", "--store", &store_arg, "--owner", "ci", "ctx"])
        .output()
        .unwrap();
    assert!(removed.status.success());

    let again = rolemap_cmd()
        .args(["criteria", "remove", "--store", &store_arg, "--owner", "ci", "ctx"])
        .output()
        .unwrap();
    assert_eq!(again.status.code(), Some(2));
}

#[test]
fn test_criteria_add_rejects_bad_rule() {
    let state = tempfile::tempdir().unwrap();
    let store = state.path().join("criteria.json");

    let output = rolemap_cmd()
        .args([
            "criteria",
            "add",
            "--store",
            &store.to_string_lossy(),
            "--id",
            "x",
            "--name",
            "x",
            "--rule",
            "controllers_count",
        ])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("expected property:operator:value"), "{stderr}");
    assert!(!store.exists());
}

#[test]
fn test_init_creates_config() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let output = rolemap_cmd()
        .args(["init"])
        .current_dir(dir.path())
        .output()
        .expect("failed to run rolemap init");

    assert!(output.status.success(), "init should succeed");

    let config_path = dir.path().join(".rolemap.toml");
    assert!(config_path.exists(), ".rolemap.toml should be created");

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[project]"), "should contain [project] section");
    assert!(content.contains("[[criteria]]"), "should contain a sample criterion");
}

#[test]
fn test_init_refuses_overwrite() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    std::fs::write(dir.path().join(".rolemap.toml"), "existing").unwrap();

    let output = rolemap_cmd()
        .args(["init"])
        .current_dir(dir.path())
        .output()
        .expect("failed to run rolemap init");

    assert!(!output.status.success(), "init should fail when file exists");
}

#[test]
fn test_analyze_nonexistent_path() {
    let output = rolemap_cmd()
        .args(["analyze", "/nonexistent/path/that/does/not/exist"])
        .output()
        .expect("failed to run rolemap");

    assert_eq!(output.status.code(), Some(2), "should exit 2 for error");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("directory not found"),
        "should report the missing directory: {stdout}"
    );
}
