//! Integration tests for `fastmin minify`.
//!
//! These tests verify:
//! - Code goes to stdout without `-o`, to the file with it
//! - `--json` output is always valid JSON with `ok` and `schema_version`
//! - External maps are written next to the code
//! - The name cache keeps member names stable across runs
//! - Error codes are SCREAMING_SNAKE_CASE

use serial_test::serial;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

fn cargo_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO"));
    cmd.args(["run", "-p", "fastmin-cli", "--bin", "fastmin", "--"]);
    cmd
}

fn run_in(dir: &Path, args: &[&str]) -> Output {
    cargo_bin()
        .arg("--cwd")
        .arg(dir)
        .args(args)
        .output()
        .expect("Failed to run fastmin")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).expect("stdout should be valid JSON")
}

#[test]
fn test_minify_prints_to_stdout() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("app.js"), "var answer = 42;\n").unwrap();

    let output = run_in(dir.path(), &["minify", "app.js", "--no-compress", "--no-mangle"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "var answer=42\n");
}

#[test]
fn test_minify_writes_output_and_json_report() {
    let dir = tempdir().unwrap();
    std::fs::write(
        dir.path().join("app.js"),
        "function add(first, second) { return first + second; }\nadd(1, 2);\n",
    )
    .unwrap();

    let output = run_in(
        dir.path(),
        &["minify", "app.js", "-o", "dist/app.min.js", "--json"],
    );
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["ok"], true);
    assert_eq!(json["schema_version"].as_u64(), Some(1));
    assert_eq!(json["code_digest"].as_str().map(str::len), Some(16));
    assert!(json["output"].as_str().unwrap().ends_with("app.min.js"));
    assert!(json["map_output"].is_null());

    let code = std::fs::read_to_string(dir.path().join("dist/app.min.js")).unwrap();
    assert_eq!(json["code_bytes"].as_u64(), Some(code.len() as u64));
    assert!(code.starts_with("function add("));
    assert!(!code.contains("first"));
}

#[test]
fn test_external_source_map_is_written() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("app.js"), "var answer = 42;\nlog(answer);\n").unwrap();

    let output = run_in(
        dir.path(),
        &[
            "minify",
            "app.js",
            "-o",
            "app.min.js",
            "--source-map",
            "app.min.js.map",
            "--source-map-include-sources",
        ],
    );
    assert!(output.status.success());

    let code = std::fs::read_to_string(dir.path().join("app.min.js")).unwrap();
    assert!(code.ends_with("\n//# sourceMappingURL=app.min.js.map"));

    let map: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("app.min.js.map")).unwrap(),
    )
    .unwrap();
    assert_eq!(map["version"], 3);
    assert_eq!(map["file"], "app.min.js");
    assert!(map["sources"][0].as_str().unwrap().ends_with("app.js"));
    assert_eq!(map["sourcesContent"][0], "var answer = 42;\nlog(answer);\n");
}

#[test]
#[serial]
fn test_name_cache_keeps_member_names_stable() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("one.js"), "o.counterValue = 1;").unwrap();
    std::fs::write(dir.path().join("two.js"), "p.counterValue();").unwrap();

    let args = ["--mangle-props", "--name-cache", "names.json"];
    let first = run_in(dir.path(), &[&["minify", "one.js"][..], &args[..]].concat());
    assert!(first.status.success());

    let cache: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("names.json")).unwrap(),
    )
    .unwrap();
    let assigned = cache["props"]["props"]["counterValue"].as_str().unwrap().to_string();
    assert_eq!(
        String::from_utf8_lossy(&first.stdout),
        format!("o.{assigned}=1\n")
    );

    let second = run_in(dir.path(), &[&["minify", "two.js"][..], &args[..]].concat());
    assert!(second.status.success());
    assert_eq!(
        String::from_utf8_lossy(&second.stdout),
        format!("p.{assigned}()\n")
    );
}

#[test]
fn test_directory_inputs_are_merged_in_order() {
    let dir = tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("src/nested")).unwrap();
    std::fs::write(dir.path().join("src/b.js"), "second();").unwrap();
    std::fs::write(dir.path().join("src/a.js"), "first();").unwrap();
    std::fs::write(dir.path().join("src/nested/c.js"), "third();").unwrap();
    std::fs::write(dir.path().join("src/readme.md"), "# not js").unwrap();

    let output = run_in(dir.path(), &["minify", "src"]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "first();second();third()\n"
    );
}

#[test]
fn test_missing_input_reports_json_error() {
    let dir = tempdir().unwrap();

    let output = run_in(dir.path(), &["minify", "missing.js", "--json"]);
    assert!(!output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["ok"], false);
    let code = json["error"]["code"].as_str().unwrap();
    assert_eq!(code, "MINIFY_READ_SOURCE");
    assert!(code.chars().all(|c| c.is_ascii_uppercase() || c == '_'));
}

#[test]
fn test_config_with_unknown_key_is_rejected() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("app.js"), "x();").unwrap();
    std::fs::write(dir.path().join("fastmin.json"), r#"{"mangel": true}"#).unwrap();

    let output = run_in(
        dir.path(),
        &["minify", "app.js", "--config", "fastmin.json", "--json"],
    );
    assert!(!output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["error"]["code"], "MINIFY_OPTIONS");
    assert!(json["error"]["message"].as_str().unwrap().contains("mangel"));
}

#[test]
fn test_version_json() {
    let output = cargo_bin()
        .args(["--json", "version"])
        .output()
        .expect("Failed to run version command");
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert!(json["version"].as_str().is_some());
    assert_eq!(json["schema_version"].as_u64(), Some(1));
}
