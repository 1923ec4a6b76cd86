//! Integration tests for `typeprobe --json check`.

use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn cargo_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO"));
    cmd.args(["run", "-q", "-p", "typeprobe-cli", "--bin", "typeprobe", "--"]);
    cmd
}

fn write(dir: &Path, files: &[(&str, &str)]) {
    for (name, text) in files {
        std::fs::write(dir.join(name), text).unwrap();
    }
}

#[test]
fn test_check_json_reports_problems() {
    let dir = tempdir().unwrap();
    write(
        dir.path(),
        &[
            (
                "package.json",
                r#"{"name":"demo","version":"1.2.3","exports":{".":{"types":"./index.d.mts","default":"./index.js"}}}"#,
            ),
            ("index.d.mts", "export declare const x: number;"),
            ("index.js", "module.exports = { x: 1 };"),
        ],
    );

    let output = cargo_bin()
        .args(["--json", "check"])
        .arg(dir.path())
        .output()
        .expect("Failed to run check command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value =
        serde_json::from_str(&stdout).expect("stdout should be valid JSON");

    assert_eq!(json["packageName"], "demo");
    assert_eq!(json["packageVersion"], "1.2.3");
    let problems = json["problems"].as_array().expect("problems array");
    assert!(problems
        .iter()
        .any(|p| p["kind"] == "CJSResolvesToESM" && p["resolutionKind"] == "dual-cjs"));
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_check_clean_package_exits_zero() {
    let dir = tempdir().unwrap();
    write(
        dir.path(),
        &[
            (
                "package.json",
                r#"{"name":"clean","version":"0.1.0","main":"index.js","types":"index.d.ts"}"#,
            ),
            ("index.d.ts", "export declare const x: number;"),
            ("index.js", "exports.x = 1;"),
        ],
    );

    let output = cargo_bin()
        .args(["check"])
        .arg(dir.path())
        .output()
        .expect("Failed to run check command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("clean@0.1.0"), "unexpected output: {stdout}");
    assert!(stdout.contains("No problems found."), "unexpected output: {stdout}");
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_check_missing_directory_fails() {
    let dir = tempdir().unwrap();
    let output = cargo_bin()
        .args(["check"])
        .arg(dir.path().join("absent"))
        .output()
        .expect("Failed to run check command");

    assert!(!output.status.success());
}
