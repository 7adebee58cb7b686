//! CLI integration tests: exit codes and report output.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const SCHEMA: &str = r#"{
    "version": 1,
    "enums": { "status": ["raw", "active"] },
    "types": {
        "idea": {
            "fields": {
                "status": { "kind": "select", "enum": "status", "required": true }
            }
        }
    }
}"#;

fn vault() -> TempDir {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "meta/schema.json", SCHEMA);
    temp
}

fn write(root: &Path, rel: &str, contents: &str) {
    let abs = root.join(rel);
    fs_err::create_dir_all(abs.parent().unwrap()).unwrap();
    fs_err::write(&abs, contents).unwrap();
}

fn notefix() -> Command {
    Command::cargo_bin("notefix").unwrap()
}

#[test]
fn audit_clean_vault_exits_zero() {
    let vault = vault();
    write(
        vault.path(),
        "ideas/good.md",
        "---\ntype: idea\nstatus: raw\n---\n",
    );

    notefix()
        .args(["audit", "--vault-root"])
        .arg(vault.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("All clean"));
}

#[test]
fn audit_with_errors_exits_two() {
    let vault = vault();
    write(
        vault.path(),
        "ideas/typo.md",
        "---\ntype: idea\nstatus: rae\n---\n",
    );

    notefix()
        .args(["audit", "--vault-root"])
        .arg(vault.path())
        .assert()
        .code(2)
        .stdout(predicate::str::contains("invalid-option"))
        .stdout(predicate::str::contains("suggestion: raw"));
}

#[test]
fn audit_json_format_emits_report_envelope() {
    let vault = vault();
    write(
        vault.path(),
        "ideas/typo.md",
        "---\ntype: idea\nstatus: rae\n---\n",
    );

    let output = notefix()
        .args(["audit", "--format", "json", "--vault-root"])
        .arg(vault.path())
        .assert()
        .code(2)
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["schema"], "notefix.audit.v1");
    assert_eq!(report["issues"][0]["code"], "invalid-option");
}

#[test]
fn schema_error_exits_three() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "meta/schema.json",
        r#"{ "version": 1, "types": { "a": { "extends": "b" }, "b": { "extends": "a" } } }"#,
    );

    notefix()
        .args(["audit", "--vault-root"])
        .arg(temp.path())
        .assert()
        .code(3)
        .stderr(predicate::str::contains("inheritance cycle"));
}

#[test]
fn fix_repairs_and_exits_zero() {
    let vault = vault();
    write(
        vault.path(),
        "ideas/typo.md",
        "---\ntype: idea\nstatus: rae\n---\n",
    );

    notefix()
        .args(["fix", "--vault-root"])
        .arg(vault.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("1 fixed"));

    let after = fs_err::read_to_string(vault.path().join("ideas/typo.md")).unwrap();
    assert!(after.contains("status: raw"));
}

#[test]
fn fix_dry_run_previews_without_writing() {
    let vault = vault();
    let original = "---\ntype: idea\nstatus: rae\n---\n";
    write(vault.path(), "ideas/typo.md", original);

    notefix()
        .args(["fix", "--dry-run", "--vault-root"])
        .arg(vault.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("dry-run"))
        .stdout(predicate::str::contains("status: raw"));

    let after = fs_err::read_to_string(vault.path().join("ideas/typo.md")).unwrap();
    assert_eq!(after, original);
}

#[test]
fn interactive_without_terminal_is_refused() {
    let vault = vault();
    write(
        vault.path(),
        "ideas/typo.md",
        "---\ntype: idea\nstatus: rae\n---\n",
    );

    notefix()
        .env("RUST_LOG", "error")
        .args(["fix", "--interactive", "--vault-root"])
        .arg(vault.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("requires a terminal"));
}

#[test]
fn unknown_issue_code_is_rejected_by_clap() {
    notefix()
        .args(["audit", "--only", "not-a-code"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown issue code"));
}
