use assert_cmd::Command;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn xref(workdir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("xref").expect("binary");
    cmd.current_dir(workdir).arg("--quiet");
    cmd
}

fn setup_repo() -> tempfile::TempDir {
    let temp = tempdir().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("app")).unwrap();
    fs::create_dir_all(root.join("node_modules/flask")).unwrap();
    fs::write(
        root.join("app/main.py"),
        "from flask import Flask\nfrom app.views import index\n\napp = Flask(__name__)\n",
    )
    .unwrap();
    fs::write(
        root.join("app/views.py"),
        "from app import models\n\ndef index():\n    return helper()\n",
    )
    .unwrap();
    fs::write(
        root.join("app/models.py"),
        "from app.views import index\n\nclass User:\n    pass\n",
    )
    .unwrap();
    fs::write(root.join("app/util.py"), "def helper():\n    return 1\n").unwrap();
    fs::write(root.join("node_modules/flask/vendored.py"), "x = 1\n").unwrap();
    temp
}

fn analyze_json(workdir: &Path, extra: &[&str]) -> Value {
    let output = xref(workdir)
        .arg("analyze")
        .args(["--format", "json"])
        .args(extra)
        .output()
        .expect("command run");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).expect("valid json")
}

fn unit_paths(context: &Value) -> Vec<String> {
    context["units"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["path"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn analyze_reports_findings_cycles_and_frameworks_as_json() {
    let repo = setup_repo();
    let context = analyze_json(repo.path(), &[]);

    assert_eq!(
        unit_paths(&context),
        vec!["app/main.py", "app/models.py", "app/util.py", "app/views.py"]
    );
    assert_eq!(context["scope"], "project");
    assert_eq!(context["cycles"][0]["units"], serde_json::json!(["app/models.py", "app/views.py"]));

    let finding = &context["findings"][0];
    assert_eq!(finding["unit"], "app/views.py");
    assert_eq!(finding["symbol"], "helper");
    assert_eq!(finding["verdict"], "resolved-elsewhere");
    assert_eq!(context["frameworks"][0]["name"], "flask");
    assert_eq!(context["units"][0]["size_class"], "optimal");
}

#[test]
fn analyze_output_is_deterministic() {
    let repo = setup_repo();
    let run = || {
        xref(repo.path())
            .args(["analyze", "--format", "json", "--workers", "3"])
            .output()
            .expect("command run")
            .stdout
    };
    assert_eq!(run(), run());
}

#[test]
fn analyze_summary_lists_problems() {
    let repo = setup_repo();
    xref(repo.path())
        .arg("analyze")
        .assert()
        .success()
        .stdout(predicate::str::contains("4 units (4 parsed, 0 unparsable)"))
        .stdout(predicate::str::contains("app/models.py <-> app/views.py"))
        .stdout(predicate::str::contains(
            "app/views.py:4: resolved-elsewhere `helper`",
        ));
}

#[test]
fn fail_on_problems_sets_exit_code() {
    let repo = setup_repo();
    xref(repo.path())
        .args(["analyze", "--fail-on-problems"])
        .assert()
        .code(2);

    let clean = tempdir().unwrap();
    fs::write(clean.path().join("a.py"), "from b import f\n\nf()\n").unwrap();
    fs::write(clean.path().join("b.py"), "def f():\n    pass\n").unwrap();
    xref(clean.path())
        .args(["analyze", "--fail-on-problems"])
        .assert()
        .success();
}

#[test]
fn single_file_scope_and_preset() {
    let repo = setup_repo();
    let context = analyze_json(
        repo.path(),
        &["app/util.py", "--preset", "strict", "--min-confidence", "90"],
    );
    assert_eq!(context["scope"], "single");
    assert_eq!(unit_paths(&context), vec!["app/util.py"]);
    assert_eq!(context["frameworks"], serde_json::json!([]));
}

#[test]
fn directory_target_is_module_scope() {
    let repo = setup_repo();
    let context = analyze_json(repo.path(), &["app"]);
    assert_eq!(context["scope"], "module");
    assert_eq!(unit_paths(&context).len(), 4);
}

#[test]
fn config_file_supplies_size_bands() {
    let repo = setup_repo();
    fs::write(
        repo.path().join("xref.toml"),
        "[size]\nbands = [{ label = \"tiny\", max_lines = 2 }, { label = \"big\" }]\n",
    )
    .unwrap();

    let context = analyze_json(repo.path(), &[]);
    let classes: Vec<&str> = context["units"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["size_class"].as_str().unwrap())
        .collect();
    assert_eq!(classes, vec!["big", "big", "tiny", "big"]);
}

#[test]
fn invalid_config_is_reported() {
    let repo = setup_repo();
    fs::write(repo.path().join("xref.toml"), "[size]\npreset = \"tiny\"\n").unwrap();
    xref(repo.path())
        .arg("analyze")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown size preset `tiny`"));
}

#[test]
fn empty_directory_fails_fast() {
    let empty = tempdir().unwrap();
    xref(empty.path())
        .arg("analyze")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Empty batch"));
}

#[test]
fn presets_are_listed() {
    let temp = tempdir().unwrap();
    xref(temp.path())
        .arg("presets")
        .assert()
        .success()
        .stdout(predicate::str::contains("strict    optimal <= 250"))
        .stdout(predicate::str::contains("legacy    optimal <= 800"))
        .stdout(predicate::str::contains("dangerous above"));
}
