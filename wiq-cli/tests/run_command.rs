use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use serde_json::Value;
use tempfile::TempDir;

fn wiq_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("wiq"));
    cmd.env_remove("wiq")
        .env_remove("queue")
        .env_remove("WIQ_WORKDIR")
        .env("RUST_LOG", "info");
    cmd
}

fn write_items(dir: &Path, json: &str) -> PathBuf {
    let path = dir.join("items.json");
    fs::write(&path, json).expect("write items");
    path
}

fn stdout_lines(output: &std::process::Output) -> Vec<Value> {
    String::from_utf8(output.stdout.clone())
        .expect("utf8 stdout")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect()
}

#[test]
fn run_once_drains_seeded_items_and_cleans_workdir() {
    let seed = TempDir::new().expect("seed dir");
    let work = TempDir::new().expect("workdir");
    let items = write_items(
        seed.path(),
        r#"[{"name":"first"},{"name":"second"},{"name":"third"}]"#,
    );

    let output = wiq_cmd()
        .arg("run")
        .arg("--items")
        .arg(&items)
        .arg("--workdir")
        .arg(work.path())
        .arg("--once")
        .output()
        .expect("run wiq");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 4, "three updates plus the report");
    for update in &lines[..3] {
        assert_eq!(update["item"]["state"], "successful");
        assert_eq!(update["files"][0]["filename"], "hello.txt");
        assert_eq!(update["files"][0]["compressed"], false);
    }
    let report = &lines[3];
    assert_eq!(report["items"], 3);
    assert_eq!(report["updated"], 3);

    assert!(!work.path().join("hello.txt").exists());
    assert_eq!(fs::read_dir(work.path()).expect("read workdir").count(), 0);
}

#[test]
fn run_only_pops_the_configured_wiq() {
    let seed = TempDir::new().expect("seed dir");
    let work = TempDir::new().expect("workdir");
    let items = write_items(
        seed.path(),
        r#"[{"name":"mine"},{"name":"theirs","wiq":"elsewhere"}]"#,
    );

    let output = wiq_cmd()
        .arg("run")
        .arg("--items")
        .arg(&items)
        .arg("--workdir")
        .arg(work.path())
        .args(["--wiq", "orders", "--once"])
        .output()
        .expect("run wiq");
    assert!(output.status.success());

    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["item"]["name"], "mine");
    assert_eq!(lines[0]["item"]["wiq"], "orders");
    assert_eq!(lines[1]["items"], 1);
}

#[test]
fn missing_items_file_exits_with_status_one() {
    let seed = TempDir::new().expect("seed dir");
    wiq_cmd()
        .arg("run")
        .arg("--items")
        .arg(seed.path().join("nope.json"))
        .arg("--once")
        .assert()
        .code(1)
        .stderr(contains("failed to load workitems"));
}

#[test]
fn snapshot_lists_regular_files_sorted() {
    let dir = TempDir::new().expect("dir");
    fs::write(dir.path().join("b.txt"), "b").expect("write");
    fs::write(dir.path().join("a.txt"), "a").expect("write");
    fs::create_dir(dir.path().join("sub")).expect("mkdir");

    wiq_cmd()
        .arg("snapshot")
        .arg(dir.path())
        .assert()
        .success()
        .stdout("a.txt\nb.txt\n");
}

#[test]
fn snapshot_json_has_root_and_files() {
    let dir = TempDir::new().expect("dir");
    fs::write(dir.path().join("only.txt"), "o").expect("write");

    let output = wiq_cmd()
        .arg("snapshot")
        .arg(dir.path())
        .arg("--json")
        .output()
        .expect("run wiq");
    assert!(output.status.success());
    let view: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(view["files"], serde_json::json!(["only.txt"]));
    assert!(view["root"].as_str().is_some());
}
