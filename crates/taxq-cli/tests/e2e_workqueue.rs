//! E2E tests for the staff workqueue: init, accounts, ranking, and the
//! client lookup, driven through the `tq` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

fn tq_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("tq"));
    cmd.current_dir(dir);
    cmd.env("TAXQ_LOG", "error");
    cmd.env("TAXQ_USER", "test-staff");
    cmd.env("TAXQ_ACCOUNT", "acme");
    cmd.env("XDG_CONFIG_HOME", dir.join("xdg"));
    cmd.env_remove("FORMAT");
    cmd
}

fn setup() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    tq_cmd(dir.path()).args(["init"]).assert().success();
    tq_cmd(dir.path())
        .args(["account", "add", "acme", "--name", "Acme Tax"])
        .assert()
        .success();
    dir
}

fn json_stdout(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("command should not crash");
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

fn json_stderr_error(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("command should not crash");
    assert!(!output.status.success(), "command should fail");
    let value: Value = serde_json::from_slice(&output.stderr).expect("stderr should be JSON");
    value["error"].clone()
}

fn add(dir: &Path, identifier: &str, extra: &[&str]) -> i64 {
    let mut args = vec!["add", "--json", "-i", identifier, "-y", "2024"];
    args.extend_from_slice(extra);
    let item = json_stdout(tq_cmd(dir).args(&args));
    item["id"].as_i64().expect("item id")
}

/// `(identifier, position, external_queue_position)` in list order.
fn ranks(dir: &Path, all: bool) -> Vec<(String, Option<u64>, Option<u64>)> {
    let mut args = vec!["list", "--json"];
    if all {
        args.push("--all");
    }
    json_stdout(tq_cmd(dir).args(&args))
        .as_array()
        .expect("list array")
        .iter()
        .map(|item| {
            (
                item["identifier"].as_str().expect("identifier").to_string(),
                item["position"].as_u64(),
                item["external_queue_position"].as_u64(),
            )
        })
        .collect()
}

fn r(ident: &str, pos: Option<u64>, ext: Option<u64>) -> (String, Option<u64>, Option<u64>) {
    (ident.to_string(), pos, ext)
}

#[test]
fn commands_before_init_report_not_initialized() {
    let dir = TempDir::new().expect("tempdir");
    let error = json_stderr_error(tq_cmd(dir.path()).args(["list", "--json"]));
    assert_eq!(error["error_code"], "E1001");
    assert!(error["suggestion"].as_str().unwrap_or_default().contains("tq init"));
}

#[test]
fn new_returns_join_the_tail_of_both_queues() {
    let dir = setup();
    add(dir.path(), "AB12", &[]);
    add(dir.path(), "CD34", &[]);
    add(dir.path(), "EF56", &[]);

    assert_eq!(
        ranks(dir.path(), false),
        vec![
            r("AB12", Some(1), Some(1)),
            r("CD34", Some(2), Some(2)),
            r("EF56", Some(3), Some(3)),
        ]
    );
}

#[test]
fn status_changes_rerank_the_client_queue() {
    let dir = setup();
    add(dir.path(), "A1", &[]);
    let b = add(dir.path(), "B2", &[]);
    add(dir.path(), "C3", &[]);

    let edited = json_stdout(
        tq_cmd(dir.path()).args(["edit", &b.to_string(), "--status", "In Progress", "--json"]),
    );
    assert_eq!(edited["status"], "In Progress");
    assert_eq!(edited["last_updated_by"], "test-staff");
    assert_eq!(
        ranks(dir.path(), false),
        vec![r("A1", Some(1), Some(1)), r("B2", Some(2), None), r("C3", Some(3), Some(2))]
    );

    tq_cmd(dir.path())
        .args(["edit", &b.to_string(), "--status", "completed"])
        .assert()
        .success();
    assert_eq!(
        ranks(dir.path(), false),
        vec![r("A1", Some(1), Some(1)), r("C3", Some(2), Some(2))]
    );
    assert_eq!(ranks(dir.path(), true).last(), Some(&r("B2", None, None)));
}

#[test]
fn delete_closes_the_gap() {
    let dir = setup();
    add(dir.path(), "A1", &[]);
    let b = add(dir.path(), "B2", &[]);
    add(dir.path(), "C3", &[]);

    let deleted = json_stdout(tq_cmd(dir.path()).args(["delete", &b.to_string(), "--json"]));
    assert_eq!(deleted["identifier"], "B2");
    assert_eq!(
        ranks(dir.path(), true),
        vec![r("A1", Some(1), Some(1)), r("C3", Some(2), Some(2))]
    );

    let error = json_stderr_error(tq_cmd(dir.path()).args(["show", &b.to_string(), "--json"]));
    assert_eq!(error["error_code"], "E2002");
}

#[test]
fn move_and_reorder_keep_ranks_dense() {
    let dir = setup();
    let a = add(dir.path(), "A1", &[]);
    let b = add(dir.path(), "B2", &[]);
    let c = add(dir.path(), "C3", &[]);

    tq_cmd(dir.path())
        .args(["move", &c.to_string(), "--to", "1"])
        .assert()
        .success();
    assert_eq!(
        ranks(dir.path(), false),
        vec![r("C3", Some(1), Some(1)), r("A1", Some(2), Some(2)), r("B2", Some(3), Some(3))]
    );

    tq_cmd(dir.path())
        .args(["reorder", &b.to_string(), &a.to_string(), &c.to_string()])
        .assert()
        .success();
    assert_eq!(
        ranks(dir.path(), false),
        vec![r("B2", Some(1), Some(1)), r("A1", Some(2), Some(2)), r("C3", Some(3), Some(3))]
    );

    let error = json_stderr_error(
        tq_cmd(dir.path()).args(["reorder", &a.to_string(), &b.to_string(), "--json"]),
    );
    assert_eq!(error["error_code"], "E3001");
}

#[test]
fn insert_at_rank_shifts_the_rest() {
    let dir = setup();
    add(dir.path(), "A1", &[]);
    add(dir.path(), "B2", &[]);
    add(dir.path(), "C3", &["--at", "1"]);
    assert_eq!(
        ranks(dir.path(), false),
        vec![r("C3", Some(1), Some(1)), r("A1", Some(2), Some(2)), r("B2", Some(3), Some(3))]
    );
}

#[test]
fn duplicate_identifier_is_a_conflict() {
    let dir = setup();
    add(dir.path(), "AB12", &[]);

    let error = json_stderr_error(
        tq_cmd(dir.path()).args(["add", "--json", "-i", "AB12", "-y", "2024"]),
    );
    assert_eq!(error["error_code"], "E4001");
    assert_eq!(ranks(dir.path(), true).len(), 1);

    // Same identifier in another year is fine.
    tq_cmd(dir.path())
        .args(["add", "-i", "AB12", "-y", "2023"])
        .assert()
        .success();

    let taken = json_stdout(tq_cmd(dir.path()).args(["check-id", "AB12", "--year", "2024", "--json"]));
    assert_eq!(taken["available"], false);
    let free = json_stdout(tq_cmd(dir.path()).args(["check-id", "ZZ99", "--year", "2024", "--json"]));
    assert_eq!(free["available"], true);
}

#[test]
fn extended_requires_an_extension_date() {
    let dir = setup();
    let id = add(dir.path(), "AB12", &[]);

    let error = json_stderr_error(
        tq_cmd(dir.path()).args(["edit", &id.to_string(), "--status", "extended", "--json"]),
    );
    assert_eq!(error["error_code"], "E3002");

    tq_cmd(dir.path())
        .args(["edit", &id.to_string(), "--status", "extended", "--extension", "October 15"])
        .assert()
        .success();
    assert_eq!(ranks(dir.path(), false), vec![r("AB12", Some(1), None)]);

    tq_cmd(dir.path())
        .args(["edit", &id.to_string(), "--status", "extended"])
        .assert()
        .success();
}

#[test]
fn human_errors_show_code_and_suggestion() {
    let dir = setup();
    add(dir.path(), "AB12", &[]);
    tq_cmd(dir.path())
        .args(["--format", "text", "add", "-i", "AB12", "-y", "2024"])
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("error[E4001]")
                .and(predicate::str::contains("suggestion:")),
        );
}

#[test]
fn client_lookup_shows_position_message() {
    let dir = setup();
    add(dir.path(), "A1", &["--notes", "private"]);
    add(dir.path(), "B2", &[]);

    tq_cmd(dir.path())
        .args(["lookup", "--subdomain", "acme", "--year", "2024", "--identifier", "B2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("you are number 2 in the queue."));

    let status = json_stdout(tq_cmd(dir.path()).args([
        "lookup",
        "--subdomain",
        "acme",
        "-y",
        "2024",
        "-i",
        "A1",
        "--json",
    ]));
    assert_eq!(status["queue_position"], 1);
    assert!(!status.to_string().contains("private"));

    let error = json_stderr_error(tq_cmd(dir.path()).args([
        "lookup",
        "--subdomain",
        "acme",
        "-y",
        "2024",
        "-i",
        "ZZ",
        "--json",
    ]));
    assert_eq!(error["error_code"], "E2003");
}

#[test]
fn recompute_repairs_drift() {
    let dir = setup();
    add(dir.path(), "A1", &[]);
    add(dir.path(), "B2", &[]);

    tq_cmd(dir.path()).args(["recompute", "--check"]).assert().success();

    {
        let conn = rusqlite::Connection::open(dir.path().join(".taxq/taxq.db")).expect("open");
        conn.execute(
            "UPDATE workqueue SET position = 9, external_queue_position = NULL WHERE identifier = 'B2'",
            [],
        )
        .expect("tamper");
    }

    let error = json_stderr_error(tq_cmd(dir.path()).args(["recompute", "--check", "--json"]));
    assert_eq!(error["error_code"], "E5003");

    let report = json_stdout(tq_cmd(dir.path()).args(["recompute", "--json"]));
    assert_eq!(report["examined"], 2);
    assert_eq!(report["changes"].as_array().map(Vec::len), Some(1));
    tq_cmd(dir.path()).args(["recompute", "--check"]).assert().success();
    assert_eq!(
        ranks(dir.path(), false),
        vec![r("A1", Some(1), Some(1)), r("B2", Some(2), Some(2))]
    );
}

#[test]
fn stats_count_by_status() {
    let dir = setup();
    add(dir.path(), "A1", &[]);
    add(dir.path(), "B2", &["--status", "Awaiting Info"]);
    add(dir.path(), "C3", &["--status", "completed"]);

    let stats = json_stdout(tq_cmd(dir.path()).args(["stats", "--json"]));
    assert_eq!(stats["total"], 3);
    assert_eq!(stats["active"], 2);
    assert_eq!(stats["completed"], 1);
    assert_eq!(stats["staff_queue_length"], 2);
    assert_eq!(stats["client_queue_length"], 1);
    let awaiting = stats["by_status"]
        .as_array()
        .expect("by_status")
        .iter()
        .find(|s| s["name"] == "Awaiting Info")
        .expect("awaiting row");
    assert_eq!(awaiting["count"], 1);
}

#[test]
fn accounts_are_isolated() {
    let dir = setup();
    tq_cmd(dir.path())
        .args(["account", "add", "beta", "--name", "Beta CPA"])
        .assert()
        .success();
    add(dir.path(), "A1", &[]);

    let beta = json_stdout(tq_cmd(dir.path()).args(["--account", "beta", "list", "--json"]));
    assert_eq!(beta, serde_json::json!([]));

    let error = json_stderr_error(tq_cmd(dir.path()).args(["--account", "nobody", "list", "--json"]));
    assert_eq!(error["error_code"], "E2001");
}

#[test]
fn lookups_list_and_add_extension() {
    let dir = setup();
    let catalogs = json_stdout(tq_cmd(dir.path()).args(["lookups", "list", "--json"]));
    let roles: Vec<&str> = catalogs["statuses"]
        .as_array()
        .expect("statuses")
        .iter()
        .filter_map(|s| s["role"].as_str())
        .collect();
    assert!(roles.contains(&"received") && roles.contains(&"completed"));

    let added = json_stdout(tq_cmd(dir.path()).args(["lookups", "add-extension", "November 15", "--json"]));
    assert_eq!(added["name"], "November 15");

    add(dir.path(), "X9", &["--status", "extended", "--extension", "november 15"]);
}
