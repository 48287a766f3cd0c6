//! Integration tests for the VPM CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

/// Helper to get a vpm command isolated from the caller's environment
fn vpm() -> Command {
    let mut cmd = Command::cargo_bin("vpm").unwrap();
    for key in [
        "VPM_DATABASE",
        "VPM_LOCK_TIMEOUT_MS",
        "VPM_STALE_REVIEW_DAYS",
        "VPM_LOG",
        "VPM_ALPHAVANTAGE_KEY",
        "VPM_ALPHAVANTAGE_URL",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

/// Helper to create a test project in a temp directory
fn setup_test_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    vpm().current_dir(tmp.path()).arg("init").assert().success();
    tmp
}

/// Run a creating command in quiet mode and return the printed ID
fn create(tmp: &TempDir, args: &[&str]) -> String {
    let output = vpm()
        .current_dir(tmp.path())
        .arg("-q")
        .args(args)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "{:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Run a command with `--format json` and parse stdout
fn json(tmp: &TempDir, args: &[&str]) -> Value {
    let output = vpm()
        .current_dir(tmp.path())
        .args(["--format", "json"])
        .args(args)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "{:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

fn create_manufacturer(tmp: &TempDir, name: &str, rating: &str) -> String {
    create(tmp, &["mfr", "new", "--name", name, "--rating", rating])
}

fn create_part(tmp: &TempDir, mfr: &str, stock: &str, threshold: &str) -> String {
    create(
        tmp,
        &[
            "part",
            "new",
            "--model",
            "ECM-TEMP-SENSOR",
            "--manufacturer",
            mfr,
            "--stock",
            stock,
            "--threshold",
            threshold,
        ],
    )
}

// ============================================================================
// CLI Basic Tests
// ============================================================================

#[test]
fn test_help_displays() {
    vpm()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("referential integrity"));
}

#[test]
fn test_version_displays() {
    vpm()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("vpm"));
}

#[test]
fn test_init_creates_project() {
    let tmp = setup_test_project();
    assert!(tmp.path().join(".vpm/config.yaml").is_file());
    assert!(tmp.path().join(".vpm/catalog.db").is_file());
}

#[test]
fn test_init_twice_reports_existing() {
    let tmp = setup_test_project();
    vpm()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn test_commands_outside_project_fail() {
    let tmp = TempDir::new().unwrap();
    vpm()
        .current_dir(tmp.path())
        .args(["mfr", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a VPM project"));
}

#[test]
fn test_project_flag_from_elsewhere() {
    let tmp = setup_test_project();
    let elsewhere = TempDir::new().unwrap();
    vpm()
        .current_dir(elsewhere.path())
        .arg("--project")
        .arg(tmp.path())
        .args(["mfr", "new", "--name", "Oshkosh", "--rating", "B"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created manufacturer MFR-"));
}

// ============================================================================
// Create / show / update
// ============================================================================

#[test]
fn test_create_and_show_part() {
    let tmp = setup_test_project();
    let mfr = create_manufacturer(&tmp, "AM General", "B");
    let part = create_part(&tmp, &mfr, "5", "10");
    assert!(part.starts_with("PART-"));

    let shown = json(&tmp, &["show", &part]);
    assert_eq!(shown["record"]["kind"], "part");
    assert_eq!(shown["record"]["manufacturer"], mfr.as_str());
    assert_eq!(shown["record"]["stock_level"], 5);
    assert_eq!(shown["version"], 1);
    assert!(shown["retired_at"].is_null());

    vpm()
        .current_dir(tmp.path())
        .args(["show", &part])
        .assert()
        .success()
        .stdout(predicate::str::contains("ECM-TEMP-SENSOR"))
        .stdout(predicate::str::contains("live"));
}

#[test]
fn test_dangling_manufacturer_rejected() {
    let tmp = setup_test_project();
    vpm()
        .current_dir(tmp.path())
        .args([
            "part",
            "new",
            "--model",
            "APA-SENSOR",
            "--manufacturer",
            "MFR-01ARZ3NDEKTSV4RRFFQ69G5FAV",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing"));

    let parts = json(&tmp, &["part", "list"]);
    assert_eq!(parts.as_array().unwrap().len(), 0);
}

#[test]
fn test_wrong_kind_id_rejected_before_store() {
    let tmp = setup_test_project();
    let mfr = create_manufacturer(&tmp, "AM General", "B");
    vpm()
        .current_dir(tmp.path())
        .args(["cert", "new", "--part", &mfr])
        .args(["--level", "MIL-STD-810H", "--valid-until", "2030-01-01"])
        .args(["--authority", "DCMA"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected a part"));
}

#[test]
fn test_set_updates_fields_and_rejects_unknown() {
    let tmp = setup_test_project();
    let mfr = create_manufacturer(&tmp, "AM General", "B");
    let part = create_part(&tmp, &mfr, "5", "10");

    let result = json(&tmp, &["set", &part, "unit_cost=42.5", "category=sensor"]);
    assert_eq!(result["version"], 2);
    let shown = json(&tmp, &["show", &part]);
    assert_eq!(shown["record"]["unit_cost"], 42.5);
    assert_eq!(shown["record"]["category"], "sensor");

    vpm()
        .current_dir(tmp.path())
        .args(["set", &part, "colour=green"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown field"));
}

#[test]
fn test_set_with_stale_version_is_busy() {
    let tmp = setup_test_project();
    let mfr = create_manufacturer(&tmp, "AM General", "B");
    vpm()
        .current_dir(tmp.path())
        .args(["set", &mfr, "location=\"South Bend\"", "--expect-version", "7"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("busy"));
}

#[test]
fn test_stock_movements() {
    let tmp = setup_test_project();
    let mfr = create_manufacturer(&tmp, "AM General", "B");
    let part = create_part(&tmp, &mfr, "5", "10");

    let result = json(&tmp, &["stock", &part, "7", "--received-on", "2026-03-01"]);
    assert_eq!(result["stock"], 12);

    let result = json(&tmp, &["stock", &part, "-2"]);
    assert_eq!(result["stock"], 10);

    vpm()
        .current_dir(tmp.path())
        .args(["stock", &part, "-11"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("stock_level"));

    let shown = json(&tmp, &["show", &part]);
    assert_eq!(shown["record"]["stock_level"], 10);
    assert_eq!(shown["record"]["last_received"], "2026-03-01");
}

// ============================================================================
// Retire / purge / dependents
// ============================================================================

#[test]
fn test_retire_blocked_by_live_dependents() {
    let tmp = setup_test_project();
    let mfr = create_manufacturer(&tmp, "AM General", "B");
    let part = create_part(&tmp, &mfr, "5", "10");

    let deps = json(&tmp, &["dependents", &mfr]);
    assert_eq!(deps, serde_json::json!([part]));

    vpm()
        .current_dir(tmp.path())
        .args(["retire", &mfr])
        .assert()
        .failure()
        .stderr(predicate::str::contains(part.as_str()));

    vpm()
        .current_dir(tmp.path())
        .args(["retire", &part])
        .assert()
        .success()
        .stdout(predicate::str::contains("Retired"));
    vpm()
        .current_dir(tmp.path())
        .args(["retire", &mfr])
        .assert()
        .success();
    vpm()
        .current_dir(tmp.path())
        .args(["retire", &mfr])
        .assert()
        .success()
        .stdout(predicate::str::contains("already retired"));

    let shown = json(&tmp, &["show", &mfr]);
    assert!(shown["retired_at"].is_string());
}

#[test]
fn test_retired_manufacturer_cannot_be_referenced() {
    let tmp = setup_test_project();
    let mfr = create_manufacturer(&tmp, "AM General", "B");
    vpm()
        .current_dir(tmp.path())
        .args(["retire", &mfr])
        .assert()
        .success();
    vpm()
        .current_dir(tmp.path())
        .args(["part", "new", "--model", "X", "--manufacturer", &mfr])
        .assert()
        .failure()
        .stderr(predicate::str::contains("retired"));
}

#[test]
fn test_purge_requires_no_referrers() {
    let tmp = setup_test_project();
    let mfr = create_manufacturer(&tmp, "AM General", "B");
    let part = create_part(&tmp, &mfr, "5", "10");
    vpm()
        .current_dir(tmp.path())
        .args(["retire", &part])
        .assert()
        .success();

    vpm()
        .current_dir(tmp.path())
        .args(["purge", &mfr])
        .assert()
        .failure()
        .stderr(predicate::str::contains(part.as_str()));

    vpm()
        .current_dir(tmp.path())
        .args(["purge", &part])
        .assert()
        .success();
    vpm()
        .current_dir(tmp.path())
        .args(["purge", &mfr])
        .assert()
        .success();
    vpm()
        .current_dir(tmp.path())
        .args(["show", &mfr])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

// ============================================================================
// Monitor and queries
// ============================================================================

#[test]
fn test_alerts_reorder_and_expired_certification() {
    let tmp = setup_test_project();
    let mfr = create_manufacturer(&tmp, "AM General", "B");
    let part = create_part(&tmp, &mfr, "3", "5");
    create(
        &tmp,
        &[
            "cert",
            "new",
            "--part",
            &part,
            "--level",
            "MIL-STD-810H",
            "--valid-until",
            "2020-01-01",
            "--authority",
            "DCMA",
        ],
    );

    let alerts = json(&tmp, &["alerts"]);
    let alerts = alerts.as_array().unwrap();
    assert_eq!(alerts.len(), 2);
    let reorder = alerts
        .iter()
        .find(|a| a["alert"] == "reorder_needed")
        .unwrap();
    assert_eq!(reorder["entity"], part.as_str());
    assert_eq!(reorder["recommended_quantity"], 6);
    assert!(alerts.iter().any(|a| a["alert"] == "certification_expired"));

    let only_reorder = json(&tmp, &["alerts", "--kind", "reorder"]);
    assert_eq!(only_reorder.as_array().unwrap().len(), 1);
}

#[test]
fn test_alerts_supply_risk_and_unrenewed_contract() {
    let tmp = setup_test_project();
    let mfr = create_manufacturer(&tmp, "Failing Fab", "D");
    let part = create(
        &tmp,
        &[
            "part",
            "new",
            "--model",
            "ECM-CORE",
            "--manufacturer",
            &mfr,
            "--criticality",
            "mission_critical",
        ],
    );
    let contract = create(
        &tmp,
        &[
            "contract",
            "new",
            "--manufacturer",
            &mfr,
            "--part",
            &part,
            "--date",
            "2020-01-01",
            "--quantity",
            "10",
            "--unit-price",
            "99.5",
            "--months",
            "12",
        ],
    );
    create(
        &tmp,
        &[
            "xref",
            "new",
            "--part",
            &part,
            "--manufacturer",
            &mfr,
            "--contract",
            &contract,
            "--primary",
        ],
    );

    let alerts = json(&tmp, &["alerts"]);
    let labels: Vec<&str> = alerts
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["alert"].as_str().unwrap())
        .collect();
    assert!(labels.contains(&"supply_risk_critical"));
    assert!(labels.contains(&"contract_expiring_unrenewed"));
}

#[test]
fn test_no_alerts_message() {
    let tmp = setup_test_project();
    vpm()
        .current_dir(tmp.path())
        .arg("alerts")
        .assert()
        .success()
        .stdout(predicate::str::contains("No alerts"))
        .stdout(predicate::str::contains("ALERT").not())
        .stdout(predicate::str::contains("alert(s)").not());

    vpm()
        .current_dir(tmp.path())
        .args(["-q", "alerts"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_query_below_threshold() {
    let tmp = setup_test_project();
    let good = create_manufacturer(&tmp, "Good Co", "A");
    let weak = create_manufacturer(&tmp, "Weak Co", "C");
    let low_good = create_part(&tmp, &good, "1", "5");
    let low_weak = create_part(&tmp, &weak, "2", "5");
    create_part(&tmp, &weak, "9", "5");

    let rows = json(&tmp, &["query", "below-threshold"]);
    let ids: Vec<&str> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["part"]["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![low_good.as_str(), low_weak.as_str()]);

    let rows = json(&tmp, &["query", "below-threshold", "--rated-below", "B"]);
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["part"]["id"], low_weak.as_str());
    assert_eq!(rows[0]["manufacturer_name"], "Weak Co");
}

#[test]
fn test_query_maintenance_and_stale_reviews() {
    let tmp = setup_test_project();
    let mfr = create_manufacturer(&tmp, "AM General", "B");
    let module = create(
        &tmp,
        &[
            "module",
            "new",
            "--type",
            "ECM",
            "--model",
            "M1078 ECM",
            "--manufacturer",
            &mfr,
            "--environment",
            "LMTV M1078",
            "--status",
            "under_review",
        ],
    );

    let rows = json(&tmp, &["query", "maintenance", "m1078"]);
    assert_eq!(rows.as_array().unwrap().len(), 1);
    assert_eq!(rows[0]["id"], module.as_str());

    let stale = json(&tmp, &["query", "stale-reviews"]);
    assert_eq!(stale[0]["manufacturer"]["id"], mfr.as_str());
    assert!(stale[0]["days_since_review"].is_null());
}

// ============================================================================
// Financials, import, audit
// ============================================================================

#[test]
fn test_financials_from_statement() {
    let tmp = setup_test_project();
    let mfr = create_manufacturer(&tmp, "Honeywell", "A");
    let statement = tmp.path().join("hon.json");
    fs::write(
        &statement,
        r#"{"symbol":"HON","annualReports":[
            {"fiscalDateEnding":"2024-12-31","totalRevenue":"38498000000","netIncome":"5705000000","ebitda":"None"},
            {"fiscalDateEnding":"2023-12-31","totalRevenue":"36662000000","netIncome":"5658000000","ebitda":"9000000000"}
        ]}"#,
    )
    .unwrap();

    let updated = json(
        &tmp,
        &[
            "mfr",
            "financials",
            &mfr,
            "--file",
            statement.to_str().unwrap(),
            "--reviewed-on",
            "2026-03-01",
        ],
    );
    assert_eq!(updated["annual_revenue"], 38498000000.0);
    assert_eq!(updated["revenue_growth_rate"], 5.01);
    assert!(updated["ebitda"].is_null());
    assert_eq!(updated["last_financial_review"], "2026-03-01");
}

#[test]
fn test_financials_rejects_in_band_error() {
    let tmp = setup_test_project();
    let mfr = create_manufacturer(&tmp, "Honeywell", "A");
    let statement = tmp.path().join("bad.json");
    fs::write(&statement, r#"{"Error Message": "Invalid API call."}"#).unwrap();

    vpm()
        .current_dir(tmp.path())
        .args(["mfr", "financials", &mfr, "--file"])
        .arg(&statement)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid API call"));
}

/// Serve one canned JSON response on a local port; returns the query URL
fn serve_statement(body: &'static str) -> (String, std::thread::JoinHandle<String>) {
    use std::io::{BufRead, BufReader, Write};

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/query", listener.local_addr().unwrap());
    let handle = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                break;
            }
        }
        write!(
            stream,
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        )
        .unwrap();
        request_line
    });
    (url, handle)
}

#[test]
fn test_financials_fetched_by_symbol() {
    let tmp = setup_test_project();
    let mfr = create_manufacturer(&tmp, "Honeywell", "A");
    let (url, server) = serve_statement(
        r#"{"symbol":"HON","annualReports":[
            {"fiscalDateEnding":"2024-12-31","totalRevenue":"38498000000","netIncome":"5705000000","ebitda":"None"},
            {"fiscalDateEnding":"2023-12-31","totalRevenue":"36662000000","netIncome":"5658000000","ebitda":"9000000000"}
        ]}"#,
    );

    let output = vpm()
        .current_dir(tmp.path())
        .env("VPM_ALPHAVANTAGE_KEY", "demo")
        .env("VPM_ALPHAVANTAGE_URL", &url)
        .args(["--format", "json", "mfr", "financials", &mfr, "--symbol", "HON"])
        .args(["--reviewed-on", "2026-03-01"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    let updated: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(updated["annual_revenue"], 38498000000.0);
    assert_eq!(updated["revenue_growth_rate"], 5.01);

    let request = server.join().unwrap();
    assert!(request.contains("function=INCOME_STATEMENT"));
    assert!(request.contains("symbol=HON"));
}

#[test]
fn test_financials_by_symbol_needs_api_key() {
    let tmp = setup_test_project();
    let mfr = create_manufacturer(&tmp, "Honeywell", "A");

    vpm()
        .current_dir(tmp.path())
        .args(["mfr", "financials", &mfr, "--symbol", "HON"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("API key"));
}

#[test]
fn test_import_contracts_reports_failures() {
    let tmp = setup_test_project();
    let mfr = create_manufacturer(&tmp, "Allison", "B");
    let csv = tmp.path().join("contracts.csv");
    fs::write(
        &csv,
        format!(
            "manufacturer,contract_date,quantity,unit_price,duration_months\n\
             {mfr},2026-01-01,10,12.5,24\n\
             {mfr},2026-01-01,0,12.5,24\n"
        ),
    )
    .unwrap();

    vpm()
        .current_dir(tmp.path())
        .args(["import", "contracts"])
        .arg(&csv)
        .assert()
        .failure()
        .stdout(predicate::str::contains("Created contract CTR-"))
        .stderr(predicate::str::contains("Row 3"));

    let contracts = json(&tmp, &["contract", "list", "--for", &mfr]);
    assert_eq!(contracts.as_array().unwrap().len(), 1);
}

#[test]
fn test_import_template() {
    vpm()
        .args(["import", "contracts", "--template"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("manufacturer,module,part,contract_date"));
}

#[test]
fn test_audit_records_changes() {
    let tmp = setup_test_project();
    let mfr = create_manufacturer(&tmp, "AM General", "B");
    vpm()
        .current_dir(tmp.path())
        .args(["set", &mfr, "financial_health=\"D\""])
        .assert()
        .success();

    let trail = json(&tmp, &["audit", &mfr]);
    let last = trail.as_array().unwrap().last().unwrap().clone();
    assert_eq!(last["field"], "financial_health");
    assert_eq!(last["old_value"], "B");
    assert_eq!(last["new_value"], "D");
}

#[test]
fn test_conflicting_contracts_rejected() {
    let tmp = setup_test_project();
    let mfr = create_manufacturer(&tmp, "Allison", "B");
    let part = create_part(&tmp, &mfr, "5", "2");
    let contract = |date: &str| {
        create(
            &tmp,
            &[
                "contract",
                "new",
                "--manufacturer",
                &mfr,
                "--date",
                date,
                "--quantity",
                "5",
                "--unit-price",
                "10",
            ],
        )
    };
    let first = contract("2026-01-01");
    let second = contract("2026-02-01");

    create(
        &tmp,
        &["xref", "new", "--part", &part, "--manufacturer", &mfr, "--contract", &first],
    );
    vpm()
        .current_dir(tmp.path())
        .args(["xref", "new", "--part", &part, "--manufacturer", &mfr])
        .args(["--contract", &second])
        .assert()
        .failure()
        .stderr(predicate::str::contains(first.as_str()));
}
