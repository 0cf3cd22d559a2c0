use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(path)
}

fn policies_json(extra: &[&str]) -> serde_json::Value {
    let output = Command::new(assert_cmd::cargo::cargo_bin!("fbx-policymap"))
        .arg("policies")
        .arg(fixture("fixtures/sample-profile.xml"))
        .args(["--format", "json"])
        .args(extra)
        .output()
        .expect("run policies");
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).expect("policies json")
}

fn names(policies: &serde_json::Value) -> Vec<String> {
    policies
        .as_array()
        .expect("array")
        .iter()
        .map(|p| p["name"].as_str().expect("name").to_string())
        .collect()
}

#[test]
fn policies_include_overlay_variant_after_base_policies() {
    let policies = policies_json(&[]);
    assert_eq!(names(&policies), vec!["P1", "WebIn", "Loop", "Admin", "P1"]);

    let base = &policies[0];
    assert_eq!(base["id"], "42");
    assert_eq!(base["src_cidrs"], serde_json::json!(["10.0.1.0/24", "10.0.2.0/24"]));
    assert_eq!(base["dst_cidrs"], serde_json::json!(["203.0.113.0/29"]));
    assert_eq!(base["nat"]["dnat"], true);

    let variant = &policies[4];
    assert_eq!(variant["from_refs"], serde_json::json!(["SpecialHost"]));
    assert_eq!(variant["src_cidrs"], serde_json::json!(["10.0.1.99/32"]));
    assert_eq!(variant["dst_cidrs"], base["dst_cidrs"]);
    assert_eq!(variant["tags"], serde_json::json!(["abs-policy:O1"]));
    assert_eq!(variant["nat"], base["nat"]);
}

#[test]
fn policies_carry_prefixed_resolution_notes() {
    let policies = policies_json(&[]);
    assert_eq!(
        policies[1]["notes"],
        serde_json::json!(["to: DMZ-Web: Retired-Web: alias not found"])
    );
    assert_eq!(
        policies[2]["notes"],
        serde_json::json!(["from: A: Cycle detected at B"])
    );
    assert_eq!(
        policies[3]["notes"],
        serde_json::json!(["to: Mgmt: Firebox: device has no address space"])
    );
    assert_eq!(policies[3]["id"], "Admin");
    assert!(policies[3].get("nat").is_none());
}

#[test]
fn host_filter_on_source_side() {
    let policies = policies_json(&["--host", "10.0.1.99", "--side", "src"]);
    assert_eq!(names(&policies), vec!["P1", "Admin", "P1"]);
}

#[test]
fn subnet_filter_on_destination_side() {
    let policies = policies_json(&["--subnet", "172.16.5.0/24", "--side", "dst"]);
    assert_eq!(names(&policies), vec!["WebIn"]);
}

#[test]
fn invalid_subnet_filter_matches_nothing() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("fbx-policymap"));
    cmd.arg("policies")
        .arg(fixture("fixtures/sample-profile.xml"))
        .args(["--subnet", "10.0.0.0/99", "--summary"])
        .assert()
        .success()
        .stdout(predicate::str::contains("policies=0"));
}

#[test]
fn exported_policies_reimport_without_duplicates() {
    let dir = tempdir().expect("tempdir");
    let export = dir.path().join("export.json");
    let output = Command::new(assert_cmd::cargo::cargo_bin!("fbx-policymap"))
        .arg("policies")
        .arg(fixture("fixtures/sample-profile.xml"))
        .args(["--format", "json"])
        .output()
        .expect("export policies");
    assert!(output.status.success());
    fs::write(&export, &output.stdout).expect("write export");

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("fbx-policymap"));
    cmd.arg("policies")
        .arg(fixture("fixtures/sample-profile.xml"))
        .arg("--import")
        .arg(&export)
        .arg("--summary")
        .assert()
        .success()
        .stdout(predicate::str::contains("policies=5"))
        .stdout(predicate::str::contains("- origin config: 5"))
        .stdout(predicate::str::contains("origin import").not());
}

#[test]
fn imported_policies_are_merged_after_profile() {
    let dir = tempdir().expect("tempdir");
    let sheet = dir.path().join("sheet.json");
    fs::write(
        &sheet,
        r#"[
  {"name": "Backup", "service": "SSH", "src_cidrs": ["10.0.2.10"], "dst_cidrs": ["198.51.100.0/24"]},
  {"id": "99", "name": "P1", "service": "HTTP",
   "src_cidrs": ["10.0.1.0/24", "10.0.2.0/24"], "dst_cidrs": ["203.0.113.0/29"], "origin": "sheet"}
]"#,
    )
    .expect("write sheet");

    let policies = policies_json(&["--import", sheet.to_str().expect("utf-8 path")]);
    assert_eq!(
        names(&policies),
        vec!["P1", "WebIn", "Loop", "Admin", "P1", "Backup"]
    );
    assert_eq!(policies[5]["origin"], "import");
    assert_eq!(policies[5]["id"], "Backup");
}

#[test]
fn missing_import_file_is_an_error() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("fbx-policymap"));
    cmd.arg("policies")
        .arg(fixture("fixtures/sample-profile.xml"))
        .args(["--import", "/nonexistent/sheet.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to import"));
}

#[test]
fn text_output_shows_refs_and_overlay_tag() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("fbx-policymap"));
    cmd.arg("policies")
        .arg(fixture("fixtures/sample-profile.xml"))
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "from: InsideAny -> 10.0.1.0/24, 10.0.2.0/24",
        ))
        .stdout(predicate::str::contains("tags=abs-policy:O1"))
        .stdout(predicate::str::contains("Decommissioned").not());
}
