//! CLI behavior: subcommands, human and JSON output, argument errors

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const SETTINGS_PROFILE: &str = r#"
[host]
package = "com.android.settings"
manufacturer = "Google"
api_level = 19

[[classes]]
name = "android.preference.PreferenceActivity"
methods = ["onBuildHeaders(java.util.List)"]

[[classes]]
name = "com.android.settings.Settings"
superclass = "android.preference.PreferenceActivity"

[[classes]]
name = "com.android.settings.applications.AppOpsSummary"

[[packages]]
uid = 10042
package = "com.example.maps"
permissions = ["android.permission.ACCESS_COARSE_LOCATION"]
ops = [
    { op = "FINE_LOCATION", mode = "ignore", last_access_ms = 1700000000000 },
    { op = "CAMERA" },
]

[strings.labels]
CAMERA = "Camera"
"#;

fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn opshim() -> Command {
    Command::cargo_bin("opshim").unwrap()
}

#[test]
fn test_help_lists_subcommands() {
    opshim()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("load"))
        .stdout(predicate::str::contains("ops"))
        .stdout(predicate::str::contains("addable"));
}

#[test]
fn test_version() {
    opshim()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("opshim "));
}

#[test]
fn test_load_human_output() {
    let dir = TempDir::new().unwrap();
    let profile = write_file(&dir, "settings.toml", SETTINGS_PROFILE);
    let prefs = write_file(&dir, "prefs.toml", "debug = false\n");

    opshim()
        .args(["load", profile.to_str().unwrap(), "--prefs", prefs.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("resources phase (com.android.settings):"))
        .stdout(predicate::str::contains("Variant: aosp_headers"))
        .stdout(predicate::str::contains("settings_icons: applied"))
        .stdout(predicate::str::contains(
            "com.android.settings.Settings#onBuildHeaders(java.util.List) (declared on android.preference.PreferenceActivity, 1 retries)",
        ))
        .stdout(predicate::str::contains("Failed hacks: 0"));
}

#[test]
fn test_load_json_respects_prefs() {
    let dir = TempDir::new().unwrap();
    let profile = write_file(&dir, "settings.toml", SETTINGS_PROFILE);
    let prefs = write_file(&dir, "prefs.toml", "[hacks]\nsettings_icons = false\n");

    let output = opshim()
        .args(["load", profile.to_str().unwrap(), "--prefs", prefs.to_str().unwrap(), "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let reports = json["reports"].as_array().unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0]["phase"], "resources");
    assert_eq!(reports[0]["variant"]["state"], "resolved");
    assert_eq!(reports[0]["resources_added"], serde_json::json!(["drawable/ic_settings_appops"]));
    assert!(reports[0]["hacks"]
        .as_array()
        .unwrap()
        .iter()
        .all(|h| h["name"] != "settings_icons"));
    assert_eq!(reports[1]["bound_hooks"][0]["retries"], 1);
}

#[test]
fn test_load_as_other_package_skips_variants() {
    let dir = TempDir::new().unwrap();
    let profile = write_file(&dir, "settings.toml", SETTINGS_PROFILE);
    let prefs = write_file(&dir, "prefs.toml", "");

    opshim()
        .args(["load", profile.to_str().unwrap(), "--prefs", prefs.to_str().unwrap(), "--package", "com.example.maps"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Variant: not a settings host"));
}

#[test]
fn test_ops_listing() {
    let dir = TempDir::new().unwrap();
    let profile = write_file(&dir, "settings.toml", SETTINGS_PROFILE);

    opshim()
        .args(["ops", profile.to_str().unwrap(), "--package", "com.example.maps"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ops for com.example.maps(10042):"))
        .stdout(predicate::str::contains("Camera [26]: allow"))
        .stdout(predicate::str::contains("FINE_LOCATION [1]: ignore (switch COARSE_LOCATION: ignore)"));
}

#[test]
fn test_addable_json() {
    let dir = TempDir::new().unwrap();
    let profile = write_file(&dir, "settings.toml", SETTINGS_PROFILE);

    let output = opshim()
        .args(["addable", profile.to_str().unwrap(), "--package", "com.example.maps", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let location: Vec<u64> = json["0"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_u64().unwrap())
        .collect();
    // FINE_LOCATION and its switch representative are already tracked
    assert_eq!(location, vec![2, 10, 12, 41, 42]);
    assert!(json.get("26").is_none());
    assert!(json.get("4").is_none());
}

#[test]
fn test_unknown_package_fails() {
    let dir = TempDir::new().unwrap();
    let profile = write_file(&dir, "settings.toml", SETTINGS_PROFILE);

    opshim()
        .args(["ops", profile.to_str().unwrap(), "--package", "com.unknown"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("com.unknown is not described by the profile"));
}

#[test]
fn test_missing_profile_fails() {
    opshim()
        .args(["load", "/nonexistent/profile.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Path does not exist"));
}

#[test]
fn test_invalid_profile_fails() {
    let dir = TempDir::new().unwrap();
    let profile = write_file(&dir, "bad.toml", "[host]\npackage = \"\"\napi_level = 19\n");

    opshim()
        .args(["ops", profile.to_str().unwrap(), "--package", "com.example"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("host.package must not be empty"));
}
