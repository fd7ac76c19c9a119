mod common;
use common::{closed_base, TestEnv};
use predicates::prelude::*;

#[test]
fn config_json_reports_paths_and_overrides() {
    let t = TestEnv::new();
    let out = t.stdout(&["--base-url", "http://localhost:1", "config", "--json"]);
    let v: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(v["storage"], "localsqlite");
    assert_eq!(v["db_path"], serde_json::json!(t.db));
    assert_eq!(v["base_url"], "http://localhost:1");
    assert_eq!(v["default_count"], 3);
    assert_eq!(v["theme"], "dark");
    assert!(v["settings_path"]
        .as_str()
        .unwrap()
        .ends_with("settings.toml"));
}

#[test]
fn settings_file_sets_default_count() {
    let t = TestEnv::new();
    let dir = t.cfg.join("cuppa");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("settings.toml"), "[source]\ndefault_count = 7\n").unwrap();
    let v: serde_json::Value = serde_json::from_str(&t.stdout(&["config", "--json"])).unwrap();
    assert_eq!(v["default_count"], 7);
}

#[test]
fn doctor_reports_unreachable_upstream() {
    let t = TestEnv::new();
    t.bin()
        .args(["--base-url", &closed_base(), "doctor"])
        .assert()
        .success()
        .stdout(predicate::str::contains("store: ok"))
        .stdout(predicate::str::contains("upstream: unreachable"));
}
