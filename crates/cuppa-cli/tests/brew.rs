mod common;
use common::{closed_base, serve_ok, TestEnv};
use predicates::prelude::*;

#[test]
fn invalid_counts_are_rejected() {
    let t = TestEnv::new();
    for bad in ["0", "-1", "abc", "2.5"] {
        t.bin()
            .args(["--base-url", &closed_base(), "brew", bad])
            .assert()
            .failure()
            .stdout(predicate::str::is_empty())
            .stderr(predicate::str::contains("positive"));
    }
}

#[test]
fn brew_json_lists_batch_newest_first() {
    let t = TestEnv::new();
    let base = serve_ok(3);
    let out = t.stdout(&["--base-url", &base, "brew", "3", "--json"]);
    let rows: serde_json::Value = serde_json::from_str(&out).unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    let stamps: Vec<i64> = rows.iter().map(|r| r["added_at"].as_i64().unwrap()).collect();
    assert!(stamps.windows(2).all(|w| w[0] >= w[1]));
    for r in rows {
        let url = r["source_url"].as_str().unwrap();
        assert!(url.starts_with(&format!("{base}/random?t=")));
        assert_eq!(r["display_url"], r["source_url"]);
        assert!(r["filename"].as_str().unwrap().ends_with(".jpg"));
        assert_eq!(r["favorite"], false);
        assert!(r["note"].is_null());
    }
}

#[test]
fn invalid_query_warns_and_shows_everything() {
    let t = TestEnv::new();
    let base = serve_ok(2);
    t.bin()
        .args(["--base-url", &base, "brew", "2", "--query", "mocha!"])
        .assert()
        .success()
        .stderr(predicate::str::contains("invalid search"))
        .stdout(predicate::function(|s: &str| s.lines().count() == 2));
}

#[test]
fn unreachable_upstream_prints_nothing() {
    let t = TestEnv::new();
    t.bin()
        .args(["--base-url", &closed_base(), "brew", "2"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("1 of 2"));
}
