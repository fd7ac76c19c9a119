mod common;
use common::TestEnv;

#[test]
fn favorite_toggles_and_persists() {
    let t = TestEnv::new();
    t.bin().arg("init-db").assert().success();

    assert_eq!(t.stdout(&["favorite", "abc"]).trim(), "favorited abc");
    let favs: serde_json::Value =
        serde_json::from_str(&t.stdout(&["favorites", "--json"])).unwrap();
    assert_eq!(favs, serde_json::json!(["abc"]));

    assert_eq!(t.stdout(&["favorite", "abc"]).trim(), "unfavorited abc");
    let favs: serde_json::Value =
        serde_json::from_str(&t.stdout(&["favorites", "--json"])).unwrap();
    assert_eq!(favs, serde_json::json!([]));
}

#[test]
fn gc_keeps_only_listed_ids() {
    let t = TestEnv::new();
    t.stdout(&["favorite", "keep-me"]);
    t.stdout(&["favorite", "stale"]);
    t.stdout(&["note", "stale", "old crema"]);
    assert_eq!(t.stdout(&["gc", "--keep", "keep-me"]).trim(), "removed 2");
    assert_eq!(t.stdout(&["favorites"]).trim(), "keep-me");
    assert_eq!(t.stdout(&["notes"]).trim(), "");
}
