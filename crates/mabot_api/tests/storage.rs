use std::fs;

use mabot_api::{FileStore, KeyValueStore, MemoryStore, StorageError};

#[test]
fn memory_store_set_get_remove() {
    let store = MemoryStore::new();
    assert!(store.get("k").is_none());

    store.set("k", "v").expect("set");
    assert_eq!(store.get("k").as_deref(), Some("v"));

    store.remove("k").expect("remove");
    assert!(store.get("k").is_none());
    store.remove("k").expect("removing a missing key is a no-op");
}

#[test]
fn file_store_persists_across_reopen() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let path = dir.path().join("state").join("credentials.json");

    let store = FileStore::open(&path).expect("missing file opens empty");
    store.set("mabot_access_token", "a1").expect("set access");
    store.set("mabot_refresh_token", "r1").expect("set refresh");
    store.remove("mabot_access_token").expect("remove access");

    let reopened = FileStore::open(&path).expect("reopen");
    assert!(reopened.get("mabot_access_token").is_none());
    assert_eq!(reopened.get("mabot_refresh_token").as_deref(), Some("r1"));
}

#[test]
fn file_store_rejects_malformed_json() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let path = dir.path().join("broken.json");
    fs::write(&path, "{not json").expect("write broken file");

    let error = FileStore::open(&path).expect_err("malformed file must fail");
    assert!(matches!(error, StorageError::Json { .. }));
}

#[test]
fn file_store_treats_blank_file_as_empty() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let path = dir.path().join("blank.json");
    fs::write(&path, "  \n").expect("write blank file");

    let store = FileStore::open(&path).expect("blank file opens empty");
    assert!(store.get("anything").is_none());
}
