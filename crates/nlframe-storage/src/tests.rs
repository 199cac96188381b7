//! Round trips of the past-action store through the file system

use super::*;
use tempfile::tempdir;

fn test_store() -> (PastActionStore, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let store = PastActionStore::open(StoreConfig::at(dir.path().join("past_actions.json"))).unwrap();
    (store, dir)
}

#[test]
fn test_missing_file_is_empty() {
    let (store, dir) = test_store();
    assert!(store.is_empty());
    assert_eq!(store.load("inplace"), None);
    assert!(!dir.path().join("past_actions.json").exists());
}

#[test]
fn test_save_persists_and_reopens() {
    let (store, dir) = test_store();
    store
        .save([
            ("inplace", Literal::Bool(true)),
            ("subset_col", Literal::str("price")),
        ])
        .unwrap();

    let reopened = PastActionStore::open(StoreConfig::at(dir.path().join("past_actions.json"))).unwrap();
    assert_eq!(reopened.len(), 2);
    assert_eq!(reopened.load("inplace"), Some(Literal::Bool(true)));
    assert_eq!(reopened.load("subset_col"), Some(Literal::str("price")));
}

#[test]
fn test_save_replaces_values() {
    let (store, _dir) = test_store();
    store.save([("by", Literal::str("a"))]).unwrap();
    let first = store.entries()["by"].updated_at;
    store.save([("by", Literal::strs(["a", "b"]))]).unwrap();

    assert_eq!(store.load("by"), Some(Literal::strs(["a", "b"])));
    assert!(store.entries()["by"].updated_at >= first);
    assert_eq!(store.len(), 1);
}

#[test]
fn test_delete_and_reset() {
    let (store, dir) = test_store();
    store
        .save([("a", Literal::Int(1)), ("b", Literal::Int(2))])
        .unwrap();

    assert!(store.delete("a").unwrap());
    assert!(!store.delete("a").unwrap());
    assert_eq!(store.load("b"), Some(Literal::Int(2)));

    store.reset().unwrap();
    assert!(store.is_empty());
    let on_disk = std::fs::read_to_string(dir.path().join("past_actions.json")).unwrap();
    assert_eq!(on_disk.trim(), "{}");
}

#[test]
fn test_corrupt_file_is_reported() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("past_actions.json");
    std::fs::write(&path, "not json").unwrap();
    match PastActionStore::open(StoreConfig::at(&path)) {
        Err(StoreError::Json { path: reported, .. }) => assert_eq!(reported, path),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("corrupt store opened"),
    }
}

#[test]
fn test_nested_directories_are_created() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("memory").join("past_actions.json");
    let store = PastActionStore::open(StoreConfig::at(&path)).unwrap();
    store.save([("n", Literal::Int(5))]).unwrap();
    assert!(path.exists());
}

#[test]
fn test_store_feeds_suggestions() {
    use nlframe_codegen::{
        suggestions, ActionCatalog, Dataset, RefinerSession, SchemaSnapshot, Workspace,
    };
    use nlframe_dsl::{Combiner, EntitySet, EntityType};

    let (store, _dir) = test_store();
    store
        .save([
            ("na_position", Literal::str("first")),
            ("by", Literal::str("price")),
        ])
        .unwrap();

    let workspace = Workspace::new().with_dataset(
        "df",
        SchemaSnapshot::new(["id", "price"], [0i64, 1]),
    );
    let template = "SORT VALUES BY <value>";
    let entities = EntitySet::new().with(EntityType::Value, "id");
    let combination = Combiner::new().recombine(template, &entities).unwrap();
    let descriptor = ActionCatalog::new().resolve(template, &combination.entities);

    let mut session = RefinerSession::default();
    let dataset: &Dataset = workspace.active().unwrap();
    session.select(descriptor, dataset).unwrap();

    let found = suggestions(&session, &store, &workspace);
    let keys: Vec<&str> = found.iter().map(|s| s.parameter.as_str()).collect();
    assert_eq!(keys, vec!["by", "na_position"]);
}
