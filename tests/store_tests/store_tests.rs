//! Tests for the Store Engine
//!
//! These tests verify:
//! - Insert / get round trips through typed tables
//! - Upsert behaviour of attribute-derived keys
//! - Rejected rows are never written
//! - Delete, increment and decrement
//! - Listing and migration
//! - Concurrent writers do not lose updates

use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;
use std::thread;

use jsonkv::{
    Column, ColumnType, Config, KeyPolicy, NotFound, Record, Result, Row, Store,
    StoreDefinition, StoreError, StoreRegistry, Table,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tempfile::TempDir;

// =============================================================================
// Test Records
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    name: String,
    code: i64,
    count: i64,
    score: f64,
    tags: Vec<String>,
    meta: BTreeMap<String, Value>,
}

impl Record for User {
    fn definition() -> Result<StoreDefinition> {
        StoreDefinition::builder("users", KeyPolicy::hashed(["name", "code"]))
            .column(Column::required("name", ColumnType::String))
            .column(Column::required("code", ColumnType::Integer))
            .column(Column::with_default("count", ColumnType::Integer, 0))
            .column(Column::with_default("score", ColumnType::Float, 0.0))
            .column(Column::required("tags", ColumnType::List))
            .column(Column::required("meta", ColumnType::Map))
            .build()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Session {
    owner: String,
    created: i64,
}

impl Record for Session {
    fn definition() -> Result<StoreDefinition> {
        StoreDefinition::builder("sessions", KeyPolicy::Generated)
            .column(Column::required("owner", ColumnType::String))
            .column(Column::required("created", ColumnType::Integer))
            .build()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_registry() -> (TempDir, StoreRegistry) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder().data_dir(temp_dir.path()).build();
    (temp_dir, StoreRegistry::new(config))
}

fn setup_users() -> (TempDir, Table<User>) {
    let (temp, registry) = setup_registry();
    let users = registry.table::<User>().unwrap();
    (temp, users)
}

fn user(name: &str, code: i64) -> User {
    User {
        name: name.to_string(),
        code,
        count: 5,
        score: 1.5,
        tags: vec!["a".to_string(), "b".to_string()],
        meta: BTreeMap::new(),
    }
}

fn row(value: Value) -> Row {
    value.as_object().cloned().unwrap()
}

fn strict_store(temp: &TempDir) -> Store {
    let definition = StoreDefinition::builder("strict", KeyPolicy::raw(["id"]))
        .column(Column::required("id", ColumnType::String))
        .column(Column::required("size", ColumnType::Integer))
        .allow_invalid_values(false)
        .build()
        .unwrap();
    let config = Config::builder().data_dir(temp.path()).build();
    Store::open(definition, &config).unwrap()
}

// =============================================================================
// Insert / Get Tests
// =============================================================================

#[test]
fn test_open_creates_empty_document() {
    let (temp, users) = setup_users();

    let path = temp.path().join("users.json");
    assert!(path.exists());
    assert_eq!(users.store().path(), path);

    let content: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(content, json!({}));
}

#[test]
fn test_insert_get_round_trip() {
    let (_temp, users) = setup_users();
    let mut alice = user("alice", 1);
    alice.meta.insert("lang".to_string(), json!("en"));

    let key = users.insert(&alice).unwrap();
    let entity = users.get(&key).unwrap();

    assert_eq!(entity.key(), key);
    assert_eq!(entity.record(), &alice);
    assert_eq!(entity.name, "alice");
}

#[test]
fn test_insert_hashes_concatenated_attributes() {
    let (_temp, users) = setup_users();

    let key = users.insert(&user("abc", 123)).unwrap();

    // SHA-1("abc123")
    assert_eq!(key, "6367c48dd193d56ea7b0baad25b19455e529f5ee");
}

#[test]
fn test_insert_with_derived_key_is_upsert() {
    let (_temp, users) = setup_users();

    let first = users.insert(&user("bob", 7)).unwrap();
    let mut changed = user("bob", 7);
    changed.count = 99;
    let second = users.insert(&changed).unwrap();

    assert_eq!(first, second);
    assert_eq!(users.list_keys().unwrap().len(), 1);
    assert_eq!(users.get(&first).unwrap().count, 99);
}

#[test]
fn test_generated_keys_never_collide() {
    let (_temp, registry) = setup_registry();
    let sessions = registry.table::<Session>().unwrap();

    let session = Session {
        owner: "x".to_string(),
        created: 1,
    };
    let first = sessions.insert(&session).unwrap();
    let second = sessions.insert(&session).unwrap();

    assert_ne!(first, second);
    assert_eq!(sessions.list_all().unwrap().len(), 2);
}

#[test]
fn test_insert_with_explicit_key() {
    let (_temp, users) = setup_users();

    users.insert_with_key("custom", &user("carol", 3)).unwrap();

    assert_eq!(users.get("custom").unwrap().name, "carol");
}

#[test]
fn test_get_missing_key_is_not_found() {
    let (_temp, users) = setup_users();

    let err = users.get("nope").unwrap_err();

    assert!(matches!(
        err,
        StoreError::NotFound(NotFound::Key { ref key, .. }) if key == "nope"
    ));
}

#[test]
fn test_insert_coerces_raw_rows() {
    let (_temp, users) = setup_users();
    let store = users.store();

    let key = store
        .insert(&row(json!({"name": "dave", "code": "42", "score": 3, "tags": null})))
        .unwrap();
    let stored = store.get(&key).unwrap();

    assert_eq!(stored["code"], json!(42));
    assert_eq!(stored["score"].as_f64(), Some(3.0));
    assert_eq!(stored["count"], json!(0));
    assert_eq!(stored["tags"], json!([]));
    assert_eq!(stored["meta"], json!({}));
}

#[test]
fn test_rejected_row_is_not_written() {
    let temp = TempDir::new().unwrap();
    let store = strict_store(&temp);
    store.insert(&row(json!({"id": "ok", "size": 1}))).unwrap();
    let before = fs::read(store.path()).unwrap();

    let err = store
        .insert(&row(json!({"id": "bad", "size": "huge"})))
        .unwrap_err();

    assert!(matches!(err, StoreError::SchemaCoercionRejected { .. }));
    assert_eq!(fs::read(store.path()).unwrap(), before);
    assert_eq!(store.list_keys().unwrap(), vec!["ok".to_string()]);
}

#[test]
fn test_map_key_attribute_renders_as_json() {
    let temp = TempDir::new().unwrap();
    let definition = StoreDefinition::builder("t", KeyPolicy::raw(["id"]))
        .column(Column::required("id", ColumnType::Map))
        .build()
        .unwrap();
    let store = Store::open(definition, &Config::builder().data_dir(temp.path()).build()).unwrap();

    let key = store.insert(&row(json!({"id": {"a": 1}}))).unwrap();
    assert_eq!(key, r#"{"a":1}"#);
}

// =============================================================================
// Delete Tests
// =============================================================================

#[test]
fn test_delete_removes_row() {
    let (_temp, users) = setup_users();
    let key = users.insert(&user("erin", 1)).unwrap();

    users.delete(&key).unwrap();

    assert!(users.get(&key).unwrap_err().is_not_found());
    assert!(!users.store().contains(&key).unwrap());
}

#[test]
fn test_delete_missing_key_leaves_document_unchanged() {
    let (_temp, users) = setup_users();
    users.insert(&user("frank", 1)).unwrap();
    let before = fs::read(users.store().path()).unwrap();

    let err = users.delete("absent").unwrap_err();

    assert!(matches!(err, StoreError::NotFound(NotFound::Key { .. })));
    assert_eq!(fs::read(users.store().path()).unwrap(), before);
}

// =============================================================================
// Increment / Decrement Tests
// =============================================================================

#[test]
fn test_increment_integer() {
    let (_temp, users) = setup_users();
    let key = users.insert(&user("gina", 1)).unwrap();

    assert!(users.increment(&key, "count").unwrap());

    assert_eq!(users.get(&key).unwrap().count, 6);
}

#[test]
fn test_decrement_integer_and_float() {
    let (_temp, users) = setup_users();
    let key = users.insert(&user("hank", 1)).unwrap();

    assert!(users.decrement(&key, "count").unwrap());
    assert!(users.decrement(&key, "score").unwrap());

    let entity = users.get(&key).unwrap();
    assert_eq!(entity.count, 4);
    assert_eq!(entity.score, 0.5);
}

#[test]
fn test_increment_non_numeric_returns_false() {
    let (_temp, users) = setup_users();
    let key = users.insert(&user("ivy", 1)).unwrap();
    let before = fs::read(users.store().path()).unwrap();

    assert!(!users.increment(&key, "name").unwrap());
    assert!(!users.decrement(&key, "tags").unwrap());

    assert_eq!(fs::read(users.store().path()).unwrap(), before);
}

#[test]
fn test_increment_undeclared_column_is_not_found() {
    let (_temp, users) = setup_users();
    let key = users.insert(&user("jack", 1)).unwrap();

    let err = users.increment(&key, "visits").unwrap_err();

    assert!(matches!(err, StoreError::NotFound(NotFound::Column { .. })));
}

#[test]
fn test_increment_missing_key_is_not_found() {
    let (_temp, users) = setup_users();

    let err = users.increment("absent", "count").unwrap_err();

    assert!(matches!(err, StoreError::NotFound(NotFound::Key { .. })));
}

#[test]
fn test_increment_overflow_returns_false() {
    let (_temp, users) = setup_users();
    let mut max = user("kim", 1);
    max.count = i64::MAX;
    let key = users.insert(&max).unwrap();

    assert!(!users.increment(&key, "count").unwrap());
    assert_eq!(users.get(&key).unwrap().count, i64::MAX);
}

#[test]
fn test_integer_beyond_i64_is_rejected_by_strict_store() {
    let temp = TempDir::new().unwrap();
    let store = strict_store(&temp);

    let err = store
        .insert(&row(json!({"id": "big", "size": 9_223_372_036_854_775_808u64})))
        .unwrap_err();

    assert!(matches!(err, StoreError::SchemaCoercionRejected { ref column, .. } if column == "size"));
    assert!(store.is_empty().unwrap());
}

#[test]
fn test_integer_beyond_i64_falls_back_to_default() {
    let (_temp, users) = setup_users();
    let key = users
        .store()
        .insert(&row(json!({
            "name": "lee",
            "code": 1,
            "count": 9_223_372_036_854_775_808u64
        })))
        .unwrap();

    assert_eq!(users.get(&key).unwrap().count, 0);
    assert!(users.increment(&key, "count").unwrap());
    assert!(users.decrement(&key, "count").unwrap());
    assert!(users.decrement(&key, "count").unwrap());
    assert_eq!(users.get(&key).unwrap().count, -1);
}

// =============================================================================
// Listing Tests
// =============================================================================

#[test]
fn test_list_all_attaches_keys() {
    let (_temp, users) = setup_users();
    let k1 = users.insert(&user("lea", 1)).unwrap();
    let k2 = users.insert(&user("max", 2)).unwrap();

    let entities = users.list_all().unwrap();
    let mut keys: Vec<String> = entities.iter().map(|e| e.key().to_string()).collect();
    keys.sort();
    let mut expected = vec![k1.clone(), k2];
    expected.sort();

    assert_eq!(keys, expected);
    let lea = entities.iter().find(|e| e.key() == k1).unwrap();
    assert_eq!(lea.name, "lea");
}

#[test]
fn test_list_keys_empty_store() {
    let (_temp, users) = setup_users();

    assert!(users.list_keys().unwrap().is_empty());
    assert!(users.store().is_empty().unwrap());
}

// =============================================================================
// Migration Tests
// =============================================================================

fn write_document(path: &std::path::Path, document: Value) {
    fs::write(path, serde_json::to_vec(&document).unwrap()).unwrap();
}

#[test]
fn test_migrate_fills_new_column() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("items.json");
    write_document(
        &path,
        json!({
            "a": {"name": "one"},
            "b": {"name": "two"},
            "c": {"name": "three"}
        }),
    );

    let definition = StoreDefinition::builder("items", KeyPolicy::raw(["name"]))
        .column(Column::required("name", ColumnType::String))
        .column(Column::with_default("flag", ColumnType::Boolean, false))
        .build()
        .unwrap();
    let store = Store::open(definition, &Config::builder().data_dir(temp.path()).build()).unwrap();

    assert_eq!(store.migrate().unwrap(), 3);
    assert_eq!(store.migrate().unwrap(), 0);

    for (_, row) in store.list_all().unwrap() {
        assert_eq!(row["flag"], json!(false));
    }
}

#[test]
fn test_migrate_keeps_existing_values() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("items.json");
    write_document(
        &path,
        json!({
            "a": {"name": "one", "flag": true},
            "b": {"name": "two"}
        }),
    );

    let definition = StoreDefinition::builder("items", KeyPolicy::raw(["name"]))
        .column(Column::required("name", ColumnType::String))
        .column(Column::with_default("flag", ColumnType::Boolean, false))
        .column(Column::required("hits", ColumnType::Integer))
        .build()
        .unwrap();
    let store = Store::open(definition, &Config::builder().data_dir(temp.path()).build()).unwrap();

    assert_eq!(store.migrate().unwrap(), 2);

    let a = store.get("a").unwrap();
    assert_eq!(a["flag"], json!(true));
    assert_eq!(a["hits"], json!(0));
    assert_eq!(store.get("b").unwrap()["flag"], json!(false));
}

#[test]
fn test_migrate_without_changes_does_not_rewrite() {
    let (_temp, users) = setup_users();
    users.insert(&user("ned", 1)).unwrap();
    let modified = fs::metadata(users.store().path()).unwrap().modified().unwrap();

    assert_eq!(users.migrate().unwrap(), 0);

    assert_eq!(
        fs::metadata(users.store().path()).unwrap().modified().unwrap(),
        modified
    );
}

// =============================================================================
// Persistence / Concurrency Tests
// =============================================================================

#[test]
fn test_rows_survive_reopen() {
    let (temp, users) = setup_users();
    let key = users.insert(&user("olga", 9)).unwrap();
    drop(users);

    let registry = StoreRegistry::new(Config::builder().data_dir(temp.path()).build());
    let users = registry.table::<User>().unwrap();

    assert_eq!(users.get(&key).unwrap().record(), &user("olga", 9));
}

#[test]
fn test_concurrent_inserts_are_not_lost() {
    let (_temp, users) = setup_users();
    let store = Arc::clone(users.store());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..10 {
                    store
                        .insert(&row(json!({
                            "name": format!("thread{}", t),
                            "code": i,
                        })))
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.len().unwrap(), 80);
}

#[test]
fn test_concurrent_increments_are_not_lost() {
    let (_temp, users) = setup_users();
    let key = users.insert(&user("pat", 1)).unwrap();
    let store = Arc::clone(users.store());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            let key = key.clone();
            thread::spawn(move || {
                for _ in 0..25 {
                    assert!(store.increment(&key, "count").unwrap());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(users.get(&key).unwrap().count, 5 + 100);
}
