mod common;

use common::{MemoryConnection, row};
use fluentsql::prelude::*;

fn tables(names: &[&str]) -> Vec<Row> {
    names
        .iter()
        .map(|n| row([("table_name", Value::from(*n))]))
        .collect()
}

#[test]
fn loads_once_until_invalidated() {
    let mut conn = MemoryConnection::new();
    conn.push_rows(tables(&["users", " posts "]));

    let mut cache = SchemaCache::new();
    assert!(cache.has_table(&mut conn, "users").unwrap());
    assert!(cache.has_table(&mut conn, "posts").unwrap());
    assert!(!cache.has_table(&mut conn, "comments").unwrap());
    assert_eq!(conn.executed.len(), 1);
    assert_eq!(
        conn.last().sql,
        "SELECT table_name::text AS table_name FROM information_schema.tables \
         WHERE table_schema = :p1 ORDER BY table_name ASC"
    );
    assert_eq!(
        conn.last().bindings,
        vec![("p1".to_string(), Value::from("public"))]
    );

    cache.invalidate();
    conn.push_rows(tables(&["users", "comments"]));
    assert!(cache.has_table(&mut conn, "comments").unwrap());
    assert_eq!(conn.executed.len(), 2);
}

#[test]
fn empty_name_is_never_a_table() {
    let mut conn = MemoryConnection::new();
    let mut cache = SchemaCache::new();
    assert!(!cache.has_table(&mut conn, "").unwrap());
    assert!(conn.executed.is_empty());
    assert!(!cache.is_loaded());
}

#[test]
fn preload_and_custom_schema() {
    let mut conn = MemoryConnection::new();
    conn.push_rows(tables(&["jobs"]));

    let mut cache = SchemaCache::for_schema("queue");
    cache.preload(&mut conn).unwrap();
    cache.preload(&mut conn).unwrap();
    assert!(cache.is_loaded());
    assert_eq!(conn.executed.len(), 1);
    assert_eq!(
        conn.last().bindings,
        vec![("p1".to_string(), Value::from("queue"))]
    );
    assert!(cache.has_table(&mut conn, "jobs").unwrap());
}

#[test]
fn seeded_cache_skips_the_connection() {
    let mut conn = MemoryConnection::new();
    let mut cache = SchemaCache::new();
    cache.load_from(["users"]);
    assert!(cache.has_table(&mut conn, "users").unwrap());
    assert!(conn.executed.is_empty());
}

#[test]
fn failed_load_leaves_cache_empty() {
    let mut conn = MemoryConnection::new();
    conn.fail_on("information_schema");

    let mut cache = SchemaCache::new();
    assert!(cache.has_table(&mut conn, "users").is_err());
    assert!(!cache.is_loaded());
}
