// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use serde_json::json;
use yare::parameterized;

#[parameterized(
    string = { json!("pending"), Some("pending") },
    integer = { json!(1700000000123u64), Some("1700000000123") },
    boolean = { json!(true), Some("true") },
    null = { json!(null), None },
    array = { json!([1, 2]), None },
    object = { json!({"a": 1}), None },
)]
fn index_value_normalization(value: serde_json::Value, expected: Option<&str>) {
    assert_eq!(index_value(&value).as_deref(), expected);
}

#[test]
fn offline_schema_declares_every_store() {
    for name in [
        stores::EVENTS,
        stores::SESSIONS,
        stores::SPEAKERS,
        stores::VENUES,
        stores::REGISTRATIONS,
        stores::SYNC_META,
        stores::MUTATION_QUEUE,
    ] {
        assert!(OFFLINE_SCHEMA.store(name).is_ok(), "missing store {name}");
    }
}

#[test]
fn mutation_queue_is_indexed_by_status_and_created_at() {
    let store = OFFLINE_SCHEMA.store(stores::MUTATION_QUEUE).unwrap();
    assert!(store.index("status").is_ok());
    assert!(store.index("createdAt").is_ok());
    assert!(matches!(
        store.index("operationName"),
        Err(Error::UnknownIndex { .. })
    ));
}

#[test]
fn unknown_store_is_an_error() {
    assert!(matches!(
        OFFLINE_SCHEMA.store("attendees"),
        Err(Error::UnknownStore(name)) if name == "attendees"
    ));
}

#[test]
fn key_of_reads_key_path() {
    let meta = OFFLINE_SCHEMA.store(stores::SYNC_META).unwrap();
    let key = meta.key_of(&json!({"key": "last_sync_completed_at", "value": 1})).unwrap();
    assert_eq!(key, "last_sync_completed_at");

    assert!(matches!(
        meta.key_of(&json!({"id": "x"})),
        Err(Error::MissingKey { .. })
    ));
}

#[test]
fn index_entries_skip_missing_fields() {
    let registrations = OFFLINE_SCHEMA.store(stores::REGISTRATIONS).unwrap();
    let entries = registrations.index_entries(&json!({"id": "r1", "eventId": "evt-1"}));
    assert_eq!(entries, vec![("eventId", "evt-1".to_string())]);
}
