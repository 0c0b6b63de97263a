// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::clock::ManualClock;
use crate::schema::OFFLINE_SCHEMA;
use serde_json::json;
use std::sync::Barrier;
use tempfile::TempDir;

fn setup() -> (SocketQueue, Arc<ManualClock>, Arc<DurableStore>) {
    let clock = Arc::new(ManualClock::new(1_000));
    let store = Arc::new(DurableStore::in_memory(&OFFLINE_SCHEMA));
    (SocketQueue::new(store.clone(), clock.clone()), clock, store)
}

fn message(text: &str) -> NewSocketEvent {
    NewSocketEvent::new("chat:send", json!({ "text": text }))
}

#[test]
fn pending_is_creation_ordered_regardless_of_storage_order() {
    let (queue, clock, _) = setup();
    clock.set(30);
    queue.queue("chat", "s1", message("third"));
    clock.set(10);
    queue.queue("chat", "s1", message("first"));
    clock.set(20);
    queue.queue("chat", "s1", message("second"));

    let texts: Vec<String> = queue
        .pending("chat", "s1")
        .into_iter()
        .map(|e| e.payload["text"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(texts, vec!["first", "second", "third"]);
}

#[test]
fn queues_are_independent_per_feature_and_session() {
    let (queue, _, _) = setup();
    queue.queue("chat", "s1", message("a"));
    queue.queue("chat", "s2", message("b"));
    queue.queue("qa", "s1", message("c"));

    assert_eq!(queue.pending("chat", "s1").len(), 1);
    assert_eq!(queue.pending("chat", "s2").len(), 1);
    assert_eq!(queue.pending("qa", "s1").len(), 1);
    assert!(queue.pending("qa", "s2").is_empty());
}

#[test]
fn every_event_gets_its_own_idempotency_key() {
    let (queue, _, _) = setup();
    let a = queue.queue("chat", "s1", message("a").with_optimistic_id("tmp-1"));
    let b = queue.queue("chat", "s1", message("b"));

    assert_ne!(a.idempotency_key, b.idempotency_key);
    assert_ne!(a.id, b.id);
    assert_eq!(a.optimistic_id.as_deref(), Some("tmp-1"));
}

#[test]
fn removing_the_last_event_drops_the_entry() {
    let (queue, _, store) = setup();
    let a = queue.queue("chat", "s1", message("a"));
    let b = queue.queue("chat", "s1", message("b"));

    assert!(queue.remove("chat", "s1", &a.id));
    assert!(!queue.remove("chat", "s1", &a.id));
    assert_eq!(queue.pending("chat", "s1"), vec![b.clone()]);

    assert!(queue.remove("chat", "s1", &b.id));
    assert!(meta::get_meta(&store, &queue_key("chat", "s1")).is_none());
}

#[test]
fn clear_empties_one_queue() {
    let (queue, _, _) = setup();
    queue.queue("chat", "s1", message("a"));
    queue.queue("chat", "s2", message("b"));

    queue.clear("chat", "s1");
    assert!(queue.pending("chat", "s1").is_empty());
    assert_eq!(queue.pending("chat", "s2").len(), 1);
}

#[test]
fn stored_under_prefixed_meta_key() {
    let (queue, _, store) = setup();
    queue.queue("chat", "s1", message("a"));
    let entry = meta::get_meta(&store, "socket_queue_chat_s1").unwrap();
    assert_eq!(entry.value.as_array().unwrap().len(), 1);
    assert_eq!(entry.value[0]["event"], "chat:send");
}

/// Two producers, each with its own connection, append to the same session
/// in lockstep. Every round must keep both sends.
#[test]
fn concurrent_producers_keep_every_send() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("offline.db");
    let clock = Arc::new(ManualClock::new(1_000));
    let barrier = Barrier::new(2);

    std::thread::scope(|scope| {
        for producer in 0..2 {
            let queue = SocketQueue::new(
                Arc::new(DurableStore::open(&path, &OFFLINE_SCHEMA)),
                clock.clone(),
            );
            let barrier = &barrier;
            scope.spawn(move || {
                for round in 0..30 {
                    barrier.wait();
                    queue.queue("chat", &format!("s{round}"), message(&format!("p{producer}")));
                }
            });
        }
    });

    let reader = SocketQueue::new(Arc::new(DurableStore::open(&path, &OFFLINE_SCHEMA)), clock);
    for round in 0..30 {
        let pending = reader.pending("chat", &format!("s{round}"));
        assert_eq!(pending.len(), 2, "round {round} lost a send");
    }
}

#[test]
fn removal_racing_an_append_keeps_the_append() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("offline.db");
    let clock = Arc::new(ManualClock::new(1_000));
    let open = || SocketQueue::new(Arc::new(DurableStore::open(&path, &OFFLINE_SCHEMA)), clock.clone());
    let (consumer, producer) = (open(), open());
    let barrier = Barrier::new(2);

    for round in 0..20 {
        let session = format!("s{round}");
        let delivered = consumer.queue("chat", &session, message("delivered"));
        let barrier = &barrier;
        let added = std::thread::scope(|scope| {
            let remover = scope.spawn(|| {
                barrier.wait();
                consumer.remove("chat", &session, &delivered.id)
            });
            let adder = scope.spawn(|| {
                barrier.wait();
                producer.queue("chat", &session, message("late"))
            });
            assert!(remover.join().unwrap());
            adder.join().unwrap()
        });
        assert_eq!(consumer.pending("chat", &session), vec![added], "round {round}");
    }
}
