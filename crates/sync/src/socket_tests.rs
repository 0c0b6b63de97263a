// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use super::*;
use crate::test_helpers::MockEmitter;
use serde_json::json;
use tether_core::{DurableStore, ManualClock, OFFLINE_SCHEMA};

fn setup(connected: bool) -> (SocketReplayer, Arc<MockEmitter>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1_000));
    let store = Arc::new(DurableStore::in_memory(&OFFLINE_SCHEMA));
    let emitter = Arc::new(MockEmitter::new(connected));
    let replayer = SocketReplayer::new(SocketQueue::new(store, clock.clone()), emitter.clone());
    (replayer, emitter, clock)
}

fn message(text: &str) -> NewSocketEvent {
    NewSocketEvent::new("chat:send", json!({ "text": text }))
}

#[tokio::test]
async fn offline_messages_replay_in_order_with_own_keys() {
    let (replayer, emitter, clock) = setup(false);

    let first = match replayer.send_or_queue("chat", "s1", message("one")).await {
        SendOutcome::Queued(event) => event,
        other => panic!("expected queued, got {other:?}"),
    };
    clock.advance(5);
    let second = match replayer.send_or_queue("chat", "s1", message("two")).await {
        SendOutcome::Queued(event) => event,
        other => panic!("expected queued, got {other:?}"),
    };
    assert!(emitter.sent().is_empty());

    emitter.set_connected(true);
    let report = replayer.on_room_rejoined("chat", "s1").await;
    assert_eq!(
        report,
        ReplayReport {
            sent: 2,
            remaining: 0,
            error: None
        }
    );

    let sent = emitter.sent();
    assert_eq!(sent[0].payload["text"], "one");
    assert_eq!(sent[1].payload["text"], "two");
    assert_eq!(sent[0].idempotency_key, first.idempotency_key);
    assert_eq!(sent[1].idempotency_key, second.idempotency_key);
    assert_ne!(sent[0].idempotency_key, sent[1].idempotency_key);
    assert!(replayer.queue().pending("chat", "s1").is_empty());
}

#[tokio::test]
async fn replay_stops_at_first_failure() {
    let (replayer, emitter, clock) = setup(false);
    for text in ["a", "b", "c"] {
        replayer.send_or_queue("chat", "s1", message(text)).await;
        clock.advance(1);
    }

    emitter.set_connected(true);
    emitter.push(Ok(()));
    emitter.push(Err(EmitError::Timeout));

    let report = replayer.on_room_rejoined("chat", "s1").await;
    assert_eq!(report.sent, 1);
    assert_eq!(report.remaining, 2);
    assert_eq!(report.error.as_deref(), Some("no ack received"));

    let left: Vec<String> = replayer
        .queue()
        .pending("chat", "s1")
        .into_iter()
        .map(|e| e.payload["text"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(left, vec!["b", "c"]);

    let retry = replayer.on_room_rejoined("chat", "s1").await;
    assert_eq!(retry.sent, 2);
    assert_eq!(emitter.sent().len(), 3);
}

#[tokio::test]
async fn connected_send_goes_straight_through() {
    let (replayer, emitter, _) = setup(true);
    let outcome = replayer
        .send_or_queue("qa", "s1", message("question").with_optimistic_id("tmp-7"))
        .await;

    assert!(matches!(outcome, SendOutcome::Sent(_)));
    assert_eq!(emitter.sent()[0].optimistic_id.as_deref(), Some("tmp-7"));
    assert!(replayer.queue().pending("qa", "s1").is_empty());
}

#[tokio::test]
async fn failed_live_send_is_kept_for_replay() {
    let (replayer, emitter, _) = setup(true);
    emitter.push(Err(EmitError::Rejected {
        event: "chat:send".into(),
        message: "rate limited".into(),
    }));

    let outcome = replayer.send_or_queue("chat", "s1", message("hi")).await;
    let SendOutcome::Queued(queued) = outcome else {
        panic!("expected queued");
    };

    replayer.on_room_rejoined("chat", "s1").await;
    assert_eq!(emitter.sent()[0].idempotency_key, queued.idempotency_key);
}

#[tokio::test]
async fn rejoining_an_empty_room_sends_nothing() {
    let (replayer, emitter, _) = setup(true);
    assert_eq!(
        replayer.on_room_rejoined("chat", "s9").await,
        ReplayReport::default()
    );
    assert!(emitter.sent().is_empty());
}
