// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use serde_json::json;

fn recorder(bus: &EventBus) -> (Subscription, Arc<Mutex<Vec<SyncEvent>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let sub = bus.subscribe(move |event| sink.lock().unwrap().push(event.clone()));
    (sub, seen)
}

#[test]
fn every_listener_receives_events() {
    let bus = EventBus::new();
    let (_a, seen_a) = recorder(&bus);
    let (_b, seen_b) = recorder(&bus);

    bus.emit(&SyncEvent::SyncStart { pending_count: 2 });

    assert_eq!(seen_a.lock().unwrap().len(), 1);
    assert_eq!(seen_b.lock().unwrap().len(), 1);
}

#[test]
fn dropping_subscription_unsubscribes() {
    let bus = EventBus::new();
    let (sub, seen) = recorder(&bus);
    assert_eq!(bus.listener_count(), 1);

    drop(sub);
    bus.emit(&SyncEvent::SyncStart { pending_count: 1 });

    assert_eq!(bus.listener_count(), 0);
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn subscription_outliving_bus_is_harmless() {
    let bus = EventBus::new();
    let (sub, _) = recorder(&bus);
    drop(bus);
    drop(sub);
}

#[test]
fn listener_may_unsubscribe_others_while_handling() {
    let bus = EventBus::new();
    let (victim, seen) = recorder(&bus);
    let slot = Arc::new(Mutex::new(Some(victim)));
    let slot_in_listener = slot.clone();
    let _killer = bus.subscribe(move |_| {
        slot_in_listener.lock().unwrap().take();
    });

    bus.emit(&SyncEvent::SyncStart { pending_count: 1 });
    bus.emit(&SyncEvent::SyncStart { pending_count: 2 });

    // The victim was registered first, so it saw the first event only.
    assert_eq!(seen.lock().unwrap().len(), 1);
    assert!(slot.lock().unwrap().is_none());
}

#[test]
fn wire_format_is_tagged_camel_case() {
    let start = serde_json::to_value(SyncEvent::SyncStart { pending_count: 3 }).unwrap();
    assert_eq!(start, json!({"type": "sync_start", "pendingCount": 3}));

    let complete = serde_json::to_value(SyncEvent::SyncComplete {
        completed_count: 2,
        failed_count: 1,
    })
    .unwrap();
    assert_eq!(
        complete,
        json!({"type": "sync_complete", "completedCount": 2, "failedCount": 1})
    );
}
