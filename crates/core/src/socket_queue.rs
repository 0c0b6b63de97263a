// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Per-session queues of realtime sends awaiting reconnection.
//!
//! Each `(feature, session)` pair owns one `syncMeta` entry at
//! `socket_queue_{feature}_{session}` whose value is the array of queued
//! events. Appends and removals rewrite the entry inside one store
//! transaction, so concurrent producers never drop each other's sends.
//! There is a single consumer per queue (the owner of the socket), so no
//! claim protocol is needed; replay order is restored by sorting on
//! `createdAt` at read time.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clock::ClockSource;
use crate::id::{generate_id, new_idempotency_key};
use crate::meta::{self, MetaEntry, SOCKET_QUEUE_PREFIX};
use crate::schema::stores;
use crate::store::{Change, DurableStore};

/// A durable realtime send intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedSocketEvent {
    /// Unique identifier (format: `sock-{hash}`).
    pub id: String,
    /// Channel event name, e.g. `chat:send`.
    pub event: String,
    pub payload: Value,
    pub idempotency_key: String,
    /// Id of the optimistic UI item this send will reconcile.
    #[serde(default)]
    pub optimistic_id: Option<String>,
    pub created_at: u64,
}

/// A realtime send to queue.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSocketEvent {
    pub event: String,
    pub payload: Value,
    pub optimistic_id: Option<String>,
}

impl NewSocketEvent {
    pub fn new(event: impl Into<String>, payload: Value) -> Self {
        NewSocketEvent {
            event: event.into(),
            payload,
            optimistic_id: None,
        }
    }

    pub fn with_optimistic_id(mut self, optimistic_id: impl Into<String>) -> Self {
        self.optimistic_id = Some(optimistic_id.into());
        self
    }
}

/// Storage key of one session's queue.
pub fn queue_key(feature: &str, session_id: &str) -> String {
    format!("{SOCKET_QUEUE_PREFIX}{feature}_{session_id}")
}

fn encode_entry(key: &str, events: &[QueuedSocketEvent], now_ms: u64) -> Option<MetaEntry> {
    match serde_json::to_value(events) {
        Ok(value) => Some(MetaEntry {
            key: key.to_string(),
            value,
            updated_at: now_ms,
        }),
        Err(e) => {
            tracing::warn!(key, error = %e, "cannot encode socket queue");
            None
        }
    }
}

fn decode_events(key: &str, value: &Value) -> Vec<QueuedSocketEvent> {
    match serde_json::from_value(value.clone()) {
        Ok(events) => events,
        Err(e) => {
            tracing::warn!(key, error = %e, "discarding unreadable socket queue");
            Vec::new()
        }
    }
}

/// Queues of realtime sends, stored in the sync meta bag.
#[derive(Clone)]
pub struct SocketQueue {
    store: Arc<DurableStore>,
    clock: Arc<dyn ClockSource>,
}

impl SocketQueue {
    pub fn new(store: Arc<DurableStore>, clock: Arc<dyn ClockSource>) -> Self {
        SocketQueue { store, clock }
    }

    /// Appends a send to the session's queue.
    pub fn queue(&self, feature: &str, session_id: &str, draft: NewSocketEvent) -> QueuedSocketEvent {
        let idempotency_key = new_idempotency_key();
        let event = QueuedSocketEvent {
            id: generate_id("sock", &idempotency_key),
            event: draft.event,
            payload: draft.payload,
            idempotency_key,
            optimistic_id: draft.optimistic_id,
            created_at: self.clock.now_ms(),
        };

        let key = queue_key(feature, session_id);
        let now = self.clock.now_ms();
        self.store
            .update(stores::SYNC_META, &key, |entry: Option<MetaEntry>| {
                let mut events = entry
                    .map(|entry| decode_events(&key, &entry.value))
                    .unwrap_or_default();
                events.push(event.clone());
                encode_entry(&key, &events, now).map_or(Change::Keep, Change::Put)
            });

        tracing::debug!(key = %key, id = %event.id, event = %event.event, "socket event queued");
        event
    }

    /// The session's queued sends in creation order.
    pub fn pending(&self, feature: &str, session_id: &str) -> Vec<QueuedSocketEvent> {
        let key = queue_key(feature, session_id);
        let Some(entry) = meta::get_meta(&self.store, &key) else {
            return Vec::new();
        };
        let mut events = decode_events(&key, &entry.value);
        events.sort_by_key(|event| event.created_at);
        events
    }

    /// Removes one send after it was delivered. Returns false if absent.
    /// The entry itself goes once its last event is removed.
    pub fn remove(&self, feature: &str, session_id: &str, id: &str) -> bool {
        let key = queue_key(feature, session_id);
        let now = self.clock.now_ms();
        self.store
            .update(stores::SYNC_META, &key, |entry: Option<MetaEntry>| {
                let Some(entry) = entry else {
                    return Change::Keep;
                };
                let mut events = decode_events(&key, &entry.value);
                let before = events.len();
                events.retain(|event| event.id != id);
                if events.len() == before {
                    Change::Keep
                } else if events.is_empty() {
                    Change::Delete
                } else {
                    encode_entry(&key, &events, now).map_or(Change::Keep, Change::Put)
                }
            })
    }

    /// Drops the session's whole queue.
    pub fn clear(&self, feature: &str, session_id: &str) {
        meta::delete_meta(&self.store, &queue_key(feature, session_id));
    }
}

#[cfg(test)]
#[path = "socket_queue_tests.rs"]
mod tests;
