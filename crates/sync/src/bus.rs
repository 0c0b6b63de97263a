// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Publish/subscribe bus for replay progress.
//!
//! UI layers subscribe to render feedback ("3 changes syncing", "message
//! could not be sent") without polling the queue.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use serde::{Deserialize, Serialize};
use tether_core::QueuedMutation;

/// Events emitted by the sync layer.
///
/// Serialized with a `type` tag and camelCase fields, e.g.
/// `{"type": "sync_start", "pendingCount": 2}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum SyncEvent {
    /// A replay pass started with this many pending records.
    SyncStart { pending_count: usize },
    /// A replay pass finished.
    SyncComplete {
        completed_count: usize,
        failed_count: usize,
    },
    /// A mutation exhausted its retries.
    MutationFailed { mutation: QueuedMutation },
    /// A mutation was stored for later replay.
    MutationQueued { mutation: QueuedMutation },
}

type Listener = Arc<dyn Fn(&SyncEvent) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: AtomicU64,
    by_id: Mutex<BTreeMap<u64, Listener>>,
}

/// Cheaply clonable handle to a set of listeners.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Listeners>,
}

/// Keeps a listener registered; dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    bus: Weak<Listeners>,
}

impl EventBus {
    pub fn new() -> Self {
        EventBus::default()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&SyncEvent) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut by_id) = self.inner.by_id.lock() {
            by_id.insert(id, Arc::new(listener));
        }
        Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Delivers `event` to every listener in subscription order.
    ///
    /// Listeners run outside the registry lock, so they may subscribe or
    /// unsubscribe while handling an event.
    pub fn emit(&self, event: &SyncEvent) {
        let listeners: Vec<Listener> = match self.inner.by_id.lock() {
            Ok(by_id) => by_id.values().cloned().collect(),
            Err(_) => return,
        };
        for listener in listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.by_id.lock().map(|by_id| by_id.len()).unwrap_or(0)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            if let Ok(mut by_id) = bus.by_id.lock() {
                by_id.remove(&self.id);
            }
        }
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
