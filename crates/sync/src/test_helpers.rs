// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test doubles for sync module tests.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use crate::cache::{CacheSnapshot, NormalizedCache};
use crate::executor::{ExecuteError, ExecuteRequest, MutationExecutor};
use crate::socket::{EmitError, SocketEmitter, SocketSend};

type Hook = Box<dyn Fn(&ExecuteRequest) + Send + Sync>;

/// Executor that replays scripted outcomes; succeeds once the script runs out.
#[derive(Default)]
pub struct MockExecutor {
    script: Mutex<VecDeque<Result<Value, ExecuteError>>>,
    calls: Mutex<Vec<ExecuteRequest>>,
    hook: Mutex<Option<Hook>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        MockExecutor::default()
    }

    /// Queue an outcome for the next call.
    pub fn push(&self, outcome: Result<Value, ExecuteError>) {
        self.script.lock().unwrap().push_back(outcome);
    }

    /// The next `n` calls fail with a network error.
    pub fn fail_next(&self, n: usize) {
        for _ in 0..n {
            self.push(Err(ExecuteError::Network("connection reset".into())));
        }
    }

    /// Run `hook` at the start of every call.
    pub fn on_execute(&self, hook: impl Fn(&ExecuteRequest) + Send + Sync + 'static) {
        *self.hook.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn calls(&self) -> Vec<ExecuteRequest> {
        self.calls.lock().unwrap().clone()
    }
}

impl MutationExecutor for MockExecutor {
    fn execute(
        &self,
        request: ExecuteRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Value, ExecuteError>> + Send + '_>> {
        Box::pin(async move {
            if let Some(hook) = self.hook.lock().unwrap().as_ref() {
                hook(&request);
            }
            self.calls.lock().unwrap().push(request);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(json!({"ok": true})))
        })
    }
}

/// Realtime channel double recording acknowledged sends.
pub struct MockEmitter {
    connected: AtomicBool,
    script: Mutex<VecDeque<Result<(), EmitError>>>,
    sent: Mutex<Vec<SocketSend>>,
}

impl MockEmitter {
    pub fn new(connected: bool) -> Self {
        MockEmitter {
            connected: AtomicBool::new(connected),
            script: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Queue an outcome for the next emit; emits succeed once the script runs out.
    pub fn push(&self, outcome: Result<(), EmitError>) {
        self.script.lock().unwrap().push_back(outcome);
    }

    /// Sends that were acknowledged, in order.
    pub fn sent(&self) -> Vec<SocketSend> {
        self.sent.lock().unwrap().clone()
    }
}

impl SocketEmitter for MockEmitter {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn emit(
        &self,
        send: SocketSend,
    ) -> Pin<Box<dyn Future<Output = Result<(), EmitError>> + Send + '_>> {
        Box::pin(async move {
            if !self.is_connected() {
                return Err(EmitError::Disconnected);
            }
            let outcome = self.script.lock().unwrap().pop_front().unwrap_or(Ok(()));
            if outcome.is_ok() {
                self.sent.lock().unwrap().push(send);
            }
            outcome
        })
    }
}

/// In-memory stand-in for a normalized client cache.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<CacheSnapshot>,
}

impl MemoryCache {
    pub fn new() -> Self {
        MemoryCache::default()
    }

    pub fn write(&self, key: &str, value: Value) {
        self.entries.lock().unwrap().insert(key.to_string(), value);
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        self.entries.lock().unwrap().clone()
    }
}

impl NormalizedCache for MemoryCache {
    fn extract(&self) -> CacheSnapshot {
        self.snapshot()
    }

    fn restore(&self, snapshot: CacheSnapshot) {
        *self.entries.lock().unwrap() = snapshot;
    }
}
