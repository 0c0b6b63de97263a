// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Allow unused items: test helpers are shared across multiple test binaries,
// and not every test file uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]

use std::sync::Arc;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use tether_core::{DurableStore, MutationQueue, SocketQueue, SystemClock, OFFLINE_SCHEMA};

pub use predicates::prelude::*;
pub use serde_json::{json, Value};
pub use tempfile::TempDir;
pub use tether_core::{NewMutation, NewSocketEvent};

/// `tether` pointed at `dir`, with logging kept off stderr noise.
pub fn tether(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("tether");
    cmd.arg("--data-dir").arg(dir.path()).env("RUST_LOG", "error");
    cmd
}

pub fn offline_store(dir: &TempDir) -> Arc<DurableStore> {
    Arc::new(DurableStore::open(
        &dir.path().join("offline.db"),
        &OFFLINE_SCHEMA,
    ))
}

pub fn mutation_queue(dir: &TempDir) -> MutationQueue {
    MutationQueue::new(offline_store(dir), Arc::new(SystemClock))
}

pub fn socket_queue(dir: &TempDir) -> SocketQueue {
    SocketQueue::new(offline_store(dir), Arc::new(SystemClock))
}

/// Enqueues a mutation and drives it to `failed`.
pub fn failed_mutation(dir: &TempDir, name: &str) -> String {
    let queue = mutation_queue(dir);
    let m = queue.enqueue(NewMutation::new(name, "mutation X", json!({})).with_max_retries(1));
    let claim = queue.claim(&m.id).unwrap();
    queue.record_failure(&claim, "server said no").unwrap();
    m.id
}

pub fn stdout_json(cmd: &mut Command) -> Value {
    let output = cmd.output().unwrap();
    assert!(output.status.success(), "command failed: {output:?}");
    serde_json::from_slice(&output.stdout).unwrap()
}
