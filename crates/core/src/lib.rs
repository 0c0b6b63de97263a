// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tether-core: durable storage and queues for offline operation
//!
//! This crate provides the storage layer (a typed key/value store with a
//! degraded fallback), the mutation queue and its claim protocol, the
//! per-session socket event queue, and the connectivity detector used by
//! `tether-sync` and the `tether` CLI.

pub mod clock;
pub mod connectivity;
pub mod error;
pub mod id;
pub mod meta;
pub mod mutation;
pub mod mutation_queue;
pub mod schema;
pub mod socket_queue;
pub mod store;

pub use clock::{ClockSource, ManualClock, SystemClock};
pub use connectivity::ConnectivityDetector;
pub use error::{Error, Result};
pub use meta::MetaEntry;
pub use mutation::{MutationStatus, NewMutation, QueuedMutation};
pub use mutation_queue::{Claim, FailureOutcome, MutationQueue, QueueStats};
pub use schema::{stores, DatabaseSchema, CACHE_SCHEMA, OFFLINE_SCHEMA};
pub use socket_queue::{NewSocketEvent, QueuedSocketEvent, SocketQueue};
pub use store::{Change, DurableStore, FallbackBackend, KvBackend, SqliteBackend};
