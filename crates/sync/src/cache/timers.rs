// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! When snapshots get written.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::persist::{CachePersister, PersistOutcome};
use super::NormalizedCache;
use crate::manager::MIN_PERIOD;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistenceTiming {
    /// Quiet period after the last cache write before persisting.
    pub debounce: Duration,
    /// Safety-net interval between persists. Raised to one millisecond if
    /// shorter.
    pub periodic: Duration,
}

impl Default for PersistenceTiming {
    fn default() -> Self {
        PersistenceTiming {
            debounce: Duration::from_secs(2),
            periodic: Duration::from_secs(30),
        }
    }
}

/// Running persistence loop started by [`setup_cache_persistence`].
pub struct CachePersistenceHandle {
    writes: Arc<Notify>,
    hidden: Arc<Notify>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
    persister: Arc<CachePersister>,
    cache: Arc<dyn NormalizedCache>,
}

impl CachePersistenceHandle {
    /// Reports a cache write. Bursts of writes persist once, `debounce`
    /// after the last of them.
    pub fn notify_write(&self) {
        self.writes.notify_one();
    }

    /// The app went to the background; persist now.
    pub fn on_visibility_hidden(&self) {
        self.hidden.notify_one();
    }

    /// The process is about to exit. Writes the backup file synchronously,
    /// since the loop may never get to run again.
    pub fn on_unload(&self) -> PersistOutcome {
        self.persister.persist_backup(self.cache.as_ref())
    }

    /// Stops the timers.
    pub fn dispose(&self) {
        self.cancel.cancel();
    }

    /// Stops the timers and waits for the loop to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "cache persistence task ended abnormally");
        }
    }
}

/// Starts debounced, periodic and visibility-driven persistence of `cache`.
pub fn setup_cache_persistence(
    persister: Arc<CachePersister>,
    cache: Arc<dyn NormalizedCache>,
    timing: PersistenceTiming,
) -> CachePersistenceHandle {
    let writes = Arc::new(Notify::new());
    let hidden = Arc::new(Notify::new());
    let cancel = CancellationToken::new();

    let task = tokio::spawn(run_loop(
        Arc::clone(&persister),
        Arc::clone(&cache),
        timing,
        Arc::clone(&writes),
        Arc::clone(&hidden),
        cancel.clone(),
    ));

    CachePersistenceHandle {
        writes,
        hidden,
        cancel,
        task,
        persister,
        cache,
    }
}

async fn run_loop(
    persister: Arc<CachePersister>,
    cache: Arc<dyn NormalizedCache>,
    timing: PersistenceTiming,
    writes: Arc<Notify>,
    hidden: Arc<Notify>,
    cancel: CancellationToken,
) {
    let period = timing.periodic.max(MIN_PERIOD);
    let mut periodic = interval_at(Instant::now() + period, period);
    periodic.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut deadline: Option<Instant> = None;

    loop {
        let reason = tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            _ = hidden.notified() => "hidden",

            _ = writes.notified() => {
                deadline = Some(Instant::now() + timing.debounce);
                continue;
            }

            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => "debounce",

            _ = periodic.tick() => "periodic",
        };

        deadline = None;
        let outcome = persister.persist_cache(cache.as_ref());
        tracing::debug!(reason, ?outcome, "cache persist");
    }
    tracing::debug!("cache persistence stopped");
}

#[cfg(test)]
#[path = "timers_tests.rs"]
mod tests;
