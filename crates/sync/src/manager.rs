// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Replays the mutation queue when the network is usable.
//!
//! A pass reclaims abandoned claims, then walks `pending` records in
//! creation order. Each record is claimed before it is executed, so a
//! concurrent replay actor working on the same store never delivers it a
//! second time. Outcomes go back through the queue's state machine and
//! every step is announced on the [`EventBus`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tether_core::meta::{self, LAST_SYNC_COMPLETED_AT};
use tether_core::{
    Claim, ClockSource, ConnectivityDetector, FailureOutcome, MutationQueue, NewMutation,
    QueuedMutation, SystemClock,
};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::bus::{EventBus, SyncEvent};
use crate::executor::{ExecuteRequest, MutationExecutor};

/// Shortest replay period; tokio intervals reject a zero period.
pub(crate) const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Counts from one replay pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Records this pass claimed and executed.
    pub claimed: usize,
    /// Delivered and deleted.
    pub completed: usize,
    /// Failed but returned to `pending`.
    pub retried: usize,
    /// Failed with retries exhausted.
    pub failed: usize,
    /// Not claimable (another actor had them) or left for the next pass.
    pub skipped: usize,
    /// Abandoned claims returned to `pending` before the pass.
    pub reclaimed: usize,
}

pub struct SyncManager {
    queue: MutationQueue,
    detector: Arc<ConnectivityDetector>,
    executor: Arc<dyn MutationExecutor>,
    bus: EventBus,
    clock: Arc<dyn ClockSource>,
    stale_claim_after: Option<Duration>,
    syncing: AtomicBool,
}

/// Clears the `syncing` flag when a pass ends, however it ends.
struct PassGuard<'a>(&'a AtomicBool);

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SyncManager {
    pub fn new(
        queue: MutationQueue,
        detector: Arc<ConnectivityDetector>,
        executor: Arc<dyn MutationExecutor>,
    ) -> Self {
        SyncManager {
            queue,
            detector,
            executor,
            bus: EventBus::new(),
            clock: Arc::new(SystemClock),
            stale_claim_after: None,
            syncing: AtomicBool::new(false),
        }
    }

    pub fn with_bus(mut self, bus: EventBus) -> Self {
        self.bus = bus;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn ClockSource>) -> Self {
        self.clock = clock;
        self
    }

    /// Enables the abandoned-claim sweep at the start of every pass.
    pub fn with_stale_claim_after(mut self, max_age: Option<Duration>) -> Self {
        self.stale_claim_after = max_age;
        self
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn queue(&self) -> &MutationQueue {
        &self.queue
    }

    pub fn detector(&self) -> &Arc<ConnectivityDetector> {
        &self.detector
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    /// Stores a write for later replay and announces it.
    pub fn queue_mutation(&self, draft: NewMutation) -> QueuedMutation {
        let mutation = self.queue.enqueue(draft);
        self.bus.emit(&SyncEvent::MutationQueued {
            mutation: mutation.clone(),
        });
        mutation
    }

    /// Runs one replay pass.
    ///
    /// Returns `None` without touching the queue when the network is not
    /// usable or another pass is already running.
    pub async fn sync_pending(&self) -> Option<SyncReport> {
        if !self.detector.is_actually_online() {
            tracing::debug!("network not usable, skipping replay pass");
            return None;
        }
        if self.syncing.swap(true, Ordering::AcqRel) {
            tracing::debug!("replay pass already running");
            return None;
        }
        let _guard = PassGuard(&self.syncing);

        let mut report = SyncReport::default();
        if let Some(max_age) = self.stale_claim_after {
            report.reclaimed = self.queue.reclaim_stale(max_age);
        }

        let pending = self.queue.pending();
        if pending.is_empty() {
            return Some(report);
        }

        self.bus.emit(&SyncEvent::SyncStart {
            pending_count: pending.len(),
        });

        let total = pending.len();
        for (position, candidate) in pending.into_iter().enumerate() {
            if !self.detector.is_actually_online() {
                tracing::info!("network lost mid-pass, deferring remaining mutations");
                report.skipped += total - position;
                break;
            }

            let Some(claimed) = self.queue.claim(&candidate.id) else {
                report.skipped += 1;
                continue;
            };
            report.claimed += 1;
            self.deliver(&claimed, &mut report).await;
        }

        meta::set_meta(
            self.queue.store(),
            LAST_SYNC_COMPLETED_AT,
            Value::from(self.clock.now_ms()),
            self.clock.now_ms(),
        );
        self.bus.emit(&SyncEvent::SyncComplete {
            completed_count: report.completed,
            failed_count: report.failed,
        });
        tracing::info!(
            completed = report.completed,
            retried = report.retried,
            failed = report.failed,
            skipped = report.skipped,
            "replay pass finished"
        );
        Some(report)
    }

    async fn deliver(&self, claim: &Claim, report: &mut SyncReport) {
        let outcome = self
            .executor
            .execute(ExecuteRequest::from(&claim.mutation))
            .await;
        let error = match outcome {
            Ok(_) => {
                if self.queue.complete(claim) {
                    report.completed += 1;
                } else {
                    report.skipped += 1;
                }
                return;
            }
            Err(e) => e,
        };

        match self.queue.record_failure(claim, &error.to_string()) {
            Some(FailureOutcome::Retrying { .. }) => report.retried += 1,
            Some(FailureOutcome::Failed(failed)) => {
                report.failed += 1;
                self.bus
                    .emit(&SyncEvent::MutationFailed { mutation: failed });
            }
            None => {
                report.skipped += 1;
                tracing::debug!(id = claim.id(), "claim lost before recording failure");
            }
        }
    }
}

/// Running replay loop started by [`init_sync_manager`].
pub struct SyncHandle {
    trigger: Arc<Notify>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Requests a pass soon. Requests made during a pass collapse into one.
    pub fn trigger(&self) {
        self.trigger.notify_one();
    }

    /// Stops the loop. A pass in progress runs to completion before the
    /// task exits.
    pub fn dispose(&self) {
        self.cancel.cancel();
    }

    /// Stops the loop and waits for the task to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "sync task ended abnormally");
        }
    }
}

/// Starts the replay loop on the current tokio runtime.
///
/// A pass runs at startup, whenever the detector reports the network usable
/// again, every `interval`, and on [`SyncHandle::trigger`]. Periods below
/// one millisecond are raised to it.
pub fn init_sync_manager(manager: Arc<SyncManager>, interval: Duration) -> SyncHandle {
    let trigger = Arc::new(Notify::new());
    let cancel = CancellationToken::new();

    let task = tokio::spawn(run_loop(
        manager,
        interval,
        Arc::clone(&trigger),
        cancel.clone(),
    ));

    SyncHandle {
        trigger,
        cancel,
        task,
    }
}

async fn run_loop(
    manager: Arc<SyncManager>,
    interval: Duration,
    trigger: Arc<Notify>,
    cancel: CancellationToken,
) {
    let mut usable = manager.detector().subscribe();
    let mut ticker = tokio::time::interval(interval.max(MIN_PERIOD));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            Ok(()) = usable.changed() => {
                if !*usable.borrow_and_update() {
                    continue;
                }
                tracing::debug!("network usable again");
            }

            _ = trigger.notified() => {}

            _ = ticker.tick() => {}
        }

        manager.sync_pending().await;
    }
    tracing::debug!("sync loop stopped");
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
