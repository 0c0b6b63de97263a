// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable mutation queue and the claim protocol.
//!
//! Every state change goes through [`DurableStore::modify`] or
//! [`DurableStore::update`], single-record atomic read-modify-writes checked
//! against [`MutationStatus::check_transition`]. That is what makes
//! [`MutationQueue::claim`] safe when two replay actors (say a foreground
//! pass and a background worker in another process) race for the same
//! record: exactly one of them observes `pending`. Each claim carries a
//! token, so an actor whose claim was reclaimed cannot finish the record
//! for the new holder.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::clock::ClockSource;
use crate::error::{Error, Result};
use crate::id::{generate_unique_id, new_idempotency_key};
use crate::mutation::{MutationStatus, NewMutation, QueuedMutation, DEFAULT_MAX_RETRIES};
use crate::schema::stores;
use crate::store::{Change, DurableStore};

const STATUS_INDEX: &str = "status";

/// Result of recording a failed delivery attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureOutcome {
    /// Back to `pending` for a later pass.
    Retrying { retry_count: u32 },
    /// Retries exhausted; the record is now `failed`.
    Failed(QueuedMutation),
}

/// Ownership of an `in_flight` record, returned by [`MutationQueue::claim`].
///
/// Only the current holder can complete or fail the record; a claim that
/// was reclaimed as stale is rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct Claim {
    /// The record as it was before the claim.
    pub mutation: QueuedMutation,
    token: String,
}

impl Claim {
    pub fn id(&self) -> &str {
        &self.mutation.id
    }

    fn is_held_on(&self, record: &QueuedMutation) -> bool {
        record.claim_token.as_deref() == Some(self.token.as_str())
    }
}

/// Record counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub pending: usize,
    pub in_flight: usize,
    pub failed: usize,
    pub completed: usize,
}

impl QueueStats {
    pub fn total(&self) -> usize {
        self.pending + self.in_flight + self.failed + self.completed
    }
}

/// Queue of durable write intents in the `mutationQueue` store.
#[derive(Clone)]
pub struct MutationQueue {
    store: Arc<DurableStore>,
    clock: Arc<dyn ClockSource>,
    default_max_retries: u32,
}

impl MutationQueue {
    pub fn new(store: Arc<DurableStore>, clock: Arc<dyn ClockSource>) -> Self {
        MutationQueue {
            store,
            clock,
            default_max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Retry budget for drafts that do not set their own.
    pub fn with_default_max_retries(mut self, max_retries: u32) -> Self {
        self.default_max_retries = max_retries.max(1);
        self
    }

    pub fn store(&self) -> &Arc<DurableStore> {
        &self.store
    }

    /// Stores a new `pending` record with a fresh idempotency key.
    pub fn enqueue(&self, draft: NewMutation) -> QueuedMutation {
        let idempotency_key = new_idempotency_key();
        let id = generate_unique_id("mut", &idempotency_key, |candidate| {
            self.store
                .get::<Value>(stores::MUTATION_QUEUE, candidate)
                .is_some()
        });

        let record = QueuedMutation {
            id,
            operation_name: draft.operation_name,
            query: draft.query,
            variables: draft.variables,
            status: MutationStatus::Pending,
            retry_count: 0,
            max_retries: draft.max_retries.unwrap_or(self.default_max_retries),
            idempotency_key,
            created_at: self.clock.now_ms(),
            claimed_at: None,
            claim_token: None,
            optimistic_response: draft.optimistic_response,
            last_error: None,
        };
        self.store.put(stores::MUTATION_QUEUE, &record);
        tracing::debug!(id = %record.id, operation = %record.operation_name, "mutation queued");
        record
    }

    pub fn get(&self, id: &str) -> Option<QueuedMutation> {
        self.store.get(stores::MUTATION_QUEUE, id)
    }

    /// Every record, in replay order.
    pub fn all(&self) -> Vec<QueuedMutation> {
        sorted(self.store.get_all(stores::MUTATION_QUEUE))
    }

    /// Records with the given status, in replay order.
    pub fn by_status(&self, status: MutationStatus) -> Vec<QueuedMutation> {
        sorted(
            self.store
                .get_by_index(stores::MUTATION_QUEUE, STATUS_INDEX, status.as_str()),
        )
    }

    /// `pending` records ordered by `createdAt`.
    pub fn pending(&self) -> Vec<QueuedMutation> {
        self.by_status(MutationStatus::Pending)
    }

    /// Atomically moves a `pending` record to `in_flight`.
    ///
    /// Returns the claim, carrying the record as it was before, or `None`
    /// if it is missing or no longer `pending` (another actor got there
    /// first).
    pub fn claim(&self, id: &str) -> Option<Claim> {
        let now = self.clock.now_ms();
        let token = new_idempotency_key();
        let claimed = self
            .store
            .modify(stores::MUTATION_QUEUE, id, |mut record: QueuedMutation| {
                record.status.check_transition(MutationStatus::InFlight).ok()?;
                record.status = MutationStatus::InFlight;
                record.claimed_at = Some(now);
                record.claim_token = Some(token.clone());
                Some(record)
            });

        match claimed {
            Some(mutation) => {
                tracing::debug!(id, "mutation claimed");
                Some(Claim { mutation, token })
            }
            None => {
                tracing::debug!(id, "mutation not claimable");
                None
            }
        }
    }

    /// Finishes a successful delivery by deleting the claimed record.
    ///
    /// Returns false if the claim is no longer held, e.g. because the
    /// record was reclaimed as stale and claimed again.
    pub fn complete(&self, claim: &Claim) -> bool {
        let id = claim.id();
        let completed = self
            .store
            .update(stores::MUTATION_QUEUE, id, |record: Option<QueuedMutation>| {
                match record {
                    Some(record)
                        if claim.is_held_on(&record)
                            && record
                                .status
                                .check_transition(MutationStatus::Completed)
                                .is_ok() =>
                    {
                        Change::Delete
                    }
                    _ => Change::Keep,
                }
            });

        if completed {
            tracing::debug!(id, "mutation completed");
        } else {
            tracing::warn!(id, "claim lost before completion");
        }
        completed
    }

    /// Records a failed delivery of a claimed record.
    ///
    /// Bumps `retryCount`; below `maxRetries` the record returns to
    /// `pending`, otherwise it becomes `failed` with `lastError` set.
    /// Returns `None` if the claim is no longer held.
    pub fn record_failure(&self, claim: &Claim, error: &str) -> Option<FailureOutcome> {
        let id = claim.id();
        let before = self
            .store
            .modify(stores::MUTATION_QUEUE, id, |record: QueuedMutation| {
                if !claim.is_held_on(&record) {
                    return None;
                }
                let from = record.status;
                let next = after_failure(record, error);
                from.check_transition(next.status).ok()?;
                Some(next)
            })?;

        let after = after_failure(before, error);
        if after.status == MutationStatus::Failed {
            tracing::warn!(
                id,
                operation = %after.operation_name,
                attempts = after.retry_count,
                error,
                "mutation failed permanently"
            );
            Some(FailureOutcome::Failed(after))
        } else {
            tracing::debug!(id, retry_count = after.retry_count, "mutation will retry");
            Some(FailureOutcome::Retrying {
                retry_count: after.retry_count,
            })
        }
    }

    /// Returns `in_flight` records claimed longer than `max_age` ago to
    /// `pending`, leaving `retryCount` alone.
    ///
    /// Recovers records whose claimer died mid-delivery. A record without a
    /// claim time counts as stale. The old claim stops being valid. Returns
    /// the number of records reclaimed.
    pub fn reclaim_stale(&self, max_age: Duration) -> usize {
        let now = self.clock.now_ms();
        let max_age_ms = u64::try_from(max_age.as_millis()).unwrap_or(u64::MAX);
        let is_stale = |record: &QueuedMutation| {
            record
                .claimed_at
                .map_or(true, |at| now.saturating_sub(at) >= max_age_ms)
        };

        let mut reclaimed = 0;
        for candidate in self.by_status(MutationStatus::InFlight) {
            let released = self.store.modify(
                stores::MUTATION_QUEUE,
                &candidate.id,
                |mut record: QueuedMutation| {
                    record.status.check_transition(MutationStatus::Pending).ok()?;
                    if !is_stale(&record) {
                        return None;
                    }
                    record.status = MutationStatus::Pending;
                    record.claimed_at = None;
                    record.claim_token = None;
                    Some(record)
                },
            );
            if released.is_some() {
                tracing::info!(id = %candidate.id, "reclaimed stale in-flight mutation");
                reclaimed += 1;
            }
        }
        reclaimed
    }

    /// Deletes a terminal record once its failure has been acknowledged.
    ///
    /// Returns `Ok(None)` if the record does not exist.
    pub fn dismiss(&self, id: &str) -> Result<Option<QueuedMutation>> {
        let mut outcome = Ok(None);
        let deleted = self
            .store
            .update(stores::MUTATION_QUEUE, id, |record: Option<QueuedMutation>| {
                match record {
                    None => {
                        outcome = Ok(None);
                        Change::Keep
                    }
                    Some(record) if record.status.is_terminal() => {
                        outcome = Ok(Some(record));
                        Change::Delete
                    }
                    Some(record) => {
                        outcome = Err(Error::InvalidTransition {
                            from: record.status.to_string(),
                            to: "dismissed".to_string(),
                        });
                        Change::Keep
                    }
                }
            });

        match outcome {
            Ok(Some(_)) if !deleted => Ok(None),
            outcome => outcome,
        }
    }

    /// Deletes every record regardless of status. Returns how many there were.
    pub fn clear(&self) -> usize {
        let count = self.store.count(stores::MUTATION_QUEUE, None);
        self.store.clear(stores::MUTATION_QUEUE);
        count
    }

    pub fn stats(&self) -> QueueStats {
        let count = |status: MutationStatus| {
            self.store.count(
                stores::MUTATION_QUEUE,
                Some((STATUS_INDEX, Value::from(status.as_str()))),
            )
        };
        QueueStats {
            pending: count(MutationStatus::Pending),
            in_flight: count(MutationStatus::InFlight),
            failed: count(MutationStatus::Failed),
            completed: count(MutationStatus::Completed),
        }
    }
}

fn after_failure(mut record: QueuedMutation, error: &str) -> QueuedMutation {
    if record.is_last_attempt() {
        record.status = MutationStatus::Failed;
        record.last_error = Some(error.to_string());
    } else {
        record.status = MutationStatus::Pending;
    }
    record.retry_count += 1;
    record.claimed_at = None;
    record.claim_token = None;
    record
}

fn sorted(mut records: Vec<QueuedMutation>) -> Vec<QueuedMutation> {
    records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    records
}

#[cfg(test)]
#[path = "mutation_queue_tests.rs"]
mod tests;
