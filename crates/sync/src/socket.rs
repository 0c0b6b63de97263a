// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Replays queued realtime sends after the channel rejoins its room.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tether_core::{NewSocketEvent, QueuedSocketEvent, SocketQueue};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EmitError {
    #[error("channel disconnected")]
    Disconnected,

    #[error("server rejected {event}: {message}")]
    Rejected { event: String, message: String },

    #[error("no ack received")]
    Timeout,
}

/// One send on the realtime channel.
#[derive(Debug, Clone, PartialEq)]
pub struct SocketSend {
    pub event: String,
    pub payload: Value,
    pub idempotency_key: String,
    pub optimistic_id: Option<String>,
}

impl From<&QueuedSocketEvent> for SocketSend {
    fn from(queued: &QueuedSocketEvent) -> Self {
        SocketSend {
            event: queued.event.clone(),
            payload: queued.payload.clone(),
            idempotency_key: queued.idempotency_key.clone(),
            optimistic_id: queued.optimistic_id.clone(),
        }
    }
}

/// Contract consumed from the realtime channel.
pub trait SocketEmitter: Send + Sync {
    fn is_connected(&self) -> bool;

    /// Sends one event; resolves once the server acknowledged it.
    fn emit(
        &self,
        send: SocketSend,
    ) -> Pin<Box<dyn Future<Output = Result<(), EmitError>> + Send + '_>>;
}

/// Outcome of [`SocketReplayer::on_room_rejoined`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayReport {
    pub sent: usize,
    /// Events left queued for the next rejoin.
    pub remaining: usize,
    /// The failure that stopped the replay, if any.
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// Acknowledged by the server.
    Sent(QueuedSocketEvent),
    /// Stored for replay after the next rejoin.
    Queued(QueuedSocketEvent),
}

pub struct SocketReplayer {
    queue: SocketQueue,
    emitter: Arc<dyn SocketEmitter>,
}

impl SocketReplayer {
    pub fn new(queue: SocketQueue, emitter: Arc<dyn SocketEmitter>) -> Self {
        SocketReplayer { queue, emitter }
    }

    pub fn queue(&self) -> &SocketQueue {
        &self.queue
    }

    /// Replays the session's queue in creation order.
    ///
    /// Call once the channel reconnected and rejoined the session room.
    /// Each event is removed after its ack. The first failure stops the
    /// replay so later events never overtake an earlier one.
    pub async fn on_room_rejoined(&self, feature: &str, session_id: &str) -> ReplayReport {
        let pending = self.queue.pending(feature, session_id);
        let mut report = ReplayReport::default();

        for (position, event) in pending.iter().enumerate() {
            match self.emitter.emit(SocketSend::from(event)).await {
                Ok(()) => {
                    self.queue.remove(feature, session_id, &event.id);
                    report.sent += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        feature,
                        session_id,
                        id = %event.id,
                        error = %e,
                        "socket replay interrupted"
                    );
                    report.remaining = pending.len() - position;
                    report.error = Some(e.to_string());
                    break;
                }
            }
        }

        if report.sent > 0 {
            tracing::info!(feature, session_id, sent = report.sent, "socket queue replayed");
        }
        report
    }

    /// Sends now if the channel is up, otherwise keeps the event for replay.
    ///
    /// The event is stored before the send is attempted and removed after
    /// the ack, so a disconnect mid-send leaves it queued under the same
    /// idempotency key.
    pub async fn send_or_queue(
        &self,
        feature: &str,
        session_id: &str,
        draft: NewSocketEvent,
    ) -> SendOutcome {
        let queued = self.queue.queue(feature, session_id, draft);
        if !self.emitter.is_connected() {
            return SendOutcome::Queued(queued);
        }

        match self.emitter.emit(SocketSend::from(&queued)).await {
            Ok(()) => {
                self.queue.remove(feature, session_id, &queued.id);
                SendOutcome::Sent(queued)
            }
            Err(e) => {
                tracing::debug!(feature, session_id, error = %e, "send failed, kept for replay");
                SendOutcome::Queued(queued)
            }
        }
    }
}

#[cfg(test)]
#[path = "socket_tests.rs"]
mod tests;
