// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Queued write operations and their lifecycle.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Retry budget applied when a draft does not set one.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Replay state of a queued mutation.
///
/// ```text
/// pending ──claim──▶ in_flight ──success──▶ completed (deleted)
///    ▲                   │
///    └──────retry────────┤
///                        └──retries exhausted──▶ failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationStatus {
    /// Waiting for a replay pass.
    Pending,
    /// Claimed by a replay actor.
    InFlight,
    /// Retries exhausted; kept for inspection.
    Failed,
    /// Executed successfully. Records are deleted on completion, so this is
    /// only observed transiently.
    Completed,
}

impl MutationStatus {
    pub const ALL: [MutationStatus; 4] = [
        MutationStatus::Pending,
        MutationStatus::InFlight,
        MutationStatus::Failed,
        MutationStatus::Completed,
    ];

    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationStatus::Pending => "pending",
            MutationStatus::InFlight => "in_flight",
            MutationStatus::Failed => "failed",
            MutationStatus::Completed => "completed",
        }
    }

    /// Checks whether the lifecycle allows moving to `target`.
    pub fn can_transition_to(&self, target: MutationStatus) -> bool {
        matches!(
            (self, target),
            (MutationStatus::Pending, MutationStatus::InFlight)
                | (MutationStatus::InFlight, MutationStatus::Pending)
                | (MutationStatus::InFlight, MutationStatus::Failed)
                | (MutationStatus::InFlight, MutationStatus::Completed)
        )
    }

    /// Returns true if no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, MutationStatus::Failed | MutationStatus::Completed)
    }

    /// Checks a transition, returning an error naming both ends if invalid.
    pub fn check_transition(&self, target: MutationStatus) -> Result<()> {
        if self.can_transition_to(target) {
            Ok(())
        } else {
            Err(Error::InvalidTransition {
                from: self.to_string(),
                to: target.to_string(),
            })
        }
    }
}

impl fmt::Display for MutationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MutationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(MutationStatus::Pending),
            "in_flight" | "in-flight" | "inflight" => Ok(MutationStatus::InFlight),
            "failed" => Ok(MutationStatus::Failed),
            "completed" => Ok(MutationStatus::Completed),
            _ => Err(Error::InvalidStatus(s.to_string())),
        }
    }
}

/// A durable write intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedMutation {
    /// Unique identifier (format: `mut-{hash}`).
    pub id: String,
    pub operation_name: String,
    /// Serialized operation document.
    pub query: String,
    pub variables: Value,
    pub status: MutationStatus,
    pub retry_count: u32,
    pub max_retries: u32,
    /// Sent with every delivery attempt; never changes after creation.
    pub idempotency_key: String,
    /// Creation time in ms; defines replay order.
    pub created_at: u64,
    /// When the current claim was taken (ms). Only set while `in_flight`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_at: Option<u64>,
    /// Identifies the current claim holder. Only set while `in_flight`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_token: Option<String>,
    #[serde(default)]
    pub optimistic_response: Option<Value>,
    /// Error of the last attempt, set when the record fails terminally.
    #[serde(default)]
    pub last_error: Option<String>,
}

impl QueuedMutation {
    /// True once another failure would exhaust the retry budget.
    pub fn is_last_attempt(&self) -> bool {
        self.retry_count + 1 >= self.max_retries
    }
}

/// A write to enqueue. The queue fills in identity and bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMutation {
    pub operation_name: String,
    pub query: String,
    pub variables: Value,
    pub optimistic_response: Option<Value>,
    pub max_retries: Option<u32>,
}

impl NewMutation {
    pub fn new(operation_name: impl Into<String>, query: impl Into<String>, variables: Value) -> Self {
        NewMutation {
            operation_name: operation_name.into(),
            query: query.into(),
            variables,
            optimistic_response: None,
            max_retries: None,
        }
    }

    pub fn with_optimistic_response(mut self, response: Value) -> Self {
        self.optimistic_response = Some(response);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }
}

#[cfg(test)]
#[path = "mutation_tests.rs"]
mod tests;
