// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Contract consumed from the GraphQL layer.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
use tether_core::QueuedMutation;

/// Why a delivery attempt failed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExecuteError {
    /// The request never got a response.
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with errors.
    #[error("server rejected {operation}: {message}")]
    Rejected { operation: String, message: String },

    /// The executor's own timeout fired.
    #[error("request timed out")]
    Timeout,
}

/// One delivery attempt of a queued mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteRequest {
    pub operation_name: String,
    pub query: String,
    pub variables: Value,
    /// Attached to the request (header or context) so the server can
    /// discard a duplicate delivery.
    pub idempotency_key: String,
}

impl From<&QueuedMutation> for ExecuteRequest {
    fn from(mutation: &QueuedMutation) -> Self {
        ExecuteRequest {
            operation_name: mutation.operation_name.clone(),
            query: mutation.query.clone(),
            variables: mutation.variables.clone(),
            idempotency_key: mutation.idempotency_key.clone(),
        }
    }
}

/// Runs GraphQL operations against the server.
///
/// Implementations own their timeouts; the sync manager waits for as long
/// as the returned future takes.
pub trait MutationExecutor: Send + Sync {
    fn execute(
        &self,
        request: ExecuteRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Value, ExecuteError>> + Send + '_>>;
}
