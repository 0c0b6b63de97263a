// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for tether-core operations.

use thiserror::Error;

/// All possible errors that can occur in tether-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown store: {0}")]
    UnknownStore(String),

    #[error("unknown index '{index}' on store '{store}'")]
    UnknownIndex { store: String, index: String },

    #[error("record in store '{store}' has no usable '{key_path}' key")]
    MissingKey { store: String, key_path: String },

    #[error("invalid mutation status: '{0}'\n  hint: valid statuses are: pending, in_flight, failed, completed")]
    InvalidStatus(String),

    #[error("invalid status transition: cannot go from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupted data: {0}")]
    CorruptedData(String),
}

/// A specialized Result type for tether-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
