// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors surfaced by `tether` commands.
#[derive(Debug, Error)]
pub enum Error {
    #[error("mutation not found: {0}")]
    MutationNotFound(String),

    #[error("cannot dismiss {id}: it is {status}\n  hint: only failed mutations can be dismissed")]
    NotDismissable { id: String, status: String },

    #[error(transparent)]
    Sync(#[from] tether_sync::Error),

    #[error(transparent)]
    Core(#[from] tether_core::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
