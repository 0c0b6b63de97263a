// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Record identifiers and idempotency keys.

use sha2::{Digest, Sha256};

/// Generate a fresh idempotency key.
///
/// The key is attached to a write for its whole life; the server uses it to
/// turn re-deliveries into no-ops, so it must be globally unique.
pub fn new_idempotency_key() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Generate a record ID from a prefix and an idempotency key.
/// Format: {prefix}-{hash} where hash is first 8 hex chars of SHA256(key)
pub fn generate_id(prefix: &str, idempotency_key: &str) -> String {
    let hash = Sha256::digest(idempotency_key.as_bytes());
    let short_hash = hex::encode(&hash[..4]);
    format!("{}-{}", prefix, short_hash)
}

/// Generate a record ID, appending an incrementing suffix on collision.
pub fn generate_unique_id<F>(prefix: &str, idempotency_key: &str, exists: F) -> String
where
    F: Fn(&str) -> bool,
{
    let base_id = generate_id(prefix, idempotency_key);

    if !exists(&base_id) {
        return base_id;
    }

    let mut suffix = 2;
    loop {
        let id = format!("{}-{}", base_id, suffix);
        if !exists(&id) {
            return id;
        }
        suffix += 1;
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
