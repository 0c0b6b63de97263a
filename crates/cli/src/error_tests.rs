// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn not_dismissable_has_hint() {
    let err = Error::NotDismissable {
        id: "mut-1".into(),
        status: "pending".into(),
    };
    let msg = err.to_string();
    assert!(msg.contains("mut-1"));
    assert!(msg.contains("hint: only failed"));
}

#[test]
fn core_errors_pass_through() {
    let err: Error = tether_core::Error::InvalidStatus("queued".into()).into();
    assert!(err.to_string().starts_with("invalid mutation status: 'queued'"));
}
