// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use super::*;
use serde_json::json;
use tempfile::TempDir;
use tether_core::NewMutation;

fn open() -> (TempDir, Context) {
    let dir = TempDir::new().unwrap();
    let ctx = Context::open(&Paths::new(dir.path())).unwrap();
    (dir, ctx)
}

#[test]
fn list_filters_by_status() {
    let (_dir, ctx) = open();
    let queue = ctx.mutations();
    let a = queue.enqueue(NewMutation::new("A", "mutation A", json!({})));
    queue.enqueue(NewMutation::new("B", "mutation B", json!({})));
    queue.claim(&a.id).unwrap();

    assert_eq!(list_impl(&ctx, None).unwrap().len(), 2);
    let in_flight = list_impl(&ctx, Some("in-flight")).unwrap();
    assert_eq!(in_flight.len(), 1);
    assert_eq!(in_flight[0].id, a.id);
}

#[test]
fn list_rejects_unknown_status() {
    let (_dir, ctx) = open();
    let err = list_impl(&ctx, Some("queued")).unwrap_err();
    assert!(err.to_string().contains("invalid mutation status"));
}

#[test]
fn dismiss_removes_failed_mutation() {
    let (_dir, ctx) = open();
    let queue = ctx.mutations();
    let m = queue.enqueue(NewMutation::new("A", "mutation A", json!({})).with_max_retries(1));
    let claim = queue.claim(&m.id).unwrap();
    queue.record_failure(&claim, "boom").unwrap();

    let dismissed = dismiss_impl(&ctx, &m.id).unwrap();
    assert_eq!(dismissed.last_error.as_deref(), Some("boom"));
    assert!(queue.get(&m.id).is_none());
}

#[test]
fn dismiss_refuses_pending_mutation() {
    let (_dir, ctx) = open();
    let m = ctx
        .mutations()
        .enqueue(NewMutation::new("A", "mutation A", json!({})));

    match dismiss_impl(&ctx, &m.id) {
        Err(Error::NotDismissable { status, .. }) => assert_eq!(status, "pending"),
        other => panic!("expected NotDismissable, got {other:?}"),
    }
    assert!(ctx.mutations().get(&m.id).is_some());
}

#[test]
fn dismiss_unknown_id_is_not_found() {
    let (_dir, ctx) = open();
    assert!(matches!(
        dismiss_impl(&ctx, "mut-missing"),
        Err(Error::MutationNotFound(_))
    ));
}

#[test]
fn reclaim_without_age_honors_disabled_sweep() {
    let (_dir, mut ctx) = open();
    ctx.config.sync.stale_claim_after_secs = 0;
    let m = ctx
        .mutations()
        .enqueue(NewMutation::new("A", "mutation A", json!({})));
    ctx.mutations().claim(&m.id).unwrap();

    assert_eq!(reclaim_impl(&ctx, None), None);
    assert_eq!(
        ctx.mutations().get(&m.id).unwrap().status,
        MutationStatus::InFlight
    );

    assert_eq!(reclaim_impl(&ctx, Some(0)), Some(1));
    assert_eq!(
        ctx.mutations().get(&m.id).unwrap().status,
        MutationStatus::Pending
    );
}

#[test]
fn reclaim_without_age_uses_configured_age() {
    let (_dir, ctx) = open();
    let m = ctx
        .mutations()
        .enqueue(NewMutation::new("A", "mutation A", json!({})));
    ctx.mutations().claim(&m.id).unwrap();

    // A fresh claim is younger than the default ten minutes.
    assert_eq!(reclaim_impl(&ctx, None), Some(0));
}

#[test]
fn configured_retry_budget_reaches_new_mutations() {
    let (_dir, mut ctx) = open();
    ctx.config.sync.max_retries = 7;

    let m = ctx
        .mutations()
        .enqueue(NewMutation::new("A", "mutation A", json!({})));
    assert_eq!(m.max_retries, 7);

    let explicit = ctx
        .mutations()
        .enqueue(NewMutation::new("B", "mutation B", json!({})).with_max_retries(2));
    assert_eq!(explicit.max_retries, 2);
}
