// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::clock::ManualClock;
use yare::parameterized;

#[derive(Debug, Clone, Copy)]
enum Signal {
    Ok,
    Fail,
    Online,
    Offline,
}

fn detector() -> ConnectivityDetector {
    ConnectivityDetector::new(Arc::new(ManualClock::new(1_000)))
}

fn apply(detector: &ConnectivityDetector, signals: &[Signal]) {
    for signal in signals {
        match signal {
            Signal::Ok => detector.record_successful_fetch(),
            Signal::Fail => detector.record_failed_fetch(),
            Signal::Online => detector.set_browser_online(true),
            Signal::Offline => detector.set_browser_online(false),
        }
    }
}

#[parameterized(
    optimistic_start = { &[], true },
    one_failure_tolerated = { &[Signal::Fail], true },
    two_failures = { &[Signal::Fail, Signal::Fail], false },
    success_resets = { &[Signal::Fail, Signal::Fail, Signal::Ok], true },
    interleaved_success = { &[Signal::Fail, Signal::Ok, Signal::Fail], true },
    platform_offline = { &[Signal::Offline], false },
    offline_beats_success = { &[Signal::Offline, Signal::Ok], false },
    online_resets_streak = { &[Signal::Fail, Signal::Fail, Signal::Online], true },
    online_then_one_failure = { &[Signal::Fail, Signal::Fail, Signal::Online, Signal::Fail], true },
    online_then_two_failures = { &[Signal::Online, Signal::Fail, Signal::Fail], false },
    back_online = { &[Signal::Offline, Signal::Online], true },
)]
fn actually_online(signals: &[Signal], expected: bool) {
    let detector = detector();
    apply(&detector, signals);
    assert_eq!(detector.is_actually_online(), expected);
}

#[test]
fn tracks_last_success_time() {
    let clock = Arc::new(ManualClock::new(5));
    let detector = ConnectivityDetector::new(clock.clone());
    assert_eq!(detector.last_successful_fetch(), None);

    clock.set(42);
    detector.record_successful_fetch();
    assert_eq!(detector.last_successful_fetch(), Some(42));
    assert_eq!(detector.consecutive_failures(), 0);
}

#[test]
fn subscribers_see_only_changes() {
    let detector = detector();
    let mut rx = detector.subscribe();
    assert!(*rx.borrow_and_update());

    detector.record_failed_fetch();
    assert!(!rx.has_changed().unwrap());

    detector.record_failed_fetch();
    assert!(rx.has_changed().unwrap());
    assert!(!*rx.borrow_and_update());

    detector.record_successful_fetch();
    assert!(*rx.borrow_and_update());
}

#[test]
fn global_instance_is_shared() {
    assert!(Arc::ptr_eq(global(), global()));
}
