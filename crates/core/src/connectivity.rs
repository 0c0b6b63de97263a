// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Conservative "is the network actually usable" signal.
//!
//! Two inputs feed the detector: the platform's online/offline events and
//! the outcome of real fetches. Going offline takes any one signal; coming
//! back needs evidence, since an `online` event only resets the failure
//! streak.
//!
//! The state lives in memory only. A process-wide instance is available
//! through [`global`] and the free functions below; it starts optimistic
//! (online, no failures) and is never persisted.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use tokio::sync::watch;

use crate::clock::{ClockSource, SystemClock};

/// Consecutive failed fetches after which the network counts as unusable.
pub const FAILURE_THRESHOLD: u32 = 2;

pub struct ConnectivityDetector {
    browser_online: AtomicBool,
    consecutive_failures: AtomicU32,
    /// 0 until the first successful fetch.
    last_success_ms: AtomicU64,
    clock: Arc<dyn ClockSource>,
    usable: watch::Sender<bool>,
}

impl ConnectivityDetector {
    pub fn new(clock: Arc<dyn ClockSource>) -> Self {
        let (usable, _) = watch::channel(true);
        ConnectivityDetector {
            browser_online: AtomicBool::new(true),
            consecutive_failures: AtomicU32::new(0),
            last_success_ms: AtomicU64::new(0),
            clock,
            usable,
        }
    }

    pub fn record_successful_fetch(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
        self.last_success_ms.store(self.clock.now_ms(), Ordering::SeqCst);
        self.publish();
    }

    pub fn record_failed_fetch(&self) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
        if failures == FAILURE_THRESHOLD {
            tracing::info!(failures, "repeated fetch failures, treating network as unusable");
        }
        self.publish();
    }

    /// Applies a platform `online` (`true`) or `offline` (`false`) event.
    pub fn set_browser_online(&self, online: bool) {
        self.browser_online.store(online, Ordering::SeqCst);
        if online {
            self.consecutive_failures.store(0, Ordering::SeqCst);
        }
        tracing::debug!(online, "platform connectivity changed");
        self.publish();
    }

    pub fn is_actually_online(&self) -> bool {
        self.browser_online.load(Ordering::SeqCst)
            && self.consecutive_failures.load(Ordering::SeqCst) < FAILURE_THRESHOLD
    }

    pub fn is_browser_online(&self) -> bool {
        self.browser_online.load(Ordering::SeqCst)
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::SeqCst)
    }

    /// Time (ms) of the last successful fetch, if any.
    pub fn last_successful_fetch(&self) -> Option<u64> {
        match self.last_success_ms.load(Ordering::SeqCst) {
            0 => None,
            ms => Some(ms),
        }
    }

    /// Watches [`Self::is_actually_online`]; notified only on changes.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.usable.subscribe()
    }

    fn publish(&self) {
        let usable = self.is_actually_online();
        self.usable.send_if_modified(|current| {
            let changed = *current != usable;
            *current = usable;
            changed
        });
    }
}

static GLOBAL: OnceLock<Arc<ConnectivityDetector>> = OnceLock::new();

/// The process-wide detector, created on first use.
pub fn global() -> &'static Arc<ConnectivityDetector> {
    GLOBAL.get_or_init(|| Arc::new(ConnectivityDetector::new(Arc::new(SystemClock))))
}

pub fn record_successful_fetch() {
    global().record_successful_fetch();
}

pub fn record_failed_fetch() {
    global().record_failed_fetch();
}

pub fn is_actually_online() -> bool {
    global().is_actually_online()
}

#[cfg(test)]
#[path = "connectivity_tests.rs"]
mod tests;
