// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The shared shutdown predicate stages poll between task completions, and
//! the lock-watchdog thread that can trip it out-of-band.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rra_storage::ProcessLock;

const SIGINT_WINDOW: Duration = Duration::from_secs(2);
const SIGINT_FORCE_COUNT: usize = 3;
const WATCHDOG_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Tracks a single shutdown request shared across the orchestrator, the
/// stage executor, and the lock-watchdog thread. Cheap to poll; stages call
/// [`is_shutdown_requested`](Self::is_shutdown_requested) after every task
/// completion.
pub struct ShutdownController {
    requested: AtomicBool,
    reason: Mutex<Option<String>>,
    sigint_times: Mutex<VecDeque<Instant>>,
}

impl ShutdownController {
    pub fn new() -> Arc<Self> {
        Arc::new(ShutdownController {
            requested: AtomicBool::new(false),
            reason: Mutex::new(None),
            sigint_times: Mutex::new(VecDeque::new()),
        })
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    pub fn reason(&self) -> Option<String> {
        self.reason.lock().clone()
    }

    /// Marks shutdown requested. Idempotent; only the first call's reason is
    /// retained.
    pub fn request_shutdown(&self, reason: impl Into<String>) {
        if !self.requested.swap(true, Ordering::SeqCst) {
            let reason = reason.into();
            tracing::warn!(reason = %reason, "shutdown requested");
            *self.reason.lock() = Some(reason);
        }
    }

    /// Records an external interrupt (SIGINT). Returns `true` if this is the
    /// third interrupt within a 2-second window, in which case the caller
    /// should force an immediate exit rather than wait for a graceful drain.
    pub fn note_interrupt(&self) -> bool {
        let now = Instant::now();
        let mut times = self.sigint_times.lock();
        times.retain(|&t| now.duration_since(t) <= SIGINT_WINDOW);
        times.push_back(now);
        let force = times.len() >= SIGINT_FORCE_COUNT;
        drop(times);
        self.request_shutdown("SIGINT received");
        force
    }

    /// Spawns a background thread polling `lock.is_valid()` at ~1 Hz. Losing
    /// the lock (deleted out from under the process) converts into a
    /// graceful shutdown request; the watchdog exits either way once
    /// shutdown has been requested by any means.
    pub fn spawn_lock_watchdog(self: &Arc<Self>, lock: Arc<ProcessLock>) -> std::thread::JoinHandle<()> {
        let controller = Arc::clone(self);
        std::thread::spawn(move || loop {
            if controller.is_shutdown_requested() {
                return;
            }
            if !lock.is_valid() {
                controller.request_shutdown("lock file removed");
                return;
            }
            std::thread::sleep(WATCHDOG_POLL_INTERVAL);
        })
    }
}

#[cfg(test)]
#[path = "shutdown_tests.rs"]
mod tests;
