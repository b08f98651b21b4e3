// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide registry of live session locks.
//!
//! Entries are non-owning weak references; locks are owned by their callers
//! and unregister themselves on release. A single signal-handler thread is
//! installed on first registration: SIGINT, SIGTERM, and SIGHUP release
//! every registered lock before the default termination action runs.

use crate::lock::LockInner;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Once, Weak};

static ACTIVE_LOCKS: LazyLock<Mutex<HashMap<String, Weak<LockInner>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

static SIGNAL_HANDLER: Once = Once::new();

pub(crate) fn register(inner: &Arc<LockInner>) {
    install_signal_handler();
    ACTIVE_LOCKS.lock().insert(inner.instance_id().to_string(), Arc::downgrade(inner));
}

pub(crate) fn unregister(instance_id: &str) {
    ACTIVE_LOCKS.lock().remove(instance_id);
}

/// Number of live registered locks. Dropped entries do not count.
#[cfg(test)]
pub(crate) fn live_count() -> usize {
    ACTIVE_LOCKS.lock().values().filter(|weak| weak.strong_count() > 0).count()
}

/// Release every registered lock. Used by the signal handler; safe to call
/// any time since release is idempotent.
pub(crate) fn release_all() {
    let locks: Vec<Weak<LockInner>> = ACTIVE_LOCKS.lock().values().cloned().collect();
    for weak in locks {
        if let Some(inner) = weak.upgrade() {
            if let Err(err) = inner.release() {
                tracing::warn!(%err, "lock release during shutdown failed");
            }
        }
    }
}

fn install_signal_handler() {
    SIGNAL_HANDLER.call_once(|| {
        use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;

        let mut signals = match Signals::new([SIGINT, SIGTERM, SIGHUP]) {
            Ok(signals) => signals,
            Err(err) => {
                tracing::warn!(%err, "signal handler installation failed; locks will not be cleaned up on exit");
                return;
            }
        };
        std::thread::spawn(move || {
            if let Some(signal) = signals.forever().next() {
                tracing::info!(signal, "releasing session locks on termination signal");
                release_all();
                let _ = signal_hook::low_level::emulate_default_handler(signal);
            }
        });
    });
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
