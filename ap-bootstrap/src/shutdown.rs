// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Shutdown Coordination
//!
//! A single `ShutdownHandle` shared across the HTTP/worker loop and the job
//! scheduler. [`crate::signals`] calls [`ShutdownCoordinator::trigger`] when a
//! signal arrives; every long-running loop awaits
//! [`ShutdownHandle::cancelled`] alongside its real work in a `tokio::select!`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    notified: AtomicBool,
    notify: Notify,
}

/// Owns the shutdown signal. Created once at startup; `handle()` is cloned
/// into every task that needs to observe it.
#[derive(Debug, Clone, Default)]
pub struct ShutdownCoordinator {
    inner: Arc<Inner>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals every waiting `cancelled()` future, now and in the future.
    pub fn trigger(&self) {
        self.inner.notified.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.notified.load(Ordering::SeqCst)
    }

    pub fn handle(&self) -> ShutdownHandle {
        ShutdownHandle { inner: self.inner.clone() }
    }
}

/// The read-only side handed to workers.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    inner: Arc<Inner>,
}

impl ShutdownHandle {
    pub fn is_triggered(&self) -> bool {
        self.inner.notified.load(Ordering::SeqCst)
    }

    /// Resolves once `trigger()` has been (or already was) called.
    pub async fn cancelled(&self) {
        if self.inner.notified.load(Ordering::SeqCst) {
            return;
        }
        self.inner.notify.notified().await;
    }
}
