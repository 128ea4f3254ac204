// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The process-wide serialization lock.
//!
//! A single FIFO async mutex serializes every state read-modify-write and
//! every git invocation in the process. Git repositories are not safe for
//! concurrent writers within one process, so the same lock doubles as the
//! VC serializer. tokio's mutex is fair (oldest waiter acquires first)
//! and its guard is held across await points, which is exactly what a
//! read-modify-write cycle needs.
//!
//! The lock is NOT reentrant: never call an adapter primitive (which
//! acquires internally) while already holding a guard.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// Cloneable handle to the process serialization lock.
#[derive(Clone, Debug, Default)]
pub struct SerialLock {
    inner: Arc<Mutex<()>>,
}

impl SerialLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock; the guard holds across suspension.
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.inner.lock().await
    }

    /// Run `f` to completion while holding the lock.
    pub async fn with_lock<T, F, Fut>(&self, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _guard = self.inner.lock().await;
        f().await
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
