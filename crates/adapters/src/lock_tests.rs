// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use parking_lot::Mutex as SyncMutex;
use std::time::Duration;

#[tokio::test]
async fn with_lock_returns_closure_result() {
    let lock = SerialLock::new();
    let value = lock.with_lock(|| async { 41 + 1 }).await;
    assert_eq!(value, 42);
}

#[tokio::test]
async fn lock_serializes_read_modify_write() {
    let lock = SerialLock::new();
    let shared = Arc::new(SyncMutex::new(0u32));

    let mut handles = Vec::new();
    for _ in 0..10 {
        let lock = lock.clone();
        let shared = Arc::clone(&shared);
        handles.push(tokio::spawn(async move {
            lock.with_lock(|| async {
                // Read, suspend, write: racy without the lock.
                let read = *shared.lock();
                tokio::time::sleep(Duration::from_millis(1)).await;
                *shared.lock() = read + 1;
            })
            .await;
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(*shared.lock(), 10);
}

#[tokio::test]
async fn guard_holds_across_await() {
    let lock = SerialLock::new();
    let guard = lock.lock().await;

    // A second acquisition must not succeed while the guard lives.
    let lock2 = lock.clone();
    let contender = tokio::spawn(async move {
        let _g = lock2.lock().await;
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!contender.is_finished());

    drop(guard);
    contender.await.unwrap();
}
