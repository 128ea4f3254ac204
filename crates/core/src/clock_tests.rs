// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn fake_clock_advances() {
    let clock = FakeClock::new();
    let t0 = clock.now();
    let ms0 = clock.epoch_ms();

    clock.advance(Duration::from_secs(5));
    assert_eq!(clock.now() - t0, Duration::from_secs(5));
    assert_eq!(clock.epoch_ms() - ms0, 5000);
}

#[test]
fn fake_clock_clones_share_time() {
    let clock = FakeClock::new();
    let clone = clock.clone();

    clock.advance(Duration::from_secs(30));
    assert_eq!(clone.now(), clock.now());
    assert_eq!(clone.epoch_ms(), clock.epoch_ms());
}

#[test]
fn fake_clock_utc_tracks_epoch() {
    let clock = FakeClock::new();
    let before = clock.utc_now();
    clock.advance(Duration::from_secs(60));
    let after = clock.utc_now();
    assert_eq!((after - before).num_seconds(), 60);
}

#[test]
fn system_clock_is_monotonic() {
    let clock = SystemClock;
    let a = clock.now();
    let b = clock.now();
    assert!(b >= a);
    assert!(clock.epoch_ms() > 0);
}
