// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

crate::define_id! {
    /// Test ID type.
    pub struct TestId;
}

#[test]
fn define_id_generates_accessors() {
    let id = TestId::new("abcdef123456");
    assert_eq!(id.as_str(), "abcdef123456");
    assert_eq!(id.short(6), "abcdef");
    assert_eq!(id.to_string(), "abcdef123456");
    assert_eq!(id, "abcdef123456");
}

#[test]
fn short_id_handles_short_strings() {
    assert_eq!("ab".short(6), "ab");
    assert_eq!("abcdef".short(6), "abcdef");
    assert_eq!("abcdefgh".short(6), "abcdef");
}

#[test]
fn uuid_gen_produces_unique_ids() {
    let gen = UuidIdGen;
    let a = gen.next();
    let b = gen.next();
    assert_ne!(a, b);
    assert_eq!(a.len(), 36);
}

#[test]
fn sequential_gen_counts_up() {
    let gen = SequentialIdGen::new("job");
    assert_eq!(gen.next(), "job-1");
    assert_eq!(gen.next(), "job-2");

    // Clones share the counter
    let clone = gen.clone();
    assert_eq!(clone.next(), "job-3");
    assert_eq!(gen.next(), "job-4");
}
