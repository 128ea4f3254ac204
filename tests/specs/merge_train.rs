// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::prelude::*;
use mc_adapters::GitCall;
use mc_core::{Checkpoint, JobSpecStatus, PlanStatus};

// Jobs completing out of order (c, a, b) merge in exactly that order.
#[tokio::test]
async fn merges_happen_in_completion_order() {
    let world = World::new();
    let orch = world.orchestrator();

    orch.start_plan(manifest(
        "autopilot",
        3,
        &[("a", &[]), ("b", &[]), ("c", &[])],
    ))
    .await
    .unwrap();
    orch.tick().await.unwrap();

    for name in ["c", "a", "b"] {
        finish_worker(&orch, name, 0).await;
        orch.tick().await.unwrap();
    }
    orch.tick().await.unwrap();

    let plan = orch.store().load_plan().unwrap().unwrap();
    assert!(plan.all_merged());
    assert_eq!(plan.job("c").unwrap().merge_order, Some(0));
    assert_eq!(plan.job("a").unwrap().merge_order, Some(1));
    assert_eq!(plan.job("b").unwrap().merge_order, Some(2));

    let merged_branches: Vec<String> = world
        .git
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            GitCall::Merge { branch, .. } => Some(branch),
            _ => None,
        })
        .collect();
    assert_eq!(merged_branches, vec!["mc/c", "mc/a", "mc/b"]);
}

// Two jobs touching the same file: the second conflicts, the plan pauses
// (supervisor) with the conflicting file recorded.
#[tokio::test]
async fn second_overlapping_job_conflicts_and_pauses_supervisor() {
    let world = World::new();
    let orch = world.orchestrator();

    orch.start_plan(manifest("supervisor", 2, &[("first", &[]), ("second", &[])]))
        .await
        .unwrap();
    orch.tick().await.unwrap();

    world
        .git
        .set_merge_conflict("mc/second", vec!["src/shared.rs".into()]);

    finish_worker(&orch, "first", 0).await;
    orch.tick().await.unwrap();
    orch.approve_plan(Some(Checkpoint::PreMerge)).await.unwrap();
    orch.tick().await.unwrap();

    finish_worker(&orch, "second", 0).await;
    orch.tick().await.unwrap();
    orch.approve_plan(Some(Checkpoint::PreMerge)).await.unwrap();
    orch.tick().await.unwrap();

    let plan = orch.store().load_plan().unwrap().unwrap();
    assert_eq!(plan.status, PlanStatus::Paused);
    assert_eq!(plan.checkpoint, Some(Checkpoint::OnError));
    assert_eq!(
        plan.job("second").unwrap().status,
        JobSpecStatus::NeedsRebase
    );
    assert_eq!(
        plan.checkpoint_context.get("conflicts").map(String::as_str),
        Some("src/shared.rs")
    );
    assert_eq!(plan.job("first").unwrap().status, JobSpecStatus::Merged);
}

// Same shape in autopilot: the plan just fails.
#[tokio::test]
async fn conflict_fails_an_autopilot_plan() {
    let world = World::new();
    let orch = world.orchestrator();

    orch.start_plan(manifest("autopilot", 2, &[("first", &[]), ("second", &[])]))
        .await
        .unwrap();
    orch.tick().await.unwrap();

    world
        .git
        .set_merge_conflict("mc/second", vec!["src/shared.rs".into()]);

    finish_worker(&orch, "first", 0).await;
    orch.tick().await.unwrap();
    finish_worker(&orch, "second", 0).await;
    orch.tick().await.unwrap();
    orch.tick().await.unwrap();

    let plan = orch.store().load_plan().unwrap().unwrap();
    assert_eq!(plan.status, PlanStatus::Failed);
}
