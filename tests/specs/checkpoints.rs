// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::prelude::*;
use mc_core::{Checkpoint, JobSpecStatus, PlanStatus};
use mc_engine::EngineError;

// Supervisor mode pauses before every merge and before the PR; each
// pause requires its own approval.
#[tokio::test]
async fn supervisor_requires_approval_at_every_step() {
    let world = World::new();
    let orch = world.orchestrator();

    orch.start_plan(manifest("supervisor", 2, &[("a", &[]), ("b", &["a"])]))
        .await
        .unwrap();
    orch.tick().await.unwrap();

    finish_worker(&orch, "a", 0).await;
    orch.tick().await.unwrap();
    let plan = orch.store().load_plan().unwrap().unwrap();
    assert_eq!(plan.status, PlanStatus::Paused);
    assert_eq!(plan.checkpoint, Some(Checkpoint::PreMerge));

    orch.approve_plan(Some(Checkpoint::PreMerge)).await.unwrap();
    orch.tick().await.unwrap();
    let plan = orch.store().load_plan().unwrap().unwrap();
    assert_eq!(plan.job("a").unwrap().status, JobSpecStatus::Merged);
    assert_eq!(plan.job("b").unwrap().status, JobSpecStatus::Running);

    finish_worker(&orch, "b", 0).await;
    orch.tick().await.unwrap();
    assert_eq!(
        orch.store().load_plan().unwrap().unwrap().checkpoint,
        Some(Checkpoint::PreMerge)
    );

    orch.approve_plan(Some(Checkpoint::PreMerge)).await.unwrap();
    orch.tick().await.unwrap();
    let plan = orch.store().load_plan().unwrap().unwrap();
    assert_eq!(plan.checkpoint, Some(Checkpoint::PrePr));

    orch.approve_plan(Some(Checkpoint::PrePr)).await.unwrap();
    orch.tick().await.unwrap();
    assert_eq!(
        orch.store().load_plan().unwrap().unwrap().status,
        PlanStatus::Completed
    );
}

// Idempotence law: approving the same checkpoint twice fails the second
// time with a mismatch.
#[tokio::test]
async fn double_approval_is_a_checkpoint_mismatch() {
    let world = World::new();
    let orch = world.orchestrator();

    orch.start_plan(manifest("supervisor", 1, &[("a", &[])]))
        .await
        .unwrap();
    orch.tick().await.unwrap();
    finish_worker(&orch, "a", 0).await;
    orch.tick().await.unwrap();

    orch.approve_plan(Some(Checkpoint::PreMerge)).await.unwrap();
    let err = orch
        .approve_plan(Some(Checkpoint::PreMerge))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::CheckpointMismatch { .. }));
}

// The paused invariant: checkpoint set exactly when status is paused.
#[tokio::test]
async fn checkpoint_iff_paused_through_the_whole_flow() {
    let world = World::new();
    let orch = world.orchestrator();

    orch.start_plan(manifest("supervisor", 1, &[("a", &[])]))
        .await
        .unwrap();

    let mut observed = Vec::new();
    for step in 0..4 {
        let plan = orch.store().load_plan().unwrap().unwrap();
        assert_eq!(
            plan.checkpoint.is_some(),
            plan.status == PlanStatus::Paused,
            "invariant broken at step {}",
            step
        );
        observed.push(plan.status);

        match step {
            0 => {
                orch.tick().await.unwrap();
                finish_worker(&orch, "a", 0).await;
                orch.tick().await.unwrap();
            }
            1 => {
                orch.approve_plan(None).await.unwrap();
                orch.tick().await.unwrap();
            }
            2 => {
                orch.approve_plan(None).await.unwrap();
                orch.tick().await.unwrap();
            }
            _ => {}
        }
    }
    assert_eq!(
        observed,
        vec![
            PlanStatus::Running,
            PlanStatus::Paused,
            PlanStatus::Paused,
            PlanStatus::Completed,
        ]
    );
}
