// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::prelude::*;
use mc_core::{JobSpecStatus, PlanStatus};
use std::time::Duration;

// A three-job diamond in autopilot runs to a completed plan with a PR,
// honoring dependency order and the parallelism cap throughout.
#[tokio::test]
async fn autopilot_diamond_runs_to_pull_request() {
    let world = World::new();
    let orch = world.orchestrator();

    orch.start_plan(manifest(
        "autopilot",
        2,
        &[("base", &[]), ("left", &["base"]), ("right", &["base"])],
    ))
    .await
    .unwrap();

    orch.tick().await.unwrap();
    let plan = orch.store().load_plan().unwrap().unwrap();
    assert_eq!(plan.job("base").unwrap().status, JobSpecStatus::Running);
    assert_eq!(plan.job("left").unwrap().status, JobSpecStatus::WaitingDeps);

    world.clock.advance(Duration::from_secs(30));
    finish_worker(&orch, "base", 0).await;
    orch.tick().await.unwrap();

    // base merged; both dependents now run, capped at 2.
    let plan = orch.store().load_plan().unwrap().unwrap();
    assert_eq!(plan.job("base").unwrap().status, JobSpecStatus::Merged);
    assert_eq!(plan.job("left").unwrap().status, JobSpecStatus::Running);
    assert_eq!(plan.job("right").unwrap().status, JobSpecStatus::Running);
    assert_eq!(orch.store().running_jobs().unwrap().len(), 2);

    world.clock.advance(Duration::from_secs(30));
    finish_worker(&orch, "left", 0).await;
    orch.tick().await.unwrap();
    world.clock.advance(Duration::from_secs(30));
    finish_worker(&orch, "right", 0).await;
    orch.tick().await.unwrap();
    orch.tick().await.unwrap();

    let plan = orch.store().load_plan().unwrap().unwrap();
    assert_eq!(plan.status, PlanStatus::Completed);
    assert!(plan.all_merged());
    assert!(plan.pr_url.is_some());
    assert!(plan.completed_at.is_some());

    // Every dependency merged no later than its dependents.
    let base_at = plan.job("base").unwrap().merged_at.unwrap();
    for dependent in ["left", "right"] {
        assert!(base_at <= plan.job(dependent).unwrap().merged_at.unwrap());
    }

    let requests = world.pr.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].branch, plan.integration_branch);
}

// Copilot pauses exactly once, at birth.
#[tokio::test]
async fn copilot_pauses_only_at_the_start() {
    let world = World::new();
    let orch = world.orchestrator();

    let plan = orch
        .start_plan(manifest("copilot", 1, &[("solo", &[])]))
        .await
        .unwrap();
    assert_eq!(plan.status, PlanStatus::Pending);

    // Unapproved: ticks do nothing.
    orch.tick().await.unwrap();
    let plan = orch.store().load_plan().unwrap().unwrap();
    assert_eq!(plan.job("solo").unwrap().status, JobSpecStatus::Queued);

    orch.approve_plan(None).await.unwrap();
    orch.tick().await.unwrap();
    finish_worker(&orch, "solo", 0).await;
    orch.tick().await.unwrap();
    orch.tick().await.unwrap();

    let plan = orch.store().load_plan().unwrap().unwrap();
    assert_eq!(plan.status, PlanStatus::Completed);
    assert!(plan.checkpoint.is_none());
}

// A second plan cannot start while one is active, but can after
// cancellation.
#[tokio::test]
async fn one_active_plan_per_project() {
    let world = World::new();
    let orch = world.orchestrator();

    orch.start_plan(manifest("autopilot", 1, &[("a", &[])]))
        .await
        .unwrap();
    assert!(orch
        .start_plan(manifest("autopilot", 1, &[("b", &[])]))
        .await
        .is_err());

    orch.cancel_plan().await.unwrap();
    orch.start_plan(manifest("autopilot", 1, &[("b", &[])]))
        .await
        .unwrap();
}
