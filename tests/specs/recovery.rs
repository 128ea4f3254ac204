// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::prelude::*;
use mc_core::{Checkpoint, JobStatus, PlanStatus};

// Crash recovery: a restart with a dead worker fails the job within one
// tick, and the plan follows.
#[tokio::test]
async fn restart_with_dead_worker_fails_job_and_plan() {
    let world = World::new();

    // First process: start the plan, launch the worker, "crash".
    {
        let orch = world.orchestrator();
        orch.start_plan(manifest("autopilot", 1, &[("a", &[])]))
            .await
            .unwrap();
        orch.tick().await.unwrap();
    }

    // The tmux session dies while no process is watching.
    let job = {
        let orch = world.orchestrator();
        orch.store().find_job("a").unwrap().unwrap()
    };
    world
        .sessions
        .set_dead(job.terminal_target.as_deref().unwrap());

    // Second process: resume, reconcile.
    let orch = world.orchestrator();
    let report = orch.resume_plan().await.unwrap();
    assert_eq!(report.failed, vec!["a"]);
    assert!(report.armed);

    orch.tick().await.unwrap();
    let plan = orch.store().load_plan().unwrap().unwrap();
    assert_eq!(plan.status, PlanStatus::Failed);
    assert_eq!(
        orch.store().find_job("a").unwrap().unwrap().status,
        JobStatus::Failed
    );
}

// A worker that survived the crash keeps running after a restart.
#[tokio::test]
async fn restart_keeps_live_workers_running() {
    let world = World::new();
    {
        let orch = world.orchestrator();
        orch.start_plan(manifest("autopilot", 1, &[("a", &[])]))
            .await
            .unwrap();
        orch.tick().await.unwrap();
    }

    let orch = world.orchestrator();
    let report = orch.resume_plan().await.unwrap();
    assert_eq!(report.reattached, vec!["a"]);
    assert!(report.failed.is_empty());

    // Still running; the restarted process can drive it to completion.
    finish_worker(&orch, "a", 0).await;
    orch.tick().await.unwrap();
    orch.tick().await.unwrap();
    assert_eq!(
        orch.store().load_plan().unwrap().unwrap().status,
        PlanStatus::Completed
    );
}

// A checkpointed plan does not re-arm on resume.
#[tokio::test]
async fn restart_at_checkpoint_stays_paused() {
    let world = World::new();
    {
        let orch = world.orchestrator();
        orch.start_plan(manifest("supervisor", 1, &[("a", &[])]))
            .await
            .unwrap();
        orch.tick().await.unwrap();
        finish_worker(&orch, "a", 0).await;
        orch.tick().await.unwrap();
        assert_eq!(
            orch.store().load_plan().unwrap().unwrap().checkpoint,
            Some(Checkpoint::PreMerge)
        );
    }

    let orch = world.orchestrator();
    let report = orch.resume_plan().await.unwrap();
    assert!(!report.armed);
    assert_eq!(
        orch.store().load_plan().unwrap().unwrap().status,
        PlanStatus::Paused
    );
}
