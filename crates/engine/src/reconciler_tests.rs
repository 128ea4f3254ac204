// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::{fixture, manifest, Fixture};
use mc_adapters::GitCall;
use mc_core::{JobSpecStatus, JobStatus, PlanManifest};
use std::time::Duration;

async fn start(fix: &Fixture, mode: &str, cap: u32, jobs: &[(&str, &[&str])]) -> Plan {
    let parsed = PlanManifest::parse(&manifest(mode, cap, jobs)).unwrap();
    fix.orch.start_plan(parsed).await.unwrap()
}

fn plan_of(fix: &Fixture) -> Plan {
    fix.orch.store().load_plan().unwrap().unwrap()
}

fn spec_status(fix: &Fixture, name: &str) -> JobSpecStatus {
    plan_of(fix).job(name).unwrap().status
}

// Scenario: DAG ordering — `b` depends on `a`, so only `a` launches
// first, and `b` launches only after `a` merges.
#[tokio::test]
async fn dependent_job_waits_for_merge() {
    let fix = fixture();
    start(&fix, "autopilot", 2, &[("a", &[]), ("b", &["a"])]).await;

    fix.orch.tick().await.unwrap();
    assert_eq!(spec_status(&fix, "a"), JobSpecStatus::Running);
    assert_eq!(spec_status(&fix, "b"), JobSpecStatus::WaitingDeps);

    fix.clock.advance(Duration::from_secs(60));
    fix.finish_worker("a", 0).await;
    fix.orch.tick().await.unwrap();

    assert_eq!(spec_status(&fix, "a"), JobSpecStatus::Merged);
    assert_eq!(spec_status(&fix, "b"), JobSpecStatus::Running);

    // Dependency invariant: a merged no later than b will.
    fix.clock.advance(Duration::from_secs(60));
    fix.finish_worker("b", 0).await;
    fix.orch.tick().await.unwrap();

    let plan = plan_of(&fix);
    let a = plan.job("a").unwrap();
    let b = plan.job("b").unwrap();
    assert_eq!(b.status, JobSpecStatus::Merged);
    assert!(a.merged_at.unwrap() <= b.merged_at.unwrap());
}

// Scenario: parallel cap — three independent jobs under max_parallel 2.
#[tokio::test]
async fn parallel_cap_holds_back_third_job() {
    let fix = fixture();
    start(&fix, "autopilot", 2, &[("j1", &[]), ("j2", &[]), ("j3", &[])]).await;

    fix.orch.tick().await.unwrap();
    assert_eq!(spec_status(&fix, "j1"), JobSpecStatus::Running);
    assert_eq!(spec_status(&fix, "j2"), JobSpecStatus::Running);
    assert_eq!(spec_status(&fix, "j3"), JobSpecStatus::Queued);
    assert_eq!(fix.orch.store().running_jobs().unwrap().len(), 2);

    fix.finish_worker("j1", 0).await;
    fix.orch.tick().await.unwrap();
    assert_eq!(spec_status(&fix, "j1"), JobSpecStatus::Merged);
    assert_eq!(spec_status(&fix, "j3"), JobSpecStatus::Running);
    assert!(fix.orch.store().running_jobs().unwrap().len() <= 2);
}

// Scenario: sequential merges — jobs complete out of order (c, a, b) and
// merge in exactly that order.
#[tokio::test]
async fn merges_follow_completion_order() {
    let fix = fixture();
    start(&fix, "autopilot", 3, &[("a", &[]), ("b", &[]), ("c", &[])]).await;
    fix.orch.tick().await.unwrap();

    for name in ["c", "a", "b"] {
        fix.finish_worker(name, 0).await;
        fix.orch.tick().await.unwrap();
    }
    // Drain any remaining train entries.
    fix.orch.tick().await.unwrap();
    fix.orch.tick().await.unwrap();

    let plan = plan_of(&fix);
    assert_eq!(plan.job("c").unwrap().merge_order, Some(0));
    assert_eq!(plan.job("a").unwrap().merge_order, Some(1));
    assert_eq!(plan.job("b").unwrap().merge_order, Some(2));
    assert!(plan.all_merged());

    let merges: Vec<String> = fix
        .git
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            GitCall::Merge { branch, .. } => Some(branch),
            _ => None,
        })
        .collect();
    assert_eq!(merges, vec!["mc/c", "mc/a", "mc/b"]);
}

// Scenario: supervisor pause — a completed job pauses the plan at
// pre_merge; nothing merges until approval.
#[tokio::test]
async fn supervisor_pauses_before_each_merge() {
    let fix = fixture();
    start(&fix, "supervisor", 2, &[("a", &[])]).await;
    fix.orch.tick().await.unwrap();

    fix.finish_worker("a", 0).await;
    fix.orch.tick().await.unwrap();

    let plan = plan_of(&fix);
    assert_eq!(plan.status, PlanStatus::Paused);
    assert_eq!(plan.checkpoint, Some(Checkpoint::PreMerge));
    assert_eq!(spec_status(&fix, "a"), JobSpecStatus::ReadyToMerge);

    // Paused: further ticks change nothing.
    fix.orch.tick().await.unwrap();
    assert_eq!(spec_status(&fix, "a"), JobSpecStatus::ReadyToMerge);
    assert!(fix
        .notify
        .toast_titles()
        .iter()
        .any(|t| t.contains("paused at pre_merge")));

    fix.orch
        .approve_plan(Some(Checkpoint::PreMerge))
        .await
        .unwrap();
    fix.orch.tick().await.unwrap();
    assert_eq!(spec_status(&fix, "a"), JobSpecStatus::Merged);

    // All merged now: the plan pauses again before the PR.
    let plan = plan_of(&fix);
    assert_eq!(plan.checkpoint, Some(Checkpoint::PrePr));

    fix.orch.approve_plan(Some(Checkpoint::PrePr)).await.unwrap();
    fix.orch.tick().await.unwrap();

    let plan = plan_of(&fix);
    assert_eq!(plan.status, PlanStatus::Completed);
    assert!(plan.pr_url.as_deref().unwrap().contains("mc/integration-"));
    assert_eq!(fix.pr.requests().len(), 1);
}

// Scenario: merge conflict — autopilot fails the plan, supervisor pauses
// at on_error.
#[tokio::test]
async fn conflict_fails_autopilot_plan() {
    let fix = fixture();
    start(&fix, "autopilot", 2, &[("a", &[]), ("b", &[])]).await;
    fix.orch.tick().await.unwrap();

    fix.git
        .set_merge_conflict("mc/b", vec!["src/shared.rs".into()]);

    fix.finish_worker("a", 0).await;
    fix.orch.tick().await.unwrap();
    fix.finish_worker("b", 0).await;
    fix.orch.tick().await.unwrap();
    fix.orch.tick().await.unwrap();

    let plan = plan_of(&fix);
    assert_eq!(plan.status, PlanStatus::Failed);
    let b = plan.job("b").unwrap();
    assert_eq!(b.status, JobSpecStatus::NeedsRebase);
    assert!(b
        .failure_reason
        .as_deref()
        .unwrap()
        .contains("src/shared.rs"));
}

#[tokio::test]
async fn conflict_pauses_supervisor_plan_at_on_error() {
    let fix = fixture();
    start(&fix, "supervisor", 1, &[("a", &[])]).await;
    fix.orch.tick().await.unwrap();

    fix.git.set_merge_conflict("mc/a", vec!["src/lib.rs".into()]);
    fix.finish_worker("a", 0).await;
    fix.orch.tick().await.unwrap();

    // Clear pre_merge, then the conflict surfaces.
    fix.orch
        .approve_plan(Some(Checkpoint::PreMerge))
        .await
        .unwrap();
    fix.orch.tick().await.unwrap();

    let plan = plan_of(&fix);
    assert_eq!(plan.status, PlanStatus::Paused);
    assert_eq!(plan.checkpoint, Some(Checkpoint::OnError));
    assert_eq!(plan.checkpoint_context.get("job").map(String::as_str), Some("a"));
    assert_eq!(
        plan.checkpoint_context.get("conflicts").map(String::as_str),
        Some("src/lib.rs")
    );
    assert_eq!(spec_status(&fix, "a"), JobSpecStatus::NeedsRebase);
}

// Test failures map exactly like conflicts.
#[tokio::test]
async fn failing_tests_revert_and_fail_autopilot_plan() {
    let fix = fixture();
    let toml = r#"
[plan]
name = "tested"
mode = "autopilot"
max_parallel = 1

[plan.test]
command = "cargo test"

[[job]]
name = "a"
prompt = "do it"
"#;
    fix.orch
        .start_plan(PlanManifest::parse(toml).unwrap())
        .await
        .unwrap();
    fix.orch.tick().await.unwrap();

    fix.shell.set_result("cargo test", 1, "1 test failed");
    fix.finish_worker("a", 0).await;
    fix.orch.tick().await.unwrap();
    fix.orch.tick().await.unwrap();

    let plan = plan_of(&fix);
    assert_eq!(plan.status, PlanStatus::Failed);
    let a = plan.job("a").unwrap();
    assert_eq!(a.status, JobSpecStatus::NeedsRebase);
    assert!(a.failure_reason.as_deref().unwrap().contains("cargo test"));
    // The merge was rewound.
    assert!(fix
        .git
        .calls()
        .iter()
        .any(|c| matches!(c, GitCall::ResetHard { .. })));
}

// A worker dying with a non-zero exit fails the job and, in autopilot,
// the plan.
#[tokio::test]
async fn failed_worker_fails_autopilot_plan() {
    let fix = fixture();
    start(&fix, "autopilot", 2, &[("a", &[])]).await;
    fix.orch.tick().await.unwrap();

    fix.finish_worker("a", 3).await;
    fix.orch.tick().await.unwrap();

    let plan = plan_of(&fix);
    assert_eq!(plan.status, PlanStatus::Failed);
    assert_eq!(spec_status(&fix, "a"), JobSpecStatus::Failed);
    assert_eq!(
        fix.orch.store().find_job("a").unwrap().unwrap().exit_code,
        Some(3)
    );
}

#[tokio::test]
async fn failed_worker_pauses_supervisor_plan() {
    let fix = fixture();
    start(&fix, "supervisor", 2, &[("a", &[])]).await;
    fix.orch.tick().await.unwrap();

    fix.finish_worker("a", 1).await;
    fix.orch.tick().await.unwrap();

    let plan = plan_of(&fix);
    assert_eq!(plan.status, PlanStatus::Paused);
    assert_eq!(plan.checkpoint, Some(Checkpoint::OnError));
}

// Copilot: born pending, runs hands-off after the first approval.
#[tokio::test]
async fn copilot_waits_for_first_approval_then_runs_through() {
    let fix = fixture();
    let plan = start(&fix, "copilot", 2, &[("a", &[])]).await;
    assert_eq!(plan.status, PlanStatus::Pending);

    fix.orch.tick().await.unwrap();
    assert_eq!(spec_status(&fix, "a"), JobSpecStatus::Queued);

    fix.orch.approve_plan(None).await.unwrap();
    fix.orch.tick().await.unwrap();
    assert_eq!(spec_status(&fix, "a"), JobSpecStatus::Running);

    fix.finish_worker("a", 0).await;
    fix.orch.tick().await.unwrap();
    fix.orch.tick().await.unwrap();

    // No pre_merge, no pre_pr: straight to completed.
    let plan = plan_of(&fix);
    assert_eq!(plan.status, PlanStatus::Completed);
    assert!(plan.pr_url.is_some());
}

// Autopilot completion opens the PR with the merged jobs listed.
#[tokio::test]
async fn completed_plan_records_pr_url() {
    let fix = fixture();
    start(&fix, "autopilot", 2, &[("a", &[]), ("b", &["a"])]).await;
    fix.orch.tick().await.unwrap();
    fix.finish_worker("a", 0).await;
    fix.orch.tick().await.unwrap();
    fix.finish_worker("b", 0).await;
    fix.orch.tick().await.unwrap();
    fix.orch.tick().await.unwrap();

    let plan = plan_of(&fix);
    assert_eq!(plan.status, PlanStatus::Completed);
    assert!(plan.completed_at.is_some());

    let requests = fix.pr.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].base, "main");
    assert!(requests[0].body.contains("a"));
    assert!(requests[0].body.contains("b"));
    assert!(fix
        .git
        .calls()
        .contains(&GitCall::Push {
            branch: plan.integration_branch.clone(),
        }));
}

// A launch failure is encoded into state, not propagated.
#[tokio::test]
async fn launch_failure_fails_job_and_autopilot_plan() {
    let fix = fixture();
    start(&fix, "autopilot", 2, &[("a", &[])]).await;

    fix.git.fail_next_worktree("disk full");
    fix.orch.tick().await.unwrap();

    let plan = plan_of(&fix);
    assert_eq!(spec_status(&fix, "a"), JobSpecStatus::Failed);
    assert_eq!(plan.status, PlanStatus::Failed);
}

// Worker events for unknown jobs are dropped with a log.
#[tokio::test]
async fn unknown_worker_event_is_dropped() {
    let fix = fixture();
    start(&fix, "autopilot", 2, &[("a", &[])]).await;
    fix.orch.tick().await.unwrap();

    fix.orch
        .apply_worker_event(mc_core::WorkerEvent::Completed {
            job_id: mc_core::JobId::new("ghost"),
            exit_code: 0,
        })
        .await;
    fix.orch.tick().await.unwrap();

    assert_eq!(spec_status(&fix, "a"), JobSpecStatus::Running);
}

// Scenario: crash recovery — a running job whose terminal died is failed
// within one tick of resume.
#[tokio::test]
async fn restart_fails_jobs_with_dead_terminals() {
    let fix = fixture();
    start(&fix, "autopilot", 2, &[("a", &[])]).await;
    fix.orch.tick().await.unwrap();

    let job = fix.orch.store().find_job("a").unwrap().unwrap();
    fix.sessions.set_dead(job.terminal_target.as_deref().unwrap());

    let report = fix.orch.resume_plan().await.unwrap();
    assert_eq!(report.failed, vec!["a"]);
    assert!(report.reattached.is_empty());
    assert!(report.armed);

    fix.orch.tick().await.unwrap();
    let plan = plan_of(&fix);
    assert_eq!(plan.status, PlanStatus::Failed);
    assert_eq!(
        fix.orch.store().find_job("a").unwrap().unwrap().status,
        JobStatus::Failed
    );
}

#[tokio::test]
async fn restart_reattaches_live_workers_and_skips_arming_at_checkpoint() {
    let fix = fixture();
    start(&fix, "supervisor", 2, &[("a", &[]), ("b", &[])]).await;
    fix.orch.tick().await.unwrap();

    // a completes and the plan pauses at pre_merge; b is still alive.
    fix.finish_worker("a", 0).await;
    fix.orch.tick().await.unwrap();
    assert_eq!(plan_of(&fix).checkpoint, Some(Checkpoint::PreMerge));

    let report = fix.orch.resume_plan().await.unwrap();
    assert_eq!(report.reattached, vec!["b"]);
    assert!(report.failed.is_empty());
    assert!(!report.armed, "checkpointed plan must not re-arm");
}

// The one-shot skip guard: approving pre_merge merges exactly the job
// that was gated, and the next completion pauses again on its own.
#[tokio::test]
async fn cleared_pre_merge_does_not_swallow_the_next_one() {
    let fix = fixture();
    start(&fix, "supervisor", 2, &[("a", &[]), ("b", &[])]).await;
    fix.orch.tick().await.unwrap();

    fix.finish_worker("a", 0).await;
    fix.orch.tick().await.unwrap();
    assert_eq!(plan_of(&fix).checkpoint, Some(Checkpoint::PreMerge));

    fix.orch
        .approve_plan(Some(Checkpoint::PreMerge))
        .await
        .unwrap();
    fix.orch.tick().await.unwrap();
    assert_eq!(spec_status(&fix, "a"), JobSpecStatus::Merged);

    fix.finish_worker("b", 0).await;
    fix.orch.tick().await.unwrap();
    let plan = plan_of(&fix);
    assert_eq!(plan.checkpoint, Some(Checkpoint::PreMerge));
    assert_eq!(spec_status(&fix, "b"), JobSpecStatus::ReadyToMerge);
}
