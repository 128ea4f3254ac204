// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::{fixed_time, plan_with_jobs};
use yare::parameterized;

#[parameterized(
    queued_to_waiting = { JobSpecStatus::Queued, JobSpecStatus::WaitingDeps, true },
    queued_to_running = { JobSpecStatus::Queued, JobSpecStatus::Running, true },
    running_to_completed = { JobSpecStatus::Running, JobSpecStatus::Completed, true },
    completed_to_ready = { JobSpecStatus::Completed, JobSpecStatus::ReadyToMerge, true },
    ready_to_merging = { JobSpecStatus::ReadyToMerge, JobSpecStatus::Merging, true },
    merging_to_merged = { JobSpecStatus::Merging, JobSpecStatus::Merged, true },
    merging_to_needs_rebase = { JobSpecStatus::Merging, JobSpecStatus::NeedsRebase, true },
    running_to_failed = { JobSpecStatus::Running, JobSpecStatus::Failed, true },
    merged_to_running = { JobSpecStatus::Merged, JobSpecStatus::Running, false },
    merged_to_failed = { JobSpecStatus::Merged, JobSpecStatus::Failed, false },
    completed_to_running = { JobSpecStatus::Completed, JobSpecStatus::Running, false },
    merging_to_queued = { JobSpecStatus::Merging, JobSpecStatus::Queued, false },
    failed_to_merged = { JobSpecStatus::Failed, JobSpecStatus::Merged, false },
    failed_requeue = { JobSpecStatus::Failed, JobSpecStatus::Queued, true },
    needs_rebase_requeue = { JobSpecStatus::NeedsRebase, JobSpecStatus::Queued, true },
)]
fn job_spec_transitions(from: JobSpecStatus, to: JobSpecStatus, allowed: bool) {
    assert_eq!(from.can_transition_to(to), allowed);
}

#[test]
fn advance_rejects_backward_transition() {
    let mut spec = JobSpec::new("a", "prompt");
    assert!(spec.advance(JobSpecStatus::Running));
    assert!(spec.advance(JobSpecStatus::Completed));
    assert!(!spec.advance(JobSpecStatus::Running));
    assert_eq!(spec.status, JobSpecStatus::Completed);
}

#[test]
fn checkpoint_iff_paused() {
    let mut plan = plan_with_jobs(PlanMode::Supervisor, &[("a", &[])]);
    plan.status = PlanStatus::Running;

    plan.enter_checkpoint(Checkpoint::PreMerge);
    assert_eq!(plan.status, PlanStatus::Paused);
    assert_eq!(plan.checkpoint, Some(Checkpoint::PreMerge));

    plan.clear_checkpoint();
    assert_eq!(plan.status, PlanStatus::Running);
    assert!(plan.checkpoint.is_none());
    assert!(plan.checkpoint_context.is_empty());
}

#[test]
fn next_merge_order_counts_up_from_zero() {
    let mut plan = plan_with_jobs(PlanMode::Autopilot, &[("a", &[]), ("b", &[]), ("c", &[])]);
    assert_eq!(plan.next_merge_order(), 0);

    plan.jobs[1].merge_order = Some(0);
    assert_eq!(plan.next_merge_order(), 1);

    plan.jobs[0].merge_order = Some(1);
    assert_eq!(plan.next_merge_order(), 2);
}

#[test]
fn all_merged_requires_every_job() {
    let mut plan = plan_with_jobs(PlanMode::Autopilot, &[("a", &[]), ("b", &[])]);
    assert!(!plan.all_merged());

    for job in &mut plan.jobs {
        job.status = JobSpecStatus::Merged;
    }
    assert!(plan.all_merged());
}

#[parameterized(
    pending = { PlanStatus::Pending, true },
    running = { PlanStatus::Running, true },
    paused = { PlanStatus::Paused, true },
    completed = { PlanStatus::Completed, false },
    failed = { PlanStatus::Failed, false },
)]
fn plan_active_statuses(status: PlanStatus, active: bool) {
    assert_eq!(status.is_active(), active);
}

#[test]
fn plan_serde_round_trip_uses_camel_case() {
    let mut plan = plan_with_jobs(PlanMode::Copilot, &[("a", &[]), ("b", &["a"])]);
    plan.jobs[0].merge_order = Some(0);
    plan.jobs[0].merged_at = Some(fixed_time());

    let json = serde_json::to_value(&plan).unwrap();
    assert_eq!(json["baseCommit"], "abc1234");
    assert_eq!(json["integrationBranch"], "mc/integration-plan-1");
    assert_eq!(json["jobs"][1]["dependsOn"][0], "a");
    assert_eq!(json["jobs"][0]["mergeOrder"], 0);
    assert_eq!(json["mode"], "copilot");

    let back: Plan = serde_json::from_value(json).unwrap();
    assert_eq!(back, plan);
}

#[test]
fn job_lookup_by_name() {
    let mut plan = plan_with_jobs(PlanMode::Autopilot, &[("a", &[]), ("b", &[])]);
    assert_eq!(plan.job("b").map(|j| j.name.as_str()), Some("b"));
    assert!(plan.job("missing").is_none());

    if let Some(job) = plan.job_mut("a") {
        job.status = JobSpecStatus::Running;
    }
    assert_eq!(plan.running_count(), 1);
}
