// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test builders shared by other crates' tests.
#![cfg_attr(coverage_nightly, coverage(off))]
#![allow(clippy::unwrap_used)]

use crate::plan::{JobSpec, Plan, PlanId, PlanMode, PlanStatus};
use chrono::{TimeZone, Utc};
use std::collections::HashMap;

/// A fixed creation timestamp so snapshots compare stably.
pub fn fixed_time() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap()
}

/// Build a plan with the given `(name, depends_on)` jobs in declaration
/// order. Status starts `pending`, integration fields pre-filled.
pub fn plan_with_jobs(mode: PlanMode, jobs: &[(&str, &[&str])]) -> Plan {
    let id = PlanId::new("plan-1");
    Plan {
        integration_branch: format!("mc/integration-{}", id),
        id,
        name: "test-plan".into(),
        mode,
        status: PlanStatus::Pending,
        checkpoint: None,
        checkpoint_context: HashMap::new(),
        jobs: jobs
            .iter()
            .map(|(name, deps)| {
                JobSpec::new(*name, format!("work on {}", name))
                    .with_depends_on(deps.iter().map(|d| d.to_string()).collect())
            })
            .collect(),
        integration_worktree_path: Some("/tmp/mc-integration".into()),
        base_commit: "abc1234".into(),
        max_parallel: 2,
        test: None,
        pr_url: None,
        created_at: fixed_time(),
        completed_at: None,
    }
}
