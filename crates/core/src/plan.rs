// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan and job-spec state machines.
//!
//! A [`Plan`] is the declarative unit of orchestration: an ordered set of
//! [`JobSpec`]s with dependencies, an integration branch, and a mode that
//! decides where checkpoints engage. The plan object is persisted whole;
//! all transitions go through the reconciler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

crate::define_id! {
    /// Unique identifier for a plan.
    pub struct PlanId;
}

/// Default job parallelism when the plan file does not set one.
pub const DEFAULT_MAX_PARALLEL: u32 = 3;

/// Execution mode controlling when checkpoints engage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanMode {
    /// Never pause; errors fail the plan.
    Autopilot,
    /// Pause once at start; run hands-off after the first approval.
    Copilot,
    /// Pause at every sensitive step (pre-merge, pre-PR, on-error).
    Supervisor,
}

impl fmt::Display for PlanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanMode::Autopilot => write!(f, "autopilot"),
            PlanMode::Copilot => write!(f, "copilot"),
            PlanMode::Supervisor => write!(f, "supervisor"),
        }
    }
}

impl std::str::FromStr for PlanMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "autopilot" => Ok(PlanMode::Autopilot),
            "copilot" => Ok(PlanMode::Copilot),
            "supervisor" => Ok(PlanMode::Supervisor),
            other => Err(format!(
                "unknown mode '{}' (expected autopilot, copilot, or supervisor)",
                other
            )),
        }
    }
}

/// Lifecycle status of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
}

impl PlanStatus {
    /// Active plans block starting another plan in the same project.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            PlanStatus::Pending | PlanStatus::Running | PlanStatus::Paused
        )
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanStatus::Pending => write!(f, "pending"),
            PlanStatus::Running => write!(f, "running"),
            PlanStatus::Paused => write!(f, "paused"),
            PlanStatus::Completed => write!(f, "completed"),
            PlanStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Named pause point in a plan's execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Checkpoint {
    PreMerge,
    PrePr,
    OnError,
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Checkpoint::PreMerge => write!(f, "pre_merge"),
            Checkpoint::PrePr => write!(f, "pre_pr"),
            Checkpoint::OnError => write!(f, "on_error"),
        }
    }
}

impl std::str::FromStr for Checkpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pre_merge" => Ok(Checkpoint::PreMerge),
            "pre_pr" => Ok(Checkpoint::PrePr),
            "on_error" => Ok(Checkpoint::OnError),
            other => Err(format!(
                "unknown checkpoint '{}' (expected pre_merge, pre_pr, or on_error)",
                other
            )),
        }
    }
}

/// Status of a job within a plan.
///
/// The main line progresses `queued → waiting_deps → running → completed →
/// ready_to_merge → merging → merged` and never moves backward.
/// `needs_rebase` and `failed` are absorbing until an operator clears them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobSpecStatus {
    Queued,
    WaitingDeps,
    Running,
    Completed,
    ReadyToMerge,
    Merging,
    Merged,
    NeedsRebase,
    Failed,
}

impl JobSpecStatus {
    /// Position on the main progression line, if on it.
    fn rank(&self) -> Option<u8> {
        match self {
            JobSpecStatus::Queued => Some(0),
            JobSpecStatus::WaitingDeps => Some(1),
            JobSpecStatus::Running => Some(2),
            JobSpecStatus::Completed => Some(3),
            JobSpecStatus::ReadyToMerge => Some(4),
            JobSpecStatus::Merging => Some(5),
            JobSpecStatus::Merged => Some(6),
            JobSpecStatus::NeedsRebase | JobSpecStatus::Failed => None,
        }
    }

    /// Whether a transition to `next` is legal.
    ///
    /// Off-line statuses (`needs_rebase`, `failed`) are reachable from any
    /// non-merged state and absorbing thereafter.
    pub fn can_transition_to(&self, next: JobSpecStatus) -> bool {
        if *self == next {
            return true;
        }
        match (self.rank(), next.rank()) {
            (Some(_), None) => *self != JobSpecStatus::Merged,
            (Some(from), Some(to)) => to > from,
            // Absorbing states are only cleared by an operator, which
            // re-queues the job from the start.
            (None, Some(0)) => true,
            (None, _) => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobSpecStatus::Merged | JobSpecStatus::NeedsRebase | JobSpecStatus::Failed
        )
    }
}

impl fmt::Display for JobSpecStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobSpecStatus::Queued => write!(f, "queued"),
            JobSpecStatus::WaitingDeps => write!(f, "waiting_deps"),
            JobSpecStatus::Running => write!(f, "running"),
            JobSpecStatus::Completed => write!(f, "completed"),
            JobSpecStatus::ReadyToMerge => write!(f, "ready_to_merge"),
            JobSpecStatus::Merging => write!(f, "merging"),
            JobSpecStatus::Merged => write!(f, "merged"),
            JobSpecStatus::NeedsRebase => write!(f, "needs_rebase"),
            JobSpecStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Test phase the merge train runs after each integration merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestConfig {
    /// Setup commands run before the test command, in order.
    #[serde(default)]
    pub setup: Vec<String>,
    /// The single test command; non-zero exit reverts the merge.
    pub command: String,
}

/// Plan-level record of one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSpec {
    /// Unique within the plan.
    pub name: String,
    pub prompt: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Assigned when the job completes; merges happen in this order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_order: Option<u32>,
    pub status: JobSpecStatus,
    /// Assigned on launch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worktree_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl JobSpec {
    pub fn new(name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prompt: prompt.into(),
            depends_on: Vec::new(),
            merge_order: None,
            status: JobSpecStatus::Queued,
            branch: None,
            worktree_path: None,
            terminal_target: None,
            merged_at: None,
            failure_reason: None,
        }
    }

    pub fn with_depends_on(mut self, deps: Vec<String>) -> Self {
        self.depends_on = deps;
        self
    }

    /// Advance the status, enforcing the forward-only state machine.
    ///
    /// Returns `false` (and leaves the spec untouched) for an illegal
    /// transition; callers treat that as a bug worth logging, not a panic.
    pub fn advance(&mut self, next: JobSpecStatus) -> bool {
        if self.status.can_transition_to(next) {
            self.status = next;
            true
        } else {
            false
        }
    }
}

/// A declarative unit of orchestration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: PlanId,
    pub name: String,
    pub mode: PlanMode,
    pub status: PlanStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<Checkpoint>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub checkpoint_context: HashMap<String, String>,
    pub jobs: Vec<JobSpec>,
    pub integration_branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_worktree_path: Option<PathBuf>,
    /// Revision the integration branch was cut from. Immutable once set.
    pub base_commit: String,
    #[serde(default)]
    pub max_parallel: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<TestConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Plan {
    pub fn job(&self, name: &str) -> Option<&JobSpec> {
        self.jobs.iter().find(|j| j.name == name)
    }

    pub fn job_mut(&mut self, name: &str) -> Option<&mut JobSpec> {
        self.jobs.iter_mut().find(|j| j.name == name)
    }

    /// Next merge order: highest assigned plus one, starting at 0.
    pub fn next_merge_order(&self) -> u32 {
        self.jobs
            .iter()
            .filter_map(|j| j.merge_order)
            .max()
            .map(|n| n + 1)
            .unwrap_or(0)
    }

    pub fn all_merged(&self) -> bool {
        self.jobs
            .iter()
            .all(|j| j.status == JobSpecStatus::Merged)
    }

    /// Count of jobs currently in `running`.
    pub fn running_count(&self) -> usize {
        self.jobs
            .iter()
            .filter(|j| j.status == JobSpecStatus::Running)
            .count()
    }

    /// Enter a checkpoint, maintaining `checkpoint.is_some() ⇔ paused`.
    pub fn enter_checkpoint(&mut self, point: Checkpoint) {
        self.checkpoint = Some(point);
        self.status = PlanStatus::Paused;
    }

    /// Leave the current checkpoint and resume running.
    pub fn clear_checkpoint(&mut self) {
        self.checkpoint = None;
        self.checkpoint_context.clear();
        self.status = PlanStatus::Running;
    }
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod tests;
