// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime job record.
//!
//! A [`Job`] is the persisted record of one launched agent: its worktree,
//! branch, terminal target, and lifecycle status. Plan-level bookkeeping
//! lives on [`crate::plan::JobSpec`]; the two are linked by `plan_id` and
//! the job name.

use crate::plan::{PlanId, PlanMode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

crate::define_id! {
    /// Unique identifier for a launched job.
    #[derive(Default)]
    pub struct JobId;
}

/// Where the agent's terminal lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Dedicated tmux session.
    #[default]
    Session,
    /// Window inside the caller's outer tmux session.
    Window,
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placement::Session => write!(f, "session"),
            Placement::Window => write!(f, "window"),
        }
    }
}

/// Lifecycle status of a launched job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
    Stopped,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Running)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Stopped => write!(f, "stopped"),
        }
    }
}

/// Configuration for creating a new job record
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub id: JobId,
    pub name: String,
    pub prompt: String,
    pub mode: PlanMode,
    pub placement: Placement,
    pub branch: String,
    pub worktree_path: PathBuf,
    pub plan_id: Option<PlanId>,
}

/// A launched job instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub name: String,
    /// Plan that owns this job, if any. Migration note: records persisted
    /// before version 2 lack this field and load as `None`.
    #[serde(default)]
    pub plan_id: Option<PlanId>,
    pub worktree_path: PathBuf,
    pub branch: String,
    /// Opaque handle to the tmux session/window hosting the agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_target: Option<String>,
    #[serde(default)]
    pub placement: Placement,
    pub status: JobStatus,
    pub prompt: String,
    pub mode: PlanMode,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

impl Job {
    /// Create a new running job record.
    pub fn new(config: JobConfig, created_at: DateTime<Utc>) -> Self {
        Self {
            id: config.id,
            name: config.name,
            plan_id: config.plan_id,
            worktree_path: config.worktree_path,
            branch: config.branch,
            terminal_target: None,
            placement: config.placement,
            status: JobStatus::Running,
            prompt: config.prompt,
            mode: config.mode,
            created_at,
            completed_at: None,
            exit_code: None,
        }
    }

    /// Attach the terminal target assigned by the supervisor.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.terminal_target = Some(target.into());
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Finish the job with the given status and exit code.
    pub fn finish(&mut self, status: JobStatus, exit_code: Option<i32>, at: DateTime<Utc>) {
        self.status = status;
        self.exit_code = exit_code;
        self.completed_at = Some(at);
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
