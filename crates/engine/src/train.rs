// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The merge train: a strictly sequential FIFO over the integration
//! branch.
//!
//! One job at a time is rebased onto the integration branch, fast-forward
//! merged into the integration worktree, and optionally tested there.
//! Conflicts and test failures come back as data, not errors; the
//! reconciler maps them to state transitions. A failing test phase
//! rewinds the integration branch to its prior tip so the worktree is
//! clean for the next candidate.

use crate::error::EngineError;
use chrono::{DateTime, Utc};
use mc_adapters::{AbortKind, GitAdapter, MergeResult, ShellRunner};
use mc_core::{Clock, Plan};
use std::collections::VecDeque;
use std::path::Path;
use tracing::{info, warn};

/// Outcome of processing one merge-train entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    Ok {
        merged_at: DateTime<Utc>,
        test_report: Option<String>,
    },
    Conflict {
        files: Vec<String>,
    },
    TestFailure {
        command: String,
        output: String,
    },
}

/// Sequential merge queue over the integration branch.
pub struct MergeTrain<G, Sh, C> {
    git: G,
    shell: Sh,
    clock: C,
    queue: VecDeque<String>,
}

impl<G, Sh, C> MergeTrain<G, Sh, C>
where
    G: GitAdapter,
    Sh: ShellRunner,
    C: Clock,
{
    pub fn new(git: G, shell: Sh, clock: C) -> Self {
        Self {
            git,
            shell,
            clock,
            queue: VecDeque::new(),
        }
    }

    /// Add a job to the back of the queue. Enqueueing a job that is
    /// already queued is a no-op.
    pub fn enqueue(&mut self, name: &str) {
        if !self.queue.iter().any(|n| n == name) {
            self.queue.push_back(name.to_string());
        }
    }

    /// Names currently queued, front first.
    pub fn queue(&self) -> Vec<String> {
        self.queue.iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drop all queued entries (plan cancellation).
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Process the front entry, if any.
    ///
    /// Returns the job name and its outcome. Adapter failures and
    /// precondition violations surface as errors; the entry is already
    /// dequeued either way, so a retry means re-enqueueing.
    pub async fn process_next(
        &mut self,
        plan: &Plan,
    ) -> Result<Option<(String, MergeOutcome)>, EngineError> {
        let Some(name) = self.queue.pop_front() else {
            return Ok(None);
        };
        let outcome = self.process_job(plan, &name).await?;
        Ok(Some((name, outcome)))
    }

    async fn process_job(&self, plan: &Plan, name: &str) -> Result<MergeOutcome, EngineError> {
        let job = plan
            .job(name)
            .ok_or_else(|| EngineError::NotFound(format!("job '{}' not in plan", name)))?;
        let branch = job.branch.clone().ok_or_else(|| {
            EngineError::PreconditionFailed(format!("job '{}' has no branch assigned", name))
        })?;
        let job_worktree = job.worktree_path.clone().ok_or_else(|| {
            EngineError::PreconditionFailed(format!("job '{}' has no worktree", name))
        })?;
        let integration_worktree = plan.integration_worktree_path.clone().ok_or_else(|| {
            EngineError::PreconditionFailed("plan has no integration worktree".into())
        })?;

        // Mergeability: the branch must exist at a known HEAD, and the
        // integration worktree must be clean.
        if !self.git.branch_exists(&branch).await? {
            return Err(EngineError::PreconditionFailed(format!(
                "branch '{}' does not exist",
                branch
            )));
        }
        self.git.head(&job_worktree).await?;
        let status = self.git.status(&integration_worktree).await?;
        if !status.trim().is_empty() {
            return Err(EngineError::PreconditionFailed(format!(
                "integration worktree is not clean:\n{}",
                status
            )));
        }

        // Rebase the job branch onto the current integration tip.
        match self
            .git
            .rebase(&job_worktree, &plan.integration_branch)
            .await?
        {
            MergeResult::Clean => {}
            MergeResult::Conflict(files) => {
                self.git.abort(&job_worktree, AbortKind::Rebase).await?;
                info!(job = name, ?files, "rebase conflict");
                return Ok(MergeOutcome::Conflict { files });
            }
        }

        // Fast-forward the integration branch to the rebased job branch.
        let prior_tip = self.git.head(&integration_worktree).await?;
        match self.git.merge(&integration_worktree, &branch).await? {
            MergeResult::Clean => {}
            MergeResult::Conflict(files) => {
                self.git
                    .abort(&integration_worktree, AbortKind::Merge)
                    .await?;
                info!(job = name, ?files, "merge conflict");
                return Ok(MergeOutcome::Conflict { files });
            }
        }

        // Test phase, when the plan configures one.
        let mut test_report = None;
        if let Some(test) = &plan.test {
            if let Some(failure) = self
                .run_test_phase(test, &integration_worktree, &prior_tip)
                .await?
            {
                return Ok(failure);
            }
            test_report = Some(test.command.clone());
        }

        Ok(MergeOutcome::Ok {
            merged_at: self.clock.utc_now(),
            test_report,
        })
    }

    /// Run setup commands then the test command; on any non-zero exit,
    /// rewind the integration branch and report the failure.
    async fn run_test_phase(
        &self,
        test: &mc_core::TestConfig,
        worktree: &Path,
        prior_tip: &str,
    ) -> Result<Option<MergeOutcome>, EngineError> {
        let commands: Vec<&String> =
            test.setup.iter().chain(std::iter::once(&test.command)).collect();
        for command in commands {
            let output = self
                .shell
                .run(command, worktree)
                .await
                .map_err(EngineError::Adapter)?;
            if !output.success() {
                warn!(command, exit_code = output.exit_code, "test phase failed");
                self.git.reset_hard(worktree, prior_tip).await?;
                return Ok(Some(MergeOutcome::TestFailure {
                    command: command.clone(),
                    output: output.combined(),
                }));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
#[path = "train_tests.rs"]
mod tests;
