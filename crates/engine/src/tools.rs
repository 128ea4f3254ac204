// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool surface: the mutating verbs and read-only queries the CLI calls.
//!
//! Every mutating verb takes the serialization lock for its state
//! read-modify-write and delegates to the reconciler (via a kick) when a
//! transition should be acted on. Readers never transition state.

use crate::checkpoint;
use crate::error::EngineError;
use crate::reconciler::Orchestrator;
use crate::supervisor::LaunchSpec;
use mc_adapters::{
    sanitize_branch, GitAdapter, NotifyAdapter, PostCreate, PrAdapter, RefreshOutcome,
    SessionAdapter, ShellRunner, ToastVariant, WorktreeOptions,
};
use mc_core::{
    Checkpoint, Clock, IdGen, Job, JobConfig, JobId, JobReport, JobSpecStatus, JobStatus, Plan,
    PlanManifest, PlanMode, PlanStatus, Placement,
};
use std::path::PathBuf;
use tracing::{info, warn};

/// Options for launching a standalone job.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub name: String,
    pub prompt: String,
    pub branch: Option<String>,
    pub placement: Placement,
    pub mode: PlanMode,
    pub symlink_dirs: Vec<PathBuf>,
    pub copy_files: Vec<PathBuf>,
    pub commands: Vec<String>,
}

impl LaunchOptions {
    pub fn new(name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prompt: prompt.into(),
            branch: None,
            placement: Placement::Session,
            mode: PlanMode::Autopilot,
            symlink_dirs: Vec::new(),
            copy_files: Vec::new(),
            commands: Vec::new(),
        }
    }
}

/// Options for cleaning up finished jobs.
#[derive(Debug, Clone, Default)]
pub struct CleanupOptions {
    pub name: Option<String>,
    pub all: bool,
    pub delete_branch: bool,
}

/// Everything the status/overview verbs show.
#[derive(Debug, Clone)]
pub struct Overview {
    pub plan: Option<Plan>,
    pub jobs: Vec<Job>,
}

/// Worktree divergence for the `diff` verb.
#[derive(Debug, Clone)]
pub struct JobDiff {
    pub ahead: u32,
    pub behind: u32,
    pub status: String,
}

/// What `resume_plan` found after a process restart.
#[derive(Debug, Clone, Default)]
pub struct ResumeReport {
    /// Workers still alive; monitoring reattached.
    pub reattached: Vec<String>,
    /// Workers whose terminal died while the process was down.
    pub failed: Vec<String>,
    /// Whether the reconciler was re-armed (not when checkpointed).
    pub armed: bool,
}

impl<G, S, N, P, Sh, C, I> Orchestrator<G, S, N, P, Sh, C, I>
where
    G: GitAdapter,
    S: SessionAdapter,
    N: NotifyAdapter,
    P: PrAdapter,
    Sh: ShellRunner,
    C: Clock,
    I: IdGen,
{
    // -- mutating verbs --

    /// Launch a standalone job: worktree, worker, persisted record.
    pub async fn launch(&self, opts: LaunchOptions) -> Result<Job, EngineError> {
        if opts.name.is_empty() {
            return Err(EngineError::Validation("job name must not be empty".into()));
        }
        let duplicate = self
            .lock
            .with_lock(|| async { self.store.find_job(&opts.name) })
            .await?;
        if duplicate.is_some() {
            return Err(EngineError::Validation(format!(
                "job '{}' already exists",
                opts.name
            )));
        }

        let branch = opts
            .branch
            .clone()
            .unwrap_or_else(|| sanitize_branch(&opts.name));
        let worktree = self
            .git
            .create_worktree(&WorktreeOptions {
                branch: branch.clone(),
                start_point: "HEAD".to_string(),
                post_create: PostCreate {
                    symlink_dirs: opts.symlink_dirs.clone(),
                    copy_files: opts.copy_files.clone(),
                    commands: opts.commands.clone(),
                },
            })
            .await?;

        let job_id = JobId::new(self.ids.next());
        let target = match self
            .supervisor
            .launch(&LaunchSpec {
                job_id: job_id.clone(),
                name: opts.name.clone(),
                prompt: opts.prompt.clone(),
                placement: opts.placement,
                worktree_path: worktree.clone(),
            })
            .await
        {
            Ok(target) => target,
            Err(e) => {
                let _ = self.git.remove_worktree(&worktree, true).await;
                return Err(e);
            }
        };

        let job = Job::new(
            JobConfig {
                id: job_id,
                name: opts.name.clone(),
                prompt: opts.prompt,
                mode: opts.mode,
                placement: opts.placement,
                branch,
                worktree_path: worktree,
                plan_id: None,
            },
            self.clock.utc_now(),
        )
        .with_target(target);

        self.lock
            .with_lock(|| async { self.store.add_job(job.clone()) })
            .await?;
        info!(job = %job.name, "standalone job launched");
        Ok(job)
    }

    /// Stop a running job's worker; the worktree is preserved.
    pub async fn kill_job(&self, name: &str, _force: bool) -> Result<Job, EngineError> {
        let job = self
            .store
            .find_job(name)?
            .ok_or_else(|| EngineError::NotFound(format!("job '{}'", name)))?;
        if job.is_terminal() {
            return Err(EngineError::PreconditionFailed(format!(
                "job '{}' is not running",
                name
            )));
        }

        if let Some(target) = &job.terminal_target {
            self.supervisor.kill(target).await?;
        }

        let now = self.clock.utc_now();
        let job = self
            .lock
            .with_lock(|| async {
                let job = self.store.update_job(&job.id, |j| {
                    j.finish(JobStatus::Stopped, None, now);
                    j.clone()
                })?;
                if let Some(plan_id) = &job.plan_id {
                    let _ = self.store.update_job_spec(plan_id, &job.name, |spec| {
                        if spec.advance(JobSpecStatus::Failed) {
                            spec.failure_reason = Some("killed by operator".into());
                        }
                    });
                }
                Ok::<_, EngineError>(job)
            })
            .await?;
        info!(job = name, "job stopped");
        Ok(job)
    }

    /// Remove worktrees, optionally branches, and job records.
    ///
    /// Idempotent: cleaning a job that is already gone succeeds, and
    /// re-removing a missing worktree or branch is a no-op. Running jobs
    /// are refused.
    pub async fn cleanup(&self, opts: CleanupOptions) -> Result<Vec<String>, EngineError> {
        let targets: Vec<Job> = match (&opts.name, opts.all) {
            (Some(_), true) | (None, false) => {
                return Err(EngineError::Validation(
                    "provide exactly one of a job name or --all".into(),
                ));
            }
            (Some(name), false) => match self.store.find_job(name)? {
                Some(job) => vec![job],
                // Already cleaned; keep the verb idempotent.
                None => Vec::new(),
            },
            (None, true) => self.store.load_jobs()?,
        };

        for job in &targets {
            if job.status == JobStatus::Running {
                return Err(EngineError::PreconditionFailed(format!(
                    "job '{}' is running; kill it first",
                    job.name
                )));
            }
        }

        let mut cleaned = Vec::new();
        for job in targets {
            // Cross-process stragglers: kill anything still tagged with
            // this job id.
            if let Ok(tagged) = self
                .supervisor
                .sessions()
                .find_tagged(job.id.as_str())
                .await
            {
                for target in tagged {
                    let _ = self.supervisor.kill(&target).await;
                }
            }

            self.git.remove_worktree(&job.worktree_path, true).await?;
            if opts.delete_branch {
                self.git.delete_branch(&job.branch).await?;
            }
            self.lock
                .with_lock(|| async { self.store.remove_job(&job.id) })
                .await?;
            cleaned.push(job.name);
        }
        Ok(cleaned)
    }

    /// Validate and persist a plan, creating its integration branch.
    ///
    /// Autopilot and supervisor plans start running immediately; copilot
    /// plans stay `pending` until the first approval.
    pub async fn start_plan(&self, manifest: PlanManifest) -> Result<Plan, EngineError> {
        let existing = self.store.load_plan()?;
        if let Some(existing) = existing {
            if existing.status.is_active() {
                return Err(EngineError::PreconditionFailed(format!(
                    "plan '{}' is already {}",
                    existing.name, existing.status
                )));
            }
        }

        let base_commit = self.git.resolve_commit("HEAD").await?;
        let plan_id = mc_core::PlanId::new(self.ids.next());
        let mut plan = manifest.into_plan(plan_id, base_commit, self.clock.utc_now());
        crate::dag::validate(&plan)?;

        let integration = self
            .git
            .create_integration_branch(
                plan.id.as_str(),
                &plan.base_commit,
                &PostCreate::default(),
            )
            .await?;
        plan.integration_branch = integration.branch;
        plan.integration_worktree_path = Some(integration.worktree_path);

        if plan.mode != PlanMode::Copilot {
            plan.status = PlanStatus::Running;
        }

        self.lock
            .with_lock(|| async { self.store.save_plan(&plan) })
            .await?;

        info!(plan = %plan.name, mode = %plan.mode, status = %plan.status, "plan started");
        if plan.status == PlanStatus::Running {
            self.kick();
        } else {
            let _ = self
                .notifier
                .toast(
                    &format!("Plan {} awaiting approval", plan.name),
                    "approve to start",
                    ToastVariant::Warning,
                    ToastVariant::Warning.duration(),
                )
                .await;
        }
        Ok(plan)
    }

    /// Approve a pending copilot plan, or clear the current checkpoint.
    pub async fn approve_plan(
        &self,
        expected: Option<Checkpoint>,
    ) -> Result<PlanStatus, EngineError> {
        let cleared = self
            .lock
            .with_lock(|| async {
                let mut plan = self
                    .store
                    .load_plan()?
                    .ok_or_else(|| EngineError::NotFound("no active plan".into()))?;

                if plan.status == PlanStatus::Pending
                    && plan.mode == PlanMode::Copilot
                    && expected.is_none()
                {
                    plan.status = PlanStatus::Running;
                    self.store.save_plan(&plan)?;
                    return Ok(None);
                }

                let cleared = checkpoint::clear_checkpoint(&mut plan, expected)?;
                self.store.save_plan(&plan)?;
                Ok::<_, EngineError>(Some(cleared))
            })
            .await?;

        if let Some(cleared) = cleared {
            // Same-tick guard: the cleared checkpoint does not re-fire
            // from the cause that raised it.
            self.arm_skip(cleared);
            info!(checkpoint = %cleared, "checkpoint cleared");
        } else {
            info!("copilot plan approved");
        }
        self.kick();
        Ok(PlanStatus::Running)
    }

    /// Kill the plan's workers, delete its integration branch, and clear
    /// the persisted plan.
    pub async fn cancel_plan(&self) -> Result<(), EngineError> {
        let plan = self
            .store
            .load_plan()?
            .ok_or_else(|| EngineError::NotFound("no active plan".into()))?;

        let now = self.clock.utc_now();
        for job in self.store.load_jobs()? {
            if job.plan_id.as_ref() == Some(&plan.id) && !job.is_terminal() {
                if let Some(target) = &job.terminal_target {
                    let _ = self.supervisor.kill(target).await;
                }
                self.lock
                    .with_lock(|| async {
                        self.store.update_job(&job.id, |j| {
                            j.finish(JobStatus::Stopped, None, now);
                        })
                    })
                    .await?;
            }
        }

        self.clear_train().await;
        self.git.delete_integration_branch(plan.id.as_str()).await?;
        self.lock
            .with_lock(|| async { self.store.clear_plan() })
            .await?;

        info!(plan = %plan.name, "plan cancelled");
        let _ = self
            .notifier
            .toast(
                &format!("Plan {} cancelled", plan.name),
                "workers stopped, integration branch removed",
                ToastVariant::Info,
                ToastVariant::Info.duration(),
            )
            .await;
        Ok(())
    }

    /// Rebuild the world after a process restart.
    ///
    /// Running jobs whose terminal died are failed; live ones get their
    /// monitor back. The reconciler is re-armed unless the plan sits at a
    /// checkpoint.
    pub async fn resume_plan(&self) -> Result<ResumeReport, EngineError> {
        let mut report = ResumeReport::default();

        for job in self.store.running_jobs()? {
            let Some(target) = job.terminal_target.clone() else {
                self.fail_recovered_job(&job, "no terminal target recorded")
                    .await?;
                report.failed.push(job.name);
                continue;
            };
            match self.supervisor.is_alive(&target).await {
                Ok(true) => {
                    self.supervisor.monitor(job.id.clone(), target);
                    report.reattached.push(job.name);
                }
                Ok(false) => {
                    self.fail_recovered_job(&job, "worker not alive after restart")
                        .await?;
                    report.failed.push(job.name);
                }
                Err(e) => {
                    warn!(job = %job.name, error = %e, "liveness unknown, keeping job running");
                    report.reattached.push(job.name);
                }
            }
        }

        if let Some(plan) = self.store.load_plan()? {
            if plan.status.is_active() && plan.checkpoint.is_none() {
                report.armed = true;
                self.kick();
            }
        }
        Ok(report)
    }

    async fn fail_recovered_job(&self, job: &Job, reason: &str) -> Result<(), EngineError> {
        let now = self.clock.utc_now();
        self.lock
            .with_lock(|| async {
                self.store.update_job(&job.id, |j| {
                    j.finish(JobStatus::Failed, None, now);
                })?;
                if let Some(plan_id) = &job.plan_id {
                    let _ = self.store.update_job_spec(plan_id, &job.name, |spec| {
                        if spec.advance(JobSpecStatus::Failed) {
                            spec.failure_reason = Some(reason.to_string());
                        }
                    });
                }
                Ok::<_, EngineError>(())
            })
            .await
    }

    /// Manually feed a completed job into the merge train.
    pub async fn merge_job(&self, name: &str) -> Result<(), EngineError> {
        let plan = self
            .store
            .load_plan()?
            .ok_or_else(|| EngineError::NotFound("no active plan".into()))?;
        let spec = plan
            .job(name)
            .ok_or_else(|| EngineError::NotFound(format!("job '{}'", name)))?;
        match spec.status {
            JobSpecStatus::Completed | JobSpecStatus::ReadyToMerge => {}
            other => {
                return Err(EngineError::PreconditionFailed(format!(
                    "job '{}' is {}, not completed",
                    name, other
                )));
            }
        }
        let next_order = plan.next_merge_order();
        self.lock
            .with_lock(|| async {
                self.store.update_job_spec(&plan.id, name, |spec| {
                    if spec.merge_order.is_none() {
                        spec.merge_order = Some(next_order);
                    }
                    spec.advance(JobSpecStatus::ReadyToMerge);
                })
            })
            .await?;
        self.kick();
        Ok(())
    }

    /// Refresh the integration branch from the default branch.
    pub async fn sync_plan(&self) -> Result<RefreshOutcome, EngineError> {
        let plan = self
            .store
            .load_plan()?
            .ok_or_else(|| EngineError::NotFound("no active plan".into()))?;
        Ok(self
            .git
            .refresh_integration_from_main(plan.id.as_str())
            .await?)
    }

    /// Push the integration branch and record the PR URL.
    pub async fn open_pr(&self) -> Result<String, EngineError> {
        let plan = self
            .store
            .load_plan()?
            .ok_or_else(|| EngineError::NotFound("no active plan".into()))?;
        let url = self.publish_plan(&plan).await?;
        self.lock
            .with_lock(|| async {
                self.store.update_plan(|plan| {
                    plan.pr_url = Some(url.clone());
                })
            })
            .await?;
        Ok(url)
    }

    async fn clear_train(&self) {
        // Dropping queued names is enough; the integration branch is
        // being deleted anyway.
        self.train.lock().await.clear();
    }

    // -- readers --

    /// The active plan plus every job record.
    pub fn overview(&self) -> Result<Overview, EngineError> {
        Ok(Overview {
            plan: self.store.load_plan()?,
            jobs: self.store.load_jobs()?,
        })
    }

    /// One job by name.
    pub fn job_status(&self, name: &str) -> Result<Job, EngineError> {
        self.store
            .find_job(name)?
            .ok_or_else(|| EngineError::NotFound(format!("job '{}'", name)))
    }

    /// Recent pane output of a job's terminal.
    pub async fn capture(&self, name: &str, lines: u32) -> Result<String, EngineError> {
        let job = self.job_status(name)?;
        let target = job
            .terminal_target
            .ok_or_else(|| EngineError::NotFound(format!("job '{}' has no terminal", name)))?;
        Ok(self
            .supervisor
            .sessions()
            .capture_output(&target, lines)
            .await?)
    }

    /// Divergence and dirtiness of a job's worktree.
    pub async fn diff(&self, name: &str) -> Result<JobDiff, EngineError> {
        let job = self.job_status(name)?;
        let ab = self.git.ahead_behind(&job.worktree_path).await?;
        let status = self.git.status(&job.worktree_path).await?;
        Ok(JobDiff {
            ahead: ab.ahead,
            behind: ab.behind,
            status,
        })
    }

    /// The tmux target to attach to for a job.
    pub fn attach_target(&self, name: &str) -> Result<String, EngineError> {
        let job = self.job_status(name)?;
        job.terminal_target
            .ok_or_else(|| EngineError::NotFound(format!("job '{}' has no terminal", name)))
    }

    /// All agent progress reports, oldest first.
    pub fn reports(&self) -> Result<Vec<JobReport>, EngineError> {
        Ok(self.store.list_reports()?)
    }

    /// One job's progress report, if the agent wrote one.
    pub fn report(&self, name: &str) -> Result<Option<JobReport>, EngineError> {
        let job = self.job_status(name)?;
        Ok(self.store.read_report(&job.id)?)
    }
}

#[cfg(test)]
#[path = "tools_tests.rs"]
mod tests;
