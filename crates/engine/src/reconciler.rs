// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The reconciler: the only component that owns state transitions.
//!
//! One tick runs at a time; overlapping triggers (timer, worker events,
//! tool mutations, checkpoint clears) coalesce through an is-reconciling
//! flag. A tick never propagates an adapter error past itself — failures
//! are encoded into job and plan state and the next trigger carries on
//! from whatever was persisted.
//!
//! State read-modify-write cycles hold the process lock for the whole
//! cycle. Git work happens between those cycles, never inside one: the
//! adapters serialize themselves on the same lock, which is not
//! reentrant.

use crate::checkpoint::{self, CheckpointDecision};
use crate::dag;
use crate::error::EngineError;
use crate::supervisor::{LaunchSpec, WorkerSupervisor};
use crate::train::{MergeOutcome, MergeTrain};
use mc_adapters::{
    sanitize_branch, GitAdapter, NotifyAdapter, PostCreate, PrAdapter, PrRequest, SerialLock,
    SessionAdapter, ShellRunner, ToastVariant, WorktreeOptions,
};
use mc_core::{
    Checkpoint, Clock, IdGen, Job, JobConfig, JobId, JobSpecStatus, JobStatus, Plan, PlanStatus,
    WorkerEvent,
};
use mc_storage::StateStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, Notify};
use tracing::{debug, error, info, warn};

/// Default reconciliation timer period.
pub const TICK_INTERVAL: Duration = Duration::from_secs(10);

/// Adapter bundle the orchestrator is built from.
pub struct EngineDeps<G, S, N, P, Sh> {
    pub git: G,
    pub sessions: S,
    pub notifier: N,
    pub pr: P,
    pub shell: Sh,
}

/// Tunables; defaults suit production.
pub struct OrchestratorConfig {
    pub tick_interval: Duration,
    /// Worker monitor poll period.
    pub poll_interval: Duration,
    /// Agent command template; `None` reads `MISSION_AGENT_CMD`.
    pub agent_command: Option<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            tick_interval: TICK_INTERVAL,
            poll_interval: Duration::from_secs(5),
            agent_command: None,
        }
    }
}

/// The plan orchestrator.
pub struct Orchestrator<G, S, N, P, Sh, C, I>
where
    S: SessionAdapter,
{
    pub(crate) store: StateStore,
    pub(crate) lock: SerialLock,
    pub(crate) git: G,
    pub(crate) notifier: N,
    pub(crate) pr: P,
    pub(crate) supervisor: WorkerSupervisor<S>,
    pub(crate) clock: C,
    pub(crate) ids: I,
    pub(crate) train: Mutex<MergeTrain<G, Sh, C>>,
    events_rx: Mutex<mpsc::Receiver<WorkerEvent>>,
    kick: Notify,
    is_reconciling: AtomicBool,
    skip_checkpoint: parking_lot::Mutex<Option<Checkpoint>>,
    tick_interval: Duration,
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
    pub fn new(
        deps: EngineDeps<G, S, N, P, Sh>,
        store: StateStore,
        lock: SerialLock,
        clock: C,
        ids: I,
        config: OrchestratorConfig,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(64);
        let mut supervisor = WorkerSupervisor::new(deps.sessions, events_tx)
            .with_poll_interval(config.poll_interval);
        if let Some(command) = config.agent_command {
            supervisor = supervisor.with_agent_command(command);
        }
        let train = MergeTrain::new(deps.git.clone(), deps.shell, clock.clone());
        Self {
            store,
            lock,
            git: deps.git,
            notifier: deps.notifier,
            pr: deps.pr,
            supervisor,
            clock,
            ids,
            train: Mutex::new(train),
            events_rx: Mutex::new(events_rx),
            kick: Notify::new(),
            is_reconciling: AtomicBool::new(false),
            skip_checkpoint: parking_lot::Mutex::new(None),
            tick_interval: config.tick_interval,
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Wake the run loop for an immediate tick.
    pub fn kick(&self) {
        self.kick.notify_one();
    }

    /// Arm the one-shot guard that keeps a just-cleared checkpoint from
    /// re-pausing the same cause.
    pub(crate) fn arm_skip(&self, cleared: Checkpoint) {
        *self.skip_checkpoint.lock() = Some(cleared);
    }

    /// Drive the plan until it completes, fails, or is cleared.
    ///
    /// Paused plans keep the loop alive: an approval from another process
    /// lands in the state file and the next timer tick picks it up.
    pub async fn run(&self) -> Result<(), EngineError> {
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            {
                let mut rx = self.events_rx.lock().await;
                tokio::select! {
                    _ = interval.tick() => {}
                    maybe = rx.recv() => {
                        if let Some(event) = maybe {
                            drop(rx);
                            self.apply_worker_event(event).await;
                        }
                    }
                    _ = self.kick.notified() => {}
                }
            }
            if let Err(e) = self.tick().await {
                error!(error = %e, "reconciliation tick failed");
            }
            match self.store.load_plan()? {
                Some(plan) if plan.status.is_active() => {}
                _ => return Ok(()),
            }
        }
    }

    /// Run one reconciliation tick. Re-entrant calls coalesce to a no-op.
    pub async fn tick(&self) -> Result<(), EngineError> {
        if self.is_reconciling.swap(true, Ordering::SeqCst) {
            debug!("tick already in flight, coalescing");
            return Ok(());
        }
        let result = self.tick_inner().await;
        self.is_reconciling.store(false, Ordering::SeqCst);
        result
    }

    async fn tick_inner(&self) -> Result<(), EngineError> {
        self.drain_events().await;

        let skip = self.skip_checkpoint.lock().take();

        // Phase 1: pure state transitions — completed jobs gain a merge
        // order, and the next in-order job enters the train.
        let Some(phase) = self.advance_state(skip).await? else {
            return Ok(());
        };

        if let Some(point) = phase.paused_at {
            self.toast_checkpoint(point, &phase.plan).await;
            return Ok(());
        }

        // Feed the train: everything in `merging` belongs on the queue.
        // This also re-arms merges interrupted by a process restart,
        // whose in-memory queue entry died with the old process.
        {
            let mut train = self.train.lock().await;
            for job in phase
                .plan
                .jobs
                .iter()
                .filter(|j| j.status == JobSpecStatus::Merging)
            {
                train.enqueue(&job.name);
            }
        }

        // Phase 2: at most one merge per tick.
        self.process_one_merge().await?;

        // Phase 3: launch newly ready jobs, unless a checkpoint engaged.
        self.launch_ready_jobs().await?;

        // Phase 4: plan completion and failure.
        self.check_completion(skip).await?;
        self.check_failure(skip).await?;

        Ok(())
    }

    /// Apply queued worker events when the run loop is not draining them.
    async fn drain_events(&self) {
        if let Ok(mut rx) = self.events_rx.try_lock() {
            let mut pending = Vec::new();
            while let Ok(event) = rx.try_recv() {
                pending.push(event);
            }
            drop(rx);
            for event in pending {
                self.apply_worker_event(event).await;
            }
        }
    }

    /// Consume one worker lifecycle event.
    pub async fn apply_worker_event(&self, event: WorkerEvent) {
        match event {
            WorkerEvent::Started { job_id } => {
                debug!(%job_id, "worker started");
            }
            WorkerEvent::Completed { job_id, exit_code } => {
                self.finish_worker(job_id, JobStatus::Completed, Some(exit_code), None)
                    .await;
            }
            WorkerEvent::Failed {
                job_id,
                exit_code,
                reason,
            } => {
                self.finish_worker(job_id, JobStatus::Failed, exit_code, Some(reason))
                    .await;
            }
        }
    }

    async fn finish_worker(
        &self,
        job_id: JobId,
        status: JobStatus,
        exit_code: Option<i32>,
        reason: Option<String>,
    ) {
        let now = self.clock.utc_now();
        let updated = self
            .lock
            .with_lock(|| async {
                let job = match self.store.update_job(&job_id, |job| {
                    if job.is_terminal() {
                        return None;
                    }
                    job.finish(status, exit_code, now);
                    Some(job.clone())
                }) {
                    Ok(Some(job)) => job,
                    Ok(None) => return None,
                    Err(e) => {
                        // Worker events for unknown jobs are dropped.
                        warn!(%job_id, error = %e, "dropping worker event for unknown job");
                        return None;
                    }
                };

                if let (Some(plan_id), Ok(Some(plan))) = (&job.plan_id, self.store.load_plan()) {
                    if plan.id == *plan_id && plan.job(&job.name).is_some() {
                        let reason = reason.clone();
                        let _ = self.store.update_job_spec(plan_id, &job.name, |spec| {
                            match status {
                                JobStatus::Completed => {
                                    spec.advance(JobSpecStatus::Completed);
                                }
                                _ => {
                                    if spec.advance(JobSpecStatus::Failed) {
                                        spec.failure_reason = reason;
                                    }
                                }
                            }
                        });
                    }
                }
                Some(job)
            })
            .await;

        if let Some(job) = updated {
            let (variant, title) = match status {
                JobStatus::Completed => (ToastVariant::Info, format!("Job {} completed", job.name)),
                _ => (ToastVariant::Error, format!("Job {} failed", job.name)),
            };
            let message = reason_or_exit(exit_code, &job);
            let _ = self
                .notifier
                .toast(&title, &message, variant, variant.duration())
                .await;
        }
    }

    /// Locked state pass: merge orders, ready-to-merge transitions, and
    /// the single in-order train candidate (or a pre-merge pause).
    async fn advance_state(
        &self,
        skip: Option<Checkpoint>,
    ) -> Result<Option<TickPhase>, EngineError> {
        self.lock
            .with_lock(|| async {
                let Some(mut plan) = self.store.load_plan()? else {
                    return Ok(None);
                };
                if plan.checkpoint.is_some() || plan.status != PlanStatus::Running {
                    return Ok(None);
                }

                let mut dirty = false;

                // Completed jobs get a merge order (stable topo order for
                // batches) and move to ready_to_merge.
                let mut next_order = plan.next_merge_order();
                for name in dag::topological_sort(&plan.jobs) {
                    let Some(spec) = plan.job_mut(&name) else {
                        continue;
                    };
                    if spec.status == JobSpecStatus::Completed {
                        if spec.merge_order.is_none() {
                            spec.merge_order = Some(next_order);
                            next_order += 1;
                        }
                        spec.advance(JobSpecStatus::ReadyToMerge);
                        dirty = true;
                    }
                }

                // The train is strictly sequential: the next candidate is
                // the lowest-order ready job whose predecessors all merged.
                let mut paused_at = None;
                let candidate = plan
                    .jobs
                    .iter()
                    .filter(|j| j.status == JobSpecStatus::ReadyToMerge)
                    .filter_map(|j| j.merge_order.map(|o| (o, j.name.clone())))
                    .min();
                if let Some((order, name)) = candidate {
                    let predecessors_merged = plan
                        .jobs
                        .iter()
                        .filter(|j| j.merge_order.is_some_and(|o| o < order))
                        .all(|j| j.status == JobSpecStatus::Merged);
                    if predecessors_merged {
                        let pause = checkpoint::decide(plan.mode, Checkpoint::PreMerge)
                            == CheckpointDecision::Pause
                            && skip != Some(Checkpoint::PreMerge);
                        if pause {
                            plan.enter_checkpoint(Checkpoint::PreMerge);
                            plan.checkpoint_context
                                .insert("job".to_string(), name.clone());
                            paused_at = Some(Checkpoint::PreMerge);
                            dirty = true;
                        } else if let Some(spec) = plan.job_mut(&name) {
                            spec.advance(JobSpecStatus::Merging);
                            dirty = true;
                        }
                    }
                }

                if dirty {
                    self.store.save_plan(&plan)?;
                }
                Ok(Some(TickPhase { plan, paused_at }))
            })
            .await
    }

    /// Pop and process the train's front entry, mapping the outcome into
    /// job and plan state.
    async fn process_one_merge(&self) -> Result<(), EngineError> {
        let Some(plan) = self.store.load_plan()? else {
            return Ok(());
        };
        if plan.checkpoint.is_some() || plan.status != PlanStatus::Running {
            return Ok(());
        }

        let processed = {
            let mut train = self.train.lock().await;
            if train.is_empty() {
                return Ok(());
            }
            train.process_next(&plan).await
        };

        match processed {
            Ok(None) => Ok(()),
            Ok(Some((name, MergeOutcome::Ok {
                merged_at,
                test_report,
            }))) => {
                self.lock
                    .with_lock(|| async {
                        self.store.update_job_spec(&plan.id, &name, |spec| {
                            spec.advance(JobSpecStatus::Merged);
                            spec.merged_at = Some(merged_at);
                        })
                    })
                    .await?;
                info!(job = name, ?test_report, "merged into integration branch");
                let _ = self
                    .notifier
                    .toast(
                        &format!("Merged {}", name),
                        &format!("into {}", plan.integration_branch),
                        ToastVariant::Success,
                        ToastVariant::Success.duration(),
                    )
                    .await;
                let _ = self.notifier.notify(&format!("merged {}", name)).await;
                Ok(())
            }
            Ok(Some((name, MergeOutcome::Conflict { files }))) => {
                let detail = format!("conflicts: {}", files.join(", "));
                self.fail_merge(&plan, &name, Checkpoint::OnError, &detail, files)
                    .await
            }
            Ok(Some((name, MergeOutcome::TestFailure { command, output }))) => {
                let detail = format!("test command failed: {}\n{}", command, output);
                self.fail_merge(&plan, &name, Checkpoint::OnError, &detail, Vec::new())
                    .await
            }
            Err(e) => {
                // Adapter/precondition failure mid-merge: encode it, don't
                // propagate it past the tick.
                if let Some(plan) = self.store.load_plan()? {
                    if let Some((_, name)) = plan
                        .jobs
                        .iter()
                        .filter(|j| j.status == JobSpecStatus::Merging)
                        .filter_map(|j| j.merge_order.map(|o| (o, j.name.clone())))
                        .min()
                    {
                        let detail = e.to_string();
                        self.fail_merge(&plan, &name, Checkpoint::OnError, &detail, Vec::new())
                            .await?;
                        return Ok(());
                    }
                }
                error!(error = %e, "merge step failed with no job in merging state");
                Ok(())
            }
        }
    }

    /// Shared conflict/test-failure/adapter-error mapping: the job needs
    /// a rebase, and the plan pauses or fails depending on mode.
    async fn fail_merge(
        &self,
        plan: &Plan,
        name: &str,
        point: Checkpoint,
        detail: &str,
        files: Vec<String>,
    ) -> Result<(), EngineError> {
        let decision = checkpoint::decide(plan.mode, point);
        let detail_owned = detail.to_string();
        self.lock
            .with_lock(|| async {
                self.store.update_plan(|plan| {
                    if let Some(spec) = plan.job_mut(name) {
                        spec.advance(JobSpecStatus::NeedsRebase);
                        spec.failure_reason = Some(detail_owned.clone());
                    }
                    match decision {
                        CheckpointDecision::Pause => {
                            plan.enter_checkpoint(point);
                            plan.checkpoint_context
                                .insert("job".to_string(), name.to_string());
                            if !files.is_empty() {
                                plan.checkpoint_context
                                    .insert("conflicts".to_string(), files.join(","));
                            }
                        }
                        CheckpointDecision::FailPlan | CheckpointDecision::Continue => {
                            plan.status = PlanStatus::Failed;
                        }
                    }
                })
            })
            .await?;

        let title = format!("Merge of {} did not land", name);
        let _ = self
            .notifier
            .toast(&title, detail, ToastVariant::Error, ToastVariant::Error.duration())
            .await;
        Ok(())
    }

    /// Launch every job the scheduler says is ready.
    async fn launch_ready_jobs(&self) -> Result<(), EngineError> {
        let Some(plan) = self.store.load_plan()? else {
            return Ok(());
        };
        if plan.checkpoint.is_some() || plan.status != PlanStatus::Running {
            return Ok(());
        }

        let running = self.store.running_jobs()?.len();
        let ready: Vec<String> = dag::ready_jobs(&plan, running, plan.max_parallel)
            .into_iter()
            .map(|j| j.name.clone())
            .collect();

        // Jobs that are queued but blocked surface as waiting_deps.
        self.lock
            .with_lock(|| async {
                self.store.update_plan(|plan| {
                    for spec in &mut plan.jobs {
                        if spec.status == JobSpecStatus::Queued
                            && !ready.contains(&spec.name)
                            && !spec.depends_on.is_empty()
                        {
                            spec.advance(JobSpecStatus::WaitingDeps);
                        }
                    }
                })
            })
            .await?;

        for name in ready {
            if let Err(e) = self.launch_plan_job(&plan, &name).await {
                warn!(job = name, error = %e, "launch failed");
                self.lock
                    .with_lock(|| async {
                        self.store.update_job_spec(&plan.id, &name, |spec| {
                            spec.advance(JobSpecStatus::Failed);
                            spec.failure_reason = Some(e.to_string());
                        })
                    })
                    .await?;
                let _ = self
                    .notifier
                    .toast(
                        &format!("Launch of {} failed", name),
                        &e.to_string(),
                        ToastVariant::Error,
                        ToastVariant::Error.duration(),
                    )
                    .await;
            }
        }
        Ok(())
    }

    /// Create the worktree, start the worker, persist both records.
    async fn launch_plan_job(&self, plan: &Plan, name: &str) -> Result<(), EngineError> {
        let spec = plan
            .job(name)
            .ok_or_else(|| EngineError::NotFound(format!("job '{}' not in plan", name)))?;
        let branch = sanitize_branch(name);

        // Branch from the integration tip so merged dependencies are
        // visible in the new worktree.
        let worktree = self
            .git
            .create_worktree(&WorktreeOptions {
                branch: branch.clone(),
                start_point: plan.integration_branch.clone(),
                post_create: PostCreate::default(),
            })
            .await?;

        let job_id = JobId::new(self.ids.next());
        let launch = LaunchSpec {
            job_id: job_id.clone(),
            name: name.to_string(),
            prompt: spec.prompt.clone(),
            placement: mc_core::Placement::Session,
            worktree_path: worktree.clone(),
        };
        let target = match self.supervisor.launch(&launch).await {
            Ok(target) => target,
            Err(e) => {
                // Reclaim the worktree; the branch stays for inspection.
                let _ = self.git.remove_worktree(&worktree, true).await;
                return Err(e);
            }
        };

        let now = self.clock.utc_now();
        let job = Job::new(
            JobConfig {
                id: job_id,
                name: name.to_string(),
                prompt: spec.prompt.clone(),
                mode: plan.mode,
                placement: mc_core::Placement::Session,
                branch: branch.clone(),
                worktree_path: worktree.clone(),
                plan_id: Some(plan.id.clone()),
            },
            now,
        )
        .with_target(target.clone());

        self.lock
            .with_lock(|| async {
                self.store.add_job(job.clone())?;
                self.store.update_job_spec(&plan.id, name, |spec| {
                    spec.advance(JobSpecStatus::Running);
                    spec.branch = Some(branch.clone());
                    spec.worktree_path = Some(worktree.clone());
                    spec.terminal_target = Some(target.clone());
                })
            })
            .await?;
        info!(job = name, branch = %branch, "job launched");
        Ok(())
    }

    /// When every job merged: pre-PR checkpoint or PR + completion.
    async fn check_completion(&self, skip: Option<Checkpoint>) -> Result<(), EngineError> {
        let Some(plan) = self.store.load_plan()? else {
            return Ok(());
        };
        if plan.checkpoint.is_some()
            || plan.status != PlanStatus::Running
            || plan.jobs.is_empty()
            || !plan.all_merged()
        {
            return Ok(());
        }

        let pause = checkpoint::decide(plan.mode, Checkpoint::PrePr) == CheckpointDecision::Pause
            && skip != Some(Checkpoint::PrePr);
        if pause {
            self.lock
                .with_lock(|| async {
                    self.store.update_plan(|plan| {
                        plan.enter_checkpoint(Checkpoint::PrePr);
                    })
                })
                .await?;
            self.toast_checkpoint(Checkpoint::PrePr, &plan).await;
            return Ok(());
        }

        let pr_url = self.publish_plan(&plan).await?;
        let now = self.clock.utc_now();
        self.lock
            .with_lock(|| async {
                self.store.update_plan(|plan| {
                    plan.status = PlanStatus::Completed;
                    plan.pr_url = Some(pr_url.clone());
                    plan.completed_at = Some(now);
                })
            })
            .await?;
        info!(plan = %plan.name, pr_url, "plan completed");
        let _ = self
            .notifier
            .toast(
                &format!("Plan {} completed", plan.name),
                &pr_url,
                ToastVariant::Success,
                ToastVariant::Success.duration(),
            )
            .await;
        let _ = self
            .notifier
            .notify(&format!("plan {} completed: {}", plan.name, pr_url))
            .await;
        Ok(())
    }

    /// Push the integration branch and open the pull request.
    pub(crate) async fn publish_plan(&self, plan: &Plan) -> Result<String, EngineError> {
        self.git.push(&plan.integration_branch).await?;
        let base = self.git.default_branch().await?;
        let merged: Vec<&str> = plan
            .jobs
            .iter()
            .filter(|j| j.status == JobSpecStatus::Merged)
            .map(|j| j.name.as_str())
            .collect();
        let url = self
            .pr
            .open_pr(&PrRequest {
                branch: plan.integration_branch.clone(),
                base,
                title: plan.name.clone(),
                body: format!("Integrates {} jobs: {}", merged.len(), merged.join(", ")),
            })
            .await?;
        Ok(url)
    }

    /// A failed job outside a retryable checkpoint fails the plan.
    async fn check_failure(&self, skip: Option<Checkpoint>) -> Result<(), EngineError> {
        let Some(plan) = self.store.load_plan()? else {
            return Ok(());
        };
        if plan.status != PlanStatus::Running {
            return Ok(());
        }
        let Some(failed) = plan
            .jobs
            .iter()
            .find(|j| j.status == JobSpecStatus::Failed)
        else {
            return Ok(());
        };

        let name = failed.name.clone();
        let reason = failed
            .failure_reason
            .clone()
            .unwrap_or_else(|| "unknown failure".to_string());
        let decision = checkpoint::decide(plan.mode, Checkpoint::OnError);
        // One-shot guard: a just-cleared on_error does not re-pause from
        // the same cause within this tick.
        if decision == CheckpointDecision::Pause && skip == Some(Checkpoint::OnError) {
            return Ok(());
        }
        self.lock
            .with_lock(|| async {
                self.store.update_plan(|plan| match decision {
                    CheckpointDecision::Pause => {
                        plan.enter_checkpoint(Checkpoint::OnError);
                        plan.checkpoint_context
                            .insert("job".to_string(), name.clone());
                    }
                    CheckpointDecision::FailPlan | CheckpointDecision::Continue => {
                        plan.status = PlanStatus::Failed;
                    }
                })
            })
            .await?;
        let _ = self
            .notifier
            .toast(
                &format!("Job {} failed", name),
                &reason,
                ToastVariant::Error,
                ToastVariant::Error.duration(),
            )
            .await;
        Ok(())
    }

    async fn toast_checkpoint(&self, point: Checkpoint, plan: &Plan) {
        let _ = self
            .notifier
            .toast(
                &format!("Plan {} paused at {}", plan.name, point),
                "approve to continue",
                ToastVariant::Warning,
                ToastVariant::Warning.duration(),
            )
            .await;
        let _ = self
            .notifier
            .notify(&format!("plan {} awaiting approval ({})", plan.name, point))
            .await;
    }
}

/// Output of the locked state pass at the top of a tick.
struct TickPhase {
    plan: Plan,
    paused_at: Option<Checkpoint>,
}

fn reason_or_exit(exit_code: Option<i32>, job: &Job) -> String {
    match exit_code {
        Some(code) => format!("{} exited with code {}", job.name, code),
        None => format!("{} terminal target gone", job.name),
    }
}

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod tests;
