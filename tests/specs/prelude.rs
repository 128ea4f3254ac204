// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared world for scenario tests: fake adapters around a real state
//! store in a temp directory. Building a second orchestrator over the
//! same world simulates a process restart.

use mc_adapters::{
    FakeGitAdapter, FakeNotifyAdapter, FakePrAdapter, FakeSessionAdapter, FakeShellRunner,
    SerialLock,
};
use mc_core::{FakeClock, JobStatus, PlanManifest, SequentialIdGen, WorkerEvent};
use mc_engine::{EngineDeps, Orchestrator, OrchestratorConfig};
use mc_storage::StateStore;
use std::time::Duration;
use tempfile::TempDir;

pub type SpecOrchestrator = Orchestrator<
    FakeGitAdapter,
    FakeSessionAdapter,
    FakeNotifyAdapter,
    FakePrAdapter,
    FakeShellRunner,
    FakeClock,
    SequentialIdGen,
>;

pub struct World {
    pub git: FakeGitAdapter,
    pub sessions: FakeSessionAdapter,
    pub notify: FakeNotifyAdapter,
    pub pr: FakePrAdapter,
    pub shell: FakeShellRunner,
    pub clock: FakeClock,
    ids: SequentialIdGen,
    _tmp: TempDir,
    data_dir: std::path::PathBuf,
}

impl World {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("tempdir");
        let data_dir = tmp.path().to_path_buf();
        Self {
            git: FakeGitAdapter::new(),
            sessions: FakeSessionAdapter::new(),
            notify: FakeNotifyAdapter::new(),
            pr: FakePrAdapter::new(),
            shell: FakeShellRunner::new(),
            clock: FakeClock::new(),
            ids: SequentialIdGen::new("id"),
            _tmp: tmp,
            data_dir,
        }
    }

    /// Build an orchestrator over this world's state. Calling it again
    /// simulates a restart: fresh in-memory state, same persisted files,
    /// same "tmux server".
    pub fn orchestrator(&self) -> SpecOrchestrator {
        Orchestrator::new(
            EngineDeps {
                git: self.git.clone(),
                sessions: self.sessions.clone(),
                notifier: self.notify.clone(),
                pr: self.pr.clone(),
                shell: self.shell.clone(),
            },
            StateStore::new(&self.data_dir, "spec-project"),
            SerialLock::new(),
            self.clock.clone(),
            self.ids.clone(),
            OrchestratorConfig {
                tick_interval: Duration::from_millis(20),
                poll_interval: Duration::from_millis(10),
                agent_command: Some("agent".to_string()),
            },
        )
    }
}

/// Parse a manifest composed from `(name, deps)` tuples.
pub fn manifest(mode: &str, max_parallel: u32, jobs: &[(&str, &[&str])]) -> PlanManifest {
    let mut out = format!(
        "[plan]\nname = \"spec-plan\"\nmode = \"{}\"\nmax_parallel = {}\n",
        mode, max_parallel
    );
    for (name, deps) in jobs {
        out.push_str(&format!(
            "\n[[job]]\nname = \"{}\"\nprompt = \"work on {}\"\n",
            name, name
        ));
        if !deps.is_empty() {
            let quoted: Vec<String> = deps.iter().map(|d| format!("\"{}\"", d)).collect();
            out.push_str(&format!("depends_on = [{}]\n", quoted.join(", ")));
        }
    }
    PlanManifest::parse(&out).expect("valid manifest")
}

/// Deliver a worker-finished event for `name` directly to the
/// reconciler, bypassing the monitor's polling.
pub async fn finish_worker(orch: &SpecOrchestrator, name: &str, exit_code: i32) {
    let job = orch
        .store()
        .find_job(name)
        .expect("store readable")
        .unwrap_or_else(|| panic!("no job record for '{}'", name));
    assert_eq!(job.status, JobStatus::Running);
    let event = if exit_code == 0 {
        WorkerEvent::Completed {
            job_id: job.id,
            exit_code,
        }
    } else {
        WorkerEvent::Failed {
            job_id: job.id,
            exit_code: Some(exit_code),
            reason: format!("agent exited with code {}", exit_code),
        }
    };
    orch.apply_worker_event(event).await;
}
