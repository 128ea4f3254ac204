// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests.
#![allow(clippy::unwrap_used)]

use crate::reconciler::{EngineDeps, Orchestrator, OrchestratorConfig};
use mc_adapters::{
    FakeGitAdapter, FakeNotifyAdapter, FakePrAdapter, FakeSessionAdapter, FakeShellRunner,
    SerialLock,
};
use mc_core::{FakeClock, JobStatus, SequentialIdGen, WorkerEvent};
use mc_storage::StateStore;
use std::time::Duration;
use tempfile::TempDir;

pub(crate) type TestOrchestrator = Orchestrator<
    FakeGitAdapter,
    FakeSessionAdapter,
    FakeNotifyAdapter,
    FakePrAdapter,
    FakeShellRunner,
    FakeClock,
    SequentialIdGen,
>;

pub(crate) struct Fixture {
    pub orch: TestOrchestrator,
    pub git: FakeGitAdapter,
    pub sessions: FakeSessionAdapter,
    pub notify: FakeNotifyAdapter,
    pub pr: FakePrAdapter,
    pub shell: FakeShellRunner,
    pub clock: FakeClock,
    _tmp: TempDir,
}

pub(crate) fn fixture() -> Fixture {
    let tmp = TempDir::new().unwrap();
    let store = StateStore::new(tmp.path(), "test-project");
    let git = FakeGitAdapter::new();
    let sessions = FakeSessionAdapter::new();
    let notify = FakeNotifyAdapter::new();
    let pr = FakePrAdapter::new();
    let shell = FakeShellRunner::new();
    let clock = FakeClock::new();

    let orch = Orchestrator::new(
        EngineDeps {
            git: git.clone(),
            sessions: sessions.clone(),
            notifier: notify.clone(),
            pr: pr.clone(),
            shell: shell.clone(),
        },
        store,
        SerialLock::new(),
        clock.clone(),
        SequentialIdGen::new("job"),
        OrchestratorConfig {
            tick_interval: Duration::from_millis(20),
            poll_interval: Duration::from_millis(10),
            agent_command: Some("agent".to_string()),
        },
    );

    Fixture {
        orch,
        git,
        sessions,
        notify,
        pr,
        shell,
        clock,
        _tmp: tmp,
    }
}

/// Compose a plan manifest for the given mode and `(name, deps)` jobs.
pub(crate) fn manifest(mode: &str, max_parallel: u32, jobs: &[(&str, &[&str])]) -> String {
    let mut out = format!(
        "[plan]\nname = \"test-plan\"\nmode = \"{}\"\nmax_parallel = {}\n",
        mode, max_parallel
    );
    for (name, deps) in jobs {
        out.push_str(&format!("\n[[job]]\nname = \"{}\"\nprompt = \"work on {}\"\n", name, name));
        if !deps.is_empty() {
            let quoted: Vec<String> = deps.iter().map(|d| format!("\"{}\"", d)).collect();
            out.push_str(&format!("depends_on = [{}]\n", quoted.join(", ")));
        }
    }
    out
}

impl Fixture {
    /// Drive the worker of `name` to completion (or failure) without
    /// waiting on the monitor's polling.
    pub async fn finish_worker(&self, name: &str, exit_code: i32) {
        let job = self
            .orch
            .store()
            .find_job(name)
            .unwrap()
            .unwrap_or_else(|| panic!("no job record for '{}'", name));
        assert_eq!(job.status, JobStatus::Running, "job '{}' not running", name);
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
        self.orch.apply_worker_event(event).await;
    }
}
