// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wiring: production adapters assembled around the current repository.

use crate::exit_error::{CliResult, ExitError};
use mc_adapters::{
    CompareUrlPr, DesktopNotifyAdapter, GitAdapter, GitCli, SerialLock, ShRunner, TmuxAdapter,
};
use mc_core::{SystemClock, UuidIdGen};
use mc_engine::{EngineDeps, Orchestrator, OrchestratorConfig};
use mc_storage::StateStore;
use std::path::PathBuf;

/// The orchestrator as the CLI runs it: real git, real tmux, desktop
/// notifications, compare-URL pull requests.
pub type ProdOrchestrator = Orchestrator<
    GitCli,
    TmuxAdapter,
    DesktopNotifyAdapter,
    CompareUrlPr,
    ShRunner,
    SystemClock,
    UuidIdGen,
>;

/// Resolve the project and build the orchestrator.
pub async fn build(directory: Option<PathBuf>) -> CliResult<ProdOrchestrator> {
    let cwd = match directory {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    let toplevel = GitCli::toplevel(&cwd)
        .await
        .map_err(|e| ExitError::failure(format!("not inside a git repository: {}", e)))?;
    let project_id = match GitCli::common_dir(&cwd).await {
        Ok(common) => mc_storage::project_id_from_git_dir(&common)
            .unwrap_or_else(|| mc_storage::paths::project_id_from_cwd(&cwd)),
        Err(_) => mc_storage::paths::project_id_from_cwd(&cwd),
    };

    let data_dir = mc_storage::data_dir();
    let store = StateStore::new(&data_dir, &project_id);
    let lock = SerialLock::new();
    let worktree_root = data_dir.join(&project_id).join("worktrees");
    let git = GitCli::new(toplevel, worktree_root, lock.clone());
    let remote = git.remote_url().await.unwrap_or(None);

    Ok(Orchestrator::new(
        EngineDeps {
            git,
            sessions: TmuxAdapter::new(),
            notifier: DesktopNotifyAdapter::new(),
            pr: CompareUrlPr::new(remote),
            shell: ShRunner::new(),
        },
        store,
        lock,
        SystemClock,
        UuidIdGen,
        OrchestratorConfig::default(),
    ))
}
