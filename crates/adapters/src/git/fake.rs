// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake git adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{
    branch_dir_name, AbortKind, AheadBehind, GitAdapter, GitError, GitOutput, IntegrationInfo,
    MergeResult, PostCreate, RefreshOutcome, WorktreeInfo, WorktreeOptions,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Recorded git call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitCall {
    RunGit { args: Vec<String> },
    CreateWorktree { branch: String },
    RemoveWorktree { path: PathBuf, force: bool },
    DeleteBranch { branch: String },
    Rebase { path: PathBuf, target: String },
    Merge { path: PathBuf, branch: String },
    Abort { path: PathBuf, kind: AbortKind },
    ResetHard { path: PathBuf, rev: String },
    CreateIntegration { plan_id: String, base: String },
    DeleteIntegration { plan_id: String },
    Refresh { plan_id: String },
    Push { branch: String },
}

struct FakeGitState {
    calls: Vec<GitCall>,
    branches: HashSet<String>,
    worktrees: HashMap<String, PathBuf>,
    heads: HashMap<String, String>,
    next_sha: u64,
    dirty_paths: HashSet<PathBuf>,
    rebase_conflicts: HashMap<String, Vec<String>>,
    merge_conflicts: HashMap<String, Vec<String>>,
    refresh_conflicts: Vec<String>,
    remote_url: Option<String>,
    worktree_error: Option<String>,
}

/// Fake git adapter: records calls, plays back scripted outcomes.
#[derive(Clone)]
pub struct FakeGitAdapter {
    inner: Arc<Mutex<FakeGitState>>,
}

impl Default for FakeGitAdapter {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeGitState {
                calls: Vec::new(),
                branches: HashSet::from(["main".to_string()]),
                worktrees: HashMap::new(),
                heads: HashMap::from([("main".to_string(), "sha-main".to_string())]),
                next_sha: 0,
                dirty_paths: HashSet::new(),
                rebase_conflicts: HashMap::new(),
                merge_conflicts: HashMap::new(),
                refresh_conflicts: Vec::new(),
                remote_url: None,
                worktree_error: None,
            })),
        }
    }
}

impl FakeGitAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<GitCall> {
        self.inner.lock().calls.clone()
    }

    /// Script the next rebase of `branch` to conflict on `files`.
    pub fn set_rebase_conflict(&self, branch: &str, files: Vec<String>) {
        self.inner
            .lock()
            .rebase_conflicts
            .insert(branch.to_string(), files);
    }

    /// Script merges of `branch` into the integration branch to conflict.
    pub fn set_merge_conflict(&self, branch: &str, files: Vec<String>) {
        self.inner
            .lock()
            .merge_conflicts
            .insert(branch.to_string(), files);
    }

    /// Mark a worktree as having uncommitted changes.
    pub fn set_dirty(&self, path: &Path) {
        self.inner.lock().dirty_paths.insert(path.to_path_buf());
    }

    /// Script `refresh_integration_from_main` to conflict.
    pub fn set_refresh_conflicts(&self, files: Vec<String>) {
        self.inner.lock().refresh_conflicts = files;
    }

    pub fn set_remote_url(&self, url: &str) {
        self.inner.lock().remote_url = Some(url.to_string());
    }

    /// Make the next worktree creation fail with this message.
    pub fn fail_next_worktree(&self, message: &str) {
        self.inner.lock().worktree_error = Some(message.to_string());
    }

    pub fn branch_list(&self) -> Vec<String> {
        let mut branches: Vec<String> = self.inner.lock().branches.iter().cloned().collect();
        branches.sort();
        branches
    }

    pub fn has_worktree(&self, branch: &str) -> bool {
        self.inner.lock().worktrees.contains_key(branch)
    }

    fn add_worktree(
        state: &mut FakeGitState,
        branch: &str,
    ) -> Result<PathBuf, GitError> {
        if let Some(message) = state.worktree_error.take() {
            return Err(GitError::Subprocess(message));
        }
        let path = PathBuf::from("/fake/wt").join(branch_dir_name(branch));
        state.branches.insert(branch.to_string());
        state.worktrees.insert(branch.to_string(), path.clone());
        state.next_sha += 1;
        let sha = format!("sha-{}", state.next_sha);
        state.heads.insert(branch.to_string(), sha);
        Ok(path)
    }

    fn branch_for_path(state: &FakeGitState, path: &Path) -> Option<String> {
        state
            .worktrees
            .iter()
            .find(|(_, p)| p.as_path() == path)
            .map(|(b, _)| b.clone())
    }
}

#[async_trait]
impl GitAdapter for FakeGitAdapter {
    async fn run_git(&self, args: &[&str], _cwd: &Path) -> Result<GitOutput, GitError> {
        let mut state = self.inner.lock();
        state.calls.push(GitCall::RunGit {
            args: args.iter().map(|s| s.to_string()).collect(),
        });
        Ok(GitOutput {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: 0,
        })
    }

    async fn create_worktree(&self, opts: &WorktreeOptions) -> Result<PathBuf, GitError> {
        let mut state = self.inner.lock();
        state.calls.push(GitCall::CreateWorktree {
            branch: opts.branch.clone(),
        });
        Self::add_worktree(&mut state, &opts.branch)
    }

    async fn remove_worktree(&self, path: &Path, force: bool) -> Result<(), GitError> {
        let mut state = self.inner.lock();
        state.calls.push(GitCall::RemoveWorktree {
            path: path.to_path_buf(),
            force,
        });
        state.worktrees.retain(|_, p| p.as_path() != path);
        Ok(())
    }

    async fn list_worktrees(&self) -> Result<Vec<WorktreeInfo>, GitError> {
        let state = self.inner.lock();
        Ok(state
            .worktrees
            .iter()
            .map(|(branch, path)| WorktreeInfo {
                path: path.clone(),
                branch: Some(branch.clone()),
                head: state.heads.get(branch).cloned().unwrap_or_default(),
                is_main: false,
            })
            .collect())
    }

    async fn current_branch(&self, path: &Path) -> Result<String, GitError> {
        let state = self.inner.lock();
        Self::branch_for_path(&state, path)
            .ok_or_else(|| GitError::Subprocess(format!("no worktree at {}", path.display())))
    }

    async fn status(&self, path: &Path) -> Result<String, GitError> {
        let state = self.inner.lock();
        if state.dirty_paths.contains(path) {
            Ok(" M src/lib.rs\n".to_string())
        } else {
            Ok(String::new())
        }
    }

    async fn ahead_behind(&self, _path: &Path) -> Result<AheadBehind, GitError> {
        Ok(AheadBehind {
            ahead: 0,
            behind: 0,
        })
    }

    async fn default_branch(&self) -> Result<String, GitError> {
        Ok("main".to_string())
    }

    async fn head(&self, path: &Path) -> Result<String, GitError> {
        let state = self.inner.lock();
        let branch = Self::branch_for_path(&state, path)
            .ok_or_else(|| GitError::Subprocess(format!("no worktree at {}", path.display())))?;
        Ok(state.heads.get(&branch).cloned().unwrap_or_default())
    }

    async fn resolve_commit(&self, rev: &str) -> Result<String, GitError> {
        let state = self.inner.lock();
        if rev == "HEAD" {
            return Ok(state
                .heads
                .get("main")
                .cloned()
                .unwrap_or_else(|| "sha-main".to_string()));
        }
        Ok(state
            .heads
            .get(rev)
            .cloned()
            .unwrap_or_else(|| rev.to_string()))
    }

    async fn branch_exists(&self, branch: &str) -> Result<bool, GitError> {
        Ok(self.inner.lock().branches.contains(branch))
    }

    async fn delete_branch(&self, branch: &str) -> Result<(), GitError> {
        let mut state = self.inner.lock();
        state.calls.push(GitCall::DeleteBranch {
            branch: branch.to_string(),
        });
        state.branches.remove(branch);
        Ok(())
    }

    async fn rebase(&self, path: &Path, target: &str) -> Result<MergeResult, GitError> {
        let mut state = self.inner.lock();
        state.calls.push(GitCall::Rebase {
            path: path.to_path_buf(),
            target: target.to_string(),
        });
        let branch = Self::branch_for_path(&state, path)
            .ok_or_else(|| GitError::Subprocess(format!("no worktree at {}", path.display())))?;
        if let Some(files) = state.rebase_conflicts.get(&branch) {
            return Ok(MergeResult::Conflict(files.clone()));
        }
        Ok(MergeResult::Clean)
    }

    async fn merge(&self, path: &Path, branch: &str) -> Result<MergeResult, GitError> {
        let mut state = self.inner.lock();
        state.calls.push(GitCall::Merge {
            path: path.to_path_buf(),
            branch: branch.to_string(),
        });
        if let Some(files) = state.merge_conflicts.get(branch) {
            return Ok(MergeResult::Conflict(files.clone()));
        }
        // Advance the integration head so reverts have a distinct prior tip.
        if let Some(target) = Self::branch_for_path(&state, path) {
            state.next_sha += 1;
            let sha = format!("sha-{}", state.next_sha);
            state.heads.insert(target, sha);
        }
        Ok(MergeResult::Clean)
    }

    async fn abort(&self, path: &Path, kind: AbortKind) -> Result<(), GitError> {
        self.inner.lock().calls.push(GitCall::Abort {
            path: path.to_path_buf(),
            kind,
        });
        Ok(())
    }

    async fn reset_hard(&self, path: &Path, rev: &str) -> Result<(), GitError> {
        let mut state = self.inner.lock();
        state.calls.push(GitCall::ResetHard {
            path: path.to_path_buf(),
            rev: rev.to_string(),
        });
        if let Some(branch) = Self::branch_for_path(&state, path) {
            state.heads.insert(branch, rev.to_string());
        }
        Ok(())
    }

    async fn create_integration_branch(
        &self,
        plan_id: &str,
        base_commit: &str,
        _post_create: &PostCreate,
    ) -> Result<IntegrationInfo, GitError> {
        let mut state = self.inner.lock();
        state.calls.push(GitCall::CreateIntegration {
            plan_id: plan_id.to_string(),
            base: base_commit.to_string(),
        });
        let branch = format!("mc/integration-{}", plan_id);
        let path = Self::add_worktree(&mut state, &branch)?;
        Ok(IntegrationInfo {
            branch,
            worktree_path: path,
        })
    }

    async fn delete_integration_branch(&self, plan_id: &str) -> Result<(), GitError> {
        let mut state = self.inner.lock();
        state.calls.push(GitCall::DeleteIntegration {
            plan_id: plan_id.to_string(),
        });
        let branch = format!("mc/integration-{}", plan_id);
        state.worktrees.remove(&branch);
        state.branches.remove(&branch);
        Ok(())
    }

    async fn refresh_integration_from_main(
        &self,
        plan_id: &str,
    ) -> Result<RefreshOutcome, GitError> {
        let mut state = self.inner.lock();
        state.calls.push(GitCall::Refresh {
            plan_id: plan_id.to_string(),
        });
        if state.refresh_conflicts.is_empty() {
            Ok(RefreshOutcome {
                success: true,
                conflicts: Vec::new(),
            })
        } else {
            Ok(RefreshOutcome {
                success: false,
                conflicts: state.refresh_conflicts.clone(),
            })
        }
    }

    async fn remote_url(&self) -> Result<Option<String>, GitError> {
        Ok(self.inner.lock().remote_url.clone())
    }

    async fn push(&self, branch: &str) -> Result<(), GitError> {
        self.inner.lock().calls.push(GitCall::Push {
            branch: branch.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
