// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git adapter: branches, worktrees, rebase, merge, conflicts.
//!
//! Every primitive is serialized through the process lock — a git
//! directory is not safe for concurrent writers within one process. The
//! production implementation shells out to `git`; the fake records calls
//! and plays back scripted outcomes.

mod cli;

pub use cli::GitCli;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeGitAdapter, GitCall};

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from git operations
#[derive(Debug, Error)]
pub enum GitError {
    #[error("git {args} exited {exit_code}: {stderr}")]
    Command {
        args: String,
        exit_code: i32,
        stderr: String,
    },
    #[error("{0}")]
    Subprocess(String),
    #[error("worktree post-create hook failed: {0}")]
    PostCreate(String),
    #[error("no git remote configured")]
    NoRemote,
}

/// Captured output of one git invocation.
#[derive(Debug, Clone)]
pub struct GitOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// One entry of `git worktree list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorktreeInfo {
    pub path: PathBuf,
    pub branch: Option<String>,
    pub head: String,
    pub is_main: bool,
}

/// Steps run inside a fresh worktree, in order: symlinks, copies, then
/// commands. A failing command aborts worktree creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostCreate {
    /// Directories symlinked from the main checkout (e.g. `node_modules`).
    pub symlink_dirs: Vec<PathBuf>,
    /// Files copied from the main checkout (e.g. `.env`).
    pub copy_files: Vec<PathBuf>,
    /// Shell commands run in the new worktree.
    pub commands: Vec<String>,
}

/// Options for creating a job worktree.
#[derive(Debug, Clone)]
pub struct WorktreeOptions {
    /// Branch to create (or check out, if it already exists).
    pub branch: String,
    /// Revision the branch starts from when newly created.
    pub start_point: String,
    pub post_create: PostCreate,
}

/// Result of counting commits against an upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AheadBehind {
    pub ahead: u32,
    pub behind: u32,
}

/// The integration branch and its dedicated worktree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrationInfo {
    pub branch: String,
    pub worktree_path: PathBuf,
}

/// Outcome of refreshing the integration branch from the default branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub success: bool,
    pub conflicts: Vec<String>,
}

/// A rebase or merge either applies cleanly or stops on conflicts.
/// Adapter-level failures (missing branch, I/O) are `GitError`s instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeResult {
    Clean,
    Conflict(Vec<String>),
}

/// Which in-progress operation to abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortKind {
    Rebase,
    Merge,
}

impl std::fmt::Display for AbortKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbortKind::Rebase => write!(f, "rebase"),
            AbortKind::Merge => write!(f, "merge"),
        }
    }
}

/// Adapter over a git repository and its worktrees.
#[async_trait]
pub trait GitAdapter: Clone + Send + Sync + 'static {
    /// Run an arbitrary git command, returning its captured output.
    /// Does not error on non-zero exit; callers inspect `exit_code`.
    async fn run_git(&self, args: &[&str], cwd: &Path) -> Result<GitOutput, GitError>;

    /// Create a worktree for a branch and run its post-create hooks.
    async fn create_worktree(&self, opts: &WorktreeOptions) -> Result<PathBuf, GitError>;

    /// Remove a worktree. Idempotent: a missing worktree is not an error.
    async fn remove_worktree(&self, path: &Path, force: bool) -> Result<(), GitError>;

    async fn list_worktrees(&self) -> Result<Vec<WorktreeInfo>, GitError>;

    async fn current_branch(&self, path: &Path) -> Result<String, GitError>;

    /// `git status --porcelain`; empty means clean.
    async fn status(&self, path: &Path) -> Result<String, GitError>;

    async fn ahead_behind(&self, path: &Path) -> Result<AheadBehind, GitError>;

    async fn default_branch(&self) -> Result<String, GitError>;

    /// Resolve HEAD of the given worktree to a commit hash.
    async fn head(&self, path: &Path) -> Result<String, GitError>;

    /// Resolve a revision in the main checkout to a commit hash.
    async fn resolve_commit(&self, rev: &str) -> Result<String, GitError>;

    async fn branch_exists(&self, branch: &str) -> Result<bool, GitError>;

    /// Delete a local branch. Idempotent: a missing branch is not an error.
    async fn delete_branch(&self, branch: &str) -> Result<(), GitError>;

    /// Rebase the branch checked out at `path` onto `target`.
    async fn rebase(&self, path: &Path, target: &str) -> Result<MergeResult, GitError>;

    /// Fast-forward merge `branch` into the branch checked out at `path`.
    async fn merge(&self, path: &Path, branch: &str) -> Result<MergeResult, GitError>;

    /// Abort an in-progress rebase or merge. Idempotent: nothing in
    /// progress is not an error.
    async fn abort(&self, path: &Path, kind: AbortKind) -> Result<(), GitError>;

    /// `git reset --hard <rev>` — the merge train's revert path.
    async fn reset_hard(&self, path: &Path, rev: &str) -> Result<(), GitError>;

    /// Cut `mc/integration-<plan_id>` from `base_commit` with its own
    /// worktree, running post-create hooks.
    async fn create_integration_branch(
        &self,
        plan_id: &str,
        base_commit: &str,
        post_create: &PostCreate,
    ) -> Result<IntegrationInfo, GitError>;

    /// Remove the integration worktree and branch. Idempotent.
    async fn delete_integration_branch(&self, plan_id: &str) -> Result<(), GitError>;

    /// Merge the default branch into the integration branch.
    async fn refresh_integration_from_main(
        &self,
        plan_id: &str,
    ) -> Result<RefreshOutcome, GitError>;

    /// URL of the `origin` remote, if configured.
    async fn remote_url(&self) -> Result<Option<String>, GitError>;

    /// Push a branch to `origin`, setting upstream.
    async fn push(&self, branch: &str) -> Result<(), GitError>;
}

/// Extract conflicted paths from rebase/merge stderr.
///
/// Recognized lines look like
/// `CONFLICT (content): Merge conflict in src/lib.rs` or
/// `CONFLICT (modify/delete): src/x.rs deleted in HEAD...`.
/// When nothing matches, the raw stderr is returned as a single entry
/// (possibly the empty string) so the operator always sees something.
pub fn parse_conflicts(stderr: &str) -> Vec<String> {
    let mut files = Vec::new();
    for line in stderr.lines() {
        let trimmed = line.trim();
        let Some(rest) = trimmed.strip_prefix("CONFLICT") else {
            continue;
        };
        if let Some((_, path)) = rest.split_once("Merge conflict in ") {
            files.push(path.trim().to_string());
        } else if let Some((_, detail)) = rest.split_once("): ") {
            files.push(detail.trim().to_string());
        } else {
            files.push(trimmed.to_string());
        }
    }
    if files.is_empty() {
        vec![stderr.to_string()]
    } else {
        files
    }
}

/// Turn a job name into a branch name under the `mc/` prefix.
pub fn sanitize_branch(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '_') {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash && !slug.is_empty() {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("job");
    }
    format!("mc/{}", slug)
}

/// Directory name for a branch's worktree (`/` is not path-safe).
pub fn branch_dir_name(branch: &str) -> String {
    branch.replace('/', "-")
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
