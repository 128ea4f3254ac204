// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git adapter backed by the `git` CLI.

use super::{
    branch_dir_name, parse_conflicts, AbortKind, AheadBehind, GitAdapter, GitError, GitOutput,
    IntegrationInfo, MergeResult, PostCreate, RefreshOutcome, WorktreeInfo, WorktreeOptions,
};
use crate::lock::SerialLock;
use crate::subprocess::{run_with_timeout, GIT_TIMEOUT, GIT_WORKTREE_TIMEOUT};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Production git adapter.
///
/// Holds the process serialization lock and acquires it once per
/// primitive; internal helpers run unlocked so primitives never nest
/// acquisitions.
#[derive(Clone)]
pub struct GitCli {
    repo_root: PathBuf,
    worktree_root: PathBuf,
    lock: SerialLock,
}

impl GitCli {
    /// `repo_root` is the main checkout; `worktree_root` is where job and
    /// integration worktrees are created.
    pub fn new(repo_root: PathBuf, worktree_root: PathBuf, lock: SerialLock) -> Self {
        Self {
            repo_root,
            worktree_root,
            lock,
        }
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// Worktree directory a branch maps to.
    pub fn worktree_path_for(&self, branch: &str) -> PathBuf {
        self.worktree_root.join(branch_dir_name(branch))
    }

    /// Resolve the repository's common git directory from any worktree.
    ///
    /// Bootstrap helper: runs before the adapter (and the lock) exist, so
    /// it takes no lock.
    pub async fn common_dir(cwd: &Path) -> Result<PathBuf, GitError> {
        let out = exec_in(cwd, &["rev-parse", "--git-common-dir"]).await?;
        if out.exit_code != 0 {
            return Err(GitError::Command {
                args: "rev-parse --git-common-dir".into(),
                exit_code: out.exit_code,
                stderr: out.stderr,
            });
        }
        let dir = PathBuf::from(out.stdout.trim());
        if dir.is_absolute() {
            Ok(dir)
        } else {
            Ok(cwd.join(dir))
        }
    }

    /// Resolve the main checkout root. Bootstrap helper, unlocked.
    pub async fn toplevel(cwd: &Path) -> Result<PathBuf, GitError> {
        let out = exec_in(cwd, &["rev-parse", "--show-toplevel"]).await?;
        if out.exit_code != 0 {
            return Err(GitError::Command {
                args: "rev-parse --show-toplevel".into(),
                exit_code: out.exit_code,
                stderr: out.stderr,
            });
        }
        Ok(PathBuf::from(out.stdout.trim()))
    }

    // -- unlocked internals --

    async fn exec(&self, args: &[&str], cwd: &Path) -> Result<GitOutput, GitError> {
        exec_in(cwd, args).await
    }

    /// Like [`Self::exec`] but errors on non-zero exit.
    async fn exec_ok(&self, args: &[&str], cwd: &Path) -> Result<GitOutput, GitError> {
        let out = self.exec(args, cwd).await?;
        if out.exit_code != 0 {
            return Err(GitError::Command {
                args: args.join(" "),
                exit_code: out.exit_code,
                stderr: out.stderr,
            });
        }
        Ok(out)
    }

    async fn branch_exists_unlocked(&self, branch: &str) -> Result<bool, GitError> {
        let refname = format!("refs/heads/{}", branch);
        let out = self
            .exec(
                &["show-ref", "--verify", "--quiet", &refname],
                &self.repo_root,
            )
            .await?;
        Ok(out.exit_code == 0)
    }

    async fn default_branch_unlocked(&self) -> Result<String, GitError> {
        let out = self
            .exec(
                &["symbolic-ref", "--short", "refs/remotes/origin/HEAD"],
                &self.repo_root,
            )
            .await?;
        if out.exit_code == 0 {
            if let Some(name) = out.stdout.trim().strip_prefix("origin/") {
                return Ok(name.to_string());
            }
        }
        for candidate in ["main", "master"] {
            if self.branch_exists_unlocked(candidate).await? {
                return Ok(candidate.to_string());
            }
        }
        Err(GitError::Subprocess(
            "cannot determine default branch (no origin/HEAD, no main or master)".into(),
        ))
    }

    /// Create the worktree directory for a branch, new or existing.
    async fn add_worktree_unlocked(
        &self,
        branch: &str,
        start_point: &str,
    ) -> Result<PathBuf, GitError> {
        let path = self.worktree_path_for(branch);
        if path.exists() {
            return Err(GitError::Subprocess(format!(
                "worktree path already exists: {}",
                path.display()
            )));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| GitError::Subprocess(e.to_string()))?;
        }

        let path_str = path.display().to_string();
        if self.branch_exists_unlocked(branch).await? {
            self.exec_worktree(&["worktree", "add", &path_str, branch])
                .await?;
        } else {
            self.exec_worktree(&["worktree", "add", "-b", branch, &path_str, start_point])
                .await?;
        }
        Ok(path)
    }

    async fn exec_worktree(&self, args: &[&str]) -> Result<GitOutput, GitError> {
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(&self.repo_root);
        let output = run_with_timeout(cmd, GIT_WORKTREE_TIMEOUT, "git worktree")
            .await
            .map_err(GitError::Subprocess)?;
        let out = to_git_output(output);
        if out.exit_code != 0 {
            return Err(GitError::Command {
                args: args.join(" "),
                exit_code: out.exit_code,
                stderr: out.stderr,
            });
        }
        Ok(out)
    }

    /// Run post-create hooks in order: symlinks, copies, commands.
    /// A failing command tears the worktree down again.
    async fn run_post_create(&self, path: &Path, hooks: &PostCreate) -> Result<(), GitError> {
        for dir in &hooks.symlink_dirs {
            let src = self.repo_root.join(dir);
            let dst = path.join(dir);
            if !src.exists() {
                tracing::warn!(dir = %dir.display(), "symlink source missing, skipping");
                continue;
            }
            if let Some(parent) = dst.parent() {
                std::fs::create_dir_all(parent).map_err(|e| GitError::Subprocess(e.to_string()))?;
            }
            #[cfg(unix)]
            std::os::unix::fs::symlink(&src, &dst)
                .map_err(|e| GitError::Subprocess(format!("symlink {}: {}", dir.display(), e)))?;
            #[cfg(not(unix))]
            tracing::warn!(dir = %dir.display(), "symlink dirs unsupported on this platform");
        }

        for file in &hooks.copy_files {
            let src = self.repo_root.join(file);
            let dst = path.join(file);
            if !src.exists() {
                tracing::warn!(file = %file.display(), "copy source missing, skipping");
                continue;
            }
            if let Some(parent) = dst.parent() {
                std::fs::create_dir_all(parent).map_err(|e| GitError::Subprocess(e.to_string()))?;
            }
            std::fs::copy(&src, &dst)
                .map_err(|e| GitError::Subprocess(format!("copy {}: {}", file.display(), e)))?;
        }

        for command in &hooks.commands {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(command).current_dir(path);
            let output = run_with_timeout(cmd, GIT_WORKTREE_TIMEOUT, "post-create command")
                .await
                .map_err(GitError::Subprocess)?;
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();
                // Tear the half-initialized worktree down before surfacing
                let _ = self
                    .exec(
                        &[
                            "worktree",
                            "remove",
                            "--force",
                            &path.display().to_string(),
                        ],
                        &self.repo_root,
                    )
                    .await;
                return Err(GitError::PostCreate(format!("{}: {}", command, stderr)));
            }
        }
        Ok(())
    }

    async fn remove_worktree_unlocked(&self, path: &Path, force: bool) -> Result<(), GitError> {
        if !path.exists() {
            // Already gone; prune any stale bookkeeping.
            let _ = self.exec(&["worktree", "prune"], &self.repo_root).await;
            return Ok(());
        }
        let path_str = path.display().to_string();
        let mut args = vec!["worktree", "remove"];
        if force {
            args.push("--force");
        }
        args.push(&path_str);
        self.exec_ok(&args, &self.repo_root).await?;
        Ok(())
    }

    async fn delete_branch_unlocked(&self, branch: &str) -> Result<(), GitError> {
        let out = self
            .exec(&["branch", "-D", branch], &self.repo_root)
            .await?;
        if out.exit_code != 0 && !out.stderr.contains("not found") {
            return Err(GitError::Command {
                args: format!("branch -D {}", branch),
                exit_code: out.exit_code,
                stderr: out.stderr,
            });
        }
        Ok(())
    }
}

async fn exec_in(cwd: &Path, args: &[&str]) -> Result<GitOutput, GitError> {
    let mut cmd = Command::new("git");
    cmd.args(args).current_dir(cwd);
    let output = run_with_timeout(cmd, GIT_TIMEOUT, "git")
        .await
        .map_err(GitError::Subprocess)?;
    Ok(to_git_output(output))
}

fn to_git_output(output: std::process::Output) -> GitOutput {
    GitOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(-1),
    }
}

#[async_trait]
impl GitAdapter for GitCli {
    async fn run_git(&self, args: &[&str], cwd: &Path) -> Result<GitOutput, GitError> {
        let _guard = self.lock.lock().await;
        self.exec(args, cwd).await
    }

    async fn create_worktree(&self, opts: &WorktreeOptions) -> Result<PathBuf, GitError> {
        let _guard = self.lock.lock().await;
        let path = self
            .add_worktree_unlocked(&opts.branch, &opts.start_point)
            .await?;
        self.run_post_create(&path, &opts.post_create).await?;
        Ok(path)
    }

    async fn remove_worktree(&self, path: &Path, force: bool) -> Result<(), GitError> {
        let _guard = self.lock.lock().await;
        self.remove_worktree_unlocked(path, force).await
    }

    async fn list_worktrees(&self) -> Result<Vec<WorktreeInfo>, GitError> {
        let _guard = self.lock.lock().await;
        let out = self
            .exec_ok(&["worktree", "list", "--porcelain"], &self.repo_root)
            .await?;

        let mut infos = Vec::new();
        let mut current: Option<WorktreeInfo> = None;
        for line in out.stdout.lines() {
            if let Some(path) = line.strip_prefix("worktree ") {
                if let Some(info) = current.take() {
                    infos.push(info);
                }
                current = Some(WorktreeInfo {
                    path: PathBuf::from(path),
                    branch: None,
                    head: String::new(),
                    is_main: infos.is_empty(),
                });
            } else if let Some(head) = line.strip_prefix("HEAD ") {
                if let Some(info) = current.as_mut() {
                    info.head = head.to_string();
                }
            } else if let Some(branch) = line.strip_prefix("branch ") {
                if let Some(info) = current.as_mut() {
                    info.branch = Some(
                        branch
                            .strip_prefix("refs/heads/")
                            .unwrap_or(branch)
                            .to_string(),
                    );
                }
            }
        }
        if let Some(info) = current.take() {
            infos.push(info);
        }
        Ok(infos)
    }

    async fn current_branch(&self, path: &Path) -> Result<String, GitError> {
        let _guard = self.lock.lock().await;
        let out = self
            .exec_ok(&["rev-parse", "--abbrev-ref", "HEAD"], path)
            .await?;
        Ok(out.stdout.trim().to_string())
    }

    async fn status(&self, path: &Path) -> Result<String, GitError> {
        let _guard = self.lock.lock().await;
        let out = self.exec_ok(&["status", "--porcelain"], path).await?;
        Ok(out.stdout)
    }

    async fn ahead_behind(&self, path: &Path) -> Result<AheadBehind, GitError> {
        let _guard = self.lock.lock().await;
        // Prefer the upstream; worktree branches usually have none, so
        // fall back to the default branch.
        let mut out = self
            .exec(
                &["rev-list", "--left-right", "--count", "@{upstream}...HEAD"],
                path,
            )
            .await?;
        if out.exit_code != 0 {
            let base = self.default_branch_unlocked().await?;
            let range = format!("{}...HEAD", base);
            out = self
                .exec_ok(&["rev-list", "--left-right", "--count", &range], path)
                .await?;
        }
        let mut parts = out.stdout.split_whitespace();
        let behind = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
        let ahead = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
        Ok(AheadBehind { ahead, behind })
    }

    async fn default_branch(&self) -> Result<String, GitError> {
        let _guard = self.lock.lock().await;
        self.default_branch_unlocked().await
    }

    async fn head(&self, path: &Path) -> Result<String, GitError> {
        let _guard = self.lock.lock().await;
        let out = self.exec_ok(&["rev-parse", "HEAD"], path).await?;
        Ok(out.stdout.trim().to_string())
    }

    async fn resolve_commit(&self, rev: &str) -> Result<String, GitError> {
        let _guard = self.lock.lock().await;
        let out = self.exec_ok(&["rev-parse", rev], &self.repo_root).await?;
        Ok(out.stdout.trim().to_string())
    }

    async fn branch_exists(&self, branch: &str) -> Result<bool, GitError> {
        let _guard = self.lock.lock().await;
        self.branch_exists_unlocked(branch).await
    }

    async fn delete_branch(&self, branch: &str) -> Result<(), GitError> {
        let _guard = self.lock.lock().await;
        self.delete_branch_unlocked(branch).await
    }

    async fn rebase(&self, path: &Path, target: &str) -> Result<MergeResult, GitError> {
        let _guard = self.lock.lock().await;
        let out = self.exec(&["rebase", target], path).await?;
        if out.exit_code == 0 {
            Ok(MergeResult::Clean)
        } else {
            Ok(MergeResult::Conflict(parse_conflicts(&combined(&out))))
        }
    }

    async fn merge(&self, path: &Path, branch: &str) -> Result<MergeResult, GitError> {
        let _guard = self.lock.lock().await;
        let out = self.exec(&["merge", "--ff-only", branch], path).await?;
        if out.exit_code == 0 {
            Ok(MergeResult::Clean)
        } else {
            Ok(MergeResult::Conflict(parse_conflicts(&combined(&out))))
        }
    }

    async fn abort(&self, path: &Path, kind: AbortKind) -> Result<(), GitError> {
        let _guard = self.lock.lock().await;
        let args: &[&str] = match kind {
            AbortKind::Rebase => &["rebase", "--abort"],
            AbortKind::Merge => &["merge", "--abort"],
        };
        let out = self.exec(args, path).await?;
        // Nothing in progress is fine: the conflict may have left no state.
        if out.exit_code != 0
            && !out.stderr.contains("No rebase in progress")
            && !out.stderr.contains("no rebase in progress")
            && !out.stderr.contains("There is no merge to abort")
        {
            return Err(GitError::Command {
                args: format!("{} --abort", kind),
                exit_code: out.exit_code,
                stderr: out.stderr,
            });
        }
        Ok(())
    }

    async fn reset_hard(&self, path: &Path, rev: &str) -> Result<(), GitError> {
        let _guard = self.lock.lock().await;
        self.exec_ok(&["reset", "--hard", rev], path).await?;
        Ok(())
    }

    async fn create_integration_branch(
        &self,
        plan_id: &str,
        base_commit: &str,
        post_create: &PostCreate,
    ) -> Result<IntegrationInfo, GitError> {
        let _guard = self.lock.lock().await;
        let branch = format!("mc/integration-{}", plan_id);
        let path = self.add_worktree_unlocked(&branch, base_commit).await?;
        self.run_post_create(&path, post_create).await?;
        Ok(IntegrationInfo {
            branch,
            worktree_path: path,
        })
    }

    async fn delete_integration_branch(&self, plan_id: &str) -> Result<(), GitError> {
        let _guard = self.lock.lock().await;
        let branch = format!("mc/integration-{}", plan_id);
        let path = self.worktree_path_for(&branch);
        self.remove_worktree_unlocked(&path, true).await?;
        self.delete_branch_unlocked(&branch).await
    }

    async fn refresh_integration_from_main(
        &self,
        plan_id: &str,
    ) -> Result<RefreshOutcome, GitError> {
        let _guard = self.lock.lock().await;
        let branch = format!("mc/integration-{}", plan_id);
        let path = self.worktree_path_for(&branch);
        let base = self.default_branch_unlocked().await?;

        let out = self.exec(&["merge", &base], &path).await?;
        if out.exit_code == 0 {
            return Ok(RefreshOutcome {
                success: true,
                conflicts: Vec::new(),
            });
        }
        let conflicts = parse_conflicts(&combined(&out));
        let _ = self.exec(&["merge", "--abort"], &path).await;
        Ok(RefreshOutcome {
            success: false,
            conflicts,
        })
    }

    async fn remote_url(&self) -> Result<Option<String>, GitError> {
        let _guard = self.lock.lock().await;
        let out = self
            .exec(&["remote", "get-url", "origin"], &self.repo_root)
            .await?;
        if out.exit_code == 0 {
            Ok(Some(out.stdout.trim().to_string()))
        } else {
            Ok(None)
        }
    }

    async fn push(&self, branch: &str) -> Result<(), GitError> {
        let _guard = self.lock.lock().await;
        self.exec_ok(&["push", "-u", "origin", branch], &self.repo_root)
            .await?;
        Ok(())
    }
}

/// Conflict markers land on stdout for merges and stderr for rebases;
/// scan both.
fn combined(out: &GitOutput) -> String {
    if out.stderr.trim().is_empty() {
        out.stdout.clone()
    } else if out.stdout.trim().is_empty() {
        out.stderr.clone()
    } else {
        format!("{}\n{}", out.stdout, out.stderr)
    }
}
