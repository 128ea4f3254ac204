// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Data-directory and project-identity resolution.
//!
//! Project identity is derived from the git common directory (the `.git`
//! shared across linked worktrees) so every worktree of a repository maps
//! to the same state directory. The fallback is the current directory's
//! basename.

use std::path::{Path, PathBuf};

/// Root directory for all persisted state.
///
/// `MISSION_DATA_DIR` overrides; otherwise an XDG-style state location.
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("MISSION_DATA_DIR") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mission-control")
}

/// Restrict a project id to filesystem-safe characters.
pub fn sanitize_project_id(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "project".to_string()
    } else {
        cleaned
    }
}

/// Derive the project id from a git directory path.
///
/// Accepts either the common dir (`<root>/.git`) or a linked worktree's
/// git dir (`<root>/.git/worktrees/<name>`) and yields the repository
/// root's basename. Returns `None` when the path has no usable basename.
pub fn project_id_from_git_dir(git_dir: &Path) -> Option<String> {
    let mut path = git_dir.to_path_buf();

    // <root>/.git/worktrees/<name> → <root>/.git
    if path
        .parent()
        .and_then(|p| p.file_name())
        .is_some_and(|n| n == "worktrees")
    {
        path = path.parent()?.parent()?.to_path_buf();
    }

    // <root>/.git → <root>
    if path.file_name().is_some_and(|n| n == ".git") {
        path = path.parent()?.to_path_buf();
    }

    let name = path.file_name()?.to_string_lossy();
    Some(sanitize_project_id(&name))
}

/// Fallback project id: the directory's own basename.
pub fn project_id_from_cwd(cwd: &Path) -> String {
    cwd.file_name()
        .map(|n| sanitize_project_id(&n.to_string_lossy()))
        .unwrap_or_else(|| "project".to_string())
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
