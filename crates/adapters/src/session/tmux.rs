// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tmux session adapter

use super::{SessionAdapter, SessionError, SpawnSpec};
use crate::subprocess::{run_with_timeout, TMUX_TIMEOUT};
use async_trait::async_trait;
use mc_core::Placement;
use tokio::process::Command;

/// Stderr fragments that mean "the target is gone" rather than a real
/// failure. Anything else from a liveness probe propagates.
const NOT_FOUND_PATTERNS: &[&str] = &[
    "can't find session",
    "can't find window",
    "can't find pane",
    "session not found",
    "no server running",
    "no current session",
];

fn is_not_found(stderr: &str) -> bool {
    NOT_FOUND_PATTERNS.iter().any(|p| stderr.contains(p))
}

/// Tmux-based session adapter
#[derive(Clone, Default)]
pub struct TmuxAdapter;

impl TmuxAdapter {
    pub fn new() -> Self {
        Self
    }

    async fn tmux(&self, args: &[&str]) -> Result<std::process::Output, SessionError> {
        let mut cmd = Command::new("tmux");
        cmd.args(args);
        run_with_timeout(cmd, TMUX_TIMEOUT, "tmux")
            .await
            .map_err(SessionError::CommandFailed)
    }

    /// Tag a target with its owning job id so `cleanup --all` can find
    /// targets created by other processes.
    async fn tag(&self, target: &str, window: bool, job_id: &str) -> Result<(), SessionError> {
        let mut args = vec!["set-option"];
        if window {
            args.push("-w");
        }
        args.extend(["-t", target, "@mc_job_id", job_id]);
        let output = self.tmux(&args).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(target, stderr = %stderr, "tagging target failed");
            // Non-fatal: the job still runs, only cross-process cleanup degrades.
        }
        Ok(())
    }

    async fn spawn_session(&self, spec: &SpawnSpec) -> Result<String, SessionError> {
        let target = format!("mc-{}", spec.name);

        // A stale session with the same name means a previous run left
        // debris behind; replace it.
        let existing = self.tmux(&["has-session", "-t", &target]).await;
        if existing.map(|o| o.status.success()).unwrap_or(false) {
            tracing::warn!(target, "target already exists, killing first");
            let _ = self.tmux(&["kill-session", "-t", &target]).await;
        }

        let cwd = spec.cwd.display().to_string();
        let mut args: Vec<String> = vec![
            "new-session".into(),
            "-d".into(),
            "-s".into(),
            target.clone(),
            "-c".into(),
            cwd,
        ];
        for (key, value) in &spec.env {
            args.push("-e".into());
            args.push(format!("{}={}", key, value));
        }
        args.push(spec.command.clone());

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = self.tmux(&arg_refs).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(target, stderr = %stderr, "tmux spawn failed");
            return Err(SessionError::SpawnFailed(stderr.to_string()));
        }

        // Keep the pane around after exit so the exit code is observable.
        let _ = self
            .tmux(&["set-option", "-t", &target, "remain-on-exit", "on"])
            .await;
        self.tag(&target, false, &spec.job_id).await?;
        Ok(target)
    }

    async fn spawn_window(&self, spec: &SpawnSpec) -> Result<String, SessionError> {
        if std::env::var("TMUX").is_err() {
            return Err(SessionError::NoOuterSession);
        }

        let cwd = spec.cwd.display().to_string();
        let name = format!("mc-{}", spec.name);
        let mut args: Vec<String> = vec![
            "new-window".into(),
            "-d".into(),
            "-P".into(),
            "-F".into(),
            "#{session_name}:#{window_index}".into(),
            "-n".into(),
            name,
            "-c".into(),
            cwd,
        ];
        for (key, value) in &spec.env {
            args.push("-e".into());
            args.push(format!("{}={}", key, value));
        }
        args.push(spec.command.clone());

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = self.tmux(&arg_refs).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SessionError::SpawnFailed(stderr.to_string()));
        }

        let target = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let _ = self
            .tmux(&["set-option", "-w", "-t", &target, "remain-on-exit", "on"])
            .await;
        self.tag(&target, true, &spec.job_id).await?;
        Ok(target)
    }
}

#[async_trait]
impl SessionAdapter for TmuxAdapter {
    async fn spawn(&self, spec: &SpawnSpec) -> Result<String, SessionError> {
        // Precondition: cwd must exist
        if !spec.cwd.exists() {
            return Err(SessionError::SpawnFailed(format!(
                "working directory does not exist: {}",
                spec.cwd.display()
            )));
        }
        match spec.placement {
            Placement::Session => self.spawn_session(spec).await,
            Placement::Window => self.spawn_window(spec).await,
        }
    }

    async fn kill(&self, target: &str) -> Result<(), SessionError> {
        // Windows have a ':' in their target; sessions don't.
        let args: &[&str] = if target.contains(':') {
            &["kill-window", "-t", target]
        } else {
            &["kill-session", "-t", target]
        };
        let output = self.tmux(args).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !is_not_found(&stderr) {
                return Err(SessionError::CommandFailed(stderr.to_string()));
            }
        }
        Ok(())
    }

    async fn is_alive(&self, target: &str) -> Result<bool, SessionError> {
        let args: &[&str] = if target.contains(':') {
            &["list-panes", "-t", target]
        } else {
            &["has-session", "-t", target]
        };
        let output = self.tmux(args).await?;
        if output.status.success() {
            return Ok(true);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if is_not_found(&stderr) {
            Ok(false)
        } else {
            Err(SessionError::CommandFailed(stderr.to_string()))
        }
    }

    async fn exit_code(&self, target: &str) -> Result<Option<i32>, SessionError> {
        let output = self
            .tmux(&[
                "display-message",
                "-t",
                target,
                "-p",
                "#{pane_dead_status}",
            ])
            .await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if is_not_found(&stderr) {
                return Err(SessionError::NotFound(target.to_string()));
            }
            return Err(SessionError::CommandFailed(stderr.to_string()));
        }

        let status_str = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if status_str.is_empty() {
            // Process is still running
            return Ok(None);
        }
        Ok(status_str.parse::<i32>().ok())
    }

    async fn capture_output(&self, target: &str, lines: u32) -> Result<String, SessionError> {
        let start = format!("-{}", lines);
        let output = self
            .tmux(&["capture-pane", "-t", target, "-p", "-S", &start])
            .await?;
        if !output.status.success() {
            return Err(SessionError::NotFound(target.to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn send(&self, target: &str, input: &str) -> Result<(), SessionError> {
        // -l = literal mode, -- = end of options (handles leading dashes)
        let output = self
            .tmux(&["send-keys", "-t", target, "-l", "--", input])
            .await?;
        if !output.status.success() {
            return Err(SessionError::NotFound(target.to_string()));
        }
        let output = self.tmux(&["send-keys", "-t", target, "Enter"]).await?;
        if !output.status.success() {
            return Err(SessionError::NotFound(target.to_string()));
        }
        Ok(())
    }

    async fn find_tagged(&self, job_id: &str) -> Result<Vec<String>, SessionError> {
        let mut targets = Vec::new();

        // Session-placed agents: the tag lives on the session.
        let output = self
            .tmux(&["list-sessions", "-F", "#{session_name}\t#{@mc_job_id}"])
            .await?;
        if output.status.success() {
            for line in String::from_utf8_lossy(&output.stdout).lines() {
                if let Some((name, tag)) = line.split_once('\t') {
                    if tag == job_id {
                        targets.push(name.to_string());
                    }
                }
            }
        }

        // Window-placed agents: the tag lives on the window.
        let output = self
            .tmux(&[
                "list-windows",
                "-a",
                "-F",
                "#{session_name}:#{window_index}\t#{@mc_job_id}",
            ])
            .await?;
        if output.status.success() {
            for line in String::from_utf8_lossy(&output.stdout).lines() {
                if let Some((target, tag)) = line.split_once('\t') {
                    if tag == job_id && !targets.contains(&target.to_string()) {
                        targets.push(target.to_string());
                    }
                }
            }
        }

        Ok(targets)
    }
}

#[cfg(test)]
#[path = "tmux_tests.rs"]
mod tests;
