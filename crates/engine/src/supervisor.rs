// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker supervisor: launches agents and watches their panes.
//!
//! A worker is an agent process inside a tmux target. Launching spawns
//! the target and a monitor task that polls the pane; when the pane's
//! process dies the monitor pushes a [`WorkerEvent`] — exit 0 means
//! completed, anything else failed — and stops. Events flow over an mpsc
//! channel straight to the reconciler.

use crate::error::EngineError;
use mc_adapters::{SessionAdapter, SessionError, SpawnSpec};
use mc_core::{JobId, Placement, WorkerEvent};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// How long a launch may take end to end before it is failed and its
/// resources reclaimed.
pub const LAUNCH_BUDGET: Duration = Duration::from_secs(30);

/// Delay before the liveness probe's single retry.
const PROBE_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Everything needed to start one worker.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub job_id: JobId,
    pub name: String,
    pub prompt: String,
    pub placement: Placement,
    pub worktree_path: PathBuf,
}

/// Escape characters that have special meaning in shell double-quoted
/// strings, so a prompt embedded in `claude "${prompt}"` is taken
/// literally.
fn escape_for_shell_double_quotes(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '`' => result.push_str("\\`"),
            '$' => result.push_str("\\$"),
            '"' => result.push_str("\\\""),
            _ => result.push(c),
        }
    }
    result
}

/// Build the agent command line from the configured template.
///
/// A `${prompt}` placeholder is substituted in place; otherwise the
/// quoted prompt is appended as the final argument.
pub fn build_agent_command(template: &str, prompt: &str) -> String {
    let escaped = escape_for_shell_double_quotes(prompt);
    if template.contains("${prompt}") {
        template.replace("${prompt}", &escaped)
    } else {
        format!("{} \"{}\"", template, escaped)
    }
}

/// Launches workers and reports their lifecycle.
pub struct WorkerSupervisor<S> {
    sessions: S,
    events_tx: mpsc::Sender<WorkerEvent>,
    agent_command: String,
    poll_interval: Duration,
    launch_budget: Duration,
    probe_retry_delay: Duration,
}

impl<S> WorkerSupervisor<S>
where
    S: SessionAdapter,
{
    pub fn new(sessions: S, events_tx: mpsc::Sender<WorkerEvent>) -> Self {
        let agent_command =
            std::env::var("MISSION_AGENT_CMD").unwrap_or_else(|_| "claude".to_string());
        Self {
            sessions,
            events_tx,
            agent_command,
            poll_interval: Duration::from_secs(5),
            launch_budget: LAUNCH_BUDGET,
            probe_retry_delay: PROBE_RETRY_DELAY,
        }
    }

    pub fn with_agent_command(mut self, command: impl Into<String>) -> Self {
        self.agent_command = command.into();
        self
    }

    /// Shorten polling and retry delays (tests).
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self.probe_retry_delay = interval.min(self.probe_retry_delay);
        self
    }

    pub fn sessions(&self) -> &S {
        &self.sessions
    }

    /// Launch a worker and start monitoring it. Returns the terminal
    /// target.
    ///
    /// The whole launch runs under a time budget; on timeout the
    /// half-created target is killed before the error returns, so the
    /// caller only has the worktree left to reclaim.
    pub async fn launch(&self, spec: &LaunchSpec) -> Result<String, EngineError> {
        let command = build_agent_command(&self.agent_command, &spec.prompt);
        let spawn = SpawnSpec {
            name: spec.name.clone(),
            placement: spec.placement,
            cwd: spec.worktree_path.clone(),
            command,
            env: vec![
                ("MC_JOB_ID".to_string(), spec.job_id.to_string()),
                ("MC_JOB_NAME".to_string(), spec.name.clone()),
            ],
            job_id: spec.job_id.to_string(),
        };

        let target = match tokio::time::timeout(self.launch_budget, self.sessions.spawn(&spawn))
            .await
        {
            Ok(Ok(target)) => target,
            Ok(Err(e)) => return Err(e.into()),
            Err(_elapsed) => {
                // The spawn may have half-succeeded; reclaim the target
                // by its conventional name before giving up.
                let _ = self.sessions.kill(&format!("mc-{}", spec.name)).await;
                return Err(EngineError::Adapter(format!(
                    "agent launch for '{}' timed out after {}s",
                    spec.name,
                    self.launch_budget.as_secs()
                )));
            }
        };

        info!(job_id = %spec.job_id, target, "worker launched");
        let _ = self
            .events_tx
            .send(WorkerEvent::Started {
                job_id: spec.job_id.clone(),
            })
            .await;
        self.spawn_monitor(spec.job_id.clone(), target.clone());
        Ok(target)
    }

    pub async fn kill(&self, target: &str) -> Result<(), EngineError> {
        self.sessions.kill(target).await?;
        Ok(())
    }

    /// Liveness probe with the transient-retry policy: a probe error is
    /// retried once after a short delay; a second error propagates. The
    /// adapter itself only answers `false` for "not found"-class errors.
    pub async fn is_alive(&self, target: &str) -> Result<bool, EngineError> {
        match self.sessions.is_alive(target).await {
            Ok(alive) => Ok(alive),
            Err(first) => {
                warn!(target, error = %first, "liveness probe failed, retrying once");
                tokio::time::sleep(self.probe_retry_delay).await;
                match self.sessions.is_alive(target).await {
                    Ok(alive) => Ok(alive),
                    Err(_) => Err(EngineError::Adapter(format!(
                        "liveness probe for {} failed: {}",
                        target, first
                    ))),
                }
            }
        }
    }

    pub async fn exit_code(&self, target: &str) -> Result<Option<i32>, EngineError> {
        Ok(self.sessions.exit_code(target).await?)
    }

    /// Reattach monitoring to a worker that survived a process restart.
    pub fn monitor(&self, job_id: JobId, target: String) {
        self.spawn_monitor(job_id, target);
    }

    fn spawn_monitor(&self, job_id: JobId, target: String) {
        let sessions = self.sessions.clone();
        let events_tx = self.events_tx.clone();
        let poll_interval = self.poll_interval;
        let retry_delay = self.probe_retry_delay;

        tokio::spawn(async move {
            loop {
                tokio::time::sleep(poll_interval).await;
                match sessions.exit_code(&target).await {
                    Ok(None) => continue,
                    Ok(Some(0)) => {
                        let _ = events_tx
                            .send(WorkerEvent::Completed {
                                job_id: job_id.clone(),
                                exit_code: 0,
                            })
                            .await;
                        break;
                    }
                    Ok(Some(code)) => {
                        let _ = events_tx
                            .send(WorkerEvent::Failed {
                                job_id: job_id.clone(),
                                exit_code: Some(code),
                                reason: format!("agent exited with code {}", code),
                            })
                            .await;
                        break;
                    }
                    Err(SessionError::NotFound(_)) => {
                        let _ = events_tx
                            .send(WorkerEvent::Failed {
                                job_id: job_id.clone(),
                                exit_code: None,
                                reason: "terminal target disappeared".to_string(),
                            })
                            .await;
                        break;
                    }
                    Err(e) => {
                        // Possibly transient; fall back to the liveness
                        // probe before deciding.
                        warn!(target, error = %e, "exit-code probe failed");
                        tokio::time::sleep(retry_delay).await;
                        match sessions.is_alive(&target).await {
                            Ok(true) => continue,
                            Ok(false) => {
                                let _ = events_tx
                                    .send(WorkerEvent::Failed {
                                        job_id: job_id.clone(),
                                        exit_code: None,
                                        reason: "terminal target disappeared".to_string(),
                                    })
                                    .await;
                                break;
                            }
                            Err(e2) => {
                                warn!(target, error = %e2, "liveness probe failed, will re-poll");
                                continue;
                            }
                        }
                    }
                }
            }
        });
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
