// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake session adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{SessionAdapter, SessionError, SpawnSpec};
use async_trait::async_trait;
use mc_core::Placement;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Recorded session call
#[derive(Debug, Clone)]
pub enum SessionCall {
    Spawn {
        name: String,
        placement: Placement,
        cwd: PathBuf,
        command: String,
        job_id: String,
    },
    Kill {
        target: String,
    },
    IsAlive {
        target: String,
    },
    ExitCode {
        target: String,
    },
    CaptureOutput {
        target: String,
        lines: u32,
    },
    Send {
        target: String,
        input: String,
    },
}

/// Fake session state
#[derive(Debug, Clone)]
pub struct FakeSession {
    pub name: String,
    pub cwd: PathBuf,
    pub command: String,
    pub job_id: String,
    pub output: Vec<String>,
    pub alive: bool,
    pub exit_code: Option<i32>,
}

#[derive(Default)]
struct FakeSessionState {
    sessions: HashMap<String, FakeSession>,
    calls: Vec<SessionCall>,
    /// Scripted probe failures: `is_alive` errors this many times before
    /// behaving normally. Exercises the retry-once policy.
    alive_errors: HashMap<String, (u32, String)>,
    reject_window: bool,
}

/// Fake session adapter for testing
#[derive(Clone, Default)]
pub struct FakeSessionAdapter {
    inner: Arc<Mutex<FakeSessionState>>,
}

impl FakeSessionAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<SessionCall> {
        self.inner.lock().calls.clone()
    }

    /// Get a session by target
    pub fn get_session(&self, target: &str) -> Option<FakeSession> {
        self.inner.lock().sessions.get(target).cloned()
    }

    /// Mark a session's process as exited with the given code.
    pub fn set_exited(&self, target: &str, exit_code: i32) {
        if let Some(session) = self.inner.lock().sessions.get_mut(target) {
            session.exit_code = Some(exit_code);
        }
    }

    /// Kill the whole target (pane gone, not just process dead).
    pub fn set_dead(&self, target: &str) {
        if let Some(session) = self.inner.lock().sessions.get_mut(target) {
            session.alive = false;
        }
    }

    /// Set pane output for capture tests.
    pub fn set_output(&self, target: &str, output: Vec<String>) {
        if let Some(session) = self.inner.lock().sessions.get_mut(target) {
            session.output = output;
        }
    }

    /// Script the next `times` liveness probes of `target` to fail.
    pub fn set_alive_errors(&self, target: &str, times: u32, message: &str) {
        self.inner
            .lock()
            .alive_errors
            .insert(target.to_string(), (times, message.to_string()));
    }

    /// Remove a target entirely, as if tmux lost it.
    pub fn remove_target(&self, target: &str) {
        self.inner.lock().sessions.remove(target);
    }

    /// Make window placement fail as if no outer session exists.
    pub fn set_reject_window(&self, reject: bool) {
        self.inner.lock().reject_window = reject;
    }

    /// Add a pre-existing target (for recovery tests).
    pub fn add_target(&self, target: &str, job_id: &str, alive: bool) {
        self.inner.lock().sessions.insert(
            target.to_string(),
            FakeSession {
                name: target.to_string(),
                cwd: PathBuf::new(),
                command: String::new(),
                job_id: job_id.to_string(),
                output: Vec::new(),
                alive,
                exit_code: None,
            },
        );
    }
}

#[async_trait]
impl SessionAdapter for FakeSessionAdapter {
    async fn spawn(&self, spec: &SpawnSpec) -> Result<String, SessionError> {
        let mut inner = self.inner.lock();

        if spec.placement == Placement::Window && inner.reject_window {
            return Err(SessionError::NoOuterSession);
        }

        inner.calls.push(SessionCall::Spawn {
            name: spec.name.clone(),
            placement: spec.placement,
            cwd: spec.cwd.clone(),
            command: spec.command.clone(),
            job_id: spec.job_id.clone(),
        });

        let target = match spec.placement {
            Placement::Session => format!("mc-{}", spec.name),
            Placement::Window => format!("outer:{}", inner.sessions.len() + 1),
        };

        inner.sessions.insert(
            target.clone(),
            FakeSession {
                name: spec.name.clone(),
                cwd: spec.cwd.clone(),
                command: spec.command.clone(),
                job_id: spec.job_id.clone(),
                output: Vec::new(),
                alive: true,
                exit_code: None,
            },
        );

        Ok(target)
    }

    async fn kill(&self, target: &str) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SessionCall::Kill {
            target: target.to_string(),
        });
        if let Some(session) = inner.sessions.get_mut(target) {
            session.alive = false;
        }
        Ok(())
    }

    async fn is_alive(&self, target: &str) -> Result<bool, SessionError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SessionCall::IsAlive {
            target: target.to_string(),
        });
        if let Some((remaining, message)) = inner.alive_errors.get_mut(target) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(SessionError::CommandFailed(message.clone()));
            }
        }
        Ok(inner.sessions.get(target).map(|s| s.alive).unwrap_or(false))
    }

    async fn exit_code(&self, target: &str) -> Result<Option<i32>, SessionError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SessionCall::ExitCode {
            target: target.to_string(),
        });
        match inner.sessions.get(target) {
            Some(session) => Ok(session.exit_code),
            None => Err(SessionError::NotFound(target.to_string())),
        }
    }

    async fn capture_output(&self, target: &str, lines: u32) -> Result<String, SessionError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SessionCall::CaptureOutput {
            target: target.to_string(),
            lines,
        });
        match inner.sessions.get(target) {
            Some(session) => {
                let start = session.output.len().saturating_sub(lines as usize);
                Ok(session.output[start..].join("\n"))
            }
            None => Err(SessionError::NotFound(target.to_string())),
        }
    }

    async fn send(&self, target: &str, input: &str) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        inner.calls.push(SessionCall::Send {
            target: target.to_string(),
            input: input.to_string(),
        });
        if !inner.sessions.contains_key(target) {
            return Err(SessionError::NotFound(target.to_string()));
        }
        Ok(())
    }

    async fn find_tagged(&self, job_id: &str) -> Result<Vec<String>, SessionError> {
        let inner = self.inner.lock();
        let mut targets: Vec<String> = inner
            .sessions
            .iter()
            .filter(|(_, s)| s.job_id == job_id && s.alive)
            .map(|(t, _)| t.clone())
            .collect();
        targets.sort();
        Ok(targets)
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
