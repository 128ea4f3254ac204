// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shell command runner for merge-train setup and test commands.

use crate::subprocess::{run_with_timeout, TEST_COMMAND_TIMEOUT};
use async_trait::async_trait;
#[cfg(any(test, feature = "test-support"))]
use parking_lot::Mutex;
#[cfg(any(test, feature = "test-support"))]
use std::collections::HashMap;
use std::path::Path;
#[cfg(any(test, feature = "test-support"))]
use std::path::PathBuf;
#[cfg(any(test, feature = "test-support"))]
use std::sync::Arc;
use tokio::process::Command;

/// Captured result of one shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Stdout and stderr interleaved for operator display.
    pub fn combined(&self) -> String {
        if self.stderr.trim().is_empty() {
            self.stdout.clone()
        } else if self.stdout.trim().is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Runs shell commands in a working directory.
#[async_trait]
pub trait ShellRunner: Clone + Send + Sync + 'static {
    async fn run(&self, command: &str, cwd: &Path) -> Result<CommandOutput, String>;
}

/// Production runner: `sh -c` with a generous timeout.
#[derive(Clone, Copy, Default)]
pub struct ShRunner;

impl ShRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ShellRunner for ShRunner {
    async fn run(&self, command: &str, cwd: &Path) -> Result<CommandOutput, String> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command).current_dir(cwd);
        let output = run_with_timeout(cmd, TEST_COMMAND_TIMEOUT, "shell command").await?;
        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Fake runner with scripted results, for tests.
#[cfg(any(test, feature = "test-support"))]
#[derive(Clone, Default)]
pub struct FakeShellRunner {
    inner: Arc<Mutex<FakeShellState>>,
}

#[cfg(any(test, feature = "test-support"))]
#[derive(Default)]
struct FakeShellState {
    results: HashMap<String, CommandOutput>,
    runs: Vec<(String, PathBuf)>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeShellRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a command's result; unscripted commands succeed silently.
    pub fn set_result(&self, command: &str, exit_code: i32, output: &str) {
        self.inner.lock().results.insert(
            command.to_string(),
            CommandOutput {
                exit_code,
                stdout: output.to_string(),
                stderr: String::new(),
            },
        );
    }

    /// Commands run so far, with their working directories.
    pub fn runs(&self) -> Vec<(String, PathBuf)> {
        self.inner.lock().runs.clone()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl ShellRunner for FakeShellRunner {
    async fn run(&self, command: &str, cwd: &Path) -> Result<CommandOutput, String> {
        let mut state = self.inner.lock();
        state.runs.push((command.to_string(), cwd.to_path_buf()));
        Ok(state.results.get(command).cloned().unwrap_or(CommandOutput {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
        }))
    }
}

#[cfg(test)]
#[path = "shell_tests.rs"]
mod tests;
