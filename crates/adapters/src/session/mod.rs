// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal session adapters.
//!
//! An agent runs inside a tmux target: either a dedicated detached
//! session or a window in the caller's outer session. Targets are opaque
//! strings; every spawn tags its target with the owning job id so a later
//! process can find and clean it up.

mod tmux;

pub use tmux::TmuxAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeSession, FakeSessionAdapter, SessionCall};

use async_trait::async_trait;
use mc_core::Placement;
use thiserror::Error;

/// Errors from session operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("target not found: {0}")]
    NotFound(String),
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("command failed: {0}")]
    CommandFailed(String),
    #[error("window placement requires an outer tmux session")]
    NoOuterSession,
}

/// What to launch and where.
#[derive(Debug, Clone)]
pub struct SpawnSpec {
    /// Job name; the target name derives from it.
    pub name: String,
    pub placement: Placement,
    pub cwd: std::path::PathBuf,
    pub command: String,
    pub env: Vec<(String, String)>,
    /// Owning job id, stamped onto the target for cross-process cleanup.
    pub job_id: String,
}

/// Adapter for managing terminal targets (tmux sessions and windows).
#[async_trait]
pub trait SessionAdapter: Clone + Send + Sync + 'static {
    /// Spawn an agent, returning its terminal target.
    async fn spawn(&self, spec: &SpawnSpec) -> Result<String, SessionError>;

    /// Kill a target. Killing an already-dead target is not an error.
    async fn kill(&self, target: &str) -> Result<(), SessionError>;

    /// Check whether a target still exists.
    ///
    /// Returns `Ok(false)` only when the underlying error clearly means
    /// "no such target"; anything else propagates so callers can retry.
    async fn is_alive(&self, target: &str) -> Result<bool, SessionError>;

    /// Exit code of the target's pane process.
    ///
    /// `None` while the process is still running.
    async fn exit_code(&self, target: &str) -> Result<Option<i32>, SessionError>;

    /// Capture the last `lines` of pane output.
    async fn capture_output(&self, target: &str, lines: u32) -> Result<String, SessionError>;

    /// Send literal text to the target, followed by Enter.
    async fn send(&self, target: &str, input: &str) -> Result<(), SessionError>;

    /// All live targets tagged with the given job id.
    async fn find_tagged(&self, job_id: &str) -> Result<Vec<String>, SessionError>;
}
