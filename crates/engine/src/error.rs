// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the engine.
//!
//! `Conflict` and `TestFailure` are deliberately absent: merge-time
//! outcomes are data on [`crate::train::MergeOutcome`], not errors.

use mc_adapters::{GitError, NotifyError, PrError, SessionError};
use mc_core::PlanFileError;
use mc_storage::StoreError;
use thiserror::Error;

/// Errors surfaced by engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    /// Bad input; nothing was changed.
    #[error("{0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    /// The operation is not legal in the current state; nothing was changed.
    #[error("{0}")]
    PreconditionFailed(String),
    #[error("job '{job}' depends on unknown job '{dependency}'")]
    InvalidDependency { job: String, dependency: String },
    #[error("dependency cycle involving job '{0}'")]
    CyclicDependency(String),
    #[error("checkpoint mismatch: expected {expected}, plan is at {actual}")]
    CheckpointMismatch { expected: String, actual: String },
    /// A collaborator (git, tmux, notifier, PR opener) failed; the
    /// underlying stderr/message is preserved.
    #[error("{0}")]
    Adapter(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    /// Whether this is a user-input error (CLI exit code 2 instead of 1).
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            EngineError::Validation(_)
                | EngineError::InvalidDependency { .. }
                | EngineError::CyclicDependency(_)
        )
    }
}

impl From<GitError> for EngineError {
    fn from(e: GitError) -> Self {
        EngineError::Adapter(e.to_string())
    }
}

impl From<SessionError> for EngineError {
    fn from(e: SessionError) -> Self {
        EngineError::Adapter(e.to_string())
    }
}

impl From<NotifyError> for EngineError {
    fn from(e: NotifyError) -> Self {
        EngineError::Adapter(e.to_string())
    }
}

impl From<PrError> for EngineError {
    fn from(e: PrError) -> Self {
        EngineError::Adapter(e.to_string())
    }
}

impl From<PlanFileError> for EngineError {
    fn from(e: PlanFileError) -> Self {
        EngineError::Validation(e.to_string())
    }
}
