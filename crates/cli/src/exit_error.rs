// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exit-code mapping for command failures.
//!
//! Exit 0 is success, 1 a generic failure, 2 a validation error (bad
//! arguments, unknown dependencies, cyclic plans).

use mc_engine::EngineError;
use mc_storage::StoreError;

/// A command failure carrying its process exit code.
#[derive(Debug)]
pub struct ExitError {
    pub message: String,
    pub code: u8,
}

impl ExitError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: 2,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: 1,
        }
    }
}

impl std::fmt::Display for ExitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}

impl From<EngineError> for ExitError {
    fn from(e: EngineError) -> Self {
        if e.is_validation() {
            Self::validation(e.to_string())
        } else {
            Self::failure(e.to_string())
        }
    }
}

impl From<StoreError> for ExitError {
    fn from(e: StoreError) -> Self {
        Self::failure(e.to_string())
    }
}

impl From<std::io::Error> for ExitError {
    fn from(e: std::io::Error) -> Self {
        Self::failure(e.to_string())
    }
}

pub type CliResult<T = ()> = Result<T, ExitError>;

#[cfg(test)]
#[path = "exit_error_tests.rs"]
mod tests;
