// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pull-request opener contract.
//!
//! Authenticating against a code host and transporting PR payloads are
//! outside this system; the engine only needs a URL to record. The
//! production implementation derives a compare URL from the `origin`
//! remote so the operator lands on the host's "open a pull request" page.

use async_trait::async_trait;
#[cfg(any(test, feature = "test-support"))]
use parking_lot::Mutex;
#[cfg(any(test, feature = "test-support"))]
use std::sync::Arc;
use thiserror::Error;

/// Errors from PR operations
#[derive(Debug, Error)]
pub enum PrError {
    #[error("no git remote configured; push the repository first")]
    NoRemote,
    #[error("unsupported remote url: {0}")]
    UnsupportedRemote(String),
}

/// What to open a pull request for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrRequest {
    /// Head branch (the integration branch).
    pub branch: String,
    /// Base branch (usually the default branch).
    pub base: String,
    pub title: String,
    pub body: String,
}

/// Adapter that turns a finished integration branch into a PR URL.
#[async_trait]
pub trait PrAdapter: Clone + Send + Sync + 'static {
    async fn open_pr(&self, request: &PrRequest) -> Result<String, PrError>;
}

/// Derives a host compare URL from the `origin` remote.
#[derive(Clone, Debug)]
pub struct CompareUrlPr {
    remote_url: Option<String>,
}

impl CompareUrlPr {
    pub fn new(remote_url: Option<String>) -> Self {
        Self { remote_url }
    }
}

/// Normalize a git remote to an `https://host/owner/repo` base.
///
/// Handles `git@host:owner/repo.git`, `ssh://git@host/owner/repo.git`,
/// and `https://host/owner/repo[.git]`.
fn https_base(remote: &str) -> Option<String> {
    let remote = remote.trim();
    let stripped = if let Some(rest) = remote.strip_prefix("git@") {
        let (host, path) = rest.split_once(':')?;
        format!("https://{}/{}", host, path)
    } else if let Some(rest) = remote.strip_prefix("ssh://git@") {
        format!("https://{}", rest)
    } else if remote.starts_with("https://") || remote.starts_with("http://") {
        remote.to_string()
    } else {
        return None;
    };
    Some(
        stripped
            .trim_end_matches('/')
            .trim_end_matches(".git")
            .to_string(),
    )
}

#[async_trait]
impl PrAdapter for CompareUrlPr {
    async fn open_pr(&self, request: &PrRequest) -> Result<String, PrError> {
        let remote = self.remote_url.as_deref().ok_or(PrError::NoRemote)?;
        let base = https_base(remote).ok_or_else(|| {
            PrError::UnsupportedRemote(remote.to_string())
        })?;
        Ok(format!(
            "{}/compare/{}...{}?expand=1",
            base, request.base, request.branch
        ))
    }
}

/// Fake PR adapter recording requests.
#[cfg(any(test, feature = "test-support"))]
#[derive(Clone, Default)]
pub struct FakePrAdapter {
    requests: Arc<Mutex<Vec<PrRequest>>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakePrAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<PrRequest> {
        self.requests.lock().clone()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl PrAdapter for FakePrAdapter {
    async fn open_pr(&self, request: &PrRequest) -> Result<String, PrError> {
        self.requests.lock().push(request.clone());
        Ok(format!("https://example.test/pr/{}", request.branch))
    }
}

#[cfg(test)]
#[path = "pr_tests.rs"]
mod tests;
