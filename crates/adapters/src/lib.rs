// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mc-adapters: External-world adapters for Mission Control.
//!
//! Each collaborator the engine talks to — git, tmux, desktop
//! notifications, the pull-request opener — is a small capability trait
//! with a production implementation and an in-memory fake. The engine is
//! generic over the traits; tests run entirely against the fakes.

pub mod git;
pub mod lock;
pub mod notify;
pub mod pr;
pub mod session;
pub mod shell;
pub mod subprocess;

pub use git::{
    parse_conflicts, sanitize_branch, AbortKind, AheadBehind, GitAdapter, GitCli, GitError,
    GitOutput, IntegrationInfo, MergeResult, PostCreate, RefreshOutcome, WorktreeInfo,
    WorktreeOptions,
};
pub use lock::SerialLock;
pub use notify::{DesktopNotifyAdapter, NoOpNotifyAdapter, NotifyAdapter, NotifyError, ToastVariant};
pub use pr::{CompareUrlPr, PrAdapter, PrError, PrRequest};
pub use session::{SessionAdapter, SessionError, SpawnSpec, TmuxAdapter};
pub use shell::{CommandOutput, ShRunner, ShellRunner};

#[cfg(any(test, feature = "test-support"))]
pub use git::{FakeGitAdapter, GitCall};
#[cfg(any(test, feature = "test-support"))]
pub use notify::{FakeNotifyAdapter, NotifyCall};
#[cfg(any(test, feature = "test-support"))]
pub use pr::FakePrAdapter;
#[cfg(any(test, feature = "test-support"))]
pub use session::{FakeSession, FakeSessionAdapter, SessionCall};
#[cfg(any(test, feature = "test-support"))]
pub use shell::FakeShellRunner;
