// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mc-storage: Versioned, atomic persistence for plan and job state.
//!
//! Each project gets two JSON documents under
//! `<data-dir>/<project-id>/state/`: `plan.json` (the active plan, or
//! null) and `jobs.json` (all launched job records). Every write goes to
//! a sibling `.tmp` file and is renamed into place, so a crash can never
//! leave a half-written document. Cross-process writers interleave between
//! a load and a save; in-process callers serialize read-modify-write
//! cycles through the engine's lock, and readers tolerate the brief
//! staleness window another process can introduce.

pub mod migration;
pub mod paths;
pub mod state;

pub use migration::{Migration, MigrationError, MigrationRegistry};
pub use paths::{data_dir, project_id_from_git_dir, sanitize_project_id};
pub use state::{StateStore, StoreError, CURRENT_STATE_VERSION};
