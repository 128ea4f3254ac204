// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checkpoint decisions.
//!
//! A thin guard the reconciler consults before each sensitive step. The
//! mode decides whether the plan pauses, continues, or fails:
//!
//! | mode       | pre_merge | pre_pr | on_error |
//! |------------|-----------|--------|----------|
//! | autopilot  | continue  | continue | fail plan |
//! | copilot    | continue  | continue | pause |
//! | supervisor | pause     | pause  | pause |
//!
//! Copilot's single pause lives elsewhere: the plan is born `pending`
//! and the first approval flips it to `running`.

use crate::error::EngineError;
use mc_core::{Checkpoint, Plan, PlanMode, PlanStatus};

/// What the reconciler does when it reaches a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointDecision {
    Pause,
    Continue,
    FailPlan,
}

/// Decide how a mode treats a checkpoint.
pub fn decide(mode: PlanMode, point: Checkpoint) -> CheckpointDecision {
    match (mode, point) {
        (PlanMode::Supervisor, _) => CheckpointDecision::Pause,
        (PlanMode::Copilot, Checkpoint::OnError) => CheckpointDecision::Pause,
        (PlanMode::Copilot, _) => CheckpointDecision::Continue,
        (PlanMode::Autopilot, Checkpoint::OnError) => CheckpointDecision::FailPlan,
        (PlanMode::Autopilot, _) => CheckpointDecision::Continue,
    }
}

/// Verify and clear the plan's checkpoint.
///
/// `expected`, when given, must match the current checkpoint; a stale
/// approval (wrong or absent checkpoint) fails with `CheckpointMismatch`
/// and changes nothing.
pub fn clear_checkpoint(
    plan: &mut Plan,
    expected: Option<Checkpoint>,
) -> Result<Checkpoint, EngineError> {
    let current = plan.checkpoint.ok_or(EngineError::CheckpointMismatch {
        expected: expected.map(|c| c.to_string()).unwrap_or_else(|| "any".into()),
        actual: "none".into(),
    })?;
    if let Some(expected) = expected {
        if expected != current {
            return Err(EngineError::CheckpointMismatch {
                expected: expected.to_string(),
                actual: current.to_string(),
            });
        }
    }
    plan.clear_checkpoint();
    debug_assert_eq!(plan.status, PlanStatus::Running);
    Ok(current)
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
