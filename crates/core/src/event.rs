// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker lifecycle events.
//!
//! The worker supervisor pushes these over a channel; the reconciler
//! consumes them inline, in arrival order. There is no fan-out.

use crate::job::JobId;
use serde::{Deserialize, Serialize};

/// A worker lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkerEvent {
    /// The agent's pane came up.
    Started { job_id: JobId },
    /// The pane died with exit code 0.
    Completed { job_id: JobId, exit_code: i32 },
    /// The pane died with a non-zero exit code, or the supervisor hit an
    /// unrecoverable error while probing it.
    Failed {
        job_id: JobId,
        exit_code: Option<i32>,
        reason: String,
    },
}

impl WorkerEvent {
    pub fn job_id(&self) -> &JobId {
        match self {
            WorkerEvent::Started { job_id }
            | WorkerEvent::Completed { job_id, .. }
            | WorkerEvent::Failed { job_id, .. } => job_id,
        }
    }
}
