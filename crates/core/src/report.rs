// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured progress reports written by agents.
//!
//! Agents drop a JSON file per job under the project's `reports/`
//! directory. Readers tolerate unknown fields so newer agents can add
//! data without breaking older readers.

use crate::job::JobId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Self-reported state of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Working,
    Blocked,
    NeedsReview,
    Completed,
    Progress,
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportStatus::Working => write!(f, "working"),
            ReportStatus::Blocked => write!(f, "blocked"),
            ReportStatus::NeedsReview => write!(f, "needs_review"),
            ReportStatus::Completed => write!(f, "completed"),
            ReportStatus::Progress => write!(f, "progress"),
        }
    }
}

/// One progress report from a job's agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    pub job_id: JobId,
    pub job_name: String,
    pub status: ReportStatus,
    #[serde(default)]
    pub message: String,
    /// Percentage 0..=100 when status is `progress`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
