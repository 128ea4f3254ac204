// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan manifest parsing.
//!
//! Plans are declared in a TOML file:
//!
//! ```toml
//! [plan]
//! name = "auth-refactor"
//! mode = "supervisor"
//! max_parallel = 3
//!
//! [plan.test]
//! setup = ["npm ci"]
//! command = "npm test"
//!
//! [[job]]
//! name = "extract-session"
//! prompt = "Extract session handling into its own module"
//!
//! [[job]]
//! name = "rewrite-login"
//! prompt = "Rewrite login on top of the session module"
//! depends_on = ["extract-session"]
//! ```
//!
//! Parsing checks shape only; DAG validation (unknown or cyclic
//! dependencies) happens in the scheduler before the plan starts.

use crate::plan::{
    JobSpec, Plan, PlanId, PlanMode, PlanStatus, TestConfig, DEFAULT_MAX_PARALLEL,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

/// Errors from reading a plan manifest
#[derive(Debug, Error)]
pub enum PlanFileError {
    #[error("invalid plan file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid plan file: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
struct PlanSection {
    name: String,
    #[serde(default)]
    mode: Option<PlanMode>,
    #[serde(default)]
    max_parallel: Option<u32>,
    #[serde(default)]
    test: Option<TestSection>,
}

#[derive(Debug, Deserialize)]
struct TestSection {
    #[serde(default)]
    setup: Vec<String>,
    command: String,
}

#[derive(Debug, Deserialize)]
struct JobSection {
    name: String,
    prompt: String,
    #[serde(default)]
    depends_on: Vec<String>,
}

/// A parsed plan manifest, not yet bound to a repository.
#[derive(Debug, Deserialize)]
pub struct PlanManifest {
    plan: PlanSection,
    #[serde(default, rename = "job")]
    jobs: Vec<JobSection>,
}

impl PlanManifest {
    /// Parse a manifest from TOML text.
    pub fn parse(content: &str) -> Result<Self, PlanFileError> {
        let manifest: PlanManifest = toml::from_str(content)?;

        if manifest.jobs.is_empty() {
            return Err(PlanFileError::Invalid(
                "plan declares no jobs (expected at least one [[job]] table)".into(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for job in &manifest.jobs {
            if job.name.is_empty() {
                return Err(PlanFileError::Invalid("job.name must not be empty".into()));
            }
            if !seen.insert(job.name.as_str()) {
                return Err(PlanFileError::Invalid(format!(
                    "duplicate job name '{}'",
                    job.name
                )));
            }
        }
        Ok(manifest)
    }

    pub fn name(&self) -> &str {
        &self.plan.name
    }

    pub fn mode(&self) -> PlanMode {
        self.plan.mode.unwrap_or(PlanMode::Supervisor)
    }

    /// Bind the manifest to a plan id and base commit.
    ///
    /// Integration branch details are filled in when the plan starts.
    pub fn into_plan(self, id: PlanId, base_commit: String, created_at: DateTime<Utc>) -> Plan {
        let jobs = self
            .jobs
            .into_iter()
            .map(|j| JobSpec::new(j.name, j.prompt).with_depends_on(j.depends_on))
            .collect();

        Plan {
            integration_branch: format!("mc/integration-{}", id),
            id,
            name: self.plan.name,
            mode: self.plan.mode.unwrap_or(PlanMode::Supervisor),
            status: PlanStatus::Pending,
            checkpoint: None,
            checkpoint_context: HashMap::new(),
            jobs,
            integration_worktree_path: None,
            base_commit,
            max_parallel: self.plan.max_parallel.unwrap_or(DEFAULT_MAX_PARALLEL),
            test: self.plan.test.map(|t| TestConfig {
                setup: t.setup,
                command: t.command,
            }),
            pr_url: None,
            created_at,
            completed_at: None,
        }
    }
}

#[cfg(test)]
#[path = "planfile_tests.rs"]
mod tests;
