// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The state store: two versioned JSON documents per project.
//!
//! `plan.json` holds the active plan (or null); `jobs.json` holds every
//! launched job record. Saves are crash-atomic: write to `<file>.tmp` in
//! the same directory, fsync, rename into place. Loads validate the
//! schema and run migrations when the on-disk version is older than
//! [`CURRENT_STATE_VERSION`], writing the upgraded document back.
//!
//! The store itself takes no locks. Callers that read-modify-write must
//! hold the process serialization lock for the whole cycle; another
//! process may still interleave between load and save, which readers
//! tolerate as a one-tick staleness window.

use crate::migration::MigrationRegistry;
use chrono::{DateTime, Utc};
use mc_core::{Job, JobId, JobReport, JobStatus, Plan, PlanId};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Version stamped into every persisted document.
pub const CURRENT_STATE_VERSION: u32 = 2;

/// Errors from state-store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{}: schema validation failed: {reason}", file.display())]
    Schema { file: PathBuf, reason: String },
    #[error("{}: {source}", file.display())]
    Migration {
        file: PathBuf,
        source: crate::migration::MigrationError,
    },
    #[error("no active plan")]
    PlanNotFound,
    #[error("plan {0} is not the active plan")]
    PlanMismatch(PlanId),
    #[error("job not found: {0}")]
    JobNotFound(String),
}

/// On-disk shape of `plan.json`.
#[derive(Debug, Serialize, Deserialize)]
struct PlanDoc {
    version: u32,
    plan: Option<Plan>,
}

/// On-disk shape of `jobs.json`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobsDoc {
    version: u32,
    updated_at: DateTime<Utc>,
    jobs: Vec<Job>,
}

/// Persistence for one project's plan and jobs.
#[derive(Debug, Clone)]
pub struct StateStore {
    state_dir: PathBuf,
    reports_dir: PathBuf,
}

impl StateStore {
    /// Create a store rooted at `<data_dir>/<project_id>/`.
    pub fn new(data_dir: &Path, project_id: &str) -> Self {
        let project_dir = data_dir.join(project_id);
        Self {
            state_dir: project_dir.join("state"),
            reports_dir: project_dir.join("reports"),
        }
    }

    /// Store for a project under the default data directory.
    pub fn for_project(project_id: &str) -> Self {
        Self::new(&crate::paths::data_dir(), project_id)
    }

    fn plan_path(&self) -> PathBuf {
        self.state_dir.join("plan.json")
    }

    fn jobs_path(&self) -> PathBuf {
        self.state_dir.join("jobs.json")
    }

    /// Directory agents drop progress reports into.
    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    // -- plan --

    /// Load the active plan, if any.
    pub fn load_plan(&self) -> Result<Option<Plan>, StoreError> {
        let path = self.plan_path();
        let Some(doc) = self.load_doc(&path, MigrationRegistry::for_plan())? else {
            return Ok(None);
        };
        let doc: PlanDoc = parse_doc(&path, doc)?;
        Ok(doc.plan)
    }

    /// Persist the plan, replacing any previous one.
    pub fn save_plan(&self, plan: &Plan) -> Result<(), StoreError> {
        let doc = PlanDoc {
            version: CURRENT_STATE_VERSION,
            plan: Some(plan.clone()),
        };
        self.write_doc(&self.plan_path(), &doc)
    }

    /// Read-modify-write the active plan under the caller's lock.
    pub fn update_plan<T>(
        &self,
        f: impl FnOnce(&mut Plan) -> T,
    ) -> Result<T, StoreError> {
        let mut plan = self.load_plan()?.ok_or(StoreError::PlanNotFound)?;
        let out = f(&mut plan);
        self.save_plan(&plan)?;
        Ok(out)
    }

    /// Read-modify-write one job spec of the active plan.
    pub fn update_job_spec<T>(
        &self,
        plan_id: &PlanId,
        name: &str,
        f: impl FnOnce(&mut mc_core::JobSpec) -> T,
    ) -> Result<T, StoreError> {
        let mut plan = self.load_plan()?.ok_or(StoreError::PlanNotFound)?;
        if plan.id != *plan_id {
            return Err(StoreError::PlanMismatch(plan_id.clone()));
        }
        let spec = plan
            .job_mut(name)
            .ok_or_else(|| StoreError::JobNotFound(name.to_string()))?;
        let out = f(spec);
        self.save_plan(&plan)?;
        Ok(out)
    }

    /// Remove the persisted plan.
    pub fn clear_plan(&self) -> Result<(), StoreError> {
        let doc = PlanDoc {
            version: CURRENT_STATE_VERSION,
            plan: None,
        };
        self.write_doc(&self.plan_path(), &doc)
    }

    // -- jobs --

    /// Load every launched job record.
    pub fn load_jobs(&self) -> Result<Vec<Job>, StoreError> {
        let path = self.jobs_path();
        let Some(doc) = self.load_doc(&path, MigrationRegistry::for_jobs())? else {
            return Ok(Vec::new());
        };
        let doc: JobsDoc = parse_doc(&path, doc)?;
        Ok(doc.jobs)
    }

    /// Persist a new job record.
    pub fn add_job(&self, job: Job) -> Result<(), StoreError> {
        let mut jobs = self.load_jobs()?;
        jobs.push(job);
        self.save_jobs(jobs)
    }

    /// Read-modify-write one job record.
    pub fn update_job<T>(
        &self,
        id: &JobId,
        f: impl FnOnce(&mut Job) -> T,
    ) -> Result<T, StoreError> {
        let mut jobs = self.load_jobs()?;
        let job = jobs
            .iter_mut()
            .find(|j| j.id == *id)
            .ok_or_else(|| StoreError::JobNotFound(id.to_string()))?;
        let out = f(job);
        self.save_jobs(jobs)?;
        Ok(out)
    }

    /// Remove a job record. Returns whether it existed.
    pub fn remove_job(&self, id: &JobId) -> Result<bool, StoreError> {
        let mut jobs = self.load_jobs()?;
        let before = jobs.len();
        jobs.retain(|j| j.id != *id);
        let removed = jobs.len() != before;
        if removed {
            self.save_jobs(jobs)?;
        }
        Ok(removed)
    }

    /// Find a job by exact name.
    pub fn find_job(&self, name: &str) -> Result<Option<Job>, StoreError> {
        Ok(self.load_jobs()?.into_iter().find(|j| j.name == name))
    }

    /// Jobs currently in `running`.
    pub fn running_jobs(&self) -> Result<Vec<Job>, StoreError> {
        Ok(self
            .load_jobs()?
            .into_iter()
            .filter(|j| j.status == JobStatus::Running)
            .collect())
    }

    fn save_jobs(&self, jobs: Vec<Job>) -> Result<(), StoreError> {
        let doc = JobsDoc {
            version: CURRENT_STATE_VERSION,
            updated_at: Utc::now(),
            jobs,
        };
        self.write_doc(&self.jobs_path(), &doc)
    }

    // -- reports --

    /// Write an agent progress report atomically.
    pub fn write_report(&self, report: &JobReport) -> Result<(), StoreError> {
        let path = self.reports_dir.join(format!("{}.json", report.job_id));
        self.write_doc(&path, report)
    }

    /// Read one job's report, if present.
    pub fn read_report(&self, job_id: &JobId) -> Result<Option<JobReport>, StoreError> {
        let path = self.reports_dir.join(format!("{}.json", job_id));
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        match serde_json::from_str(&content) {
            Ok(report) => Ok(Some(report)),
            Err(e) => Err(StoreError::Schema {
                file: path,
                reason: e.to_string(),
            }),
        }
    }

    /// All readable reports. Writers may leave `.tmp` siblings and
    /// malformed files behind; both are skipped.
    pub fn list_reports(&self) -> Result<Vec<JobReport>, StoreError> {
        let mut reports = Vec::new();
        let entries = match fs::read_dir(&self.reports_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(reports),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let content = fs::read_to_string(&path)?;
            match serde_json::from_str::<JobReport>(&content) {
                Ok(report) => reports.push(report),
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "skipping unreadable report");
                }
            }
        }
        reports.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(reports)
    }

    // -- document I/O --

    /// Load and migrate a document, writing the upgraded form back.
    fn load_doc(
        &self,
        path: &Path,
        registry: MigrationRegistry,
    ) -> Result<Option<serde_json::Value>, StoreError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        let value: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| StoreError::Schema {
                file: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let version = value.get("version").and_then(|v| v.as_u64()).unwrap_or(1) as u32;
        if version == CURRENT_STATE_VERSION {
            return Ok(Some(value));
        }

        let migrated = registry
            .migrate_to(value, CURRENT_STATE_VERSION)
            .map_err(|e| StoreError::Migration {
                file: path.to_path_buf(),
                source: e,
            })?;
        // Upgrade in place so the next load skips migration.
        self.write_doc(path, &migrated)?;
        Ok(Some(migrated))
    }

    /// Write a document atomically: tmp file, fsync, rename.
    fn write_doc<T: Serialize>(&self, path: &Path, doc: &T) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = path.with_extension("tmp");
        {
            let mut file = File::create(&tmp_path)?;
            let bytes = serde_json::to_vec_pretty(doc).map_err(|e| StoreError::Schema {
                file: path.to_path_buf(),
                reason: e.to_string(),
            })?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

/// Parse a migrated document into its typed form, naming the file on error.
fn parse_doc<T: serde::de::DeserializeOwned>(
    path: &Path,
    value: serde_json::Value,
) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|e| StoreError::Schema {
        file: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
