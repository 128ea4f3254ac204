// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State-file migration system for schema evolution.
//!
//! Migrations transform a persisted JSON document from one version to the
//! next; the registry chains them to reach the current version. Migrating
//! a document already at the target version is a no-op, which makes the
//! whole pipeline idempotent.

use serde_json::Value;
use thiserror::Error;

/// Errors that can occur during migration
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("migration v{from}→v{to} failed: {reason}")]
    Failed { from: u32, to: u32, reason: String },
    #[error("no migration path from v{0} to v{1}")]
    NoPath(u32, u32),
    #[error("state version {0} is newer than supported ({1})")]
    TooNew(u32, u32),
}

/// A migration from one state-file version to the next.
pub trait Migration: Send + Sync {
    fn source_version(&self) -> u32;
    fn target_version(&self) -> u32;
    fn migrate(&self, doc: &mut Value) -> Result<(), MigrationError>;
}

/// Registry of migrations for upgrading persisted documents.
pub struct MigrationRegistry {
    migrations: Vec<Box<dyn Migration>>,
}

impl MigrationRegistry {
    /// Registry for `jobs.json` documents.
    pub fn for_jobs() -> Self {
        Self {
            migrations: vec![Box::new(JobsAddPlanId)],
        }
    }

    /// Registry for `plan.json` documents.
    ///
    /// Version 1 plan documents have the current shape; only the version
    /// stamp advances.
    pub fn for_plan() -> Self {
        Self {
            migrations: vec![Box::new(PlanVersionBump)],
        }
    }

    /// Migrate a document to the target version.
    pub fn migrate_to(&self, mut doc: Value, target: u32) -> Result<Value, MigrationError> {
        let current = doc.get("version").and_then(|v| v.as_u64()).unwrap_or(1) as u32;

        if current == target {
            return Ok(doc);
        }
        if current > target {
            return Err(MigrationError::TooNew(current, target));
        }

        let mut version = current;
        while version < target {
            let migration = self
                .migrations
                .iter()
                .find(|m| m.source_version() == version)
                .ok_or(MigrationError::NoPath(version, target))?;

            migration.migrate(&mut doc)?;
            version = migration.target_version();

            if let Some(obj) = doc.as_object_mut() {
                obj.insert("version".into(), version.into());
            }
        }
        Ok(doc)
    }
}

/// v1 → v2: job records gain `planId: null` when absent.
struct JobsAddPlanId;

impl Migration for JobsAddPlanId {
    fn source_version(&self) -> u32 {
        1
    }

    fn target_version(&self) -> u32 {
        2
    }

    fn migrate(&self, doc: &mut Value) -> Result<(), MigrationError> {
        let jobs = doc
            .get_mut("jobs")
            .and_then(|j| j.as_array_mut())
            .ok_or_else(|| MigrationError::Failed {
                from: 1,
                to: 2,
                reason: "jobs.json has no 'jobs' array".into(),
            })?;

        for job in jobs {
            if let Some(obj) = job.as_object_mut() {
                obj.entry("planId").or_insert(Value::Null);
            }
        }
        Ok(())
    }
}

/// v1 → v2: plan documents only advance the version stamp.
struct PlanVersionBump;

impl Migration for PlanVersionBump {
    fn source_version(&self) -> u32 {
        1
    }

    fn target_version(&self) -> u32 {
        2
    }

    fn migrate(&self, _doc: &mut Value) -> Result<(), MigrationError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "migration_tests.rs"]
mod tests;
