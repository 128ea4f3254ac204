// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn v1_jobs_doc() -> Value {
    json!({
        "version": 1,
        "updatedAt": "2026-01-15T12:00:00Z",
        "jobs": [
            {"id": "job-1", "name": "a"},
            {"id": "job-2", "name": "b", "planId": "plan-9"},
        ],
    })
}

#[test]
fn jobs_v1_gain_null_plan_id() {
    let registry = MigrationRegistry::for_jobs();
    let migrated = registry.migrate_to(v1_jobs_doc(), 2).unwrap();

    assert_eq!(migrated["version"], 2);
    assert_eq!(migrated["jobs"][0]["planId"], Value::Null);
    // Existing planId is preserved, not clobbered
    assert_eq!(migrated["jobs"][1]["planId"], "plan-9");
}

#[test]
fn migration_is_idempotent() {
    let registry = MigrationRegistry::for_jobs();
    let once = registry.migrate_to(v1_jobs_doc(), 2).unwrap();
    let twice = registry.migrate_to(once.clone(), 2).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn missing_version_treated_as_v1() {
    let registry = MigrationRegistry::for_jobs();
    let doc = json!({"jobs": [{"id": "job-1"}]});
    let migrated = registry.migrate_to(doc, 2).unwrap();
    assert_eq!(migrated["version"], 2);
    assert_eq!(migrated["jobs"][0]["planId"], Value::Null);
}

#[test]
fn newer_version_is_rejected() {
    let registry = MigrationRegistry::for_jobs();
    let doc = json!({"version": 3, "jobs": []});
    let err = registry.migrate_to(doc, 2).unwrap_err();
    assert!(matches!(err, MigrationError::TooNew(3, 2)));
}

#[test]
fn jobs_doc_without_array_fails_descriptively() {
    let registry = MigrationRegistry::for_jobs();
    let doc = json!({"version": 1});
    let err = registry.migrate_to(doc, 2).unwrap_err();
    assert!(err.to_string().contains("no 'jobs' array"), "got: {err}");
}

#[test]
fn plan_v1_only_bumps_version() {
    let registry = MigrationRegistry::for_plan();
    let doc = json!({"version": 1, "plan": null});
    let migrated = registry.migrate_to(doc, 2).unwrap();
    assert_eq!(migrated, json!({"version": 2, "plan": null}));
}
