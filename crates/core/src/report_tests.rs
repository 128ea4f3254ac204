// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::fixed_time;

#[test]
fn report_round_trip() {
    let report = JobReport {
        job_id: JobId::new("job-1"),
        job_name: "extract-session".into(),
        status: ReportStatus::Progress,
        message: "halfway through the module split".into(),
        progress: Some(50),
        timestamp: fixed_time(),
    };

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["jobId"], "job-1");
    assert_eq!(json["status"], "progress");
    assert_eq!(json["progress"], 50);

    let back: JobReport = serde_json::from_value(json).unwrap();
    assert_eq!(back, report);
}

#[test]
fn reader_tolerates_unknown_fields() {
    let json = serde_json::json!({
        "jobId": "job-2",
        "jobName": "rewrite-login",
        "status": "blocked",
        "message": "waiting on an API key",
        "timestamp": "2026-01-15T12:00:00Z",
        "futureField": {"nested": true},
    });
    let report: JobReport = serde_json::from_value(json).unwrap();
    assert_eq!(report.status, ReportStatus::Blocked);
    assert!(report.progress.is_none());
}

#[test]
fn message_defaults_to_empty() {
    let json = serde_json::json!({
        "jobId": "job-3",
        "jobName": "j",
        "status": "working",
        "timestamp": "2026-01-15T12:00:00Z",
    });
    let report: JobReport = serde_json::from_value(json).unwrap();
    assert_eq!(report.message, "");
}
