// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plain-text formatting for command output.

use mc_core::{Job, JobReport, Plan};

/// Render the job list as aligned columns.
pub fn jobs_table(jobs: &[Job]) -> String {
    if jobs.is_empty() {
        return "no jobs".to_string();
    }
    let mut out = String::new();
    let name_width = jobs
        .iter()
        .map(|j| j.name.len())
        .max()
        .unwrap_or(4)
        .max("NAME".len());
    out.push_str(&format!(
        "{:<name_width$}  {:<10}  {:<24}  BRANCH\n",
        "NAME", "STATUS", "TARGET"
    ));
    for job in jobs {
        out.push_str(&format!(
            "{:<name_width$}  {:<10}  {:<24}  {}\n",
            job.name,
            job.status.to_string(),
            job.terminal_target.as_deref().unwrap_or("-"),
            job.branch,
        ));
    }
    out
}

/// Render the plan's jobs with merge order and status.
pub fn plan_block(plan: &Plan) -> String {
    let mut out = format!(
        "plan {} [{}] mode={} status={}",
        plan.name, plan.id, plan.mode, plan.status
    );
    if let Some(point) = plan.checkpoint {
        out.push_str(&format!(" checkpoint={}", point));
    }
    out.push('\n');
    out.push_str(&format!(
        "integration {} (base {})\n",
        plan.integration_branch,
        &plan.base_commit[..plan.base_commit.len().min(12)]
    ));
    if let Some(url) = &plan.pr_url {
        out.push_str(&format!("pr {}\n", url));
    }
    for job in &plan.jobs {
        let order = job
            .merge_order
            .map(|o| o.to_string())
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!("  [{}] {:<20} {}", order, job.name, job.status));
        if let Some(reason) = &job.failure_reason {
            out.push_str(&format!("  ({})", reason.lines().next().unwrap_or(reason)));
        }
        out.push('\n');
    }
    out
}

/// Render one progress report line.
pub fn report_line(report: &JobReport) -> String {
    let progress = report
        .progress
        .map(|p| format!(" {}%", p))
        .unwrap_or_default();
    format!(
        "{} [{}{}] {}",
        report.job_name, report.status, progress, report.message
    )
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
