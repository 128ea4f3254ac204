// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only verbs: jobs, status, overview, report.

use crate::context::ProdOrchestrator;
use crate::exit_error::CliResult;
use crate::output;

pub async fn jobs(orch: &ProdOrchestrator) -> CliResult {
    let overview = orch.overview()?;
    print!("{}", output::jobs_table(&overview.jobs));
    Ok(())
}

pub async fn status(orch: &ProdOrchestrator, name: Option<String>) -> CliResult {
    match name {
        Some(name) => {
            let job = orch.job_status(&name)?;
            println!("{} [{}] on {}", job.name, job.status, job.branch);
            println!("worktree {}", job.worktree_path.display());
            if let Some(target) = &job.terminal_target {
                println!("terminal {}", target);
            }
            if let Some(code) = job.exit_code {
                println!("exit code {}", code);
            }
        }
        None => {
            let overview = orch.overview()?;
            match overview.plan {
                Some(plan) => print!("{}", output::plan_block(&plan)),
                None => println!("no plan"),
            }
        }
    }
    Ok(())
}

pub async fn overview(orch: &ProdOrchestrator) -> CliResult {
    let overview = orch.overview()?;
    match &overview.plan {
        Some(plan) => print!("{}", output::plan_block(plan)),
        None => println!("no plan"),
    }
    println!();
    print!("{}", output::jobs_table(&overview.jobs));
    Ok(())
}

pub async fn report(orch: &ProdOrchestrator, name: Option<String>) -> CliResult {
    match name {
        Some(name) => match orch.report(&name)? {
            Some(report) => println!("{}", output::report_line(&report)),
            None => println!("no report from {}", name),
        },
        None => {
            let reports = orch.reports()?;
            if reports.is_empty() {
                println!("no reports");
            }
            for report in reports {
                println!("{}", output::report_line(&report));
            }
        }
    }
    Ok(())
}
