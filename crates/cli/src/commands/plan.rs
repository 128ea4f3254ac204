// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan verbs: start/run, status, approve, cancel, merge, sync, pr.

use crate::context::ProdOrchestrator;
use crate::exit_error::{CliResult, ExitError};
use crate::output;
use clap::Args;
use mc_core::{Checkpoint, PlanManifest, PlanStatus};
use mc_engine::EngineError;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Plan manifest (TOML)
    pub file: PathBuf,
    /// Start the plan and return instead of driving it to completion
    #[arg(long)]
    pub no_wait: bool,
}

pub async fn run_plan(orch: &ProdOrchestrator, args: PlanArgs) -> CliResult {
    let content = std::fs::read_to_string(&args.file)
        .map_err(|e| ExitError::failure(format!("{}: {}", args.file.display(), e)))?;
    let manifest = PlanManifest::parse(&content).map_err(EngineError::from)?;

    let plan = orch.start_plan(manifest).await?;
    println!(
        "plan {} started: {} jobs, mode {}, integration {}",
        plan.name,
        plan.jobs.len(),
        plan.mode,
        plan.integration_branch
    );
    if plan.status == PlanStatus::Pending {
        println!("awaiting approval: run `mc plan-approve` to begin");
        return Ok(());
    }
    if args.no_wait {
        println!("running in background state; check with `mc plan-status`");
        return Ok(());
    }

    orch.resume_plan().await?;
    orch.run().await?;

    match orch.store().load_plan()? {
        Some(plan) => {
            print!("{}", output::plan_block(&plan));
            if plan.status == PlanStatus::Failed {
                return Err(ExitError::failure(format!("plan {} failed", plan.name)));
            }
        }
        None => println!("plan cleared"),
    }
    Ok(())
}

pub async fn plan_status(orch: &ProdOrchestrator) -> CliResult {
    match orch.store().load_plan()? {
        Some(plan) => print!("{}", output::plan_block(&plan)),
        None => println!("no plan"),
    }
    Ok(())
}

pub async fn plan_approve(orch: &ProdOrchestrator, checkpoint: Option<String>) -> CliResult {
    let expected = match checkpoint {
        Some(raw) => Some(Checkpoint::from_str(&raw).map_err(ExitError::validation)?),
        None => None,
    };
    orch.approve_plan(expected).await?;
    println!("approved; plan is running");
    Ok(())
}

pub async fn plan_cancel(orch: &ProdOrchestrator) -> CliResult {
    orch.cancel_plan().await?;
    println!("plan cancelled");
    Ok(())
}

pub async fn merge(orch: &ProdOrchestrator, name: String) -> CliResult {
    orch.merge_job(&name).await?;
    println!("{} queued for merge", name);
    Ok(())
}

pub async fn sync(orch: &ProdOrchestrator) -> CliResult {
    let outcome = orch.sync_plan().await?;
    if outcome.success {
        println!("integration branch refreshed from the default branch");
    } else {
        println!("refresh hit conflicts:");
        for file in outcome.conflicts {
            println!("  {}", file);
        }
        return Err(ExitError::failure("sync aborted on conflicts"));
    }
    Ok(())
}

pub async fn pr(orch: &ProdOrchestrator) -> CliResult {
    let url = orch.open_pr().await?;
    println!("{}", url);
    Ok(())
}
