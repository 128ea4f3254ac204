// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mc — Mission Control CLI

mod commands;
mod context;
mod exit_error;
mod output;

use clap::{Parser, Subcommand};
use commands::{job, plan, status};
use exit_error::CliResult;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "mc",
    version,
    about = "Mission Control - orchestrate fleets of coding agents"
)]
struct Cli {
    /// Change to <dir> before doing anything
    #[arg(short = 'C', global = true, value_name = "DIR")]
    directory: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch a standalone agent job in its own worktree
    Launch(job::LaunchArgs),
    /// List all jobs
    Jobs,
    /// Show the plan, or one job by name
    Status {
        /// Job name (omit for the plan)
        name: Option<String>,
    },
    /// Stop a running job's worker (worktree preserved)
    Kill {
        name: String,
        #[arg(long)]
        force: bool,
    },
    /// Remove worktrees and records of finished jobs
    Cleanup(job::CleanupArgs),
    /// Attach to a job's tmux target
    Attach { name: String },
    /// Print recent pane output of a job
    Capture {
        name: String,
        /// Number of trailing lines
        #[arg(short = 'n', long, default_value = "50")]
        lines: u32,
    },
    /// Show a job worktree's divergence and dirtiness
    Diff { name: String },
    /// Queue a completed job into the merge train
    Merge { name: String },
    /// Refresh the integration branch from the default branch
    Sync,
    /// Push the integration branch and print the PR URL
    Pr,
    /// Start a plan from a manifest and drive it
    Plan(plan::PlanArgs),
    /// Show the active plan
    PlanStatus,
    /// Approve a pending plan or clear a checkpoint
    PlanApprove {
        /// Expected checkpoint (pre_merge, pre_pr, on_error)
        checkpoint: Option<String>,
    },
    /// Cancel the active plan and clean up its workers
    PlanCancel,
    /// Show the plan and every job
    Overview,
    /// Show agent progress reports
    Report {
        /// Job name (omit for all)
        name: Option<String>,
    },
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_env("MISSION_LOG")
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> CliResult {
    let orch = context::build(cli.directory).await?;
    match cli.command {
        Commands::Launch(args) => job::launch(&orch, args).await,
        Commands::Jobs => status::jobs(&orch).await,
        Commands::Status { name } => status::status(&orch, name).await,
        Commands::Kill { name, force } => job::kill(&orch, name, force).await,
        Commands::Cleanup(args) => job::cleanup(&orch, args).await,
        Commands::Attach { name } => job::attach(&orch, name).await,
        Commands::Capture { name, lines } => job::capture(&orch, name, lines).await,
        Commands::Diff { name } => job::diff(&orch, name).await,
        Commands::Merge { name } => plan::merge(&orch, name).await,
        Commands::Sync => plan::sync(&orch).await,
        Commands::Pr => plan::pr(&orch).await,
        Commands::Plan(args) => plan::run_plan(&orch, args).await,
        Commands::PlanStatus => plan::plan_status(&orch).await,
        Commands::PlanApprove { checkpoint } => plan::plan_approve(&orch, checkpoint).await,
        Commands::PlanCancel => plan::plan_cancel(&orch).await,
        Commands::Overview => status::overview(&orch).await,
        Commands::Report { name } => status::report(&orch, name).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e.message);
            ExitCode::from(e.code)
        }
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
