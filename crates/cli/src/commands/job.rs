// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job verbs: launch, kill, cleanup, attach, capture, diff.

use crate::context::ProdOrchestrator;
use crate::exit_error::{CliResult, ExitError};
use clap::Args;
use mc_core::Placement;
use mc_engine::{CleanupOptions, LaunchOptions};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct LaunchArgs {
    /// Job name (unique per project)
    pub name: String,
    /// Prompt handed to the agent
    pub prompt: String,
    /// Branch name (default: mc/<sanitized-name>)
    #[arg(long)]
    pub branch: Option<String>,
    /// Open a window in the current tmux session instead of a detached session
    #[arg(long)]
    pub window: bool,
    /// Directories symlinked from the main checkout into the worktree
    #[arg(long = "symlink-dir", value_name = "DIR")]
    pub symlink_dirs: Vec<PathBuf>,
    /// Files copied from the main checkout into the worktree
    #[arg(long = "copy-file", value_name = "FILE")]
    pub copy_files: Vec<PathBuf>,
    /// Commands run in the worktree before the agent starts
    #[arg(long = "run", value_name = "CMD")]
    pub commands: Vec<String>,
}

pub async fn launch(orch: &ProdOrchestrator, args: LaunchArgs) -> CliResult {
    let mut opts = LaunchOptions::new(args.name, args.prompt);
    opts.branch = args.branch;
    opts.placement = if args.window {
        Placement::Window
    } else {
        Placement::Session
    };
    opts.symlink_dirs = args.symlink_dirs;
    opts.copy_files = args.copy_files;
    opts.commands = args.commands;

    let job = orch.launch(opts).await?;
    println!(
        "launched {} on {} in {}",
        job.name,
        job.branch,
        job.worktree_path.display()
    );
    if let Some(target) = &job.terminal_target {
        println!("attach with: mc attach {}  (tmux target {})", job.name, target);
    }
    Ok(())
}

pub async fn kill(orch: &ProdOrchestrator, name: String, force: bool) -> CliResult {
    let job = orch.kill_job(&name, force).await?;
    println!("stopped {} (worktree preserved at {})", job.name, job.worktree_path.display());
    Ok(())
}

#[derive(Args, Debug)]
pub struct CleanupArgs {
    /// Job to clean up
    pub name: Option<String>,
    /// Clean up every finished job
    #[arg(long)]
    pub all: bool,
    /// Also delete the job's branch
    #[arg(long)]
    pub delete_branch: bool,
}

pub async fn cleanup(orch: &ProdOrchestrator, args: CleanupArgs) -> CliResult {
    let cleaned = orch
        .cleanup(CleanupOptions {
            name: args.name,
            all: args.all,
            delete_branch: args.delete_branch,
        })
        .await?;
    if cleaned.is_empty() {
        println!("nothing to clean");
    } else {
        println!("cleaned {}", cleaned.join(", "));
    }
    Ok(())
}

pub async fn attach(orch: &ProdOrchestrator, name: String) -> CliResult {
    let target = orch.attach_target(&name)?;
    // Inside tmux, switch the client; outside, attach.
    let subcommand = if std::env::var("TMUX").is_ok() {
        "switch-client"
    } else {
        "attach-session"
    };
    let status = std::process::Command::new("tmux")
        .args([subcommand, "-t", &target])
        .status()
        .map_err(|e| ExitError::failure(format!("tmux {}: {}", subcommand, e)))?;
    if !status.success() {
        return Err(ExitError::failure(format!(
            "tmux {} -t {} exited with {}",
            subcommand, target, status
        )));
    }
    Ok(())
}

pub async fn capture(orch: &ProdOrchestrator, name: String, lines: u32) -> CliResult {
    let output = orch.capture(&name, lines).await?;
    print!("{}", output);
    Ok(())
}

pub async fn diff(orch: &ProdOrchestrator, name: String) -> CliResult {
    let diff = orch.diff(&name).await?;
    println!("ahead {}, behind {}", diff.ahead, diff.behind);
    if diff.status.trim().is_empty() {
        println!("worktree clean");
    } else {
        print!("{}", diff.status);
    }
    Ok(())
}
