// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dependency-DAG scheduling.
//!
//! Pure functions over the plan: validation (unknown names, cycles),
//! stable topological ordering, and the ready-set under the parallelism
//! cap. Ties always break by declaration order within the plan.

use crate::error::EngineError;
use mc_core::{JobSpec, JobSpecStatus, Plan};
use std::collections::{HashMap, HashSet};

/// Validate the plan's dependency graph.
///
/// Fails with `InvalidDependency` when a `depends_on` entry names a job
/// that does not exist in the plan, and `CyclicDependency` when a DFS
/// finds a back edge.
pub fn validate(plan: &Plan) -> Result<(), EngineError> {
    let names: HashSet<&str> = plan.jobs.iter().map(|j| j.name.as_str()).collect();
    for job in &plan.jobs {
        for dep in &job.depends_on {
            if !names.contains(dep.as_str()) {
                return Err(EngineError::InvalidDependency {
                    job: job.name.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }

    let index: HashMap<&str, &JobSpec> =
        plan.jobs.iter().map(|j| (j.name.as_str(), j)).collect();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut on_stack: HashSet<&str> = HashSet::new();

    fn dfs<'a>(
        name: &'a str,
        index: &HashMap<&'a str, &'a JobSpec>,
        visited: &mut HashSet<&'a str>,
        on_stack: &mut HashSet<&'a str>,
    ) -> Result<(), EngineError> {
        if on_stack.contains(name) {
            return Err(EngineError::CyclicDependency(name.to_string()));
        }
        if !visited.insert(name) {
            return Ok(());
        }
        on_stack.insert(name);
        if let Some(job) = index.get(name) {
            for dep in &job.depends_on {
                dfs(dep.as_str(), index, visited, on_stack)?;
            }
        }
        on_stack.remove(name);
        Ok(())
    }

    for job in &plan.jobs {
        dfs(job.name.as_str(), &index, &mut visited, &mut on_stack)?;
    }
    Ok(())
}

/// Stable topological order of job names.
///
/// Kahn's algorithm; among jobs whose dependencies are all satisfied,
/// declaration order wins. Assumes the plan already validated.
pub fn topological_sort(jobs: &[JobSpec]) -> Vec<String> {
    let mut remaining: Vec<&JobSpec> = jobs.iter().collect();
    let mut done: HashSet<&str> = HashSet::new();
    let mut order = Vec::with_capacity(jobs.len());

    while !remaining.is_empty() {
        let Some(pos) = remaining
            .iter()
            .position(|j| j.depends_on.iter().all(|d| done.contains(d.as_str())))
        else {
            // Cycle: validation rejects these plans, but stay total.
            for job in remaining {
                order.push(job.name.clone());
            }
            break;
        };
        let job = remaining.remove(pos);
        done.insert(job.name.as_str());
        order.push(job.name.clone());
    }
    order
}

/// Jobs eligible to launch this tick.
///
/// A job is ready when it is `queued` or `waiting_deps` and every
/// dependency is `merged`. The result is capped so new launches plus the
/// currently running count never exceed `max_parallel`.
pub fn ready_jobs<'a>(plan: &'a Plan, running: usize, max_parallel: u32) -> Vec<&'a JobSpec> {
    let slots = (max_parallel as usize).saturating_sub(running);
    if slots == 0 {
        return Vec::new();
    }

    plan.jobs
        .iter()
        .filter(|job| {
            matches!(
                job.status,
                JobSpecStatus::Queued | JobSpecStatus::WaitingDeps
            )
        })
        .filter(|job| {
            job.depends_on.iter().all(|dep| {
                plan.job(dep)
                    .map(|d| d.status == JobSpecStatus::Merged)
                    .unwrap_or(false)
            })
        })
        .take(slots)
        .collect()
}

#[cfg(test)]
#[path = "dag_tests.rs"]
mod tests;
