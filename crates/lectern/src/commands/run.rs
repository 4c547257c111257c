//! Task commands.

use std::path::Path;

use anyhow::{Context, Result};
use lectern_tasks::{ProjectConfig, TaskGraph, TaskRunner};

/// Load lectern.toml, falling back to defaults when it does not exist.
pub fn load_config(path: &Path) -> Result<ProjectConfig> {
    ProjectConfig::load(path).with_context(|| format!("Invalid configuration {}", path.display()))
}

/// Run a task from the standard graph.
pub async fn run(config: ProjectConfig, task: &str) -> Result<()> {
    let runner = TaskRunner::new(TaskGraph::standard(), config);

    let report = runner
        .run(task)
        .await
        .with_context(|| format!("Task '{}' failed", task))?;

    if report.steps.len() > 1 {
        tracing::info!("Finished '{}' after {}ms", task, report.duration_ms());
    }

    Ok(())
}
