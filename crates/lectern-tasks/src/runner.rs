//! Task execution.

use std::sync::Arc;
use std::time::Instant;

use lectern_audit::{AuditError, Auditor};
use lectern_server::{DevServer, FileWatcher, ServerError, WatchRules};
use lectern_static::{
    ConvertError, DocumentConverter, PackageError, Packager, StyleError, StylePipeline,
};

use crate::config::{ConfigError, ProjectConfig};
use crate::dispatch::Dispatcher;
use crate::graph::{Action, GraphError, PlanStep, TaskGraph};

/// Errors from running a task.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error(transparent)]
    Style(#[from] StyleError),

    #[error(transparent)]
    Package(#[from] PackageError),

    #[error(transparent)]
    Audit(#[from] AuditError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("Task '{task}' runs until interrupted and cannot be triggered by a file change")]
    Interactive { task: String },
}

/// Timing of one executed step.
#[derive(Debug, Clone)]
pub struct StepReport {
    pub task: String,
    pub duration_ms: u64,
}

/// Steps executed by one task run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub steps: Vec<StepReport>,
}

impl RunReport {
    pub fn duration_ms(&self) -> u64 {
        self.steps.iter().map(|s| s.duration_ms).sum()
    }
}

/// Runs tasks from a graph against one project.
///
/// Cheap to clone; clones share the graph and configuration.
#[derive(Debug, Clone)]
pub struct TaskRunner {
    graph: Arc<TaskGraph>,
    config: Arc<ProjectConfig>,
}

impl TaskRunner {
    pub fn new(graph: TaskGraph, config: ProjectConfig) -> Self {
        Self {
            graph: Arc::new(graph),
            config: Arc::new(config),
        }
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Run a task to completion, serving if the plan includes it.
    pub async fn run(&self, name: &str) -> Result<RunReport, TaskError> {
        let plan = self.graph.plan(name)?;
        let mut report = RunReport::default();

        for step in plan {
            if step.action == Action::Serve {
                self.serve().await?;
                continue;
            }
            report.steps.push(self.run_step(&step)?);
        }

        Ok(report)
    }

    /// Run a task on the current thread.
    ///
    /// Fails before running anything if the plan contains an interactive step.
    pub fn run_blocking(&self, name: &str) -> Result<RunReport, TaskError> {
        let plan = self.runnable_plan(name)?;
        let steps = plan
            .iter()
            .map(|step| self.run_step(step))
            .collect::<Result<_, _>>()?;
        Ok(RunReport { steps })
    }

    /// Check that every task a watch rule names exists and can be run on a
    /// file change.
    pub fn check_watch_rules(&self, rules: &WatchRules) -> Result<(), TaskError> {
        for rule in rules.iter() {
            let Some(task) = rule.task() else {
                continue;
            };
            self.runnable_plan(task)?;
            tracing::debug!(
                "Watching {} for '{}'",
                rule.patterns().collect::<Vec<_>>().join(", "),
                task
            );
        }
        Ok(())
    }

    /// Plan a task, refusing plans with an interactive step.
    fn runnable_plan(&self, name: &str) -> Result<Vec<PlanStep>, TaskError> {
        let plan = self.graph.plan(name)?;
        if let Some(step) = plan.iter().find(|s| s.action.is_interactive()) {
            return Err(TaskError::Interactive {
                task: step.task.clone(),
            });
        }
        Ok(plan)
    }

    fn run_step(&self, step: &PlanStep) -> Result<StepReport, TaskError> {
        let start = Instant::now();
        tracing::info!("Starting '{}'...", step.task);

        self.execute(step)?;

        let duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!("Finished '{}' after {}ms", step.task, duration_ms);
        Ok(StepReport {
            task: step.task.clone(),
            duration_ms,
        })
    }

    fn execute(&self, step: &PlanStep) -> Result<(), TaskError> {
        match step.action {
            Action::ConvertDocument => {
                DocumentConverter::new(self.config.convert_config()).convert()?;
            }
            Action::CompileThemes => {
                StylePipeline::new(self.config.style_config()).compile_themes()?;
            }
            Action::CompileCore => {
                StylePipeline::new(self.config.style_config()).compile_core()?;
            }
            Action::Noop => {
                tracing::debug!("'{}' has nothing to do", step.task);
            }
            Action::Archive => {
                Packager::new(self.config.package_config()).package()?;
            }
            Action::Audit => {
                Auditor::new(self.config.audit_config())?.run()?;
            }
            Action::Serve => {
                return Err(TaskError::Interactive {
                    task: step.task.clone(),
                })
            }
        }
        Ok(())
    }

    /// Serve the project, rebuilding on change, until interrupted.
    async fn serve(&self) -> Result<(), TaskError> {
        let rules = self.config.watch_rules()?;
        self.check_watch_rules(&rules)?;
        let server = DevServer::new(self.config.server_config());
        let listener = server.bind().await?;

        let root = self.config.root.canonicalize().map_err(|e| {
            ServerError::WatchError(format!("{}: {}", self.config.root.display(), e))
        })?;
        let (watcher, events) = FileWatcher::new(std::slice::from_ref(&root))
            .map_err(|e| ServerError::WatchError(e.to_string()))?;

        let dispatcher = Dispatcher::new(self.clone(), rules, root, server.hub().clone());
        let dispatch = tokio::spawn(dispatcher.run(events));

        let result = server
            .serve(listener, async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("Shutting down");
            })
            .await;

        drop(watcher);
        dispatch.abort();
        result.map_err(TaskError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    const DECK: &str = "---\ntitle: Lightning Talk\n---\n\n## Only slide\n\nHello from lectern.\n";

    fn project(dir: &Path) -> TaskRunner {
        fs::create_dir_all(dir.join("css/theme/source")).unwrap();
        fs::write(dir.join("slides.md"), DECK).unwrap();
        fs::write(
            dir.join("css/reveal.scss"),
            "$bg: #111;\n.reveal { background: $bg; user-select: none; }\n",
        )
        .unwrap();

        let config = ProjectConfig {
            root: dir.to_path_buf(),
            ..ProjectConfig::default()
        };
        TaskRunner::new(TaskGraph::standard(), config)
    }

    #[test]
    fn build_produces_page_and_stylesheet() {
        let temp = tempdir().unwrap();
        let runner = project(temp.path());

        let report = runner.run_blocking("build").unwrap();

        assert_eq!(report.steps.len(), 4);
        let html = fs::read_to_string(temp.path().join("index.html")).unwrap();
        assert!(html.contains("Hello from lectern."));
        let css = fs::metadata(temp.path().join("dist/reveal.css")).unwrap();
        assert!(css.len() > 0);
    }

    #[tokio::test]
    async fn async_run_matches_blocking_run() {
        let temp = tempdir().unwrap();
        let runner = project(temp.path());

        let report = runner.run("css").await.unwrap();

        let tasks: Vec<_> = report.steps.iter().map(|s| s.task.as_str()).collect();
        assert_eq!(tasks, vec!["css-themes", "css-core"]);
        assert!(temp.path().join("dist/reveal.css").exists());
    }

    #[test]
    fn package_without_prebuild_fails() {
        let temp = tempdir().unwrap();
        let runner = project(temp.path());

        let result = runner.run_blocking("package");

        assert!(matches!(
            result,
            Err(TaskError::Package(PackageError::MissingPath { .. }))
        ));
        assert!(!temp.path().join("presentation.zip").exists());
    }

    #[test]
    fn package_after_build_writes_archive() {
        let temp = tempdir().unwrap();
        let runner = project(temp.path());

        runner.run_blocking("build").unwrap();
        runner.run_blocking("package").unwrap();

        assert!(temp.path().join("presentation.zip").exists());
    }

    #[test]
    fn serve_cannot_run_blocking() {
        let temp = tempdir().unwrap();
        let runner = project(temp.path());

        let result = runner.run_blocking("serve");

        assert!(matches!(result, Err(TaskError::Interactive { .. })));
    }

    #[test]
    fn unknown_task_fails() {
        let temp = tempdir().unwrap();
        let runner = project(temp.path());

        assert!(matches!(
            runner.run_blocking("deploy"),
            Err(TaskError::Graph(GraphError::UnknownTask { .. }))
        ));
    }

    fn runner_with_rule(dir: &Path, task: &str) -> (TaskRunner, WatchRules) {
        let config = ProjectConfig::parse(&format!(
            "[[watch]]\npatterns = [\"css/*.scss\"]\ntask = \"{}\"\n",
            task
        ))
        .unwrap();
        let config = ProjectConfig {
            root: dir.to_path_buf(),
            ..config
        };
        let rules = config.watch_rules().unwrap();
        (TaskRunner::new(TaskGraph::standard(), config), rules)
    }

    #[test]
    fn watch_rules_must_name_known_tasks() {
        let temp = tempdir().unwrap();
        let (runner, rules) = runner_with_rule(temp.path(), "csss");

        assert!(matches!(
            runner.check_watch_rules(&rules),
            Err(TaskError::Graph(GraphError::UnknownTask { .. }))
        ));
    }

    #[test]
    fn watch_rules_cannot_trigger_serve() {
        let temp = tempdir().unwrap();
        let (runner, rules) = runner_with_rule(temp.path(), "serve");

        assert!(matches!(
            runner.check_watch_rules(&rules),
            Err(TaskError::Interactive { task }) if task == "serve"
        ));
    }

    #[tokio::test]
    async fn serve_rejects_bad_watch_rules_before_binding() {
        let temp = tempdir().unwrap();
        let (runner, _) = runner_with_rule(temp.path(), "csss");

        let result = runner.run("serve").await;

        assert!(matches!(
            result,
            Err(TaskError::Graph(GraphError::UnknownTask { .. }))
        ));
    }

    #[test]
    fn default_watch_rules_are_runnable() {
        let temp = tempdir().unwrap();
        let runner = project(temp.path());
        let rules = runner.config().watch_rules().unwrap();

        runner.check_watch_rules(&rules).unwrap();
    }

    #[test]
    fn strict_audit_fails_task() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("lib/js")).unwrap();
        fs::write(temp.path().join("lib/js/jquery-3.4.1.min.js"), "").unwrap();
        let mut config = ProjectConfig {
            root: temp.path().to_path_buf(),
            ..ProjectConfig::default()
        };

        TaskRunner::new(TaskGraph::standard(), config.clone())
            .run_blocking("audit")
            .unwrap();

        config.audit.strict = true;
        let result = TaskRunner::new(TaskGraph::standard(), config).run_blocking("audit");
        assert!(matches!(
            result,
            Err(TaskError::Audit(AuditError::VulnerableDependencies { .. }))
        ));
    }
}
