//! Turning file changes into task runs and browser reloads.

use std::path::PathBuf;
use std::sync::Arc;

use lectern_server::{ReloadHub, WatchEvent, WatchRules};
use lectern_static::fsutil::relative_path;
use tokio::sync::mpsc;

use crate::runner::TaskRunner;

/// What handling one changed path amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Outside the project or matched by no rule
    Ignored,
    /// Matched only reload rules
    ReloadOnly,
    /// Every matched task succeeded
    Ran { tasks: Vec<String> },
    /// A task failed; later tasks were skipped
    Failed { task: String, message: String },
}

impl DispatchOutcome {
    /// Whether browsers should reload afterwards.
    pub fn should_reload(&self) -> bool {
        matches!(self, Self::ReloadOnly | Self::Ran { .. })
    }

    fn ran_tasks(&self) -> bool {
        matches!(self, Self::Ran { .. } | Self::Failed { .. })
    }
}

/// Single consumer of the watch event queue.
///
/// Tasks run one at a time. Events that pile up while a task runs are
/// discarded once it finishes, so a build writing into the watched tree
/// does not trigger itself.
pub struct Dispatcher {
    runner: TaskRunner,
    rules: WatchRules,
    root: PathBuf,
    hub: ReloadHub,
}

impl Dispatcher {
    pub fn new(runner: TaskRunner, rules: WatchRules, root: PathBuf, hub: ReloadHub) -> Self {
        Self {
            runner,
            rules,
            root,
            hub,
        }
    }

    /// Handle one change: run every task its rules name, in order.
    pub fn dispatch(&self, event: &WatchEvent) -> DispatchOutcome {
        let path = &event.path;
        if !path.starts_with(&self.root) {
            return DispatchOutcome::Ignored;
        }
        let relative = relative_path(&self.root, path);

        let Some(tasks) = self.rules.tasks_for(&relative) else {
            tracing::trace!("No watch rule for {}", relative);
            return DispatchOutcome::Ignored;
        };

        if tasks.is_empty() {
            tracing::info!("{} {}", event.kind, relative);
            return DispatchOutcome::ReloadOnly;
        }

        tracing::info!("{} {}, running {}", event.kind, relative, tasks.join(", "));
        for task in &tasks {
            if let Err(e) = self.runner.run_blocking(task) {
                tracing::error!("Task '{}' failed: {}", task, e);
                return DispatchOutcome::Failed {
                    task: task.to_string(),
                    message: e.to_string(),
                };
            }
        }

        DispatchOutcome::Ran {
            tasks: tasks.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Consume events until the queue closes.
    pub async fn run(self, mut events: mpsc::Receiver<WatchEvent>) {
        let dispatcher = Arc::new(self);

        while let Some(event) = events.recv().await {
            let worker = Arc::clone(&dispatcher);
            let outcome =
                match tokio::task::spawn_blocking(move || worker.dispatch(&event)).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::error!("Watch task aborted: {}", e);
                        continue;
                    }
                };

            if outcome.ran_tasks() {
                let mut dropped = 0usize;
                while events.try_recv().is_ok() {
                    dropped += 1;
                }
                if dropped > 0 {
                    tracing::debug!("Dropped {} changes made while the task ran", dropped);
                }
            }

            if outcome.should_reload() {
                dispatcher.hub.reload();
            }
        }
    }
}
