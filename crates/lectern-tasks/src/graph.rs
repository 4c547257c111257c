//! Named build tasks and how they compose.

use std::collections::BTreeMap;
use std::fmt;

/// A primitive build step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Render the source document to markup
    ConvertDocument,
    /// Compile theme stylesheets
    CompileThemes,
    /// Compile, prefix and minify the core stylesheet
    CompileCore,
    /// Does nothing; stands in for script bundling
    Noop,
    /// Zip the bundle
    Archive,
    /// Check dependencies against advisories
    Audit,
    /// Serve and watch until interrupted
    Serve,
}

impl Action {
    /// Long-running actions that cannot be triggered from a watcher.
    pub fn is_interactive(self) -> bool {
        matches!(self, Self::Serve)
    }
}

/// What a task does when run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskDef {
    Action(Action),
    /// Other tasks, run in order
    Sequence(Vec<String>),
}

/// A named task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub description: String,
    pub def: TaskDef,
}

/// One primitive step of a flattened task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanStep {
    /// Name of the task defining the action
    pub task: String,
    pub action: Action,
}

/// Errors building or querying the graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Unknown task '{name}' (available: {})", available.join(", "))]
    UnknownTask {
        name: String,
        available: Vec<String>,
    },

    #[error("Task '{task}' refers to unknown task '{reference}'")]
    UnknownReference { task: String, reference: String },

    #[error("Task cycle: {}", path.join(" -> "))]
    Cycle { path: Vec<String> },
}

/// Immutable set of named tasks, validated on construction.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    tasks: BTreeMap<String, Task>,
}

impl TaskGraph {
    pub fn builder() -> TaskGraphBuilder {
        TaskGraphBuilder::default()
    }

    /// The built-in tasks.
    pub fn standard() -> Self {
        Self::builder()
            .action("js", "Script bundling placeholder (no-op)", Action::Noop)
            .action("css-themes", "Compile theme stylesheets", Action::CompileThemes)
            .action(
                "css-core",
                "Compile, prefix and minify the core stylesheet",
                Action::CompileCore,
            )
            .sequence("css", "All stylesheets", &["css-themes", "css-core"])
            .sequence("default", "Stylesheets and scripts", &["css", "js"])
            .action("prebuild", "Convert the source document", Action::ConvertDocument)
            .sequence("build", "Convert the document, then build assets", &["prebuild", "default"])
            .action("archive", "Zip the built bundle", Action::Archive)
            .sequence("package", "Build assets, then zip the bundle", &["default", "archive"])
            .action("audit", "Check dependencies against known advisories", Action::Audit)
            .action("serve", "Serve with live reload and rebuild on change", Action::Serve)
            .build()
            .expect("standard task graph is valid")
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// Tasks sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Task)> {
        self.tasks.iter().map(|(name, task)| (name.as_str(), task))
    }

    pub fn names(&self) -> Vec<String> {
        self.tasks.keys().cloned().collect()
    }

    /// Flatten a task into its primitive steps, in execution order.
    pub fn plan(&self, name: &str) -> Result<Vec<PlanStep>, GraphError> {
        if !self.contains(name) {
            return Err(GraphError::UnknownTask {
                name: name.to_string(),
                available: self.names(),
            });
        }

        let mut steps = Vec::new();
        self.flatten(name, &mut steps);
        Ok(steps)
    }

    // Only called on validated graphs, so every reference resolves and
    // recursion terminates.
    fn flatten(&self, name: &str, steps: &mut Vec<PlanStep>) {
        let Some(task) = self.tasks.get(name) else {
            return;
        };
        match &task.def {
            TaskDef::Action(action) => steps.push(PlanStep {
                task: name.to_string(),
                action: *action,
            }),
            TaskDef::Sequence(children) => {
                for child in children {
                    self.flatten(child, steps);
                }
            }
        }
    }

    fn validate(&self) -> Result<(), GraphError> {
        for (name, task) in &self.tasks {
            if let TaskDef::Sequence(children) = &task.def {
                if let Some(missing) = children.iter().find(|c| !self.tasks.contains_key(*c)) {
                    return Err(GraphError::UnknownReference {
                        task: name.clone(),
                        reference: missing.clone(),
                    });
                }
            }
        }

        let mut done = Vec::new();
        for name in self.tasks.keys() {
            self.check_cycles(name, &mut Vec::new(), &mut done)?;
        }
        Ok(())
    }

    fn check_cycles<'a>(
        &'a self,
        name: &'a str,
        stack: &mut Vec<&'a str>,
        done: &mut Vec<&'a str>,
    ) -> Result<(), GraphError> {
        if done.contains(&name) {
            return Ok(());
        }
        if let Some(start) = stack.iter().position(|n| *n == name) {
            let mut path: Vec<String> = stack[start..].iter().map(|n| n.to_string()).collect();
            path.push(name.to_string());
            return Err(GraphError::Cycle { path });
        }

        stack.push(name);
        if let Some(Task {
            def: TaskDef::Sequence(children),
            ..
        }) = self.tasks.get(name)
        {
            for child in children {
                self.check_cycles(child, stack, done)?;
            }
        }
        stack.pop();
        done.push(name);
        Ok(())
    }
}

impl fmt::Display for TaskDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Action(action) => write!(f, "{:?}", action),
            Self::Sequence(children) => write!(f, "{}", children.join(" -> ")),
        }
    }
}

/// Collects task definitions; [`TaskGraphBuilder::build`] validates them.
#[derive(Debug, Default)]
pub struct TaskGraphBuilder {
    tasks: BTreeMap<String, Task>,
}

impl TaskGraphBuilder {
    pub fn action(mut self, name: &str, description: &str, action: Action) -> Self {
        self.tasks.insert(
            name.to_string(),
            Task {
                description: description.to_string(),
                def: TaskDef::Action(action),
            },
        );
        self
    }

    pub fn sequence(mut self, name: &str, description: &str, children: &[&str]) -> Self {
        self.tasks.insert(
            name.to_string(),
            Task {
                description: description.to_string(),
                def: TaskDef::Sequence(children.iter().map(|c| c.to_string()).collect()),
            },
        );
        self
    }

    /// Reject unknown references and cycles.
    pub fn build(self) -> Result<TaskGraph, GraphError> {
        let graph = TaskGraph { tasks: self.tasks };
        graph.validate()?;
        Ok(graph)
    }
}
