//! Build orchestration for lectern projects.
//!
//! [`ProjectConfig`] reads `lectern.toml`, [`TaskGraph`] names the build
//! steps and how they compose, [`TaskRunner`] executes them, and
//! [`Dispatcher`] turns file changes into task runs while serving.

pub mod config;
pub mod dispatch;
pub mod graph;
pub mod runner;

pub use config::{ConfigError, ProjectConfig, DEFAULT_CONFIG_FILE};
pub use dispatch::{DispatchOutcome, Dispatcher};
pub use graph::{Action, GraphError, PlanStep, Task, TaskDef, TaskGraph, TaskGraphBuilder};
pub use runner::{RunReport, StepReport, TaskError, TaskRunner};
