//! Task listing command.

use lectern_tasks::{TaskDef, TaskGraph};

/// Print every task with what it does.
pub fn run() {
    let graph = TaskGraph::standard();

    for (name, task) in graph.iter() {
        match &task.def {
            TaskDef::Action(_) => println!("  {:<12} {}", name, task.description),
            TaskDef::Sequence(_) => {
                println!("  {:<12} {} ({})", name, task.description, task.def)
            }
        }
    }
}
