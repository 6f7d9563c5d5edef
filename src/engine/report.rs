// src/engine/report.rs

//! Summary of a finished (or interrupted) run.

use std::fmt;

use crate::dag::{Fingerprint, Scheduler, TaskId, TaskState};
use crate::task::TaskKey;

/// Terminal (or last known) state of one task.
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub id: TaskId,
    pub key: TaskKey,
    pub salt: Fingerprint,
    pub location: String,
    pub state: TaskState,
}

/// Every task of the run in execution order, with its state.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub tasks: Vec<TaskReport>,
    /// The run was stopped before every task reached a terminal state.
    pub interrupted: bool,
}

impl RunReport {
    pub fn from_scheduler(scheduler: &Scheduler, interrupted: bool) -> Self {
        let graph = scheduler.graph();
        let tasks = scheduler
            .states()
            .map(|(id, state)| {
                let node = graph.node(id);
                TaskReport {
                    id,
                    key: node.key.clone(),
                    salt: node.salt.clone(),
                    location: node.target.location(),
                    state: state.clone(),
                }
            })
            .collect();

        Self { tasks, interrupted }
    }

    /// `true` iff the run was not interrupted and no task failed.
    pub fn success(&self) -> bool {
        !self.interrupted
            && self
                .tasks
                .iter()
                .all(|t| t.state.is_terminal() && !t.state.is_failure())
    }

    pub fn find(&self, key: &TaskKey) -> Option<&TaskReport> {
        self.tasks.iter().find(|t| &t.key == key)
    }

    pub fn done_count(&self) -> usize {
        self.count(|s| matches!(s, TaskState::Done))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|s| matches!(s, TaskState::Skipped))
    }

    pub fn not_needed_count(&self) -> usize {
        self.count(|s| matches!(s, TaskState::NotNeeded))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|s| matches!(s, TaskState::Failed(_)))
    }

    /// Tasks that never reached a terminal state (interrupted runs only).
    pub fn unfinished_count(&self) -> usize {
        self.count(|s| !s.is_terminal())
    }

    fn count(&self, pred: impl Fn(&TaskState) -> bool) -> usize {
        self.tasks.iter().filter(|t| pred(&t.state)).count()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for task in &self.tasks {
            writeln!(f, "{:<8} {} [{}] {}", task.state.label(), task.key, task.salt, task.location)?;
            if let TaskState::Failed(cause) = &task.state {
                writeln!(f, "         {cause}")?;
            }
        }

        write!(
            f,
            "{} tasks: {} done, {} skipped, {} failed",
            self.tasks.len(),
            self.done_count(),
            self.skipped_count(),
            self.failed_count()
        )?;

        let not_needed = self.not_needed_count();
        if not_needed > 0 {
            write!(f, ", {not_needed} not needed")?;
        }

        if self.interrupted {
            write!(f, ", {} unfinished (interrupted)", self.unfinished_count())?;
        }

        Ok(())
    }
}
