// src/dag/task_info.rs

//! Per-task run state and the job description handed to workers.

use std::fmt;
use std::sync::Arc;

use crate::dag::graph::{TaskGraph, TaskId};
use crate::dag::identity::Fingerprint;
use crate::engine::TaskFailure;
use crate::task::{Task, TaskContext, TaskKey};

/// State of a task within the current run.
///
/// `Pending → Ready → Running → {Done | Failed | Skipped}`; a task can also go
/// straight from `Pending` to `Skipped` (target already present), `Failed`
/// (blocked by a failed dependency, or its target could not be probed) or
/// `NotNeeded` (only required by tasks whose targets are present).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    /// Waiting on dependencies.
    Pending,
    /// All dependencies satisfied; queued for a worker.
    Ready,
    /// A worker is executing the work unit.
    Running,
    /// The work unit ran and the target now exists.
    Done,
    /// The target already existed; nothing was executed.
    Skipped,
    /// Target missing, but every requested path to it passes through a
    /// present target, so it was never scheduled.
    NotNeeded,
    Failed(FailureCause),
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Done | TaskState::Skipped | TaskState::NotNeeded | TaskState::Failed(_)
        )
    }

    /// Whether dependents may proceed past this task.
    pub fn is_success(&self) -> bool {
        matches!(self, TaskState::Done | TaskState::Skipped)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, TaskState::Failed(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskState::Pending => "PENDING",
            TaskState::Ready => "READY",
            TaskState::Running => "RUNNING",
            TaskState::Done => "DONE",
            TaskState::Skipped => "SKIPPED",
            TaskState::NotNeeded => "UNNEEDED",
            TaskState::Failed(_) => "FAILED",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Failed(cause) => write!(f, "FAILED ({cause})"),
            other => f.write_str(other.label()),
        }
    }
}

/// Why a task ended up `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    /// The task itself failed.
    Error(TaskFailure),
    /// An upstream task failed, so this one was never started.
    Dependency { upstream: TaskKey },
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCause::Error(err) => write!(f, "{err}"),
            FailureCause::Dependency { upstream } => {
                write!(f, "blocked by failed dependency {upstream}")
            }
        }
    }
}

/// Result of checking a target before scheduling starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    Present,
    Absent,
    Error(String),
}

/// Description of a task that the scheduler wants a worker to run now.
#[derive(Debug, Clone)]
pub struct ScheduledTask {
    pub id: TaskId,
    pub key: TaskKey,
    pub salt: Fingerprint,
    pub task: Arc<dyn Task>,
    pub ctx: TaskContext,
}

impl ScheduledTask {
    pub fn from_graph(graph: &TaskGraph, id: TaskId) -> Self {
        let node = graph.node(id);
        Self {
            id,
            key: node.key.clone(),
            salt: node.salt.clone(),
            task: Arc::clone(&node.task),
            ctx: graph.context_for(id),
        }
    }
}
