// src/dag/state_manager.rs

//! Per-run state transitions for tasks in the scheduler.

use tracing::{debug, info};

use crate::dag::graph::{TaskGraph, TaskId};
use crate::dag::task_info::{FailureCause, ScheduledTask, TaskState};

/// Applies state transitions to the per-task state vector of one run.
pub struct StateManager<'a> {
    graph: &'a TaskGraph,
    states: &'a mut [TaskState],
}

impl<'a> StateManager<'a> {
    pub fn new(graph: &'a TaskGraph, states: &'a mut [TaskState]) -> Self {
        Self { graph, states }
    }

    /// Whether every dependency of `id` is `Done` or `Skipped`.
    pub fn deps_satisfied(&self, id: TaskId) -> bool {
        ReadOnlyStateManager::new(self.graph, self.states).deps_satisfied(id)
    }

    /// Mark every pending transitive dependent of `failed` as failed by
    /// dependency.
    ///
    /// Traversal stops at tasks that are already terminal: a `Skipped`
    /// dependent had its output all along, so its own dependents are not
    /// affected.
    ///
    /// Returns the newly failed tasks (excluding `failed` itself).
    pub fn mark_dependents_failed(&mut self, failed: TaskId) -> Vec<TaskId> {
        let upstream = self.graph.node(failed).key.clone();
        let mut stack = self.graph.dependents_of(failed);
        let mut newly_failed = Vec::new();

        while let Some(id) = stack.pop() {
            // Running cannot happen here (its deps would be unsatisfied);
            // anything else is already terminal.
            if !matches!(self.states[id.index()], TaskState::Pending | TaskState::Ready) {
                continue;
            }

            debug!(
                task = %self.graph.node(id).key,
                upstream = %upstream,
                "marking dependent as failed due to upstream failure"
            );
            self.states[id.index()] = TaskState::Failed(FailureCause::Dependency {
                upstream: upstream.clone(),
            });
            newly_failed.push(id);
            stack.extend(self.graph.dependents_of(id));
        }

        newly_failed
    }

    /// Promote `Pending` candidates whose dependencies are satisfied to
    /// `Ready` and return them as jobs.
    pub fn collect_new_ready_tasks(
        &mut self,
        candidates: impl IntoIterator<Item = TaskId>,
    ) -> Vec<ScheduledTask> {
        let mut ready = Vec::new();

        for id in candidates {
            if self.states[id.index()] != TaskState::Pending || !self.deps_satisfied(id) {
                continue;
            }

            let node = self.graph.node(id);
            info!(task = %node.key, salt = %node.salt, "dependencies satisfied; task ready");
            self.states[id.index()] = TaskState::Ready;
            ready.push(ScheduledTask::from_graph(self.graph, id));
        }

        ready
    }

    /// Check if all tasks are in a terminal state.
    pub fn all_tasks_terminal(&self) -> bool {
        self.states.iter().all(TaskState::is_terminal)
    }
}

/// A read-only view of the per-run state.
pub struct ReadOnlyStateManager<'a> {
    graph: &'a TaskGraph,
    states: &'a [TaskState],
}

impl<'a> ReadOnlyStateManager<'a> {
    pub fn new(graph: &'a TaskGraph, states: &'a [TaskState]) -> Self {
        Self { graph, states }
    }

    pub fn deps_satisfied(&self, id: TaskId) -> bool {
        self.graph
            .dependencies_of(id)
            .iter()
            .all(|dep| self.states[dep.index()].is_success())
    }
}
