// src/dag/scheduler.rs

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::dag::graph::{TaskGraph, TaskId};
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::{ReadOnlyStateManager, StateManager};
use crate::dag::task_info::{FailureCause, Probe, TaskState};
use crate::engine::{TaskFailure, TaskOutcome};

/// Scheduler holds the immutable resolved graph plus the per-task state of
/// one run.
///
/// It is responsible for:
/// - applying the initial target probes (existing targets are skipped)
/// - deciding when a task is ready to run (all deps `Done` or `Skipped`)
/// - recording starts and completions reported by workers
/// - failing every downstream task when a task fails
///
/// It performs no IO; the runtime feeds it events and executes the jobs it
/// returns.
#[derive(Debug)]
pub struct Scheduler {
    graph: Arc<TaskGraph>,
    states: Vec<TaskState>,
    seeded: bool,
}

impl Scheduler {
    pub fn new(graph: Arc<TaskGraph>) -> Self {
        let states = vec![TaskState::Pending; graph.len()];
        Self {
            graph,
            states,
            seeded: false,
        }
    }

    pub fn graph(&self) -> &Arc<TaskGraph> {
        &self.graph
    }

    pub fn state_of(&self, id: TaskId) -> &TaskState {
        &self.states[id.index()]
    }

    /// All tasks with their current state, in execution order.
    pub fn states(&self) -> impl Iterator<Item = (TaskId, &TaskState)> {
        self.graph.order().map(|id| (id, &self.states[id.index()]))
    }

    /// Whether the dependencies of `id` are satisfied for this run.
    pub fn deps_satisfied(&self, id: TaskId) -> bool {
        ReadOnlyStateManager::new(&self.graph, &self.states).deps_satisfied(id)
    }

    /// `true` once every task is terminal.
    pub fn is_finished(&self) -> bool {
        self.states.iter().all(TaskState::is_terminal)
    }

    pub fn running_count(&self) -> usize {
        self.states
            .iter()
            .filter(|s| matches!(s, TaskState::Running))
            .count()
    }

    /// Apply the pre-run target probes and return the first batch of ready
    /// tasks.
    ///
    /// Tasks without a probe result are treated as absent. A present target
    /// satisfies everything upstream of it: tasks reachable from the roots
    /// only through present targets are marked `NotNeeded` and never run,
    /// whatever their own probe said.
    pub fn seed(&mut self, probes: Vec<(TaskId, Probe)>) -> SchedulerStep {
        if self.seeded {
            warn!("scheduler already seeded; ignoring repeated seed");
            return SchedulerStep {
                run_finished: self.is_finished(),
                ..SchedulerStep::default()
            };
        }
        self.seeded = true;

        let mut by_id = vec![Probe::Absent; self.graph.len()];
        for (id, probe) in probes {
            by_id[id.index()] = probe;
        }
        let needed = self.needed_tasks(&by_id);

        let mut failed = Vec::new();

        for (id, probe) in self.graph.order().zip(by_id) {
            let key = &self.graph.node(id).key;
            match probe {
                Probe::Present => {
                    info!(task = %key, "target exists; skipping");
                    self.states[id.index()] = TaskState::Skipped;
                }
                _ if !needed[id.index()] => {
                    debug!(task = %key, "only required by present targets; not scheduling");
                    self.states[id.index()] = TaskState::NotNeeded;
                }
                Probe::Absent => {
                    debug!(task = %key, "target missing; task will run");
                }
                Probe::Error(msg) => {
                    warn!(task = %key, error = %msg, "could not check target");
                    self.states[id.index()] =
                        TaskState::Failed(FailureCause::Error(TaskFailure::TargetIo(msg)));
                    failed.push(id);
                }
            }
        }

        let mut newly_failed = failed.clone();
        let mut manager = StateManager::new(&self.graph, &mut self.states);
        for id in failed {
            newly_failed.extend(manager.mark_dependents_failed(id));
        }

        let newly_ready = manager.collect_new_ready_tasks(self.graph.order());
        let run_finished = manager.all_tasks_terminal();

        SchedulerStep {
            newly_ready,
            newly_failed,
            run_finished,
        }
    }

    /// Tasks reachable from a root without passing through a present target.
    /// A present task is itself needed (it is reported as skipped) but does
    /// not pull in its dependencies.
    fn needed_tasks(&self, probes: &[Probe]) -> Vec<bool> {
        let mut needed = vec![false; self.graph.len()];
        let mut stack: Vec<TaskId> = self.graph.roots().to_vec();

        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut needed[id.index()], true) {
                continue;
            }
            if probes[id.index()] != Probe::Present {
                stack.extend_from_slice(self.graph.dependencies_of(id));
            }
        }

        needed
    }

    /// A worker picked up `id`.
    pub fn handle_started(&mut self, id: TaskId) {
        match self.states[id.index()] {
            TaskState::Ready => {
                debug!(task = %self.graph.node(id).key, "task running");
                self.states[id.index()] = TaskState::Running;
            }
            ref other => {
                warn!(
                    task = %self.graph.node(id).key,
                    state = %other,
                    "start reported for task that is not ready; ignoring"
                );
            }
        }
    }

    /// A worker finished `id` with `outcome`.
    pub fn handle_completion(&mut self, id: TaskId, outcome: TaskOutcome) -> SchedulerStep {
        if !matches!(
            self.states[id.index()],
            TaskState::Running | TaskState::Ready
        ) {
            warn!(
                task = %self.graph.node(id).key,
                state = %self.states[id.index()],
                "completion reported for task that is not in flight; ignoring"
            );
            return SchedulerStep {
                run_finished: self.is_finished(),
                ..SchedulerStep::default()
            };
        }

        let key = self.graph.node(id).key.clone();
        let mut newly_ready = Vec::new();
        let mut newly_failed = Vec::new();

        let finished = match outcome {
            TaskOutcome::Done => Ok(TaskState::Done),
            TaskOutcome::Skipped => Ok(TaskState::Skipped),
            TaskOutcome::Failed(err) => Err(err),
        };

        match finished {
            Ok(state) => {
                info!(task = %key, state = %state, "task finished");
                self.states[id.index()] = state;

                let dependents = self.graph.dependents_of(id);
                let mut manager = StateManager::new(&self.graph, &mut self.states);
                newly_ready.extend(manager.collect_new_ready_tasks(dependents));
            }
            Err(err) => {
                warn!(task = %key, error = %err, "task failed; failing dependents");
                self.states[id.index()] = TaskState::Failed(FailureCause::Error(err));
                newly_failed.push(id);

                let mut manager = StateManager::new(&self.graph, &mut self.states);
                newly_failed.extend(manager.mark_dependents_failed(id));
            }
        }

        let run_finished = self.is_finished();
        if run_finished {
            info!("scheduler: all tasks terminal");
        }

        SchedulerStep {
            newly_ready,
            newly_failed,
            run_finished,
        }
    }
}
