// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use tracing::{debug, info};

use crate::dag::{Probe, ScheduledTask, Scheduler, SchedulerStep, TaskId};
use crate::engine::TaskOutcome;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Send these tasks to the executor.
    DispatchTasks(Vec<ScheduledTask>),
    /// Every task is terminal; the run is over.
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn from_scheduler_step(step: SchedulerStep) -> Self {
        let mut commands = Vec::new();

        if !step.newly_ready.is_empty() {
            commands.push(CoreCommand::DispatchTasks(step.newly_ready));
        }

        if step.run_finished {
            commands.push(CoreCommand::RequestExit);
        }

        CoreStep {
            commands,
            keep_running: !step.run_finished,
        }
    }
}

/// Seed a fresh run from the pre-run target probes.
pub fn handle_seed(scheduler: &mut Scheduler, probes: Vec<(TaskId, Probe)>) -> CoreStep {
    let step = scheduler.seed(probes);
    info!(
        ready = step.newly_ready.len(),
        failed = step.newly_failed.len(),
        "run seeded"
    );
    CoreStep::from_scheduler_step(step)
}

/// Handle a task start event.
pub fn handle_task_started(scheduler: &mut Scheduler, id: TaskId) -> CoreStep {
    scheduler.handle_started(id);
    CoreStep {
        commands: Vec::new(),
        keep_running: true,
    }
}

/// Handle a task completion event.
pub fn handle_task_finished(
    scheduler: &mut Scheduler,
    id: TaskId,
    outcome: TaskOutcome,
) -> CoreStep {
    let step = scheduler.handle_completion(id, outcome);
    if !step.newly_failed.is_empty() {
        debug!(count = step.newly_failed.len(), "tasks failed in this step");
    }
    CoreStep::from_scheduler_step(step)
}
