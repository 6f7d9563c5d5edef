// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - probing targets before the run starts
//! - reading events from channels
//! - sending `ScheduledTask`s to the executor
//! - handling Ctrl+C / shutdown
//!
//! The core is intended to be extensively unit tested without any Tokio,
//! channels, filesystem, or threads.

use crate::dag::{Probe, Scheduler, TaskId};
use crate::engine::event_handlers::{
    CoreStep, handle_seed, handle_task_finished, handle_task_started,
};
use crate::engine::report::RunReport;
use crate::engine::RuntimeEvent;

/// Pure core runtime state.
///
/// This owns the DAG scheduler and whether the run was interrupted. It has
/// **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    interrupted: bool,
}

impl CoreRuntime {
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            scheduler,
            interrupted: false,
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Expose whether every task is terminal (for tests).
    pub fn is_finished(&self) -> bool {
        self.scheduler.is_finished()
    }

    /// Start the run from the pre-run target probes.
    pub fn seed(&mut self, probes: Vec<(TaskId, Probe)>) -> CoreStep {
        handle_seed(&mut self.scheduler, probes)
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TaskStarted { id } => handle_task_started(&mut self.scheduler, id),
            RuntimeEvent::TaskFinished { id, outcome } => {
                handle_task_finished(&mut self.scheduler, id, outcome)
            }
            RuntimeEvent::ShutdownRequested => {
                self.interrupted = true;
                CoreStep {
                    commands: Vec::new(),
                    keep_running: false,
                }
            }
        }
    }

    /// Snapshot the per-task states into a report.
    pub fn report(&self) -> RunReport {
        RunReport::from_scheduler(&self.scheduler, self.interrupted)
    }
}
