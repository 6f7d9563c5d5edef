// src/engine/mod.rs

//! Orchestration engine for saltdag.
//!
//! This module ties together:
//! - the DAG scheduler
//! - the main runtime event loop that reacts to:
//!   - task start and completion events from workers
//!   - shutdown signals
//! - the final [`RunReport`]
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use thiserror::Error;

use crate::dag::TaskId;

/// Why a single task failed.
///
/// These are not errors of the run as a whole: they are recorded against the
/// task in the [`RunReport`] and fail its dependents.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskFailure {
    #[error("work unit failed: {0}")]
    WorkUnit(String),

    #[error("work unit panicked: {0}")]
    Panicked(String),

    #[error("target {0} still missing after the work unit finished")]
    MissingOutput(String),

    #[error("target check failed: {0}")]
    TargetIo(String),
}

/// Outcome of one task execution attempt, as reported by a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The work unit ran and the target exists.
    Done,
    /// The target appeared before the work unit was started.
    Skipped,
    Failed(TaskFailure),
}

/// Events flowing into the runtime from workers and signal handlers.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A worker picked up the task.
    TaskStarted { id: TaskId },
    /// A worker finished the task with a concrete outcome.
    TaskFinished { id: TaskId, outcome: TaskOutcome },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod report;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use report::{RunReport, TaskReport};
pub use runtime::Runtime;
