// src/dag/mod.rs

//! Task graph construction and scheduling.
//!
//! - [`identity`] computes the salted fingerprint of a task.
//! - [`resolve`] expands root tasks into a deduplicated, salted graph.
//! - [`graph`] holds the resolved graph of tasks.
//! - [`scheduler`] contains the per-run state machine that decides
//!   which tasks are ready to run, and when dependents can be scheduled.
//! - [`task_info`] provides task states and scheduled task types.
//! - [`scheduler_step`] defines the result type for scheduler steps.
//! - [`state_manager`] manages per-run state transitions.

pub mod graph;
pub mod identity;
pub mod resolve;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;
pub mod task_info;

pub use graph::{TaskGraph, TaskId, TaskNode};
pub use identity::{FINGERPRINT_LEN, Fingerprint, compute_salt, fingerprint};
pub use resolve::resolve;
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use task_info::{FailureCause, Probe, ScheduledTask, TaskState};
