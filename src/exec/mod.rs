// src/exec/mod.rs

//! Task execution layer.
//!
//! This module is responsible for actually running the work units of ready
//! tasks on a fixed pool of workers, and reporting back to the orchestration
//! runtime via `RuntimeEvent`s.
//!
//! - [`executor_loop`] owns the worker pool draining the shared job queue.
//! - [`task_runner`] handles a single task execution attempt.
//! - [`backend`] provides the `ExecutorBackend` trait and a concrete
//!   `LocalExecutorBackend` that the runtime uses in production, and which
//!   tests can replace with a fake implementation.

pub mod backend;
pub mod executor_loop;
pub mod task_runner;

pub use backend::{ExecutorBackend, LocalExecutorBackend};
pub use executor_loop::spawn_executor;
