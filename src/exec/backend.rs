// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of a raw mpsc sender.
//! This makes it easy to swap in a fake executor in tests while keeping the
//! production worker pool in [`executor_loop`](super::executor_loop).
//!
//! - `LocalExecutorBackend` is the default implementation used by saltdag.
//!   It wraps the worker pool spawned by `spawn_executor` and forwards
//!   scheduled tasks over the shared job queue.
//! - Tests can provide their own `ExecutorBackend` that, for example, records
//!   which tasks were scheduled and directly emits `TaskFinished` events.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

use crate::dag::ScheduledTask;
use crate::engine::RuntimeEvent;
use crate::errors::{Result, SaltdagError};

use super::executor_loop::spawn_executor;

/// Trait abstracting how scheduled tasks are executed.
///
/// Production code uses [`LocalExecutorBackend`]; tests can provide their own
/// implementation that doesn't run real work units.
pub trait ExecutorBackend: Send {
    /// Dispatch the given tasks for execution.
    ///
    /// The implementation must eventually report a `TaskFinished` event for
    /// every dispatched task.
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Executor backend running work units on a local worker pool.
pub struct LocalExecutorBackend {
    tx: mpsc::UnboundedSender<ScheduledTask>,
}

impl LocalExecutorBackend {
    /// Create a new backend with `workers` workers, wiring it to the given
    /// runtime event sender.
    ///
    /// This spawns the worker pool immediately.
    pub fn new(workers: usize, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Result<Self> {
        if workers == 0 {
            return Err(SaltdagError::InvalidWorkerCount(workers));
        }
        let tx = spawn_executor(workers, runtime_tx);
        Ok(Self { tx })
    }
}

impl ExecutorBackend for LocalExecutorBackend {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.tx.clone();

        Box::pin(async move {
            for task in tasks {
                tx.send(task).map_err(|e| {
                    SaltdagError::Other(anyhow::anyhow!(
                        "worker pool is gone; could not dispatch {}",
                        e.0.key
                    ))
                })?;
            }
            Ok(())
        })
    }
}
