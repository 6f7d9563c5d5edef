// src/exec/executor_loop.rs

//! Fixed-size worker pool draining the shared job queue.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};

use crate::dag::ScheduledTask;
use crate::engine::RuntimeEvent;
use crate::exec::task_runner::run_task;

/// Spawn `workers` workers sharing one job queue.
///
/// The returned sender is what `LocalExecutorBackend` uses to enqueue ready
/// tasks. Each worker takes one job at a time and runs it to completion
/// before taking the next, so at most `workers` work units execute at once.
///
/// The job queue is unbounded: the scheduler never holds more ready tasks
/// than the graph has nodes, and enqueueing must not block the runtime loop
/// while workers are blocked sending events back to it.
pub fn spawn_executor(
    workers: usize,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> mpsc::UnboundedSender<ScheduledTask> {
    let (tx, rx) = mpsc::unbounded_channel::<ScheduledTask>();
    let rx = Arc::new(Mutex::new(rx));

    info!(workers, "worker pool started");

    for worker in 0..workers {
        let rx = Arc::clone(&rx);
        let runtime_tx = runtime_tx.clone();

        tokio::spawn(async move {
            loop {
                // Only the worker holding the lock waits on the queue.
                let job = { rx.lock().await.recv().await };
                match job {
                    Some(task) => {
                        debug!(worker, task = %task.key, "worker picked up task");
                        run_task(task, &runtime_tx).await;
                    }
                    None => break,
                }
            }
            debug!(worker, "worker finished (queue closed)");
        });
    }

    tx
}
