// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::dag::{Probe, ScheduledTask, TaskGraph, TaskId};
use crate::errors::{Result, SaltdagError};
use crate::exec::ExecutorBackend;

use super::core::CoreRuntime;
use super::report::RunReport;
use super::{CoreCommand, CoreStep, RuntimeEvent};

/// Drives the DAG scheduler in response to `RuntimeEvent`s,
/// and delegates actual task execution to an `ExecutorBackend`.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// runtime semantics. This struct handles async IO: probing targets,
/// reading events from channels and dispatching tasks to the executor.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
        }
    }

    /// Main event loop.
    ///
    /// - Probes every target and seeds the core.
    /// - Consumes `RuntimeEvent`s from `event_rx`.
    /// - Feeds them into the core runtime.
    /// - Executes commands returned by the core (dispatch tasks, exit).
    ///
    /// Returns the report once every task is terminal or shutdown was
    /// requested.
    pub async fn run(mut self) -> Result<RunReport> {
        info!(tasks = self.core.scheduler().graph().len(), "saltdag runtime started");

        let probes = probe_targets(self.core.scheduler().graph()).await?;
        let step = self.core.seed(probes);
        let mut keep_running = self.apply(step).await?;

        while keep_running {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    warn!("runtime event channel closed before the run finished");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            // Feed the event into the pure core and get commands back.
            let step = self.core.step(event);
            keep_running = self.apply(step).await?;

            if !keep_running {
                info!("core requested exit; stopping runtime");
            }
        }

        let report = self.core.report();
        info!(
            done = report.done_count(),
            skipped = report.skipped_count(),
            failed = report.failed_count(),
            interrupted = report.interrupted,
            "runtime exiting"
        );
        Ok(report)
    }

    async fn apply(&mut self, step: CoreStep) -> Result<bool> {
        for command in step.commands {
            self.execute_command(command).await?;
        }
        Ok(step.keep_running)
    }

    /// Execute a single command from the core.
    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::DispatchTasks(tasks) => {
                self.spawn_ready(tasks).await?;
            }
            CoreCommand::RequestExit => {
                debug!("core issued RequestExit command");
            }
        }
        Ok(())
    }

    async fn spawn_ready(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let keys: Vec<String> = tasks.iter().map(|t| t.key.to_string()).collect();
        debug!(?keys, "dispatching ready tasks");

        self.executor.spawn_ready_tasks(tasks).await
    }
}

/// Check every target once before scheduling starts.
///
/// Target checks may block, so they run on the blocking thread pool.
pub async fn probe_targets(graph: &Arc<TaskGraph>) -> Result<Vec<(TaskId, Probe)>> {
    let graph = Arc::clone(graph);
    let probes = tokio::task::spawn_blocking(move || {
        graph
            .order()
            .map(|id| {
                let probe = match graph.node(id).target.exists() {
                    Ok(true) => Probe::Present,
                    Ok(false) => Probe::Absent,
                    Err(e) => Probe::Error(format!("{e:#}")),
                };
                (id, probe)
            })
            .collect::<Vec<_>>()
    })
    .await
    .map_err(|e| SaltdagError::Other(anyhow::anyhow!("target probe task failed: {e}")))?;

    Ok(probes)
}
