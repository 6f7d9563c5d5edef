use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use saltdag::dag::ScheduledTask;
use saltdag::engine::{RuntimeEvent, TaskFailure, TaskOutcome};
use saltdag::errors::Result;
use saltdag::exec::ExecutorBackend;
use tokio::sync::mpsc;

/// A fake executor that:
/// - records which tasks were "run" (by their display key)
/// - reports `TaskStarted` then `TaskFinished` for each scheduled task, failing
///   the ones whose kind is listed in `failing_kinds`.
///
/// Work units are never called and targets are never touched.
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<String>>>,
    failing_kinds: HashSet<String>,
}

impl FakeExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, executed: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            runtime_tx,
            executed,
            failing_kinds: HashSet::new(),
        }
    }

    pub fn failing(mut self, kind: &str) -> Self {
        self.failing_kinds.insert(kind.to_string());
        self
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);
        let failing = self.failing_kinds.clone();

        Box::pin(async move {
            let mut events = Vec::new();
            for t in tasks {
                {
                    let mut guard = executed.lock().unwrap();
                    guard.push(t.key.to_string());
                }

                let outcome = if failing.contains(t.key.kind()) {
                    TaskOutcome::Failed(TaskFailure::WorkUnit(format!("{} refused", t.key)))
                } else {
                    TaskOutcome::Done
                };
                events.push(RuntimeEvent::TaskStarted { id: t.id });
                events.push(RuntimeEvent::TaskFinished { id: t.id, outcome });
            }

            // Delivered from a separate task: the runtime is the only reader
            // and is busy awaiting this future.
            tokio::spawn(async move {
                for event in events {
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
            });
            Ok(())
        })
    }
}
