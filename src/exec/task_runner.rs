// src/exec/task_runner.rs

//! Single task execution attempt.

use std::any::Any;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskFailure, TaskOutcome};
use crate::task::{Task, TaskContext};

/// Run one scheduled task on the blocking thread pool, emitting
/// `TaskStarted` before and `TaskFinished` after.
///
/// Panics inside the work unit are caught and reported as failures; they
/// never take the worker down.
pub async fn run_task(task: ScheduledTask, runtime_tx: &mpsc::Sender<RuntimeEvent>) {
    let id = task.id;
    let key = task.key.clone();

    if runtime_tx.send(RuntimeEvent::TaskStarted { id }).await.is_err() {
        warn!(task = %key, "runtime is gone; dropping task");
        return;
    }

    info!(task = %key, salt = %task.salt, "starting task");

    let ScheduledTask { task, ctx, .. } = task;
    let outcome = match tokio::task::spawn_blocking(move || execute(task.as_ref(), &ctx)).await {
        Ok(outcome) => outcome,
        Err(join_err) if join_err.is_panic() => {
            let msg = panic_message(join_err.into_panic());
            error!(task = %key, panic = %msg, "work unit panicked");
            TaskOutcome::Failed(TaskFailure::Panicked(msg))
        }
        Err(join_err) => TaskOutcome::Failed(TaskFailure::WorkUnit(join_err.to_string())),
    };

    match &outcome {
        TaskOutcome::Done => info!(task = %key, "task done"),
        TaskOutcome::Skipped => info!(task = %key, "target appeared before start; skipped"),
        TaskOutcome::Failed(err) => error!(task = %key, error = %err, "task failed"),
    }

    if runtime_tx
        .send(RuntimeEvent::TaskFinished { id, outcome })
        .await
        .is_err()
    {
        warn!(task = %key, "runtime is gone; completion not delivered");
    }
}

/// Execute the work unit of `task`, bracketed by target checks.
///
/// - target already present: `Skipped`, the work unit is not called
/// - work unit error: `Failed(WorkUnit)`
/// - target still absent afterwards: `Failed(MissingOutput)`
/// - any target check error: `Failed(TargetIo)`
pub fn execute(task: &dyn Task, ctx: &TaskContext) -> TaskOutcome {
    let output = ctx.output();

    match output.exists() {
        Ok(true) => return TaskOutcome::Skipped,
        Ok(false) => {}
        Err(e) => return TaskOutcome::Failed(TaskFailure::TargetIo(format!("{e:#}"))),
    }

    if let Err(e) = task.run(ctx) {
        return TaskOutcome::Failed(TaskFailure::WorkUnit(format!("{e:#}")));
    }

    match output.exists() {
        Ok(true) => TaskOutcome::Done,
        Ok(false) => TaskOutcome::Failed(TaskFailure::MissingOutput(output.location())),
        Err(e) => TaskOutcome::Failed(TaskFailure::TargetIo(format!("{e:#}"))),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::dag::{Fingerprint, compute_salt};
    use crate::target::{MemoryStore, Target, write_all};
    use crate::task::TaskKey;

    #[derive(Debug)]
    struct Writer {
        store: MemoryStore,
        runs: AtomicUsize,
        writes: bool,
    }

    impl Writer {
        fn new(store: &MemoryStore, writes: bool) -> Self {
            Self {
                store: store.clone(),
                runs: AtomicUsize::new(0),
                writes,
            }
        }

        fn context(&self) -> TaskContext {
            let params = self.params();
            let salt = compute_salt(self.kind(), self.version(), &self.schema(), &params, &[])
                .unwrap();
            TaskContext::new(
                TaskKey::new(self.kind(), &params),
                salt.clone(),
                self.output(&salt),
                Vec::new(),
            )
        }

        fn runs(&self) -> usize {
            self.runs.load(Ordering::SeqCst)
        }
    }

    impl Task for Writer {
        fn kind(&self) -> &str {
            "Writer"
        }
        fn version(&self) -> &str {
            "1"
        }
        fn output(&self, salt: &Fingerprint) -> Arc<dyn Target> {
            Arc::new(self.store.target(format!("writer-{salt}")))
        }
        fn run(&self, ctx: &TaskContext) -> anyhow::Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.writes {
                write_all(ctx.output().as_ref(), b"model")?;
            }
            Ok(())
        }
    }

    #[test]
    fn target_created_after_seeding_is_skipped() {
        let store = MemoryStore::new();
        let task = Writer::new(&store, true);
        let ctx = task.context();

        // Another process finished the artifact after the pre-run check.
        store.insert(ctx.output().location(), "elsewhere").unwrap();

        assert_eq!(execute(&task, &ctx), TaskOutcome::Skipped);
        assert_eq!(task.runs(), 0);
        assert_eq!(store.get(&ctx.output().location()), Some(b"elsewhere".to_vec()));
    }

    #[test]
    fn unreachable_target_fails_without_running() {
        let store = MemoryStore::new();
        let task = Writer::new(&store, true);
        let ctx = task.context();

        store.set_offline(true);
        let outcome = execute(&task, &ctx);

        assert!(
            matches!(&outcome, TaskOutcome::Failed(TaskFailure::TargetIo(msg)) if msg.contains("offline")),
            "{outcome:?}"
        );
        assert_eq!(task.runs(), 0);
    }

    #[test]
    fn work_unit_must_leave_its_target_behind() {
        let store = MemoryStore::new();

        let writer = Writer::new(&store, true);
        assert_eq!(execute(&writer, &writer.context()), TaskOutcome::Done);
        assert_eq!(writer.runs(), 1);

        let lazy = Writer::new(&MemoryStore::new(), false);
        let outcome = execute(&lazy, &lazy.context());
        assert!(matches!(outcome, TaskOutcome::Failed(TaskFailure::MissingOutput(_))));
        assert_eq!(lazy.runs(), 1);
    }
}
