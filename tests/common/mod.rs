#![allow(dead_code)]

use std::sync::Arc;

use saltdag::dag::TaskState;
use saltdag::engine::RunReport;
use saltdag::task::{Task, TaskKey};

pub use saltdag_test_utils::{init_tracing, with_timeout};

/// Run `roots` on `workers` workers, failing the test on a configuration
/// error or a hang.
pub async fn run_ok(roots: &[Arc<dyn Task>], workers: usize) -> RunReport {
    with_timeout(saltdag::build(roots.to_vec(), workers))
        .await
        .expect("run should not fail with a configuration error")
}

/// State of `task` in `report`; panics if the task is not part of the run.
pub fn state_of<'a>(report: &'a RunReport, task: &Arc<dyn Task>) -> &'a TaskState {
    let key = TaskKey::of(task.as_ref());
    &report
        .find(&key)
        .unwrap_or_else(|| panic!("{key} missing from report:\n{report}"))
        .state
}
