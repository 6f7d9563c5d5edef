use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use proptest::prelude::*;
use saltdag::dag::{FailureCause, Probe, Scheduler, TaskGraph, TaskId, TaskState, resolve};
use saltdag::engine::{TaskFailure, TaskOutcome};
use saltdag::target::MemoryStore;
use saltdag::task::Task;
use saltdag_test_utils::builders::TestTaskBuilder;

// Acyclic by construction: task N may only depend on tasks 0..N-1.
fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        )
        .prop_map(|raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, deps)| {
                    let mut valid: Vec<usize> = if i == 0 {
                        Vec::new()
                    } else {
                        deps.into_iter().map(|d| d % i).collect()
                    };
                    valid.sort();
                    valid.dedup();
                    valid
                })
                .collect()
        })
    })
}

fn build_graph(deps: &[Vec<usize>]) -> TaskGraph {
    let store = MemoryStore::new();
    let mut tasks: Vec<Arc<dyn Task>> = Vec::new();
    for (i, task_deps) in deps.iter().enumerate() {
        let mut builder = TestTaskBuilder::new("Node", &store).param("i", i as i64);
        for d in task_deps {
            builder = builder.requires(&tasks[*d]);
        }
        tasks.push(builder.build());
    }
    resolve(&tasks).unwrap()
}

proptest! {
    #[test]
    fn scheduler_terminates_and_respects_dependencies(
        deps in dag_strategy(12),
        failing in proptest::collection::hash_set(0..12usize, 0..4),
        present in proptest::collection::hash_set(0..12usize, 0..4),
        pick in proptest::collection::vec(any::<usize>(), 64),
    ) {
        let graph = Arc::new(build_graph(&deps));
        let mut scheduler = Scheduler::new(Arc::clone(&graph));

        let probes = graph
            .order()
            .map(|id| {
                let probe = if present.contains(&id.index()) { Probe::Present } else { Probe::Absent };
                (id, probe)
            })
            .collect();

        let mut executing: VecDeque<TaskId> = VecDeque::new();
        let mut dispatched: HashSet<TaskId> = HashSet::new();

        let step = scheduler.seed(probes);
        for t in step.newly_ready {
            prop_assert!(dispatched.insert(t.id), "task dispatched twice");
            executing.push_back(t.id);
        }

        let mut steps = 0;
        while let Some(front) = executing.pop_front() {
            steps += 1;
            prop_assert!(steps <= graph.len(), "more completions than tasks");

            // Complete tasks in a pseudo-random order.
            executing.push_back(front);
            let idx = pick[steps % pick.len()] % executing.len();
            let id = executing.remove(idx).unwrap();

            for dep in graph.dependencies_of(id) {
                prop_assert!(scheduler.state_of(*dep).is_success(), "dispatched before its deps finished");
            }

            scheduler.handle_started(id);
            let outcome = if failing.contains(&id.index()) {
                TaskOutcome::Failed(TaskFailure::WorkUnit("boom".into()))
            } else {
                TaskOutcome::Done
            };

            let step = scheduler.handle_completion(id, outcome);
            for t in step.newly_ready {
                prop_assert!(dispatched.insert(t.id), "task dispatched twice");
                executing.push_back(t.id);
            }
        }

        prop_assert!(scheduler.is_finished(), "scheduler stuck with nothing running");

        for id in graph.order() {
            match scheduler.state_of(id) {
                TaskState::Done => {
                    prop_assert!(graph.dependencies_of(id).iter().all(|d| scheduler.state_of(*d).is_success()));
                }
                TaskState::Skipped => prop_assert!(present.contains(&id.index())),
                TaskState::NotNeeded => {
                    prop_assert!(!present.contains(&id.index()));
                    prop_assert!(!graph.roots().contains(&id));
                    prop_assert!(!dispatched.contains(&id));
                    prop_assert!(graph.dependents_of(id).iter().all(|d| matches!(
                        scheduler.state_of(*d),
                        TaskState::Skipped | TaskState::NotNeeded
                    )));
                }
                TaskState::Failed(FailureCause::Error(_)) => {
                    prop_assert!(failing.contains(&id.index()));
                }
                TaskState::Failed(FailureCause::Dependency { .. }) => {
                    prop_assert!(!dispatched.contains(&id));
                    prop_assert!(graph
                        .dependencies_of(id)
                        .iter()
                        .any(|d| matches!(scheduler.state_of(*d), TaskState::Failed(_))));
                }
                other => prop_assert!(false, "non-terminal state {} after the run", other),
            }
        }
    }
}
