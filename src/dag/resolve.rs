// src/dag/resolve.rs

//! Expansion of root tasks into the full execution graph.
//!
//! Traversal is depth-first from each root. Every task is keyed by its
//! logical identity ([`TaskKey`]), so two separately constructed instances
//! with equal type tag and parameters collapse into one node no matter how
//! many paths reach them. A task met again while it is still being expanded
//! closes a cycle, which is reported as a configuration error.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::dag::graph::{TaskGraph, TaskId, TaskNode};
use crate::dag::identity::{Fingerprint, compute_salt};
use crate::errors::{Result, SaltdagError};
use crate::task::{Task, TaskKey};
use crate::types::{Params, Schema};

#[derive(Debug, Clone, Copy)]
enum Visit {
    InProgress,
    Done(usize),
}

/// A task whose dependencies have all been expanded.
struct Expanded {
    task: Arc<dyn Task>,
    key: TaskKey,
    schema: Schema,
    params: Params,
    deps: Vec<usize>,
}

/// A task on the DFS stack, with the dependencies not yet walked.
struct Frame {
    task: Arc<dyn Task>,
    key: TaskKey,
    schema: Schema,
    params: Params,
    pending: std::vec::IntoIter<Arc<dyn Task>>,
    deps: Vec<usize>,
}

impl Frame {
    fn add_dep(&mut self, idx: usize) {
        if !self.deps.contains(&idx) {
            self.deps.push(idx);
        }
    }
}

/// Depth-first expansion with an explicit stack, so chain depth is bounded
/// by memory rather than by the thread stack.
#[derive(Default)]
struct Resolver {
    visits: HashMap<TaskKey, Visit>,
    /// Post-order of the traversal; doubles as the topological order.
    expanded: Vec<Expanded>,
    stack: Vec<Frame>,
}

impl Resolver {
    fn visit(&mut self, root: Arc<dyn Task>) -> Result<usize> {
        if let Some(idx) = self.enter(root)? {
            return Ok(idx);
        }

        while let Some(frame) = self.stack.last_mut() {
            match frame.pending.next() {
                Some(required) => {
                    if let Some(idx) = self.enter(required)? {
                        self.add_dep_to_top(idx);
                    }
                }
                None => {
                    let Some(frame) = self.stack.pop() else { break };
                    let idx = self.finish(frame);
                    match self.stack.last_mut() {
                        Some(parent) => parent.add_dep(idx),
                        None => return Ok(idx),
                    }
                }
            }
        }

        Err(SaltdagError::ConfigError(
            "resolver stack emptied before its root was expanded".to_string(),
        ))
    }

    /// Start visiting `task`. Returns the node index if it is already
    /// expanded, or `None` after pushing a new frame.
    fn enter(&mut self, task: Arc<dyn Task>) -> Result<Option<usize>> {
        let params = task.params();
        let key = TaskKey::new(task.kind(), &params);

        match self.visits.get(&key) {
            Some(Visit::Done(idx)) => return Ok(Some(*idx)),
            Some(Visit::InProgress) => return Err(self.cycle_error(&key)),
            None => {}
        }

        let schema = task.schema();
        schema
            .validate(&params)
            .map_err(|e| SaltdagError::InvalidParam {
                task: key.to_string(),
                reason: e.to_string(),
            })?;

        self.visits.insert(key.clone(), Visit::InProgress);
        let pending = task.requires().into_iter();
        self.stack.push(Frame {
            task,
            key,
            schema,
            params,
            pending,
            deps: Vec::new(),
        });

        Ok(None)
    }

    fn add_dep_to_top(&mut self, idx: usize) {
        if let Some(top) = self.stack.last_mut() {
            top.add_dep(idx);
        }
    }

    fn finish(&mut self, frame: Frame) -> usize {
        let idx = self.expanded.len();
        debug!(task = %frame.key, deps = frame.deps.len(), "expanded task");
        self.visits.insert(frame.key.clone(), Visit::Done(idx));
        self.expanded.push(Expanded {
            task: frame.task,
            key: frame.key,
            schema: frame.schema,
            params: frame.params,
            deps: frame.deps,
        });
        idx
    }

    fn cycle_error(&self, key: &TaskKey) -> SaltdagError {
        let start = self
            .stack
            .iter()
            .position(|f| &f.key == key)
            .unwrap_or(0);
        let cycle = self.stack[start..]
            .iter()
            .map(|f| &f.key)
            .chain(std::iter::once(key))
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join(" -> ");
        SaltdagError::DagCycle(format!("cycle detected: {cycle}"))
    }
}

/// Resolve `roots` into a [`TaskGraph`]: transitive closure, deduplicated by
/// logical identity, topologically ordered, with every node salted and its
/// target attached.
pub fn resolve(roots: &[Arc<dyn Task>]) -> Result<TaskGraph> {
    let mut resolver = Resolver::default();

    let mut root_ids = Vec::new();
    for root in roots {
        let idx = resolver.visit(Arc::clone(root))?;
        if !root_ids.contains(&idx) {
            root_ids.push(idx);
        }
    }

    // Dependencies always precede their dependents in `expanded`, so a
    // single forward pass sees every dependency salt before it is needed.
    let mut salts: Vec<Fingerprint> = Vec::with_capacity(resolver.expanded.len());
    let mut nodes = Vec::with_capacity(resolver.expanded.len());

    for entry in resolver.expanded {
        let dep_salts: Vec<Fingerprint> = entry.deps.iter().map(|d| salts[*d].clone()).collect();

        let salt = compute_salt(
            entry.task.kind(),
            entry.task.version(),
            &entry.schema,
            &entry.params,
            &dep_salts,
        )
        .map_err(|e| SaltdagError::InvalidParam {
            task: entry.key.to_string(),
            reason: e.to_string(),
        })?;

        let target = entry.task.output(&salt);
        debug!(
            task = %entry.key,
            salt = %salt,
            target = %target.location(),
            "salted task"
        );

        salts.push(salt.clone());
        nodes.push(TaskNode {
            task: entry.task,
            key: entry.key,
            salt,
            target,
            deps: entry.deps.into_iter().map(TaskId::new).collect(),
        });
    }

    let graph = TaskGraph::from_ordered(nodes, root_ids.into_iter().map(TaskId::new).collect());
    info!(
        tasks = graph.len(),
        roots = graph.roots().len(),
        "resolved task graph"
    );

    Ok(graph)
}
