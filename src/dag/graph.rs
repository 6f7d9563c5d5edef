// src/dag/graph.rs

use std::collections::HashMap;
use std::sync::Arc;

use petgraph::Direction;
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};

use crate::dag::identity::Fingerprint;
use crate::target::Target;
use crate::task::{Task, TaskContext, TaskKey};

/// Index of a task inside a [`TaskGraph`].
pub type TaskId = NodeIndex;

/// A resolved task: the instance plus everything derived from it.
#[derive(Debug, Clone)]
pub struct TaskNode {
    pub task: Arc<dyn Task>,
    pub key: TaskKey,
    pub salt: Fingerprint,
    pub target: Arc<dyn Target>,
    /// Direct dependencies in declaration order (deduplicated).
    pub deps: Vec<TaskId>,
}

/// The execution graph: an arena of unique tasks with `dep -> dependent`
/// edges.
///
/// Nodes are stored in topological order, so iterating [`TaskGraph::order`]
/// always visits a task after all of its dependencies.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    graph: DiGraph<TaskNode, ()>,
    roots: Vec<TaskId>,
    index: HashMap<TaskKey, TaskId>,
}

impl TaskGraph {
    /// Assemble a graph from nodes that are already topologically ordered
    /// (every `deps` entry points at an earlier node).
    pub(crate) fn from_ordered(nodes: Vec<TaskNode>, roots: Vec<TaskId>) -> Self {
        let mut graph = DiGraph::with_capacity(nodes.len(), 0);
        let mut index = HashMap::with_capacity(nodes.len());

        for node in nodes {
            let key = node.key.clone();
            let deps = node.deps.clone();
            let id = graph.add_node(node);
            index.insert(key, id);
            for dep in deps {
                graph.add_edge(dep, id, ());
            }
        }

        Self {
            graph,
            roots,
            index,
        }
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// The tasks the caller asked for, deduplicated.
    pub fn roots(&self) -> &[TaskId] {
        &self.roots
    }

    /// All tasks in a valid execution order.
    pub fn order(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.graph.node_indices()
    }

    pub fn node(&self, id: TaskId) -> &TaskNode {
        &self.graph[id]
    }

    pub fn find(&self, key: &TaskKey) -> Option<TaskId> {
        self.index.get(key).copied()
    }

    pub fn dependencies_of(&self, id: TaskId) -> &[TaskId] {
        &self.graph[id].deps
    }

    /// Tasks that list `id` as a direct dependency.
    pub fn dependents_of(&self, id: TaskId) -> Vec<TaskId> {
        let mut out: Vec<TaskId> = self
            .graph
            .neighbors_directed(id, Direction::Outgoing)
            .collect();
        out.sort();
        out
    }

    /// Build the context handed to the task's work unit.
    pub fn context_for(&self, id: TaskId) -> TaskContext {
        let node = &self.graph[id];
        let inputs = node
            .deps
            .iter()
            .map(|dep| Arc::clone(&self.graph[*dep].target))
            .collect();
        TaskContext::new(
            node.key.clone(),
            node.salt.clone(),
            Arc::clone(&node.target),
            inputs,
        )
    }

    /// Graphviz rendering, one node per task labelled with its key and salt.
    pub fn to_dot(&self) -> String {
        let labelled = self
            .graph
            .map(|_, node| format!("{}\n{}", node.key, node.salt), |_, _| "");
        format!("{}", Dot::with_config(&labelled, &[Config::EdgeNoLabel]))
    }
}
