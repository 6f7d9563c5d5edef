// src/task.rs

//! The task abstraction walked by the resolver and the scheduler.

use std::fmt;
use std::sync::Arc;

use crate::dag::identity::Fingerprint;
use crate::target::Target;
use crate::types::{Params, Schema};

/// A node in the pipeline DAG.
///
/// Implementors are plain immutable values: the type tag plus the parameter
/// values form the task's logical identity, and `requires` must be a pure
/// function of those parameters.
pub trait Task: Send + Sync + fmt::Debug + 'static {
    /// Type tag, e.g. `"Download"`.
    fn kind(&self) -> &str;

    /// Semantic version, bumped by hand whenever the task's behaviour changes.
    fn version(&self) -> &str;

    /// Parameters accepted by this task kind.
    fn schema(&self) -> Schema {
        Schema::new()
    }

    /// Concrete parameter values of this instance.
    fn params(&self) -> Params {
        Params::new()
    }

    /// Direct upstream tasks.
    fn requires(&self) -> Vec<Arc<dyn Task>> {
        Vec::new()
    }

    /// The artifact this task produces, named from its fingerprint.
    fn output(&self, salt: &Fingerprint) -> Arc<dyn Target>;

    /// The unit of work. Must leave `ctx.output()` existing on success.
    fn run(&self, ctx: &TaskContext) -> anyhow::Result<()>;
}

/// Logical identity of a task: type tag plus the canonical text of *all*
/// parameters (partition parameters included).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskKey {
    kind: String,
    params: String,
}

impl TaskKey {
    /// Build a key from already-validated parameters.
    ///
    /// Values without a canonical form are rendered as `?`; the resolver
    /// validates parameters before a key is ever used for deduplication.
    pub fn new(kind: &str, params: &Params) -> Self {
        let params = params
            .iter()
            .map(|(name, value)| {
                let text = value.canonical().unwrap_or_else(|| "?".to_string());
                format!("{name}={text}")
            })
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            kind: kind.to_string(),
            params,
        }
    }

    pub fn of(task: &dyn Task) -> Self {
        Self::new(task.kind(), &task.params())
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind, self.params)
    }
}

/// Everything a work unit gets to see while it runs.
#[derive(Debug, Clone)]
pub struct TaskContext {
    key: TaskKey,
    salt: Fingerprint,
    output: Arc<dyn Target>,
    inputs: Vec<Arc<dyn Target>>,
}

impl TaskContext {
    pub fn new(
        key: TaskKey,
        salt: Fingerprint,
        output: Arc<dyn Target>,
        inputs: Vec<Arc<dyn Target>>,
    ) -> Self {
        Self {
            key,
            salt,
            output,
            inputs,
        }
    }

    pub fn key(&self) -> &TaskKey {
        &self.key
    }

    pub fn salt(&self) -> &Fingerprint {
        &self.salt
    }

    /// This task's own target.
    pub fn output(&self) -> &Arc<dyn Target> {
        &self.output
    }

    /// Targets of the direct dependencies, in declaration order.
    pub fn inputs(&self) -> &[Arc<dyn Target>] {
        &self.inputs
    }
}
