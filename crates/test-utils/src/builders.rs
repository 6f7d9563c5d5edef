#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::bail;
use saltdag::dag::Fingerprint;
use saltdag::target::{MemoryStore, Target, write_all};
use saltdag::task::{Task, TaskContext, TaskKey};
use saltdag::types::{ParamKind, ParamValue, Params, Schema};

/// What a [`TestTask`] does when its work unit runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Behaviour {
    /// Write the target.
    Succeed,
    /// Return an error without writing.
    Fail(String),
    /// Panic inside the work unit.
    Panic(String),
    /// Return `Ok` without writing the target.
    ForgetOutput,
}

/// Tracks how many work units run at the same time.
#[derive(Debug, Default)]
pub struct ConcurrencyGauge {
    current: AtomicUsize,
    max: AtomicUsize,
}

impl ConcurrencyGauge {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn enter(&self) -> GaugeGuard<'_> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
        GaugeGuard(self)
    }

    /// Highest number of concurrently running work units seen so far.
    pub fn max(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }
}

struct GaugeGuard<'a>(&'a ConcurrencyGauge);

impl Drop for GaugeGuard<'_> {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Shared log of work units in the order they ran.
pub type Journal = Arc<Mutex<Vec<TaskKey>>>;

/// Configurable task backed by a [`MemoryStore`].
///
/// The target location is `<kind>-<salt>` followed by `-<value>` for every
/// partition parameter, so shards sharing a salt still get distinct targets.
#[derive(Debug, Clone)]
pub struct TestTask {
    kind: String,
    version: String,
    schema: Schema,
    params: Params,
    partitions: Vec<String>,
    deps: Vec<Arc<dyn Task>>,
    store: MemoryStore,
    behaviour: Behaviour,
    runs: Arc<AtomicUsize>,
    gauge: Option<Arc<ConcurrencyGauge>>,
    journal: Option<Journal>,
    delay: Option<Duration>,
}

impl TestTask {
    /// How many times the work unit ran.
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

impl Task for TestTask {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn schema(&self) -> Schema {
        self.schema.clone()
    }

    fn params(&self) -> Params {
        self.params.clone()
    }

    fn requires(&self) -> Vec<Arc<dyn Task>> {
        self.deps.clone()
    }

    fn output(&self, salt: &Fingerprint) -> Arc<dyn Target> {
        let mut location = format!("{}-{salt}", self.kind);
        for name in &self.partitions {
            if let Some(text) = self.params.get(name).and_then(ParamValue::canonical) {
                location.push('-');
                location.push_str(&text);
            }
        }
        Arc::new(self.store.target(location))
    }

    fn run(&self, ctx: &TaskContext) -> anyhow::Result<()> {
        let _guard = self.gauge.as_ref().map(|g| g.enter());

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        self.runs.fetch_add(1, Ordering::SeqCst);
        if let Some(journal) = &self.journal {
            journal
                .lock()
                .expect("journal poisoned")
                .push(ctx.key().clone());
        }

        match &self.behaviour {
            Behaviour::Succeed => write_all(ctx.output().as_ref(), ctx.key().to_string().as_bytes()),
            Behaviour::Fail(msg) => bail!("{msg}"),
            Behaviour::Panic(msg) => panic!("{msg}"),
            Behaviour::ForgetOutput => Ok(()),
        }
    }
}

/// Builder for [`TestTask`] to simplify test setup.
pub struct TestTaskBuilder {
    task: TestTask,
}

impl TestTaskBuilder {
    pub fn new(kind: &str, store: &MemoryStore) -> Self {
        Self {
            task: TestTask {
                kind: kind.to_string(),
                version: "1.0".to_string(),
                schema: Schema::new(),
                params: Params::new(),
                partitions: Vec::new(),
                deps: Vec::new(),
                store: store.clone(),
                behaviour: Behaviour::Succeed,
                runs: Arc::new(AtomicUsize::new(0)),
                gauge: None,
                journal: None,
                delay: None,
            },
        }
    }

    pub fn version(mut self, version: &str) -> Self {
        self.task.version = version.to_string();
        self
    }

    /// Declare an identity parameter and set its value.
    pub fn param(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        let value = value.into();
        self.task.schema = self.task.schema.param(name, value.kind());
        self.task.params.insert(name, value);
        self
    }

    /// Declare a partition parameter and set its value.
    pub fn partition(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        let value = value.into();
        self.task.schema = self.task.schema.partition(name, value.kind());
        self.task.params.insert(name, value);
        self.task.partitions.push(name.to_string());
        self
    }

    /// Declare a parameter without giving it a value.
    pub fn declare_param(mut self, name: &str, kind: ParamKind) -> Self {
        self.task.schema = self.task.schema.param(name, kind);
        self
    }

    /// Set a value without declaring it in the schema.
    pub fn undeclared_param(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.task.params.insert(name, value);
        self
    }

    pub fn requires(mut self, dep: &Arc<dyn Task>) -> Self {
        self.task.deps.push(Arc::clone(dep));
        self
    }

    pub fn behaviour(mut self, behaviour: Behaviour) -> Self {
        self.task.behaviour = behaviour;
        self
    }

    pub fn fails(self, msg: &str) -> Self {
        self.behaviour(Behaviour::Fail(msg.to_string()))
    }

    /// Share a run counter with the test.
    pub fn runs(mut self, counter: &Arc<AtomicUsize>) -> Self {
        self.task.runs = Arc::clone(counter);
        self
    }

    pub fn gauge(mut self, gauge: &Arc<ConcurrencyGauge>) -> Self {
        self.task.gauge = Some(Arc::clone(gauge));
        self
    }

    pub fn journal(mut self, journal: &Journal) -> Self {
        self.task.journal = Some(Arc::clone(journal));
        self
    }

    /// Block inside the work unit for `delay`.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.task.delay = Some(delay);
        self
    }

    pub fn build(self) -> Arc<dyn Task> {
        Arc::new(self.task)
    }
}

/// New empty journal.
pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}
