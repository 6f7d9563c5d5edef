// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod pipeline;
pub mod target;
pub mod task;
pub mod types;

use std::fmt::Write as _;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::load_and_validate;
use crate::dag::{Scheduler, TaskGraph, resolve};
use crate::engine::{CoreRuntime, RunReport, Runtime, RuntimeEvent};
use crate::errors::{Result, SaltdagError};
use crate::exec::LocalExecutorBackend;
use crate::task::Task;

/// Options for [`build_with_options`].
#[derive(Debug, Clone, Copy)]
pub struct BuildOptions {
    /// Size of the worker pool; must be at least 1.
    pub workers: usize,
    /// Stop the run on Ctrl-C.
    pub handle_interrupt: bool,
}

impl BuildOptions {
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            handle_interrupt: false,
        }
    }
}

/// Resolve `roots` and run the graph to completion on `workers` workers.
///
/// Configuration problems (bad worker count, cycles, invalid parameters) are
/// returned as `Err` before any work unit runs. Task failures are not errors:
/// they are reported in the returned [`RunReport`].
pub async fn build(roots: Vec<Arc<dyn Task>>, workers: usize) -> Result<RunReport> {
    build_with_options(roots, BuildOptions::new(workers)).await
}

pub async fn build_with_options(
    roots: Vec<Arc<dyn Task>>,
    options: BuildOptions,
) -> Result<RunReport> {
    if options.workers == 0 {
        return Err(SaltdagError::InvalidWorkerCount(options.workers));
    }

    let graph = Arc::new(resolve(&roots)?);
    run_graph(graph, options).await
}

/// Run an already resolved graph.
pub async fn run_graph(graph: Arc<TaskGraph>, options: BuildOptions) -> Result<RunReport> {
    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let executor = LocalExecutorBackend::new(options.workers, rt_tx.clone())?;

    // Ctrl-C → graceful shutdown.
    let interrupt = options.handle_interrupt.then(|| {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            info!("Ctrl+C received; stopping run");
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        })
    });
    drop(rt_tx);

    // Construct the pure core runtime (single source of truth for semantics).
    let core = CoreRuntime::new(Scheduler::new(graph));

    // Construct the async IO shell around the core.
    let runtime = Runtime::new(core, rt_rx, executor);
    let report = runtime.run().await;

    if let Some(handle) = interrupt {
        handle.abort();
    }

    report
}

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and CLI overrides
/// - pipeline construction and resolution
/// - dry-run / Graphviz output, or a full run
///
/// Returns `None` when nothing was executed.
pub async fn run(args: CliArgs) -> Result<Option<RunReport>> {
    let mut cfg = load_and_validate(&args.config)?;

    if let Some(workers) = args.workers {
        cfg.set_workers(workers);
    }
    if let Some(data_dir) = args.data_dir.clone() {
        cfg.set_data_dir(data_dir);
    }

    let options = BuildOptions {
        workers: cfg.run.workers,
        handle_interrupt: true,
    };
    if options.workers == 0 {
        return Err(SaltdagError::InvalidWorkerCount(0));
    }

    let roots = pipeline::build_roots(&cfg);
    let graph = resolve(&roots)?;

    if args.dot {
        println!("{}", graph.to_dot());
        return Ok(None);
    }

    if args.dry_run {
        print!("{}", render_plan(&graph));
        debug!("dry-run complete (no execution)");
        return Ok(None);
    }

    info!(
        workers = options.workers,
        data_dir = %cfg.run.data_dir.display(),
        "starting run"
    );
    run_graph(Arc::new(graph), options).await.map(Some)
}

/// Dry-run listing: every task in execution order with its identity,
/// fingerprint, target and whether that target already exists.
pub fn render_plan(graph: &TaskGraph) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "saltdag dry-run ({} tasks)", graph.len());

    for id in graph.order() {
        let node = graph.node(id);
        let status = match node.target.exists() {
            Ok(true) => "present".to_string(),
            Ok(false) => "missing".to_string(),
            Err(e) => format!("unknown ({e:#})"),
        };

        let _ = writeln!(out, "  - {}", node.key);
        let _ = writeln!(out, "      salt: {}", node.salt);
        let _ = writeln!(out, "      target: {} [{status}]", node.target.location());
        let deps = graph.dependencies_of(id);
        if !deps.is_empty() {
            let names: Vec<String> = deps.iter().map(|d| graph.node(*d).key.to_string()).collect();
            let _ = writeln!(out, "      requires: {}", names.join("; "));
        }
    }

    out
}
