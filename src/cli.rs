// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_config_path;

/// Command-line arguments for `saltdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "saltdag",
    version,
    about = "Run a salted task pipeline, skipping every stage whose output already exists.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the pipeline config file (TOML).
    ///
    /// Default: `Saltdag.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Number of workers; overrides `[run].workers`.
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Root directory for artifacts; overrides `[run].data_dir`.
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SALTDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve and fingerprint the graph, print the plan, run nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the resolved graph in Graphviz DOT format and exit.
    #[arg(long)]
    pub dot: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_are_optional() {
        let args = CliArgs::try_parse_from(["saltdag"]).unwrap();
        assert_eq!(args.config, PathBuf::from("Saltdag.toml"));
        assert!(args.workers.is_none());
        assert!(!args.dry_run);

        let args = CliArgs::try_parse_from(["saltdag", "--workers", "8", "--dot"]).unwrap();
        assert_eq!(args.workers, Some(8));
        assert!(args.dot);
    }
}
