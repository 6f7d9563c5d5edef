// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! `SaltdagError` covers everything that aborts a run *before* any work unit
//! executes (configuration problems, cycles, bad parameters). Failures of an
//! individual task are not errors of the run; they are recorded in the
//! [`RunReport`](crate::engine::RunReport) as [`TaskFailure`](crate::engine::TaskFailure).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SaltdagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Cycle detected in task graph: {0}")]
    DagCycle(String),

    #[error("Invalid parameter for task '{task}': {reason}")]
    InvalidParam { task: String, reason: String },

    #[error("Invalid worker count: {0} (must be >= 1)")]
    InvalidWorkerCount(usize),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SaltdagError {
    /// Whether this error belongs to the configuration class: fatal, detected
    /// before execution, and never worth retrying without changing inputs.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SaltdagError::ConfigError(_)
                | SaltdagError::DagCycle(_)
                | SaltdagError::InvalidParam { .. }
                | SaltdagError::InvalidWorkerCount(_)
                | SaltdagError::TomlError(_)
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SaltdagError>;
