// src/config/mod.rs

//! Configuration loading and validation for the bundled pipeline.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate worker count, shard layout and training values (`validate.rs`).
//!
//! The engine itself never reads configuration; the CLI turns a
//! [`PipelineConfig`] into task values.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    DownloadSection, PipelineConfig, PreprocessSection, RawPipelineConfig, RunSection,
    TrainSection,
};
pub use validate::validate_config;
