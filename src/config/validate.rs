// src/config/validate.rs

use crate::config::model::{PipelineConfig, RawPipelineConfig};
use crate::errors::{Result, SaltdagError};

impl TryFrom<RawPipelineConfig> for PipelineConfig {
    type Error = crate::errors::SaltdagError;

    fn try_from(raw: RawPipelineConfig) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        Ok(PipelineConfig::new_unchecked(raw))
    }
}

/// Check every semantic invariant of a deserialized config.
pub fn validate_config(cfg: &RawPipelineConfig) -> Result<()> {
    validate_run(cfg)?;
    validate_download(cfg)?;
    validate_preprocess(cfg)?;
    validate_train(cfg)?;
    Ok(())
}

fn validate_run(cfg: &RawPipelineConfig) -> Result<()> {
    if cfg.run.workers == 0 {
        return Err(SaltdagError::InvalidWorkerCount(0));
    }
    Ok(())
}

fn validate_download(cfg: &RawPipelineConfig) -> Result<()> {
    let dl = &cfg.download;

    if dl.shards == 0 {
        return Err(SaltdagError::ConfigError(
            "[download].shards must be >= 1 (got 0)".to_string(),
        ));
    }

    if dl.n_items % dl.shards != 0 {
        return Err(SaltdagError::ConfigError(format!(
            "[download].n_items ({}) must be divisible by [download].shards ({})",
            dl.n_items, dl.shards
        )));
    }

    if dl.version.trim().is_empty() {
        return Err(SaltdagError::ConfigError(
            "[download].version must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_preprocess(cfg: &RawPipelineConfig) -> Result<()> {
    if cfg.preprocess.image_shape.is_empty() {
        return Err(SaltdagError::ConfigError(
            "[preprocess].image_shape must have at least one dimension".to_string(),
        ));
    }
    if cfg.preprocess.image_shape.contains(&0) {
        return Err(SaltdagError::ConfigError(format!(
            "[preprocess].image_shape has a zero dimension: {:?}",
            cfg.preprocess.image_shape
        )));
    }
    Ok(())
}

fn validate_train(cfg: &RawPipelineConfig) -> Result<()> {
    let train = &cfg.train;

    for (name, value) in [("test_split", train.test_split), ("lr", train.lr)] {
        if let Some(v) = value {
            if !v.is_finite() {
                return Err(SaltdagError::ConfigError(format!(
                    "[train].{name} must be a finite number (got {v})"
                )));
            }
        }
    }

    if let Some(split) = train.test_split {
        if !(0.0..1.0).contains(&split) {
            return Err(SaltdagError::ConfigError(format!(
                "[train].test_split must be in [0, 1) (got {split})"
            )));
        }
    }

    Ok(())
}
