// src/pipeline/mod.rs

//! The bundled three-stage pipeline: `Download` shards → `Preprocess` →
//! `Train`.
//!
//! These are ordinary [`Task`] implementations; the engine knows nothing
//! about them.

pub mod download;
pub mod preprocess;
pub mod train;

use std::sync::Arc;

use tracing::debug;

use crate::config::PipelineConfig;
use crate::task::Task;

pub use download::Download;
pub use preprocess::Preprocess;
pub use train::{Train, TrainParams};

/// One `Download` per configured shard.
pub fn download_shards(cfg: &PipelineConfig) -> Vec<Download> {
    cfg.shard_ranges()
        .into_iter()
        .map(|(lower, upper)| Download {
            version: cfg.download.version.clone(),
            source: cfg.download.source.clone(),
            lower,
            upper,
            data_dir: cfg.run.data_dir.clone(),
        })
        .collect()
}

pub fn preprocess(cfg: &PipelineConfig) -> Preprocess {
    Preprocess {
        version: cfg.preprocess.version.clone(),
        image_shape: cfg.preprocess.image_shape.clone(),
        shards: download_shards(cfg),
        data_dir: cfg.run.data_dir.clone(),
    }
}

pub fn train(cfg: &PipelineConfig) -> Train {
    let t = &cfg.train;
    Train {
        version: t.version.clone(),
        hyper: TrainParams {
            batch_size: t.batch_size,
            test_split: t.test_split,
            num_classes: t.num_classes,
            lr: t.lr,
            seed: t.seed,
            epochs: t.epochs,
        },
        input: preprocess(cfg),
        data_dir: cfg.run.data_dir.clone(),
    }
}

/// Root tasks for a configured run.
pub fn build_roots(cfg: &PipelineConfig) -> Vec<Arc<dyn Task>> {
    debug!(
        shards = cfg.download.shards,
        n_items = cfg.download.n_items,
        "building pipeline roots"
    );
    vec![Arc::new(train(cfg))]
}
