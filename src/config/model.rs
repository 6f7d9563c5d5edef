// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

/// Pipeline configuration as read from a TOML file.
///
/// ```toml
/// [run]
/// workers = 4
/// data_dir = "data"
///
/// [download]
/// version = "1.0"
/// n_items = 100
/// shards = 4
///
/// [preprocess]
/// image_shape = [64, 32, 32, 5]
///
/// [train]
/// batch_size = 32
/// test_split = 0.2
/// num_classes = 10
/// lr = 0.001
/// seed = 42
/// epochs = 5
/// ```
///
/// Every section is optional. Missing `[train]` values are not defaulted:
/// they surface as missing task parameters when the graph is resolved.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawPipelineConfig {
    #[serde(default)]
    pub run: RunSection,

    #[serde(default)]
    pub download: DownloadSection,

    #[serde(default)]
    pub preprocess: PreprocessSection,

    #[serde(default)]
    pub train: TrainSection,
}

/// `[run]` section: how the engine executes the graph.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunSection {
    /// Size of the worker pool.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Root directory for every artifact and completion marker.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_workers() -> usize {
    4
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            data_dir: default_data_dir(),
        }
    }
}

/// `[download]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DownloadSection {
    #[serde(default = "default_download_version")]
    pub version: String,

    /// Name of the upstream source; part of the download identity.
    #[serde(default = "default_source")]
    pub source: String,

    /// Total number of items to fetch.
    #[serde(default = "default_n_items")]
    pub n_items: u32,

    /// Number of equal `[lower, upper)` ranges the items are split into.
    #[serde(default = "default_shards")]
    pub shards: u32,
}

fn default_download_version() -> String {
    "1.0".to_string()
}

fn default_source() -> String {
    "urls.txt".to_string()
}

fn default_n_items() -> u32 {
    100
}

fn default_shards() -> u32 {
    4
}

impl Default for DownloadSection {
    fn default() -> Self {
        Self {
            version: default_download_version(),
            source: default_source(),
            n_items: default_n_items(),
            shards: default_shards(),
        }
    }
}

/// `[preprocess]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PreprocessSection {
    #[serde(default = "default_preprocess_version")]
    pub version: String,

    #[serde(default = "default_image_shape")]
    pub image_shape: Vec<u32>,
}

fn default_preprocess_version() -> String {
    "0.1.0".to_string()
}

fn default_image_shape() -> Vec<u32> {
    vec![64, 32, 32, 5]
}

impl Default for PreprocessSection {
    fn default() -> Self {
        Self {
            version: default_preprocess_version(),
            image_shape: default_image_shape(),
        }
    }
}

/// `[train]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrainSection {
    #[serde(default = "default_train_version")]
    pub version: String,

    #[serde(default)]
    pub batch_size: Option<u32>,

    /// Fraction of the data held out for evaluation.
    #[serde(default)]
    pub test_split: Option<f64>,

    #[serde(default)]
    pub num_classes: Option<u32>,

    #[serde(default)]
    pub lr: Option<f64>,

    #[serde(default)]
    pub seed: Option<i64>,

    #[serde(default)]
    pub epochs: Option<u32>,
}

fn default_train_version() -> String {
    "0.1.0".to_string()
}

impl Default for TrainSection {
    fn default() -> Self {
        Self {
            version: default_train_version(),
            batch_size: None,
            test_split: None,
            num_classes: None,
            lr: None,
            seed: None,
            epochs: None,
        }
    }
}

/// Validated pipeline configuration.
///
/// Only obtainable through `TryFrom<RawPipelineConfig>` (see
/// [`validate`](super::validate)), so its invariants always hold.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub run: RunSection,
    pub download: DownloadSection,
    pub preprocess: PreprocessSection,
    pub train: TrainSection,
}

impl PipelineConfig {
    pub(crate) fn new_unchecked(raw: RawPipelineConfig) -> Self {
        Self {
            run: raw.run,
            download: raw.download,
            preprocess: raw.preprocess,
            train: raw.train,
        }
    }

    /// Width of each download shard.
    pub fn shard_width(&self) -> u32 {
        self.download.n_items / self.download.shards
    }

    /// `[lower, upper)` of every download shard, in order.
    pub fn shard_ranges(&self) -> Vec<(u32, u32)> {
        let width = self.shard_width();
        (0..self.download.shards)
            .map(|i| (i * width, (i + 1) * width))
            .collect()
    }

    /// Override the worker count (CLI flag). Must be re-checked by the engine.
    pub fn set_workers(&mut self, workers: usize) {
        self.run.workers = workers;
    }

    pub fn set_data_dir(&mut self, data_dir: PathBuf) {
        self.run.data_dir = data_dir;
    }
}
