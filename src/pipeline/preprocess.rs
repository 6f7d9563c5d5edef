// src/pipeline/preprocess.rs

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};

use crate::dag::Fingerprint;
use crate::pipeline::download::Download;
use crate::target::{LocalTarget, Target, read_to_string};
use crate::task::{Task, TaskContext};
use crate::types::{ParamKind, ParamValue, Params, Schema};

/// Merges every download shard into one normalized dataset.
#[derive(Debug, Clone)]
pub struct Preprocess {
    pub version: String,
    pub image_shape: Vec<u32>,
    pub shards: Vec<Download>,
    pub data_dir: PathBuf,
}

impl Preprocess {
    pub const KIND: &'static str = "Preprocess";

    fn n_items(&self) -> u32 {
        self.shards.iter().map(|d| d.upper - d.lower).sum()
    }

    fn source(&self) -> &str {
        self.shards.first().map(|d| d.source.as_str()).unwrap_or_default()
    }

    fn encode(&self, item: &str) -> String {
        let digest = blake3::hash(item.as_bytes()).to_hex();
        format!("{item}\t{}", &digest.as_str()[..16])
    }
}

impl Task for Preprocess {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .param("source", ParamKind::Str)
            .param("n_items", ParamKind::Int)
            .param("image_shape", ParamKind::Tuple)
    }

    fn params(&self) -> Params {
        Params::new()
            .with("source", self.source())
            .with("n_items", self.n_items())
            .with("image_shape", ParamValue::tuple(self.image_shape.iter().copied()))
    }

    fn requires(&self) -> Vec<Arc<dyn Task>> {
        self.shards
            .iter()
            .map(|d| Arc::new(d.clone()) as Arc<dyn Task>)
            .collect()
    }

    fn output(&self, salt: &Fingerprint) -> Arc<dyn Target> {
        let name = format!("preprocess-{salt}.txt");
        Arc::new(LocalTarget::new(self.data_dir.join("processed").join(name)))
    }

    fn run(&self, ctx: &TaskContext) -> Result<()> {
        let mut items = Vec::new();
        for input in ctx.inputs() {
            let contents = read_to_string(input.as_ref())?;
            items.extend(contents.lines().map(str::to_string));
        }

        if items.len() != self.n_items() as usize {
            bail!(
                "expected {} downloaded items, found {}",
                self.n_items(),
                items.len()
            );
        }

        let shape = self
            .image_shape
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join("x");

        let mut writer = ctx.output().open_for_write()?;
        writeln!(writer, "# shape={shape} items={}", items.len()).context("writing header")?;
        for item in &items {
            writeln!(writer, "{}", self.encode(item)).context("writing item")?;
        }
        writer.commit()
    }
}
