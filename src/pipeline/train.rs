// src/pipeline/train.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::dag::Fingerprint;
use crate::pipeline::preprocess::Preprocess;
use crate::target::{LocalTarget, Target, read_to_string, write_all};
use crate::task::{Task, TaskContext};
use crate::types::{ParamKind, Params, Schema};

/// Hyperparameters of a training run. Unset values stay unset so that
/// resolution reports them instead of silently defaulting.
#[derive(Debug, Clone, Default)]
pub struct TrainParams {
    pub batch_size: Option<u32>,
    pub test_split: Option<f64>,
    pub num_classes: Option<u32>,
    pub lr: Option<f64>,
    pub seed: Option<i64>,
    pub epochs: Option<u32>,
}

/// Fits a model on the preprocessed dataset.
///
/// The model is written to `models/model-<salt>` first; the target itself is
/// the `models/_SUCCESS-<salt>` marker, committed only once the model is in
/// place.
#[derive(Debug, Clone)]
pub struct Train {
    pub version: String,
    pub hyper: TrainParams,
    pub input: Preprocess,
    pub data_dir: PathBuf,
}

impl Train {
    pub const KIND: &'static str = "Train";

    fn models_dir(&self) -> PathBuf {
        self.data_dir.join("models")
    }

    /// The model artifact vouched for by the marker with the same salt.
    pub fn model_target(&self, salt: &Fingerprint) -> LocalTarget {
        LocalTarget::new(self.models_dir().join(format!("model-{salt}")))
    }
}

impl Task for Train {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .param("batch_size", ParamKind::Int)
            .param("test_split", ParamKind::Float)
            .param("num_classes", ParamKind::Int)
            .param("lr", ParamKind::Float)
            .param("seed", ParamKind::Int)
            .param("epochs", ParamKind::Int)
    }

    fn params(&self) -> Params {
        let mut params = Params::new();
        if let Some(v) = self.hyper.batch_size {
            params.insert("batch_size", v);
        }
        if let Some(v) = self.hyper.test_split {
            params.insert("test_split", v);
        }
        if let Some(v) = self.hyper.num_classes {
            params.insert("num_classes", v);
        }
        if let Some(v) = self.hyper.lr {
            params.insert("lr", v);
        }
        if let Some(v) = self.hyper.seed {
            params.insert("seed", v);
        }
        if let Some(v) = self.hyper.epochs {
            params.insert("epochs", v);
        }
        params
    }

    fn requires(&self) -> Vec<Arc<dyn Task>> {
        vec![Arc::new(self.input.clone())]
    }

    fn output(&self, salt: &Fingerprint) -> Arc<dyn Target> {
        Arc::new(LocalTarget::new(
            self.models_dir().join(format!("_SUCCESS-{salt}")),
        ))
    }

    fn run(&self, ctx: &TaskContext) -> Result<()> {
        let Some(dataset) = ctx.inputs().first() else {
            bail!("training needs the preprocessed dataset as input");
        };
        let dataset = read_to_string(dataset.as_ref())?;

        let rows: Vec<&str> = dataset.lines().filter(|l| !l.starts_with('#')).collect();
        let split = self.hyper.test_split.unwrap_or_default();
        let held_out = (rows.len() as f64 * split).round() as usize;
        let train_rows = rows.len().saturating_sub(held_out);

        // Stand-in for fitting: a digest over the training rows and every
        // hyperparameter, so the model changes whenever its inputs do.
        let mut hasher = blake3::Hasher::new();
        for row in &rows[..train_rows] {
            hasher.update(row.as_bytes());
        }
        hasher.update(format!("{:?}", self.hyper).as_bytes());
        let weights = hasher.finalize().to_hex();

        let model = format!(
            "train_rows={train_rows}\nheld_out={held_out}\nweights={}\n",
            weights.as_str()
        );

        let model_target = self.model_target(ctx.salt());
        write_all(&model_target, model.as_bytes())
            .with_context(|| format!("saving model to {}", model_target.location()))?;
        info!(model = %model_target.location(), train_rows, held_out, "model saved");

        write_all(ctx.output().as_ref(), b"success")
    }
}
