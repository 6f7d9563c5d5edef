// src/pipeline/download.rs

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::dag::Fingerprint;
use crate::target::{LocalTarget, Target};
use crate::task::{Task, TaskContext};
use crate::types::{ParamKind, Params, Schema};

/// Fetches the items `[lower, upper)` of `source`.
///
/// The range only partitions the work: every shard of one source shares a
/// fingerprint, and the range is appended to the file name instead.
#[derive(Debug, Clone)]
pub struct Download {
    pub version: String,
    pub source: String,
    pub lower: u32,
    pub upper: u32,
    pub data_dir: PathBuf,
}

impl Download {
    pub const KIND: &'static str = "Download";

    /// Deterministic stand-in for the fetched item.
    pub fn item(source: &str, index: u32) -> String {
        format!("{source}#{index:06}")
    }
}

impl Task for Download {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .param("source", ParamKind::Str)
            .partition("lower", ParamKind::Int)
            .partition("upper", ParamKind::Int)
    }

    fn params(&self) -> Params {
        Params::new()
            .with("source", self.source.as_str())
            .with("lower", self.lower)
            .with("upper", self.upper)
    }

    fn output(&self, salt: &Fingerprint) -> Arc<dyn Target> {
        let name = format!("download-{salt}-{}-{}.txt", self.lower, self.upper);
        Arc::new(LocalTarget::new(self.data_dir.join("raw").join(name)))
    }

    fn run(&self, ctx: &TaskContext) -> Result<()> {
        let mut writer = ctx.output().open_for_write()?;
        for index in self.lower..self.upper {
            writeln!(writer, "{}", Self::item(&self.source, index))
                .with_context(|| format!("writing item {index}"))?;
        }
        writer.commit()
    }
}
