// src/target/mod.rs

//! Persisted task outputs.
//!
//! A [`Target`] is the only state the engine shares across workers and across
//! processes. Its contract:
//!
//! - `exists()` is a side-effect free predicate.
//! - `open_for_write()` hands out a [`TargetWriter`]; nothing becomes visible
//!   at the target location until [`TargetWriter::commit`] succeeds, and a
//!   writer dropped without committing leaves no trace.
//!
//! [`LocalTarget`] implements this on the local filesystem by writing to a
//! temporary file in the destination directory and renaming it into place.
//! [`memory`] provides an in-process store for tests.

use std::fmt::Debug;
use std::fs;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use tracing::debug;

pub mod memory;

pub use memory::{MemoryStore, MemoryTarget};

/// Abstract persisted artifact.
pub trait Target: Send + Sync + Debug {
    /// Human-readable location (a path, a key, ...).
    fn location(&self) -> String;

    /// Whether the complete artifact is present.
    fn exists(&self) -> Result<bool>;

    /// Open a scoped writer whose contents only appear on `commit`.
    fn open_for_write(&self) -> Result<Box<dyn TargetWriter>>;

    /// Open the committed artifact for reading.
    fn open_for_read(&self) -> Result<Box<dyn Read + Send>>;
}

/// Writable handle with atomic finalization.
pub trait TargetWriter: Write + Send {
    /// Flush, make durable and publish the written bytes at the target
    /// location in one step.
    fn commit(self: Box<Self>) -> Result<()>;
}

/// Write `contents` to `target` in a single atomic step.
pub fn write_all(target: &dyn Target, contents: &[u8]) -> Result<()> {
    let mut writer = target.open_for_write()?;
    writer
        .write_all(contents)
        .with_context(|| format!("writing target {}", target.location()))?;
    writer.commit()
}

/// Read a committed target as UTF-8 text.
pub fn read_to_string(target: &dyn Target) -> Result<String> {
    let mut reader = target.open_for_read()?;
    let mut out = String::new();
    reader
        .read_to_string(&mut out)
        .with_context(|| format!("reading target {}", target.location()))?;
    Ok(out)
}

/// A file on the local filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTarget {
    path: PathBuf,
}

impl LocalTarget {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl Target for LocalTarget {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn exists(&self) -> Result<bool> {
        self.path
            .try_exists()
            .with_context(|| format!("checking existence of {:?}", self.path))
    }

    fn open_for_write(&self) -> Result<Box<dyn TargetWriter>> {
        let dir = self.parent_dir();
        fs::create_dir_all(dir).with_context(|| format!("creating dir {:?}", dir))?;

        // Same directory as the destination so the final rename never
        // crosses a filesystem boundary.
        let tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("creating temporary file in {:?}", dir))?;
        debug!(target = %self.location(), tmp = ?tmp.path(), "opened target for write");

        Ok(Box::new(LocalWriter {
            inner: BufWriter::new(tmp),
            dest: self.path.clone(),
        }))
    }

    fn open_for_read(&self) -> Result<Box<dyn Read + Send>> {
        let file =
            fs::File::open(&self.path).with_context(|| format!("opening file {:?}", self.path))?;
        Ok(Box::new(file))
    }
}

/// Writer for [`LocalTarget`]; the temporary file is deleted if dropped
/// uncommitted.
struct LocalWriter {
    inner: BufWriter<NamedTempFile>,
    dest: PathBuf,
}

impl Write for LocalWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl TargetWriter for LocalWriter {
    fn commit(self: Box<Self>) -> Result<()> {
        let LocalWriter { inner, dest } = *self;
        let tmp = inner
            .into_inner()
            .map_err(|e| e.into_error())
            .with_context(|| format!("flushing temporary file for {:?}", dest))?;

        tmp.as_file()
            .sync_all()
            .with_context(|| format!("syncing temporary file for {:?}", dest))?;
        tmp.persist(&dest)
            .with_context(|| format!("renaming temporary file into {:?}", dest))?;

        debug!(target = ?dest, "committed target");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_target_appears_only_after_commit() {
        let dir = tempfile::tempdir().unwrap();
        let target = LocalTarget::new(dir.path().join("nested").join("model-abc"));
        assert!(!target.exists().unwrap());

        let mut writer = target.open_for_write().unwrap();
        writer.write_all(b"weights").unwrap();
        assert!(!target.exists().unwrap());

        writer.commit().unwrap();
        assert!(target.exists().unwrap());
        assert_eq!(read_to_string(&target).unwrap(), "weights");
    }

    #[test]
    fn dropped_writer_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let target = LocalTarget::new(dir.path().join("_SUCCESS-abc"));

        {
            let mut writer = target.open_for_write().unwrap();
            writer.write_all(b"partial").unwrap();
        }

        assert!(!target.exists().unwrap());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
