// src/target/memory.rs

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Result, anyhow, bail};

use super::{Target, TargetWriter};

/// Shared in-memory artifact store.
///
/// Cloning is cheap and every clone sees the same entries, so a test can keep
/// one handle for assertions while tasks write through [`MemoryTarget`]s.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    offline: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A target stored under `location`.
    pub fn target(&self, location: impl Into<String>) -> MemoryTarget {
        MemoryTarget {
            store: self.clone(),
            location: location.into(),
        }
    }

    /// Make every subsequent operation fail, simulating unavailable storage.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn insert(&self, location: impl Into<String>, contents: impl Into<Vec<u8>>) -> Result<()> {
        self.lock()?.insert(location.into(), contents.into());
        Ok(())
    }

    pub fn remove(&self, location: &str) -> Result<bool> {
        Ok(self.lock()?.remove(location).is_some())
    }

    pub fn contains(&self, location: &str) -> bool {
        self.lock().is_ok_and(|entries| entries.contains_key(location))
    }

    pub fn get(&self, location: &str) -> Option<Vec<u8>> {
        self.lock().ok()?.get(location).cloned()
    }

    /// All stored locations, sorted.
    pub fn locations(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .lock()
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        out.sort();
        out
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        if self.offline.load(Ordering::SeqCst) {
            bail!("memory store is offline");
        }
        self.entries
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }
}

/// A single entry in a [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct MemoryTarget {
    store: MemoryStore,
    location: String,
}

impl Target for MemoryTarget {
    fn location(&self) -> String {
        self.location.clone()
    }

    fn exists(&self) -> Result<bool> {
        Ok(self.store.lock()?.contains_key(&self.location))
    }

    fn open_for_write(&self) -> Result<Box<dyn TargetWriter>> {
        // Surface storage failures at open time, like a real filesystem would.
        drop(self.store.lock()?);
        Ok(Box::new(MemoryWriter {
            store: self.store.clone(),
            location: self.location.clone(),
            buf: Vec::new(),
        }))
    }

    fn open_for_read(&self) -> Result<Box<dyn Read + Send>> {
        match self.store.lock()?.get(&self.location) {
            Some(bytes) => Ok(Box::new(Cursor::new(bytes.clone()))),
            None => Err(anyhow!("target not found: {}", self.location)),
        }
    }
}

struct MemoryWriter {
    store: MemoryStore,
    location: String,
    buf: Vec<u8>,
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl TargetWriter for MemoryWriter {
    fn commit(self: Box<Self>) -> Result<()> {
        let MemoryWriter { store, location, buf } = *self;
        store.insert(location, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{read_to_string, write_all};

    #[test]
    fn commit_publishes_and_drop_discards() {
        let store = MemoryStore::new();
        let target = store.target("preprocess-abc");

        {
            let mut writer = target.open_for_write().unwrap();
            writer.write_all(b"half").unwrap();
        }
        assert!(!target.exists().unwrap());

        write_all(&target, b"full").unwrap();
        assert!(target.exists().unwrap());
        assert_eq!(read_to_string(&target).unwrap(), "full");
        assert_eq!(store.locations(), vec!["preprocess-abc".to_string()]);
    }

    #[test]
    fn offline_store_reports_errors() {
        let store = MemoryStore::new();
        let target = store.target("x");
        store.set_offline(true);
        assert!(target.exists().is_err());
        assert!(target.open_for_write().is_err());
        store.set_offline(false);
        assert!(!target.exists().unwrap());
    }
}
