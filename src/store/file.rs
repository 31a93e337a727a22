//! Single-file key/value backend.
//!
//! The record set stays resident in memory while the store is open;
//! `close` on a dirty writable store rewrites the file through a temp
//! file, fsync and atomic rename, so a crash mid-close leaves the
//! previous generation intact. That matches the one durability promise
//! the index makes: writes are on disk once `close` returns.
//!
//! File layout (all integers little-endian):
//!
//! ```text
//! [magic "HMKV"][version u16]
//! repeated: [key_len u32][val_len u32][key][val]
//! ```

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::{debug, warn};

use super::{KvStore, OpenMode};
use crate::error::{HmError, Result};

const MAGIC: [u8; 4] = *b"HMKV";
const FORMAT_VERSION: u16 = 1;

/// A key/value store backed by one file on disk.
pub struct FileStore {
    path: PathBuf,
    mode: OpenMode,
    inner: RwLock<Inner>,
}

struct Inner {
    records: BTreeMap<Vec<u8>, Vec<u8>>,
    dirty: bool,
    closed: bool,
}

impl FileStore {
    /// Open an existing store file, or create an empty one.
    ///
    /// Used by database initialisation. `capacity_hint` is the caller's
    /// estimate of the eventual record volume; this backend keeps records
    /// resident and has nothing to pre-allocate, so the hint is accepted
    /// for interface parity and otherwise unused.
    pub fn create(path: impl AsRef<Path>, capacity_hint: u64) -> Result<Self> {
        let path = path.as_ref();
        let _ = capacity_hint;
        let (records, dirty) = if path.exists() {
            (load(path)?, false)
        } else {
            (BTreeMap::new(), true)
        };
        debug!(path = %path.display(), records = records.len(), "created store");
        Ok(Self {
            path: path.to_path_buf(),
            mode: OpenMode::ReadWrite,
            inner: RwLock::new(Inner {
                records,
                dirty,
                closed: false,
            }),
        })
    }

    /// Open an existing store file. Fails if the file is missing or not
    /// a store file.
    pub fn open(path: impl AsRef<Path>, mode: OpenMode) -> Result<Self> {
        let path = path.as_ref();
        let records = load(path)?;
        debug!(path = %path.display(), ?mode, records = records.len(), "opened store");
        Ok(Self {
            path: path.to_path_buf(),
            mode,
            inner: RwLock::new(Inner {
                records,
                dirty: false,
                closed: false,
            }),
        })
    }

    fn write_guard(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner>> {
        if self.mode == OpenMode::ReadOnly {
            return Err(HmError::Backend("store is opened read-only".into()));
        }
        let inner = self.inner.write().expect("store lock poisoned");
        if inner.closed {
            return Err(HmError::Closed);
        }
        Ok(inner)
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let inner = self.inner.read().expect("store lock poisoned");
        if inner.closed {
            return Err(HmError::Closed);
        }
        Ok(inner.records.get(key).cloned())
    }

    fn append(&self, key: &[u8], suffix: &[u8]) -> Result<()> {
        let mut inner = self.write_guard()?;
        inner
            .records
            .entry(key.to_vec())
            .or_default()
            .extend_from_slice(suffix);
        inner.dirty = true;
        Ok(())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut inner = self.write_guard()?;
        inner.records.insert(key.to_vec(), value.to_vec());
        inner.dirty = true;
        Ok(())
    }

    fn record_count(&self) -> Result<u64> {
        let inner = self.inner.read().expect("store lock poisoned");
        if inner.closed {
            return Err(HmError::Closed);
        }
        Ok(inner.records.len() as u64)
    }

    fn scan(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let inner = self.inner.read().expect("store lock poisoned");
        if inner.closed {
            return Err(HmError::Closed);
        }
        Ok(inner
            .records
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn close(&self) -> Result<()> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        if inner.closed {
            return Ok(());
        }
        inner.closed = true;
        if inner.dirty && self.mode == OpenMode::ReadWrite {
            flush(&self.path, &inner.records)?;
        }
        debug!(path = %self.path.display(), "closed store");
        Ok(())
    }
}

impl Drop for FileStore {
    fn drop(&mut self) {
        // Close explicitly to observe flush errors; on drop they can
        // only be logged.
        if let Err(e) = self.close() {
            warn!(path = %self.path.display(), error = %e, "flush on drop failed");
        }
    }
}

fn load(path: &Path) -> Result<BTreeMap<Vec<u8>, Vec<u8>>> {
    let data = fs::read(path)?;
    if data.len() < 6 || data[0..4] != MAGIC {
        return Err(HmError::Backend(format!(
            "{} is not a hash database",
            path.display()
        )));
    }
    let version = u16::from_le_bytes([data[4], data[5]]);
    if version != FORMAT_VERSION {
        return Err(HmError::Backend(format!(
            "unsupported format version {version} in {}",
            path.display()
        )));
    }

    let truncated = || HmError::Backend(format!("truncated record in {}", path.display()));

    let mut records = BTreeMap::new();
    let mut off = 6;
    while off < data.len() {
        if data.len() - off < 8 {
            return Err(truncated());
        }
        let key_len = u32::from_le_bytes(data[off..off + 4].try_into().unwrap()) as usize;
        let val_len = u32::from_le_bytes(data[off + 4..off + 8].try_into().unwrap()) as usize;
        off += 8;
        if data.len() - off < key_len + val_len {
            return Err(truncated());
        }
        let key = data[off..off + key_len].to_vec();
        let value = data[off + key_len..off + key_len + val_len].to_vec();
        off += key_len + val_len;
        records.insert(key, value);
    }
    Ok(records)
}

fn flush(path: &Path, records: &BTreeMap<Vec<u8>, Vec<u8>>) -> Result<()> {
    let tmp_path = path.with_extension("tmp");
    {
        let mut w = BufWriter::new(File::create(&tmp_path)?);
        w.write_all(&MAGIC)?;
        w.write_all(&FORMAT_VERSION.to_le_bytes())?;
        for (key, value) in records {
            w.write_all(&(key.len() as u32).to_le_bytes())?;
            w.write_all(&(value.len() as u32).to_le_bytes())?;
            w.write_all(key)?;
            w.write_all(value)?;
        }
        w.flush()?;
        w.get_ref().sync_all()?;
    }

    fs::rename(&tmp_path, path)?;

    // Persist the rename itself.
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        File::open(dir)?.sync_all()?;
    }
    Ok(())
}
