//! In-memory store, for unit tests and ephemeral indexes.

use std::collections::BTreeMap;
use std::sync::RwLock;

use super::KvStore;
use crate::error::{HmError, Result};

/// A [`KvStore`] that lives entirely in memory. Always writable; `close`
/// discards nothing but seals the store.
#[derive(Debug, Default)]
pub struct MemStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    records: BTreeMap<Vec<u8>, Vec<u8>>,
    closed: bool,
}

impl MemStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let inner = self.inner.read().expect("store lock poisoned");
        if inner.closed {
            return Err(HmError::Closed);
        }
        Ok(inner.records.get(key).cloned())
    }

    fn append(&self, key: &[u8], suffix: &[u8]) -> Result<()> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        if inner.closed {
            return Err(HmError::Closed);
        }
        inner
            .records
            .entry(key.to_vec())
            .or_default()
            .extend_from_slice(suffix);
        Ok(())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        if inner.closed {
            return Err(HmError::Closed);
        }
        inner.records.insert(key.to_vec(), value.to_vec());
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
        self.inner.write().expect("store lock poisoned").closed = true;
        Ok(())
    }
}
