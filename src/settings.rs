//! Database settings and the sentinel records that persist them.
//!
//! A database is parameterised by exactly two values fixed at init time:
//! the hash width in bits and the maximum Hamming error answered by
//! lookups. They are stored as two ASCII-decimal records under reserved
//! keys outside the `'P'` partition namespace, and read back verbatim on
//! every open, so a database file is self-describing.

use crate::error::{HmError, Result};
use crate::store::KvStore;

/// Key of the record holding the configured hash width in bits.
pub const HASH_BITS_KEY: &[u8] = b"_hb";

/// Key of the record holding the configured maximum error.
pub const MAX_ERROR_KEY: &[u8] = b"_me";

/// Largest supported `max_error`.
///
/// The partition index is one byte in the on-disk key, so the partition
/// count `(max_error + 3) / 2` must stay below 256.
pub const MAX_ERROR_LIMIT: u32 = 518;

/// Immutable per-database configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    hash_bits: u32,
    max_error: u32,
}

impl Settings {
    /// Validate and construct settings.
    ///
    /// `hash_bits` must be a positive multiple of 8; `max_error` must lie
    /// in `(0, hash_bits)` and not exceed [`MAX_ERROR_LIMIT`].
    pub fn new(hash_bits: u32, max_error: u32) -> Result<Self> {
        if hash_bits == 0 || hash_bits % 8 != 0 {
            return Err(HmError::InvalidConfig(format!(
                "invalid hash_bits value {hash_bits}: must be a positive multiple of 8"
            )));
        }
        if max_error == 0 || max_error >= hash_bits || max_error > MAX_ERROR_LIMIT {
            return Err(HmError::InvalidConfig(format!(
                "invalid max_error value {max_error}: must be in (0, {hash_bits}) and at most {MAX_ERROR_LIMIT}"
            )));
        }
        Ok(Self {
            hash_bits,
            max_error,
        })
    }

    /// Configured hash width in bits.
    #[must_use]
    pub fn hash_bits(&self) -> u32 {
        self.hash_bits
    }

    /// Configured maximum Hamming error.
    #[must_use]
    pub fn max_error(&self) -> u32 {
        self.max_error
    }

    /// Hash width in whole bytes.
    #[must_use]
    pub fn hash_bytes(&self) -> usize {
        (self.hash_bits as usize) / 8
    }

    /// Write the sentinel records. Called exactly once, at init.
    pub(crate) fn persist(&self, store: &dyn KvStore) -> Result<()> {
        store.put(HASH_BITS_KEY, self.hash_bits.to_string().as_bytes())?;
        store.put(MAX_ERROR_KEY, self.max_error.to_string().as_bytes())?;
        Ok(())
    }

    /// Read the sentinel records back from an opened store.
    pub(crate) fn load(store: &dyn KvStore) -> Result<Self> {
        let hash_bits = read_decimal(store, HASH_BITS_KEY)?;
        let max_error = read_decimal(store, MAX_ERROR_KEY)?;
        Self::new(hash_bits, max_error)
            .map_err(|e| HmError::SettingsMissing(format!("stored settings rejected: {e}")))
    }
}

fn read_decimal(store: &dyn KvStore, key: &[u8]) -> Result<u32> {
    let name = String::from_utf8_lossy(key).into_owned();
    let value = store
        .get(key)?
        .ok_or_else(|| HmError::SettingsMissing(format!("record {name} absent")))?;
    std::str::from_utf8(&value)
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .filter(|&v| v != 0)
        .ok_or_else(|| HmError::SettingsMissing(format!("record {name} is not a positive decimal")))
}
