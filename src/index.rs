//! The public index handle.
//!
//! [`HmIndex`] ties the pieces together: settings and partition geometry
//! on top of a [`KvStore`]. `insert` and `lookup` take `&self` and may be
//! called from multiple threads; `close` takes `&mut self`, so the borrow
//! checker enforces that nothing else is in flight when the handle shuts
//! down.

use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::error::{HmError, Result};
use crate::hexhash::format_hex;
use crate::partition::{PartitionScheme, PARTITION_KEY_PREFIX};
use crate::search::{self, Hit};
use crate::settings::Settings;
use crate::store::{FileStore, KvStore, OpenMode};

/// A handle to an open hash database.
pub struct HmIndex {
    settings: Settings,
    scheme: PartitionScheme,
    store: Option<Box<dyn KvStore>>,
}

impl HmIndex {
    /// Create and initialise a new database file.
    ///
    /// `num_hashes` is a sizing hint forwarded to the backend; it does
    /// not affect semantics.
    ///
    /// # Errors
    ///
    /// [`HmError::InvalidConfig`] for out-of-range parameters and
    /// [`HmError::NotEmpty`] if the file already contains records.
    pub fn init(
        path: impl AsRef<Path>,
        hash_bits: u32,
        max_error: u32,
        num_hashes: u64,
    ) -> Result<()> {
        let path = path.as_ref();
        let settings = Settings::new(hash_bits, max_error)?;
        let store = FileStore::create(path, num_hashes)?;
        Self::init_store(&store, settings)?;
        store.close()?;
        debug!(path = %path.display(), hash_bits, max_error, "initialised database");
        Ok(())
    }

    /// Initialise the settings records on a freshly-created store.
    ///
    /// Building block behind [`init`](Self::init) for callers bringing
    /// their own [`KvStore`] backend.
    pub fn init_store(store: &dyn KvStore, settings: Settings) -> Result<()> {
        if store.record_count()? > 0 {
            return Err(HmError::NotEmpty);
        }
        settings.persist(store)
    }

    /// Open an existing database file.
    pub fn open(path: impl AsRef<Path>, mode: OpenMode) -> Result<Self> {
        Self::with_store(Box::new(FileStore::open(path, mode)?))
    }

    /// Wrap an already-open store into an index handle, reading the
    /// settings records from it.
    pub fn with_store(store: Box<dyn KvStore>) -> Result<Self> {
        let settings = Settings::load(store.as_ref())?;
        let scheme = PartitionScheme::new(&settings);
        Ok(Self {
            settings,
            scheme,
            store: Some(store),
        })
    }

    /// The settings this database was initialised with.
    #[must_use]
    pub fn settings(&self) -> Settings {
        self.settings
    }

    /// Hash width in bytes; every inserted or queried hash must have
    /// exactly this length.
    #[must_use]
    pub fn hash_bytes(&self) -> usize {
        self.scheme.hash_bytes()
    }

    /// Insert a hash, appending it to each of its partition buckets.
    ///
    /// Duplicates are not detected; inserting the same hash twice stores
    /// two copies in every bucket (lookups still report it once). On
    /// failure the hash may remain in a prefix of its buckets; no
    /// rollback is attempted.
    pub fn insert(&self, hash: &[u8]) -> Result<()> {
        let store = self.store()?;
        self.check_len(hash)?;
        for partition in 0..self.scheme.partitions() {
            let (key, _) = self.scheme.partition_key(hash, partition);
            store.append(&key, hash)?;
        }
        Ok(())
    }

    /// Find every stored hash within Hamming distance of the query.
    ///
    /// The distance cap is the database's `max_error`, lowered to
    /// `reduced_error` when one is given. Results are not sorted and
    /// carry exact distances.
    pub fn lookup(&self, query: &[u8], reduced_error: Option<u32>) -> Result<Vec<Hit>> {
        let store = self.store()?;
        self.check_len(query)?;
        search::lookup(
            store,
            &self.scheme,
            self.settings.max_error(),
            query,
            reduced_error,
        )
    }

    /// Write a debug listing of every partition bucket.
    pub fn dump(&self, out: &mut dyn Write) -> Result<()> {
        let store = self.store()?;
        for (key, value) in store.scan()? {
            if key.len() < 2 || key[0] != PARTITION_KEY_PREFIX {
                continue;
            }
            writeln!(out, "Partition {}{}", key[1], format_hex(&key[2..]))?;
            for hash in value.chunks_exact(self.scheme.hash_bytes()) {
                writeln!(out, "    {}", format_hex(hash))?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    /// Flush and release the underlying store. Idempotent; any later
    /// operation on this handle fails with [`HmError::Closed`].
    pub fn close(&mut self) -> Result<()> {
        if let Some(store) = self.store.take() {
            store.close()?;
        }
        Ok(())
    }

    fn store(&self) -> Result<&dyn KvStore> {
        self.store.as_deref().ok_or(HmError::Closed)
    }

    fn check_len(&self, hash: &[u8]) -> Result<()> {
        if hash.len() != self.scheme.hash_bytes() {
            return Err(HmError::InvalidInput(format!(
                "incorrect hash length: got {} bytes, expected {}",
                hash.len(),
                self.scheme.hash_bytes()
            )));
        }
        Ok(())
    }
}
