//! Hash partitioning for multi-index lookup.
//!
//! HmSearch splits every b-bit hash into `P = (k + 3) / 2` non-overlapping
//! bit windows of `B = ceil(b / P)` bits. By pigeonhole, any two hashes
//! within Hamming distance `k` agree, or nearly agree, on enough windows
//! that probing each window's bucket (and its 1-bit variants) recovers all
//! true matches without scanning the database.
//!
//! A partition key is what a window looks like on disk:
//!
//! ```text
//! byte 0      'P'                       (namespace marker)
//! byte 1      partition index           (0 .. P)
//! bytes 2..   masked window bytes       (partition_bytes of them)
//! ```
//!
//! The window bytes are copied byte-for-byte out of the source hash, so a
//! window starting mid-byte keeps its bit offset and everything outside
//! the live window is masked to zero. Two hashes therefore share a
//! partition-i key exactly when they agree on partition i's live bits.

use smallvec::SmallVec;

use crate::settings::Settings;

/// Marker byte namespacing partition records away from settings records.
pub const PARTITION_KEY_PREFIX: u8 = b'P';

/// A partition key buffer, inline for typical perceptual-hash geometries.
pub type PartitionKey = SmallVec<[u8; 24]>;

/// Derived partitioning geometry for a fixed `(hash_bits, max_error)` pair.
///
/// Pure arithmetic over the settings; every instance derived from equal
/// settings produces identical keys for identical inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionScheme {
    hash_bits: usize,
    hash_bytes: usize,
    partitions: usize,
    partition_bits: usize,
    partition_bytes: usize,
}

impl PartitionScheme {
    /// Derive the partition geometry from validated settings.
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        let hash_bits = settings.hash_bits() as usize;
        let partitions = (settings.max_error() as usize + 3) / 2;
        let partition_bits = hash_bits.div_ceil(partitions);
        // One byte of slack lets a window that starts mid-byte keep its
        // natural alignment without a separate length field.
        let partition_bytes = partition_bits.div_ceil(8) + 1;
        Self {
            hash_bits,
            hash_bytes: settings.hash_bytes(),
            partitions,
            partition_bits,
            partition_bytes,
        }
    }

    /// Hash width in bytes.
    #[must_use]
    pub fn hash_bytes(&self) -> usize {
        self.hash_bytes
    }

    /// Number of partitions `P`.
    #[must_use]
    pub fn partitions(&self) -> usize {
        self.partitions
    }

    /// Nominal window width `B` in bits; the final window may be narrower.
    #[must_use]
    pub fn partition_bits(&self) -> usize {
        self.partition_bits
    }

    /// On-disk width of the window bytes (excluding the 2-byte header).
    #[must_use]
    pub fn partition_bytes(&self) -> usize {
        self.partition_bytes
    }

    /// Total on-disk key length.
    #[must_use]
    pub fn key_len(&self) -> usize {
        self.partition_bytes + 2
    }

    /// Number of live bits in partition `partition`.
    ///
    /// `min(B, hash_bits - partition * B)`; zero when the geometry rounds
    /// the final window entirely past the end of the hash.
    #[must_use]
    pub fn live_bits(&self, partition: usize) -> usize {
        self.partition_bits
            .min(self.hash_bits.saturating_sub(partition * self.partition_bits))
    }

    /// Extract the on-disk key for partition `partition` of `hash`.
    ///
    /// Returns the key and the number of live bits in the window (the bit
    /// positions a lookup may flip).
    #[must_use]
    pub fn partition_key(&self, hash: &[u8], partition: usize) -> (PartitionKey, usize) {
        debug_assert_eq!(hash.len(), self.hash_bytes);
        debug_assert!(partition < self.partitions);

        let psize = self.live_bits(partition);

        let mut key = PartitionKey::with_capacity(self.key_len());
        key.push(PARTITION_KEY_PREFIX);
        key.push(partition as u8);

        // Walk the output bytes, consuming up to a byte's worth of live
        // bits per step. Once the window is exhausted the remaining key
        // bytes are zero padding, and the source byte index may already
        // sit past the end of the hash, so it must not be dereferenced.
        let mut bits_left = psize;
        let mut hash_bit = partition * self.partition_bits;
        for _ in 0..self.partition_bytes {
            let bit = hash_bit % 8;
            let take = bits_left.min(8 - bit);
            if take == 0 {
                key.push(0);
                continue;
            }
            let mask = (((1u16 << take) - 1) << (8 - bit - take)) as u8;
            key.push(hash[hash_bit / 8] & mask);
            bits_left -= take;
            hash_bit += take;
        }

        (key, psize)
    }

    /// Toggle hash bit `hash_bit` inside a key produced by
    /// [`partition_key`](Self::partition_key) for the same partition.
    ///
    /// `hash_bit` must lie within the partition's live window. Calling
    /// twice restores the original key.
    pub fn flip_key_bit(&self, key: &mut [u8], partition: usize, hash_bit: usize) {
        let base_byte = (partition * self.partition_bits) / 8;
        key[hash_bit / 8 - base_byte + 2] ^= 1 << (7 - (hash_bit % 8));
    }
}
