//! Lookup-time candidate generation, filtering and verification.
//!
//! Only exact partition windows are stored; the 1-bit variants the
//! HmSearch algorithm relies on are expanded here at query time instead.
//! For each partition the searcher probes the exact window key plus one
//! key per live bit with that bit flipped, tallies per-hash hit
//! statistics, and applies a validity rule keyed to the parity of the
//! configured maximum error before paying for a full Hamming distance
//! check. The rule rejects candidates whose hits could all be explained
//! by coincidental 1-bit collisions, and never rejects a hash actually
//! within range, so the reduced on-disk footprint costs no recall.

use std::collections::BTreeMap;

use crate::distance::hamming;
use crate::error::Result;
use crate::partition::PartitionScheme;
use crate::store::KvStore;

/// One verified lookup hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    /// The stored hash.
    pub hash: Vec<u8>,
    /// Its exact Hamming distance from the query.
    pub distance: u32,
}

/// Which kind of probe produced a bucket hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Probe {
    #[default]
    Exact,
    Variant,
}

/// Per-hash statistics over all probes of one lookup.
#[derive(Debug, Clone, Copy, Default)]
struct Candidate {
    matches: u32,
    first_match: Probe,
    second_match: Probe,
}

impl Candidate {
    fn note(&mut self, probe: Probe) {
        self.matches += 1;
        if self.matches == 1 {
            self.first_match = probe;
        } else if self.matches == 2 {
            self.second_match = probe;
        }
    }

    /// Can this candidate possibly be within `max_error` of the query?
    ///
    /// With an odd maximum error a true match either shares some exact
    /// window with the query or collides with at least three probes; two
    /// lone 1-variant hits can be coincidence. With an even maximum a
    /// single 1-variant hit is the only disprovable pattern.
    fn is_valid(&self, odd_max_error: bool) -> bool {
        if odd_max_error {
            self.matches >= 3
                || !(self.matches == 1
                    || (self.first_match == Probe::Variant && self.second_match == Probe::Variant))
        } else {
            self.matches >= 2 || self.first_match == Probe::Exact
        }
    }
}

/// Run a full lookup: probe, filter, verify.
///
/// `reduced_error`, when given, caps the reported distance below the
/// database-wide maximum; it can only shrink the result set.
pub(crate) fn lookup(
    store: &dyn KvStore,
    scheme: &PartitionScheme,
    max_error: u32,
    query: &[u8],
    reduced_error: Option<u32>,
) -> Result<Vec<Hit>> {
    let candidates = collect_candidates(store, scheme, query)?;

    let k_eff = reduced_error.map_or(max_error, |m| m.min(max_error));
    let odd_max_error = max_error % 2 == 1;

    let mut hits = Vec::new();
    for (hash, candidate) in &candidates {
        if !candidate.is_valid(odd_max_error) {
            continue;
        }
        let distance = hamming(query, hash);
        if distance <= k_eff {
            hits.push(Hit {
                hash: hash.clone(),
                distance,
            });
        }
    }
    Ok(hits)
}

/// Probe every partition's exact key and 1-bit variants, aggregating
/// per-hash hit statistics.
fn collect_candidates(
    store: &dyn KvStore,
    scheme: &PartitionScheme,
    query: &[u8],
) -> Result<BTreeMap<Vec<u8>, Candidate>> {
    let mut candidates = BTreeMap::new();

    for partition in 0..scheme.partitions() {
        let (mut key, psize) = scheme.partition_key(query, partition);

        if let Some(bucket) = store.get(&key)? {
            register_bucket(&mut candidates, Probe::Exact, &bucket, scheme.hash_bytes());
        }

        let base = partition * scheme.partition_bits();
        for hash_bit in base..base + psize {
            scheme.flip_key_bit(&mut key, partition, hash_bit);
            if let Some(bucket) = store.get(&key)? {
                register_bucket(&mut candidates, Probe::Variant, &bucket, scheme.hash_bytes());
            }
            // Restore for the next variant.
            scheme.flip_key_bit(&mut key, partition, hash_bit);
        }
    }

    Ok(candidates)
}

fn register_bucket(
    candidates: &mut BTreeMap<Vec<u8>, Candidate>,
    probe: Probe,
    bucket: &[u8],
    hash_bytes: usize,
) {
    for hash in bucket.chunks_exact(hash_bytes) {
        candidates.entry(hash.to_vec()).or_default().note(probe);
    }
}
