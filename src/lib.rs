//! hmsearch: an on-disk index for approximate matching of fixed-width
//! binary hashes under the Hamming distance.
//!
//! Given a database of b-bit hashes and a maximum error `k` fixed at
//! initialisation, [`HmIndex::lookup`] returns every stored hash within
//! Hamming distance `k` of a query in sublinear expected time. Typical
//! use is perceptual-hash lookup: image or audio fingerprints where
//! near-duplicates differ in a handful of bits.
//!
//! # Algorithm
//!
//! The index implements the HmSearch multi-index scheme. Each hash is cut
//! into `P = (k + 3) / 2` bit windows; inserting a hash appends it to one
//! bucket per window, keyed by the window's bits. A lookup probes, for
//! each window of the query, the bucket for the exact window plus one
//! bucket per 1-bit variant of it, so any stored hash within distance `k`
//! collides with the query on enough probes to surface as a candidate.
//! A validity rule on the per-candidate hit pattern (which depends on the
//! parity of `k`) discards coincidental collisions before the final
//! exact-distance verification.
//!
//! Unlike the scheme as published, only exact windows are stored; the
//! 1-variant expansion happens at query time. That multiplies lookup
//! probes by roughly the window width but shrinks the database by the
//! same factor, which in practice dominates insert cost and disk
//! footprint.
//!
//! # Example
//!
//! ```rust,ignore
//! use hmsearch::{HmIndex, OpenMode};
//!
//! HmIndex::init("hashes.db", 64, 6, 100_000)?;
//!
//! let mut db = HmIndex::open("hashes.db", OpenMode::ReadWrite)?;
//! db.insert(&hmsearch::parse_hex("35d0467de4e87a44")?)?;
//!
//! for hit in db.lookup(&hmsearch::parse_hex("35d0467de4e87a45")?, None)? {
//!     println!("{} {}", hmsearch::format_hex(&hit.hash), hit.distance);
//! }
//! db.close()?;
//! ```
//!
//! # References
//!
//! - Zhang, Qin, Wang, Xue, Shan (2013). "HmSearch: an efficient Hamming
//!   distance query processing algorithm" (SSDBM '13).

pub mod distance;
pub mod error;
pub mod hexhash;
pub mod index;
pub mod partition;
pub mod search;
pub mod settings;
pub mod store;

pub use error::{HmError, Result};
pub use hexhash::{format_hex, parse_hex};
pub use index::HmIndex;
pub use partition::PartitionScheme;
pub use search::Hit;
pub use settings::Settings;
pub use store::{FileStore, KvStore, MemStore, OpenMode};
