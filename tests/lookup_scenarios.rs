//! End-to-end scenarios against the file-backed store.

use tempfile::TempDir;

use hmsearch::{parse_hex, HmError, HmIndex, OpenMode};

struct Db {
    _dir: TempDir,
    path: std::path::PathBuf,
}

fn init_db(hash_bits: u32, max_error: u32) -> Db {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hashes.db");
    HmIndex::init(&path, hash_bits, max_error, 100).unwrap();
    Db { _dir: dir, path }
}

fn populate(db: &Db, hashes: &[&str]) {
    let mut index = HmIndex::open(&db.path, OpenMode::ReadWrite).unwrap();
    for hex in hashes {
        index.insert(&parse_hex(hex).unwrap()).unwrap();
    }
    index.close().unwrap();
}

/// Lookup `query` and return the hits as sorted `(hex, distance)` pairs.
fn hits(db: &Db, query: &str, reduced_error: Option<u32>) -> Vec<(String, u32)> {
    let index = HmIndex::open(&db.path, OpenMode::ReadOnly).unwrap();
    let mut result: Vec<(String, u32)> = index
        .lookup(&parse_hex(query).unwrap(), reduced_error)
        .unwrap()
        .into_iter()
        .map(|hit| (hmsearch::format_hex(&hit.hash), hit.distance))
        .collect();
    result.sort();
    result
}

#[test]
fn trivial_recall() {
    let db = init_db(8, 2);
    populate(&db, &["ab"]);

    assert_eq!(hits(&db, "ab", None), vec![("ab".into(), 0)]);
    assert_eq!(hits(&db, "aa", None), vec![("ab".into(), 1)]);
    assert_eq!(hits(&db, "54", None), vec![]); // distance 8
}

#[test]
fn odd_max_error_parity_rule() {
    let db = init_db(16, 3);
    populate(&db, &["0000", "ffff"]);

    assert_eq!(hits(&db, "0003", None), vec![("0000".into(), 2)]);
    assert_eq!(hits(&db, "0007", None), vec![("0000".into(), 3)]);
    assert_eq!(hits(&db, "000f", None), vec![]); // distance 4 > 3
}

#[test]
fn even_max_error_parity_rule() {
    let db = init_db(16, 4);
    populate(&db, &["0000"]);

    assert_eq!(hits(&db, "1111", None), vec![("0000".into(), 4)]);
    assert_eq!(hits(&db, "1113", None), vec![]); // distance 5 > 4
}

#[test]
fn windows_crossing_byte_boundaries() {
    // 24-bit hashes with max_error 5: four 6-bit windows, two of which
    // straddle byte boundaries.
    let db = init_db(24, 5);
    populate(&db, &["000000", "ffffff"]);

    assert_eq!(hits(&db, "010204", None), vec![("000000".into(), 3)]);
}

#[test]
fn reduced_error_override() {
    let db = init_db(16, 3);
    populate(&db, &["0000", "ffff"]);

    assert_eq!(hits(&db, "0007", Some(2)), vec![]);
    assert_eq!(hits(&db, "0007", Some(3)), vec![("0000".into(), 3)]);
    // No override: the database-wide maximum applies.
    assert_eq!(hits(&db, "0007", None), vec![("0000".into(), 3)]);
    // An override above the maximum cannot widen it.
    assert_eq!(hits(&db, "000f", Some(16)), vec![]);
}

#[test]
fn duplicate_inserts_collapse_in_results() {
    let db = init_db(8, 2);
    populate(&db, &["00", "00", "00"]);

    assert_eq!(hits(&db, "00", None), vec![("00".into(), 0)]);
}

#[test]
fn results_survive_reopen() {
    let db = init_db(64, 6);
    populate(&db, &["35d0467de4e87a44"]);
    populate(&db, &["35d0467de4e87a47"]);

    // Both write sessions are visible, with exact distances.
    assert_eq!(
        hits(&db, "35d0467de4e87a44", None),
        vec![
            ("35d0467de4e87a44".into(), 0),
            ("35d0467de4e87a47".into(), 2)
        ]
    );
}

#[test]
fn init_validates_configuration() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.db");

    for (hash_bits, max_error) in [(0, 1), (12, 2), (64, 0), (64, 64), (8192, 519)] {
        assert!(
            matches!(
                HmIndex::init(&path, hash_bits, max_error, 1),
                Err(HmError::InvalidConfig(_))
            ),
            "hash_bits={hash_bits} max_error={max_error}"
        );
    }
}

#[test]
fn init_rejects_populated_database() {
    let db = init_db(8, 2);
    populate(&db, &["ab"]);

    assert!(matches!(
        HmIndex::init(&db.path, 8, 2, 1),
        Err(HmError::NotEmpty)
    ));
}

#[test]
fn open_missing_database_fails() {
    let dir = TempDir::new().unwrap();
    assert!(HmIndex::open(dir.path().join("absent.db"), OpenMode::ReadOnly).is_err());
}

#[test]
fn read_only_handle_rejects_insert() {
    let db = init_db(8, 2);
    let index = HmIndex::open(&db.path, OpenMode::ReadOnly).unwrap();
    assert!(matches!(
        index.insert(&[0xab]),
        Err(HmError::Backend(_))
    ));
}

#[test]
fn closed_handle_is_idempotent_and_inert() {
    let db = init_db(8, 2);
    let mut index = HmIndex::open(&db.path, OpenMode::ReadWrite).unwrap();
    index.insert(&[0xab]).unwrap();
    index.close().unwrap();
    index.close().unwrap();
    assert!(matches!(index.insert(&[0xab]), Err(HmError::Closed)));
    assert!(matches!(index.lookup(&[0xab], None), Err(HmError::Closed)));
}

#[test]
fn dump_prints_partitions_in_the_debug_format() {
    let db = init_db(8, 2);
    populate(&db, &["ab"]);

    let index = HmIndex::open(&db.path, OpenMode::ReadOnly).unwrap();
    let mut out = Vec::new();
    index.dump(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    // One block per partition: header, indented member, blank line.
    assert_eq!(text, "Partition 0a000\n    ab\n\nPartition 10b00\n    ab\n\n");
}
