//! End-to-end tests for `BinaryIndex`: add/query contract, snapshots and
//! lifecycle.

use std::fs;

use _nexus_bindex::{BinaryIndex, BindexError, IndexConfig, Match};
use proptest::prelude::*;
use tempfile::TempDir;

/// Deterministic pseudo-random codes (xorshift).
fn random_codes(count: usize, num_bytes: usize, seed: u64) -> Vec<u8> {
    let mut state = seed.max(1);
    (0..count * num_bytes)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 24) as u8
        })
        .collect()
}

fn index(num_bytes: usize) -> BinaryIndex {
    BinaryIndex::new(IndexConfig::new(num_bytes)).unwrap()
}

#[test]
fn single_bit_flip_scenario() {
    let idx = index(4);
    idx.add(&[1, 2], &[0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01])
        .unwrap();
    let results = idx.query(&[0x00, 0x00, 0x00, 0x00], 2).unwrap();
    assert_eq!(results, vec![vec![Match::new(1, 0), Match::new(2, 1)]]);
}

#[test]
fn every_inserted_code_finds_itself_first() {
    let num_bytes = 8;
    let codes = random_codes(300, num_bytes, 42);
    let ids: Vec<u32> = (1000..1300).collect();

    let idx = index(num_bytes);
    // Several batches, so later rows see the graph built by earlier calls.
    for (chunk_ids, chunk_codes) in ids.chunks(64).zip(codes.chunks(64 * num_bytes)) {
        idx.add(chunk_ids, chunk_codes).unwrap();
    }
    assert_eq!(idx.len(), 300);

    let results = idx.query(&codes, 1).unwrap();
    assert_eq!(results.len(), 300);
    for (row, &id) in results.iter().zip(&ids) {
        assert_eq!(row, &vec![Match::new(id, 0)]);
    }
}

#[test]
fn approximate_results_are_near_neighbors() {
    let num_bytes = 4;
    let base = random_codes(1, num_bytes, 7);
    let mut codes = Vec::new();
    let mut ids = Vec::new();
    // Codes at 1..=8 bits from `base`.
    for bit in 0..8u32 {
        let mut code = base.clone();
        for b in 0..=bit {
            code[(b / 8) as usize] ^= 1 << (b % 8);
        }
        codes.extend_from_slice(&code);
        ids.push(bit + 1);
    }
    let idx = BinaryIndex::new(IndexConfig::new(num_bytes).with_max_degree(16)).unwrap();
    idx.add(&ids, &codes).unwrap();

    let results = idx.query(&base, 3).unwrap();
    assert_eq!(
        results[0],
        vec![Match::new(1, 1), Match::new(2, 2), Match::new(3, 3)]
    );
}

#[test]
fn query_on_empty_index() {
    let idx = index(16);
    let results = idx.query(&random_codes(5, 16, 3), 10).unwrap();
    assert_eq!(results.len(), 5);
    assert!(results.iter().all(Vec::is_empty));
}

#[test]
fn shape_errors_leave_state_unchanged() {
    let idx = index(4);
    idx.add(&[1], &[1, 2, 3, 4]).unwrap();
    let before = idx.stats().unwrap();

    assert!(matches!(
        idx.add(&[2, 3], &[0u8; 9]),
        Err(BindexError::CountMismatch { .. })
    ));
    assert!(matches!(
        idx.query(&[0u8; 6], 1),
        Err(BindexError::ShapeMismatch { .. })
    ));
    assert_eq!(idx.stats().unwrap(), before);
}

#[test]
fn save_load_roundtrip_reproduces_queries() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bindexer.bin");
    let num_bytes = 6;
    let config = IndexConfig::new(num_bytes).with_ef(10);

    let codes = random_codes(200, num_bytes, 99);
    let ids: Vec<u32> = (0..200).map(|i| i / 2).collect();
    let original = BinaryIndex::new(config).unwrap();
    original.add(&ids, &codes).unwrap();
    original.save(&path).unwrap();

    let queries = random_codes(50, num_bytes, 1234);
    let expected = original.query(&queries, 5).unwrap();
    let expected_self = original.query(&codes, 3).unwrap();

    let restored = BinaryIndex::open(config, &path).unwrap();
    assert_eq!(restored.query(&queries, 5).unwrap(), expected);
    assert_eq!(restored.query(&codes, 3).unwrap(), expected_self);
    assert_eq!(restored.stats().unwrap(), original.stats().unwrap());
}

#[test]
fn load_replaces_existing_contents() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("index.bin");

    let saved = index(2);
    saved.add(&[1], &[0xAA, 0xAA]).unwrap();
    saved.save(&path).unwrap();

    let target = index(2);
    target.add(&[2, 3], &[0x00, 0x00, 0x11, 0x11]).unwrap();
    target.load(&path).unwrap();
    assert_eq!(target.len(), 1);
    assert_eq!(
        target.query(&[0xAA, 0xAA], 5).unwrap(),
        vec![vec![Match::new(1, 0)]]
    );

    // The restored index keeps accepting inserts.
    target.add(&[4], &[0xAA, 0xAB]).unwrap();
    assert_eq!(
        target.query(&[0xAA, 0xAA], 5).unwrap(),
        vec![vec![Match::new(1, 0), Match::new(4, 1)]]
    );
}

#[test]
fn load_with_other_num_bytes_is_fatal() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("index.bin");
    let saved = index(4);
    saved.add(&[1], &[1, 2, 3, 4]).unwrap();
    saved.save(&path).unwrap();

    let other = index(8);
    assert!(matches!(
        other.load(&path),
        Err(BindexError::ConfigMismatch {
            expected: 8,
            found: 4
        })
    ));
    assert!(!other.is_open());
    assert!(matches!(other.query(&[0u8; 8], 1), Err(BindexError::Closed)));
}

#[test]
fn load_missing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nope.bin");
    assert!(matches!(
        BinaryIndex::open(IndexConfig::new(4), &path),
        Err(BindexError::IndexNotFound(_))
    ));
}

#[test]
fn load_corrupted_snapshot() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("index.bin");
    let saved = index(4);
    saved.add(&[1, 2], &random_codes(2, 4, 5)).unwrap();
    saved.save(&path).unwrap();

    let mut bytes = fs::read(&path).unwrap();
    let mid = bytes.len() - 8;
    bytes[mid] ^= 0x5A;
    fs::write(&path, &bytes).unwrap();

    let idx = index(4);
    assert!(matches!(
        idx.load(&path),
        Err(BindexError::CorruptIndex { .. })
    ));
    assert!(!idx.is_open());
}

#[test]
fn failed_save_keeps_memory_state() {
    let dir = TempDir::new().unwrap();
    let blocked = dir.path().join("blocked");
    fs::create_dir(&blocked).unwrap();
    fs::write(blocked.join("file"), b"x").unwrap();

    let idx = index(2);
    idx.add(&[1], &[3, 3]).unwrap();
    assert!(matches!(idx.save(&blocked), Err(BindexError::Io(_))));
    assert!(idx.is_open());
    assert_eq!(
        idx.query(&[3, 3], 1).unwrap(),
        vec![vec![Match::new(1, 0)]]
    );
}

#[test]
fn dispose_then_use_fails() {
    let dir = TempDir::new().unwrap();
    let idx = index(2);
    idx.add(&[1], &[1, 1]).unwrap();
    idx.dispose();
    assert!(matches!(
        idx.save(&dir.path().join("x.bin")),
        Err(BindexError::Closed)
    ));
    assert!(matches!(idx.add(&[1], &[1, 1]), Err(BindexError::Closed)));
}

#[test]
fn concurrent_queries_share_the_index() {
    let idx = index(4);
    let codes = random_codes(100, 4, 11);
    let ids: Vec<u32> = (0..100).collect();
    idx.add(&ids, &codes).unwrap();
    let expected = idx.query(&codes, 4).unwrap();

    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                assert_eq!(idx.query(&codes, 4).unwrap(), expected);
            });
        }
    });
}

#[test]
fn queries_run_alongside_writer() {
    let num_bytes = 4;
    let idx = index(num_bytes);
    let seed_codes = random_codes(50, num_bytes, 21);
    let seed_ids: Vec<u32> = (0..50).collect();
    idx.add(&seed_ids, &seed_codes).unwrap();

    let extra = random_codes(400, num_bytes, 22);
    std::thread::scope(|s| {
        s.spawn(|| {
            for (batch, chunk) in extra.chunks(20 * num_bytes).enumerate() {
                let ids: Vec<u32> = (0..20).map(|i| 1000 + (batch * 20 + i) as u32).collect();
                idx.add(&ids, chunk).unwrap();
            }
        });
        for reader in 0..3usize {
            let idx = &idx;
            let seed_codes = &seed_codes;
            s.spawn(move || {
                for round in 0..30usize {
                    let rows = 1 + (reader + round) % 7;
                    let queries = &seed_codes[..rows * num_bytes];
                    let results = idx.query(queries, 3).unwrap();
                    assert_eq!(results.len(), rows);
                    for (row, id) in results.iter().zip(0u32..) {
                        assert_eq!(row[0], Match::new(id, 0));
                        assert!(row.len() <= 3);
                    }
                }
            });
        }
    });

    assert_eq!(idx.len(), 450);
    assert_eq!(
        idx.query(&extra[..num_bytes], 1).unwrap(),
        vec![vec![Match::new(1000, 0)]]
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_one_result_list_per_query(
        num_bytes in 1usize..6,
        rows in 0usize..40,
        queries in 0usize..10,
        top_k in 0usize..8,
        seed in any::<u64>(),
    ) {
        let idx = index(num_bytes);
        let codes = random_codes(rows, num_bytes, seed);
        let ids: Vec<u32> = (0..rows as u32).collect();
        idx.add(&ids, &codes).unwrap();

        let query_codes = random_codes(queries, num_bytes, seed ^ 0xFFFF);
        let results = idx.query(&query_codes, top_k).unwrap();
        prop_assert_eq!(results.len(), queries);
        for row in &results {
            prop_assert!(row.len() <= top_k);
            // Exact matches precede approximate ones.
            let first_approx = row.iter().position(|m| m.distance > 0).unwrap_or(row.len());
            prop_assert!(row[first_approx..].iter().all(|m| m.distance > 0));
        }
    }

    #[test]
    fn prop_duplicate_inserts_are_all_returned(
        code in prop::collection::vec(any::<u8>(), 4),
        copies in 1usize..6,
    ) {
        let idx = index(4);
        let ids: Vec<u32> = vec![77; copies];
        let codes: Vec<u8> = code.iter().copied().cycle().take(4 * copies).collect();
        idx.add(&ids, &codes).unwrap();
        let results = idx.query(&code, 100).unwrap();
        prop_assert_eq!(&results[0], &vec![Match::new(77, 0); copies]);
    }
}
