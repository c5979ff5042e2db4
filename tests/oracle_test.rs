//! End-to-end tests: encrypt a plaintext, then recover the planted key.

use std::fs;

use keysweep::oracle::des::{self, DesOracle};
use keysweep::search::{SearchConfig, Strategy, run_search};

const PLAINTEXT: &[u8] =
    b"deep in the archive, the shared secret phrase waits for whoever holds the key";
const PATTERN: &[u8] = b"shared secret phrase";
const PLANTED_KEY: u64 = 0x1234;

fn planted_oracle() -> DesOracle {
    let ciphertext = des::encrypt(PLANTED_KEY, PLAINTEXT);
    DesOracle::new(ciphertext, PATTERN).unwrap()
}

#[test]
fn test_search_recovers_planted_key_with_every_strategy() {
    for strategy in [Strategy::Block, Strategy::Interleaved, Strategy::Dynamic] {
        let config = SearchConfig::default()
            .with_upper(0x2000)
            .with_strategy(strategy)
            .with_workers(4)
            .with_check_interval(256)
            .with_chunk_size(512);
        let outcome = run_search(&config, &planted_oracle()).unwrap();
        assert!(outcome.found, "strategy {strategy}");
        assert_eq!(outcome.key, Some(PLANTED_KEY), "strategy {strategy}");
    }
}

#[test]
fn test_preview_of_winning_key_contains_pattern() {
    let oracle = planted_oracle();
    let preview = oracle.preview(PLANTED_KEY);
    let text = String::from_utf8_lossy(&preview);
    assert!(text.contains("deep in the archive"));
}

#[test]
fn test_ciphertext_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cipher.bin");

    let ciphertext = des::encrypt(PLANTED_KEY, PLAINTEXT);
    fs::write(&path, &ciphertext).unwrap();

    let loaded = fs::read(&path).unwrap();
    assert_eq!(loaded, ciphertext);

    let config = SearchConfig::default()
        .with_upper(0x2000)
        .with_workers(2)
        .with_check_interval(256);
    let oracle = DesOracle::new(loaded, PATTERN).unwrap();
    let outcome = run_search(&config, &oracle).unwrap();
    assert_eq!(outcome.key, Some(PLANTED_KEY));
}

#[test]
fn test_search_reports_not_found_when_key_is_outside_space() {
    // The planted key lies beyond the searched space.
    let config = SearchConfig::default()
        .with_upper(0x100)
        .with_workers(2)
        .with_check_interval(64);
    let outcome = run_search(&config, &planted_oracle()).unwrap();
    assert!(!outcome.found);
    assert_eq!(outcome.candidates_evaluated, 0x100);
}
