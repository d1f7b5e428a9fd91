//! Tests for Engine
//!
//! These tests verify:
//! - Directory layout on open
//! - HEAD is written after every flush
//! - Reopening resumes the recorded manifest
//! - Corrupt HEAD records are refused
//! - A HEAD write failure after a committed flush is not reported as a failed add
//! - Subscribers see manifest addresses

use std::fs;

use blocstack::config::{Config, SyncStrategy};
use blocstack::engine::Engine;
use blocstack::{Address, BlocError, Digest};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn engine_config(temp_dir: &TempDir) -> Config {
    Config::builder()
        .data_dir(temp_dir.path())
        .sync_strategy(SyncStrategy::EveryWrite) // Sync every write for test reliability
        .batch_capacity(10)
        .build()
}

fn setup_temp_engine() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open(engine_config(&temp_dir)).unwrap();
    (temp_dir, engine)
}

fn add_range(engine: &Engine, prefix: &str, range: std::ops::Range<u32>) {
    for n in range {
        engine
            .add(Digest::sha256(format!("{prefix}{n}").as_bytes()))
            .unwrap();
    }
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_engine_open_creates_directories() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("mydb");

    let engine = Engine::open_path(&data_dir).unwrap();

    assert!(data_dir.exists());
    assert!(data_dir.join("objects").is_dir());
    assert!(!data_dir.join("HEAD").exists());
    assert!(engine.head().unwrap().is_none());
    assert!(engine.manifest().is_empty());
}

#[test]
fn test_engine_rejects_invalid_config() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .batch_capacity(0)
        .build();
    assert!(matches!(Engine::open(config), Err(BlocError::Config(_))));
}

#[test]
fn test_head_written_after_flush() {
    let (temp_dir, engine) = setup_temp_engine();

    add_range(&engine, "a", 0..9);
    assert!(engine.head().unwrap().is_none());

    let outcome = engine
        .add(Digest::sha256(b"a9"))
        .unwrap()
        .expect("tenth digest fills the batch");

    assert!(temp_dir.path().join("HEAD").exists());
    let head = engine.head().unwrap().unwrap();
    assert_eq!(head.manifest, outcome.manifest_address);
    assert_eq!(head.version, 1);
    assert_eq!(head.settled_digests, 10);
}

#[test]
fn test_reopen_resumes_manifest() {
    let temp_dir = TempDir::new().unwrap();

    let (manifest, head) = {
        let engine = Engine::open(engine_config(&temp_dir)).unwrap();
        add_range(&engine, "b", 0..35);
        (engine.manifest(), engine.head().unwrap().unwrap())
    };
    assert_eq!(head.version, 3);
    assert_eq!(head.settled_digests, 30);

    let engine = Engine::open(engine_config(&temp_dir)).unwrap();
    assert_eq!(engine.manifest(), manifest);
    assert_eq!(engine.accumulator().settled_digests(), 30);
    assert_eq!(engine.accumulator().slots().version(), 3);

    // Unflushed digests from the first run are gone
    assert_eq!(engine.pending_len(), 0);

    // One more flush carries 10 + 10 + 20 into a single bloc of 40
    add_range(&engine, "c", 0..10);
    let levels: Vec<u32> = engine.manifest().entries().iter().map(|e| e.level).collect();
    assert_eq!(levels, vec![6]);
    assert_eq!(engine.head().unwrap().unwrap().version, 4);
}

#[test]
fn test_forced_flush_updates_head() {
    let (_temp, engine) = setup_temp_engine();
    assert!(engine.flush().unwrap().is_none());

    add_range(&engine, "d", 0..3);
    let outcome = engine.flush().unwrap().unwrap();
    assert_eq!(outcome.level, 2);
    assert_eq!(engine.head().unwrap().unwrap().manifest, outcome.manifest_address);
}

#[test]
fn test_head_write_failure_keeps_flush_committed() {
    let (temp_dir, engine) = setup_temp_engine();
    add_range(&engine, "h", 0..9);

    // A directory where the HEAD temp file goes makes the HEAD write fail
    let blocker = temp_dir.path().join("HEAD.tmp");
    fs::create_dir(&blocker).unwrap();

    let tenth = Digest::sha256(b"h9");
    let outcome = engine
        .add(tenth)
        .unwrap()
        .expect("tenth digest fills the batch");
    assert_eq!(outcome.flushed, 10);
    assert!(engine.head_is_stale());
    assert!(engine.head().unwrap().is_none());
    assert_eq!(engine.pending_len(), 0);
    assert_eq!(engine.accumulator().settled_digests(), 10);

    // HEAD catches up on the next call once the path is usable again
    fs::remove_dir(&blocker).unwrap();
    engine.add(Digest::sha256(b"next")).unwrap();
    assert!(!engine.head_is_stale());
    let head = engine.head().unwrap().unwrap();
    assert_eq!(head.manifest, outcome.manifest_address);
    assert_eq!(head.settled_digests, 10);

    // The committed digest was settled exactly once
    let bloc = engine.load_bloc(&outcome.bloc_address).unwrap();
    assert_eq!(bloc.iter().filter(|d| *d == tenth).count(), 1);
}

#[test]
fn test_sync_head_after_failed_write() {
    let temp_dir = TempDir::new().unwrap();
    let blocker = temp_dir.path().join("HEAD.tmp");
    let manifest = {
        let engine = Engine::open(engine_config(&temp_dir)).unwrap();
        fs::create_dir(&blocker).unwrap();
        add_range(&engine, "s", 0..10);
        assert!(engine.head_is_stale());
        assert!(engine.sync_head().is_err());

        fs::remove_dir(&blocker).unwrap();
        engine.sync_head().unwrap();
        assert!(!engine.head_is_stale());
        engine.manifest()
    };

    let engine = Engine::open(engine_config(&temp_dir)).unwrap();
    assert_eq!(engine.manifest(), manifest);
    assert_eq!(engine.accumulator().settled_digests(), 10);
}

#[test]
fn test_corrupt_head_refused() {
    let temp_dir = TempDir::new().unwrap();
    {
        let engine = Engine::open(engine_config(&temp_dir)).unwrap();
        add_range(&engine, "e", 0..10);
    }

    let head_path = temp_dir.path().join("HEAD");
    let mut raw = fs::read(&head_path).unwrap();
    let last = raw.len() - 1;
    raw[last] ^= 0xff;
    fs::write(&head_path, raw).unwrap();

    assert!(matches!(
        Engine::open(engine_config(&temp_dir)),
        Err(BlocError::Serialization(_))
    ));
}

#[test]
fn test_head_pointing_at_missing_manifest() {
    let temp_dir = TempDir::new().unwrap();
    let manifest_address = {
        let engine = Engine::open(engine_config(&temp_dir)).unwrap();
        add_range(&engine, "f", 0..10);
        engine.head().unwrap().unwrap().manifest
    };

    let objects = temp_dir.path().join("objects");
    fs::remove_file(objects.join(format!("{}.obj", manifest_address.to_hex()))).unwrap();

    assert!(matches!(
        Engine::open(engine_config(&temp_dir)),
        Err(BlocError::NotFound(a)) if a == manifest_address
    ));
}

// =============================================================================
// Notifications
// =============================================================================

#[test]
fn test_subscribers_receive_manifest_addresses() {
    let (_temp, engine) = setup_temp_engine();
    let rx = engine.subscribe();

    add_range(&engine, "g", 0..20);

    let published: Vec<Address> = rx
        .try_iter()
        .map(|note| Address::parse(note.payload_str().unwrap()).unwrap())
        .collect();
    assert_eq!(published.len(), 2);
    assert_eq!(
        published.last().copied(),
        Some(engine.head().unwrap().unwrap().manifest)
    );
}

#[test]
fn test_add_multihash_through_engine() {
    let (_temp, engine) = setup_temp_engine();
    let multihash = Digest::sha256(b"cid content").to_multihash().to_bytes();

    engine.add_multihash(&multihash).unwrap();
    assert_eq!(engine.pending_len(), 1);

    let outcome = engine.flush().unwrap().unwrap();
    let bloc = engine.load_bloc(&outcome.bloc_address).unwrap();
    assert_eq!(bloc.digest(0), Some(Digest::sha256(b"cid content")));
}
