//! Tests for content stores
//!
//! These tests verify:
//! - Both stores honour the same put/get contract
//! - Object files survive reopening and detect tampering
//! - A damaged object is rewritten by the next put of the same bytes
//! - An accumulator runs unchanged on top of the file store

use std::fs;
use std::sync::Arc;
use std::thread;

use blocstack::accumulator::Accumulator;
use blocstack::config::{Config, SyncStrategy};
use blocstack::store::{FileStore, LogPublisher, MemoryStore};
use blocstack::{Address, BlocError, ContentStore, Digest};
use tempfile::TempDir;

/// Header: Magic (4) + Version (2) + Length (8)
const HEADER_SIZE: usize = 14;
const FOOTER_SIZE: usize = 4;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_file_store() -> (TempDir, FileStore) {
    let temp_dir = TempDir::new().unwrap();
    let store = FileStore::open(temp_dir.path(), SyncStrategy::EveryWrite).unwrap();
    (temp_dir, store)
}

fn check_contract(store: &dyn ContentStore) {
    let address = store.put(b"payload").unwrap();
    assert_eq!(address, Address::of(b"payload"));
    assert!(store.contains(&address).unwrap());
    assert_eq!(store.get(&address).unwrap().as_ref(), b"payload");

    // Idempotent
    assert_eq!(store.put(b"payload").unwrap(), address);

    let missing = Address::of(b"missing");
    assert!(!store.contains(&missing).unwrap());
    match store.get(&missing) {
        Err(BlocError::NotFound(a)) => assert_eq!(a, missing),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

// =============================================================================
// Contract Tests
// =============================================================================

#[test]
fn test_memory_store_contract() {
    let store = MemoryStore::new();
    check_contract(&store);
    assert_eq!(store.len(), 1);
}

#[test]
fn test_file_store_contract() {
    let (_temp, store) = setup_file_store();
    check_contract(&store);
    assert_eq!(store.addresses().unwrap().len(), 1);
}

// =============================================================================
// File Store
// =============================================================================

#[test]
fn test_file_store_object_layout() {
    let (_temp, store) = setup_file_store();
    let address = store.put(&[9u8; 32]).unwrap();

    let raw = fs::read(store.object_path(&address)).unwrap();
    assert_eq!(raw.len(), HEADER_SIZE + 32 + FOOTER_SIZE);
    assert_eq!(&raw[0..4], b"BLCS");
    assert_eq!(u16::from_le_bytes([raw[4], raw[5]]), 1);
    assert_eq!(&raw[6..HEADER_SIZE], &32u64.to_le_bytes());
    assert_eq!(&raw[HEADER_SIZE..HEADER_SIZE + 32], &[9u8; 32]);
}

#[test]
fn test_file_store_detects_flipped_payload() {
    let (_temp, store) = setup_file_store();
    let address = store.put(b"fragile payload").unwrap();
    let path = store.object_path(&address);

    let mut raw = fs::read(&path).unwrap();
    raw[HEADER_SIZE] ^= 0xff;
    fs::write(&path, raw).unwrap();

    assert!(matches!(
        store.get(&address),
        Err(BlocError::CorruptObject { .. })
    ));
}

#[test]
fn test_file_store_rejects_oversized_length_header() {
    let (_temp, store) = setup_file_store();
    let address = store.put(b"x").unwrap();
    let path = store.object_path(&address);

    let mut raw = fs::read(&path).unwrap();
    raw[6..HEADER_SIZE].copy_from_slice(&u64::MAX.to_le_bytes());
    fs::write(&path, raw).unwrap();

    assert!(matches!(
        store.get(&address),
        Err(BlocError::CorruptObject { .. })
    ));
}

#[test]
fn test_file_store_put_repairs_damaged_object() {
    let (_temp, store) = setup_file_store();
    let address = store.put(b"repairable").unwrap();
    let path = store.object_path(&address);

    let mut raw = fs::read(&path).unwrap();
    raw[HEADER_SIZE] ^= 0xff;
    fs::write(&path, raw).unwrap();
    assert!(store.get(&address).is_err());

    assert_eq!(store.put(b"repairable").unwrap(), address);
    assert_eq!(store.get(&address).unwrap().as_ref(), b"repairable");
}

#[test]
fn test_file_store_addresses_lists_objects_only() {
    let (temp, store) = setup_file_store();
    let a = store.put(b"a").unwrap();
    let b = store.put(b"b").unwrap();
    fs::write(temp.path().join("notes.txt"), b"ignored").unwrap();

    let mut expected = vec![a, b];
    expected.sort();
    assert_eq!(store.addresses().unwrap(), expected);
}

#[test]
fn test_file_store_reopen_sees_existing_objects() {
    let temp_dir = TempDir::new().unwrap();
    let address = {
        let store = FileStore::open(temp_dir.path(), SyncStrategy::OsBuffered).unwrap();
        store.put(b"durable").unwrap()
    };
    let store = FileStore::open(temp_dir.path(), SyncStrategy::OsBuffered).unwrap();
    assert_eq!(store.get(&address).unwrap().as_ref(), b"durable");
}

#[test]
fn test_file_store_detects_swapped_object() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileStore::open(temp_dir.path(), SyncStrategy::OsBuffered).unwrap();

    let first = store.put(b"first").unwrap();
    let second = store.put(b"second").unwrap();

    // A well-formed object file under the wrong name
    fs::copy(store.object_path(&second), store.object_path(&first)).unwrap();

    assert!(matches!(
        store.get(&first),
        Err(BlocError::CorruptObject { .. })
    ));
}

#[test]
fn test_file_store_truncated_object() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileStore::open(temp_dir.path(), SyncStrategy::OsBuffered).unwrap();

    let address = store.put(&[7u8; 64]).unwrap();
    let path = store.object_path(&address);
    let raw = fs::read(&path).unwrap();
    fs::write(&path, &raw[..raw.len() - 10]).unwrap();

    assert!(matches!(
        store.get(&address),
        Err(BlocError::CorruptObject { .. })
    ));
}

#[test]
fn test_file_store_concurrent_puts() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(FileStore::open(temp_dir.path(), SyncStrategy::OsBuffered).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for n in 0..25 {
                    // Half the payloads are shared between threads
                    let payload = if n % 2 == 0 {
                        format!("shared-{n}")
                    } else {
                        format!("thread-{t}-{n}")
                    };
                    let address = store.put(payload.as_bytes()).unwrap();
                    assert_eq!(store.get(&address).unwrap().as_ref(), payload.as_bytes());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // 13 shared + 4 × 12 private
    assert_eq!(store.addresses().unwrap().len(), 13 + 48);
}

#[test]
fn test_accumulator_on_file_store() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileStore::open(temp_dir.path(), SyncStrategy::OsBuffered).unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .batch_capacity(4)
        .build();
    let accumulator = Accumulator::new(config, store, LogPublisher).unwrap();

    for n in 0..12u32 {
        accumulator.add(Digest::sha256(&n.to_le_bytes())).unwrap();
    }

    // 3 flushes of 4 → 4 at level 2, 8 at level 3
    let levels: Vec<usize> = accumulator.slots().occupied().map(|(l, _)| l).collect();
    assert_eq!(levels, vec![2, 3]);

    let manifest = accumulator
        .load_manifest(&accumulator.last_manifest_address().unwrap())
        .unwrap();
    assert_eq!(manifest, accumulator.manifest());
    for entry in manifest.entries() {
        let bloc = accumulator.load_bloc(&entry.address).unwrap();
        assert!(bloc.is_sorted());
    }
}
