//! Tests for Store
//!
//! These tests verify:
//! - Open/close lifecycle in both modes
//! - Write/read round trips through every codec
//! - Journal persistence of the write position
//! - Segment rollover and capacity limits
//! - Error reporting for bad references and unknown codecs
//! - Concurrent writers on one handle

use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use std::thread;

use blobkeep::codec;
use blobkeep::config::{Config, JournalSync};
use blobkeep::journal::JOURNAL_FILE;
use blobkeep::record::RecordHeader;
use blobkeep::{BlobError, LockRegistry, Ref, Store};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_store() -> (TempDir, LockRegistry, Store) {
    let temp_dir = TempDir::new().unwrap();
    let registry = LockRegistry::new();
    let config = Config::builder().data_dir(temp_dir.path()).build();
    let store = Store::open_write(config, &registry).unwrap();
    (temp_dir, registry, store)
}

fn setup_small_segments(max_segment_len: u32) -> (TempDir, LockRegistry, Store) {
    let temp_dir = TempDir::new().unwrap();
    let registry = LockRegistry::new();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .max_segment_len(max_segment_len)
        .build();
    let store = Store::open_write(config, &registry).unwrap();
    (temp_dir, registry, store)
}

fn journal_text(dir: &TempDir) -> String {
    fs::read_to_string(dir.path().join(JOURNAL_FILE)).unwrap()
}

// =============================================================================
// Open/Close Tests
// =============================================================================

#[test]
fn test_open_write_creates_directory_and_journal() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("blobs");
    let registry = LockRegistry::new();

    let store = Store::open_write(Config::builder().data_dir(&data_dir).build(), &registry).unwrap();

    assert!(data_dir.is_dir());
    assert!(data_dir.join(JOURNAL_FILE).is_file());
    assert!(store.is_writable());
    assert_eq!(store.write_position().unwrap(), Ref::NULL);
    assert_eq!(store.data_dir(), data_dir);
}

#[test]
fn test_open_read_missing_directory() {
    let temp_dir = TempDir::new().unwrap();
    let result = Store::open_path(&temp_dir.path().join("nope"));

    assert!(matches!(result, Err(BlobError::StoreNotFound(_))));
}

#[test]
fn test_open_read_does_not_track_position() {
    let (temp, _registry, _writer) = setup_temp_store();

    let reader = Store::open_path(temp.path()).unwrap();

    assert!(!reader.is_writable());
    assert!(matches!(reader.write_position(), Err(BlobError::ReadOnly)));
    assert!(matches!(reader.write(b"nope"), Err(BlobError::ReadOnly)));
}

#[test]
fn test_invalid_config_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let registry = LockRegistry::new();

    let tiny = Config::builder().data_dir(temp_dir.path()).max_segment_len(16).build();
    assert!(matches!(Store::open_write(tiny, &registry), Err(BlobError::Config(_))));

    let unknown = Config::builder().data_dir(temp_dir.path()).default_codec("ZZZZ").build();
    assert!(matches!(Store::open_write(unknown, &registry), Err(BlobError::Config(_))));

    assert!(registry.is_empty());
}

#[test]
fn test_operations_fail_after_close() {
    let (_temp, _registry, store) = setup_temp_store();
    let reference = store.write(b"before close").unwrap();

    store.close().unwrap();

    assert!(store.is_closed());
    assert!(matches!(store.write(b"after"), Err(BlobError::Closed)));
    assert!(matches!(store.read(reference), Err(BlobError::Closed)));
    assert!(matches!(store.write_position(), Err(BlobError::Closed)));
    assert!(matches!(store.close(), Err(BlobError::Closed)));
    assert_eq!(store.open_segment_count(), 0);
}

#[test]
fn test_close_releases_segment_handles() {
    let (_temp, _registry, store) = setup_small_segments(64);

    for _ in 0..4 {
        store.write_with_codec(&[7u8; 30], &codec::NONE).unwrap();
    }
    assert!(store.open_segment_count() >= 2);

    store.close().unwrap();
    assert_eq!(store.open_segment_count(), 0);
}

// =============================================================================
// Write/Read Tests
// =============================================================================

#[test]
fn test_first_write_is_null_ref() {
    let (_temp, _registry, store) = setup_temp_store();

    let blob = "i am a little blob and i am ok";
    let first = store.write(blob.as_bytes()).unwrap();
    assert_eq!(first, Ref::new(0, 0));
    assert_ne!(store.write_position().unwrap().offset, 0);

    let second = store.write(b"little bob").unwrap();
    assert_eq!(second.segment, 0);
    assert!(second.offset > 0);
    assert_eq!(second.offset % 8, 0);

    assert_eq!(store.read(first).unwrap(), blob.as_bytes());
    assert_eq!(store.read(second).unwrap(), b"little bob");
}

#[test]
fn test_roundtrip_every_codec() {
    let (_temp, _registry, store) = setup_temp_store();
    let blob = br#"{"id": 42, "name": "widget", "tags": ["a", "b", "c", "a", "b", "c"]}"#.repeat(50);

    for codec in codec::codecs() {
        let reference = store.write_with_codec(&blob, codec).unwrap();
        assert_eq!(store.read(reference).unwrap(), blob, "codec {}", codec.tag());
    }
}

#[test]
fn test_write_with_codec_name() {
    let (_temp, _registry, store) = setup_temp_store();

    let reference = store.write_with_codec_name(b"gzipped", "GZIP").unwrap();
    assert_eq!(store.read(reference).unwrap(), b"gzipped");

    let result = store.write_with_codec_name(b"nope", "ZSTD");
    assert!(matches!(result, Err(BlobError::UnknownCodec(t)) if t == "ZSTD"));
}

#[test]
fn test_default_codec_from_config() {
    let temp_dir = TempDir::new().unwrap();
    let registry = LockRegistry::new();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .default_codec("GZIP")
        .build();
    let store = Store::open_write(config, &registry).unwrap();

    let reference = store.write(b"hello").unwrap();
    let info = store.cursor(Ref::NULL).next().unwrap().unwrap();

    assert_eq!(store.default_codec().tag(), "GZIP");
    assert_eq!(info.reference, reference);
    assert_eq!(info.tag, "GZIP");
}

#[test]
fn test_empty_blob() {
    let (_temp, _registry, store) = setup_temp_store();

    let reference = store.write(b"").unwrap();
    assert_eq!(store.read(reference).unwrap(), b"");
}

#[test]
fn test_binary_and_large_blobs() {
    let (_temp, _registry, store) = setup_temp_store();

    let binary: Vec<u8> = (0..=255u8).cycle().take(50_000).collect();
    let reference = store.write(&binary).unwrap();
    assert_eq!(store.read(reference).unwrap(), binary);
}

#[test]
fn test_segment_files_are_aligned() {
    let (temp, _registry, store) = setup_temp_store();

    for i in 0..20 {
        store.write(format!("blob number {}", i).repeat(i + 1).as_bytes()).unwrap();
    }

    let len = fs::metadata(temp.path().join("00000")).unwrap().len();
    assert_eq!(len % 8, 0);
    assert_eq!(len, store.write_position().unwrap().offset as u64);
}

// =============================================================================
// Journal Tests
// =============================================================================

#[test]
fn test_journal_matches_position_after_every_write() {
    let (temp, _registry, store) = setup_temp_store();

    for i in 0..10 {
        store.write(format!("entry {}", i).as_bytes()).unwrap();
        let position = store.write_position().unwrap();
        assert_eq!(journal_text(&temp), position.to_string());
        assert_eq!(journal_text(&temp).len(), 14);
    }
}

#[test]
fn test_position_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let registry = LockRegistry::new();
    let config = Config::builder().data_dir(temp_dir.path()).build();

    let (first, position) = {
        let store = Store::open_write(config.clone(), &registry).unwrap();
        let first = store.write(b"persisted").unwrap();
        let position = store.write_position().unwrap();
        store.close().unwrap();
        (first, position)
    };

    let store = Store::open_write(config, &registry).unwrap();
    assert_eq!(store.write_position().unwrap(), position);

    let second = store.write(b"appended").unwrap();
    assert_eq!(second, position);
    assert_eq!(store.read(first).unwrap(), b"persisted");
    assert_eq!(store.read(second).unwrap(), b"appended");
}

#[test]
fn test_journal_sync_every_write() {
    let temp_dir = TempDir::new().unwrap();
    let registry = LockRegistry::new();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .journal_sync(JournalSync::EveryWrite)
        .build();
    let store = Store::open_write(config, &registry).unwrap();

    let reference = store.write(b"synced").unwrap();
    assert_eq!(store.read(reference).unwrap(), b"synced");
    assert_eq!(journal_text(&temp_dir), store.write_position().unwrap().to_string());
}

#[test]
fn test_corrupt_journal_fails_open_and_releases_lock() {
    let temp_dir = TempDir::new().unwrap();
    let registry = LockRegistry::new();
    let config = Config::builder().data_dir(temp_dir.path()).build();

    fs::write(temp_dir.path().join(JOURNAL_FILE), "not a ref at all").unwrap();
    let result = Store::open_write(config.clone(), &registry);
    assert!(matches!(result, Err(BlobError::Journal(_))));
    assert!(registry.is_empty());

    fs::write(temp_dir.path().join(JOURNAL_FILE), "00000:0000").unwrap();
    let result = Store::open_write(config.clone(), &registry);
    assert!(matches!(result, Err(BlobError::Journal(_))));

    fs::write(temp_dir.path().join(JOURNAL_FILE), "00002:00000010").unwrap();
    let store = Store::open_write(config, &registry).unwrap();
    assert_eq!(store.write_position().unwrap(), Ref::new(2, 0x10));
}

// =============================================================================
// Rollover Tests
// =============================================================================

#[test]
fn test_rollover_to_next_segment() {
    let (temp, _registry, store) = setup_small_segments(128);
    let blob = [0x5Au8; 50]; // span = round_up_8(16 + 50) = 72

    let first = store.write_with_codec(&blob, &codec::NONE).unwrap();
    let second = store.write_with_codec(&blob, &codec::NONE).unwrap();
    let third = store.write_with_codec(&blob, &codec::NONE).unwrap();

    assert_eq!(first, Ref::new(0, 0));
    assert_eq!(second, Ref::new(1, 0));
    assert_eq!(third, Ref::new(2, 0));
    assert_eq!(store.write_position().unwrap(), Ref::new(2, 72));

    assert!(temp.path().join("00001").is_file());
    assert!(store.has_segment(2));
    assert!(!store.has_segment(3));

    for reference in [first, second, third] {
        assert_eq!(store.read(reference).unwrap(), blob);
    }
}

#[test]
fn test_record_filling_segment_exactly() {
    let (_temp, _registry, store) = setup_small_segments(96);

    // two spans of 48 fill 96 exactly
    let a = store.write_with_codec(&[1u8; 32], &codec::NONE).unwrap();
    let b = store.write_with_codec(&[2u8; 32], &codec::NONE).unwrap();
    let c = store.write_with_codec(&[3u8; 32], &codec::NONE).unwrap();

    assert_eq!(a, Ref::new(0, 0));
    assert_eq!(b, Ref::new(0, 48));
    assert_eq!(c, Ref::new(1, 0));
}

#[test]
fn test_record_too_large_for_segment() {
    let (_temp, _registry, store) = setup_small_segments(128);

    let result = store.write_with_codec(&[0u8; 200], &codec::NONE);

    assert!(matches!(result, Err(BlobError::RecordTooLarge { size: 216, limit: 128 })));
    assert_eq!(store.write_position().unwrap(), Ref::NULL);
}

#[test]
fn test_segment_numbers_exhausted() {
    let temp_dir = TempDir::new().unwrap();
    let registry = LockRegistry::new();
    fs::write(temp_dir.path().join(JOURNAL_FILE), "65535:00000070").unwrap();

    let config = Config::builder()
        .data_dir(temp_dir.path())
        .max_segment_len(128)
        .build();
    let store = Store::open_write(config, &registry).unwrap();

    let result = store.write_with_codec(&[0u8; 50], &codec::NONE);
    assert!(matches!(result, Err(BlobError::CapacityExhausted { max: 65535 })));
    assert_eq!(store.write_position().unwrap(), Ref::new(65535, 0x70));

    // a record that still fits is fine
    let reference = store.write_with_codec(&[0u8; 0], &codec::NONE).unwrap();
    assert_eq!(reference, Ref::new(65535, 0x70));
}

// =============================================================================
// Read Error Tests
// =============================================================================

#[test]
fn test_read_off_boundary_fails() {
    let (_temp, _registry, store) = setup_temp_store();
    store.write(b"i am a little blob and i am ok").unwrap();

    assert!(store.read(Ref::new(0, 8)).is_err());
    assert!(store.read(Ref::new(0, 4)).is_err());
}

#[test]
fn test_read_past_end_fails() {
    let (_temp, _registry, store) = setup_temp_store();
    store.write(b"short").unwrap();

    let reference = Ref::new(0, 4096);
    match store.read(reference) {
        Err(BlobError::Read { reference: r, .. }) => assert_eq!(r, reference),
        other => panic!("expected read error, got {:?}", other),
    }
}

#[test]
fn test_read_missing_segment_fails() {
    let (_temp, _registry, store) = setup_temp_store();

    let result = store.read(Ref::new(7, 0));
    assert!(matches!(result, Err(BlobError::Read { .. })));
    assert!(!store.has_segment(7));
}

#[test]
fn test_read_unknown_codec() {
    let (temp, _registry, store) = setup_temp_store();
    let header = RecordHeader::new(*b"ZZZZ", 4, 4);
    fs::write(temp.path().join("00000"), header.frame(b"abcd")).unwrap();

    match store.read(Ref::NULL) {
        Err(BlobError::UnknownRecordCodec { tag, reference }) => {
            assert_eq!(tag, "ZZZZ");
            assert_eq!(reference, Ref::NULL);
        }
        other => panic!("expected unknown codec, got {:?}", other),
    }
}

#[test]
fn test_read_truncated_payload() {
    let (temp, _registry, store) = setup_temp_store();
    let header = RecordHeader::new(*b"NONE", 1000, 1000);
    fs::write(temp.path().join("00000"), header.encode()).unwrap();

    let result = store.read(Ref::NULL);
    assert!(matches!(result, Err(BlobError::CorruptHeader { .. })));
}

// =============================================================================
// Concurrent Access Tests
// =============================================================================

#[test]
fn test_concurrent_writes_get_disjoint_ranges() {
    let (_temp, _registry, store) = setup_small_segments(16 * 1024);
    let store = Arc::new(store);

    let mut handles = vec![];
    for t in 0..8 {
        let store_clone = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            let mut written = Vec::new();
            for i in 0..50 {
                let blob = format!("thread{}_blob{}_", t, i).repeat(i + 1).into_bytes();
                let reference = store_clone.write(&blob).unwrap();
                written.push((reference, blob));
            }
            written
        }));
    }

    let mut all = Vec::new();
    for handle in handles {
        all.extend(handle.join().unwrap());
    }

    let refs: HashSet<Ref> = all.iter().map(|(r, _)| *r).collect();
    assert_eq!(refs.len(), 400);

    for (reference, blob) in &all {
        assert_eq!(&store.read(*reference).unwrap(), blob);
    }

    let scanned = store.cursor(Ref::NULL).count();
    assert_eq!(scanned, 400);
}

#[test]
fn test_concurrent_reads() {
    let (_temp, _registry, store) = setup_temp_store();
    let store = Arc::new(store);

    let refs: Vec<Ref> = (0..100)
        .map(|i| store.write(format!("value{}", i).as_bytes()).unwrap())
        .collect();
    let refs = Arc::new(refs);

    let mut handles = vec![];
    for _ in 0..4 {
        let store_clone = Arc::clone(&store);
        let refs = Arc::clone(&refs);
        handles.push(thread::spawn(move || {
            for (i, reference) in refs.iter().enumerate() {
                let expected = format!("value{}", i);
                assert_eq!(store_clone.read(*reference).unwrap(), expected.as_bytes());
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_reader_sees_writer_records() {
    let (temp, _registry, writer) = setup_temp_store();
    let reference = writer.write(b"shared").unwrap();

    let reader = Store::open_path(temp.path()).unwrap();
    assert_eq!(reader.read(reference).unwrap(), b"shared");

    let later = writer.write(b"later").unwrap();
    assert_eq!(reader.read(later).unwrap(), b"later");
}
