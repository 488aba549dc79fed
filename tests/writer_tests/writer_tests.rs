//! Tests for RotatingWriter basics
//!
//! These tests verify:
//! - Appending records below capacity (no rotation, exact concatenation)
//! - Size recovery when re-opening an existing file
//! - Construction errors (unknown compression, bad capacity)
//! - Close semantics
//! - io::Write integration
//! - Concurrent writers never split or lose records

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use rotatelog::{segment, Capacity, Compression, Config, RotateError, RotatingWriter};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_log() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("container.log");
    (temp_dir, log_path)
}

// =============================================================================
// Basic Writing Tests
// =============================================================================

#[test]
fn test_open_creates_file() {
    let (_temp, log_path) = setup_temp_log();

    let writer = RotatingWriter::new(&log_path, -1, 1, "").unwrap();

    assert!(log_path.exists());
    assert_eq!(writer.current_size(), 0);
    assert_eq!(writer.path(), log_path.as_path());
}

#[test]
fn test_write_returns_length() {
    let (_temp, log_path) = setup_temp_log();
    let writer = RotatingWriter::new(&log_path, -1, 1, "").unwrap();

    let n = writer.write(b"hello\n").unwrap();

    assert_eq!(n, 6);
    assert_eq!(writer.current_size(), 6);
}

#[test]
fn test_below_capacity_is_exact_concatenation() {
    let (_temp, log_path) = setup_temp_log();
    let writer = RotatingWriter::new(&log_path, 4096, 3, "gzip").unwrap();

    let mut expected = Vec::new();
    for i in 0..50 {
        let record = format!("record number {}\n", i);
        writer.write(record.as_bytes()).unwrap();
        expected.extend_from_slice(record.as_bytes());
    }

    assert!(expected.len() < 4096);
    assert_eq!(writer.rotations(), 0);
    assert_eq!(fs::read(&log_path).unwrap(), expected);
    assert!(!segment::segment_path(&log_path, 1, "").exists());
}

#[test]
fn test_empty_write() {
    let (_temp, log_path) = setup_temp_log();
    let writer = RotatingWriter::new(&log_path, -1, 1, "").unwrap();

    assert_eq!(writer.write(b"").unwrap(), 0);
    assert_eq!(writer.current_size(), 0);
}

// =============================================================================
// Restart Tests
// =============================================================================

#[test]
fn test_reopen_recovers_size_and_appends() {
    let (_temp, log_path) = setup_temp_log();

    {
        let writer = RotatingWriter::new(&log_path, 1024, 3, "").unwrap();
        writer.write(&[b'a'; 600]).unwrap();
    }

    let writer = RotatingWriter::new(&log_path, 1024, 3, "").unwrap();
    assert_eq!(writer.current_size(), 600);

    // 600 < 1024: lands in the same segment
    writer.write(&[b'b'; 500]).unwrap();
    assert_eq!(writer.rotations(), 0);
    assert_eq!(fs::metadata(&log_path).unwrap().len(), 1100);

    // 1100 >= 1024: rotates first
    writer.write(b"c").unwrap();
    assert_eq!(writer.rotations(), 1);
    assert_eq!(fs::read(&log_path).unwrap(), b"c");
}

// =============================================================================
// Construction Error Tests
// =============================================================================

#[test]
fn test_unknown_compression_rejected() {
    let (_temp, log_path) = setup_temp_log();

    let result = RotatingWriter::new(&log_path, 1024, 3, "lz4");

    assert!(matches!(result, Err(RotateError::UnknownCompression(ref s)) if s == "lz4"));
    assert!(!log_path.exists());
}

#[test]
fn test_invalid_capacity_rejected() {
    let (_temp, log_path) = setup_temp_log();

    let result = RotatingWriter::new(&log_path, -5, 3, "");

    assert!(matches!(result, Err(RotateError::Config(_))));
}

#[test]
fn test_missing_directory_fails() {
    let (temp, _) = setup_temp_log();
    let log_path = temp.path().join("no-such-dir").join("container.log");

    let result = RotatingWriter::new(&log_path, 1024, 3, "");

    assert!(matches!(result, Err(RotateError::Io(_))));
}

#[test]
fn test_open_with_builder() {
    let (_temp, log_path) = setup_temp_log();
    let config = Config::builder()
        .path(&log_path)
        .capacity("1k".parse().unwrap())
        .max_files(4)
        .compression(Compression::Xz)
        .build();

    let writer = RotatingWriter::open(config).unwrap();

    assert_eq!(writer.capacity(), Capacity::Bytes(1024));
    assert_eq!(writer.max_files(), 4);
    assert_eq!(writer.compression(), Compression::Xz);
}

// =============================================================================
// Close Tests
// =============================================================================

#[test]
fn test_write_after_close_fails() {
    let (_temp, log_path) = setup_temp_log();
    let writer = RotatingWriter::new(&log_path, -1, 1, "").unwrap();
    writer.write(b"kept\n").unwrap();

    writer.close().unwrap();

    assert!(matches!(writer.write(b"lost\n"), Err(RotateError::Closed)));
    assert_eq!(fs::read(&log_path).unwrap(), b"kept\n");
}

#[test]
fn test_close_twice_is_ok() {
    let (_temp, log_path) = setup_temp_log();
    let writer = RotatingWriter::new(&log_path, -1, 1, "").unwrap();

    writer.close().unwrap();
    writer.close().unwrap();
}

// =============================================================================
// io::Write Tests
// =============================================================================

#[test]
fn test_io_write_by_value_and_by_ref() {
    let (_temp, log_path) = setup_temp_log();
    let mut writer = RotatingWriter::new(&log_path, -1, 1, "").unwrap();

    writeln!(writer, "owned {}", 1).unwrap();
    {
        let mut shared = &writer;
        writeln!(shared, "shared {}", 2).unwrap();
        shared.flush().unwrap();
    }

    assert_eq!(fs::read_to_string(&log_path).unwrap(), "owned 1\nshared 2\n");
}

#[test]
fn test_io_write_error_after_close() {
    let (_temp, log_path) = setup_temp_log();
    let writer = RotatingWriter::new(&log_path, -1, 1, "").unwrap();
    writer.close().unwrap();

    let mut shared = &writer;
    let err = shared.write_all(b"x").unwrap_err();

    assert_eq!(err.kind(), std::io::ErrorKind::Other);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_writers_keep_records_whole() {
    let (_temp, log_path) = setup_temp_log();
    let writer = Arc::new(RotatingWriter::new(&log_path, 2048, 100, "").unwrap());

    let threads = 8;
    let per_thread = 200;

    let mut handles = Vec::new();
    for t in 0..threads {
        let writer = Arc::clone(&writer);
        handles.push(thread::spawn(move || {
            for i in 0..per_thread {
                let record = format!("thread{}-record{:04}-payload\n", t, i);
                writer.write(record.as_bytes()).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(writer.rotations() > 0);

    let all = segment::read_all(&log_path, 100, Compression::None).unwrap();
    let text = String::from_utf8(all).unwrap();

    // Every record whole, each exactly once, per-thread order kept
    let mut next: HashMap<usize, usize> = HashMap::new();
    let mut total = 0;
    for line in text.lines() {
        let (thread_part, rest) = line.split_once('-').unwrap();
        let t: usize = thread_part.strip_prefix("thread").unwrap().parse().unwrap();
        let i: usize = rest
            .strip_prefix("record")
            .unwrap()
            .strip_suffix("-payload")
            .unwrap()
            .parse()
            .unwrap();

        let expected = next.entry(t).or_insert(0);
        assert_eq!(i, *expected, "thread {} out of order", t);
        *expected += 1;
        total += 1;
    }

    assert_eq!(total, threads * per_thread);
}
