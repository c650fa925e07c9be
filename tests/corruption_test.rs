//! Corruption and truncation handling
//!
//! Damaged archives must fail with a specific error kind and never be repaired.

use kres_rs::{
    validate_archive_bytes, validate_archive_file, Archive, ArchiveReader, ErrorKind, KresError,
    FORMAT_VERSION,
};
use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use tempfile::NamedTempFile;

/// Helper: Create a valid test archive
fn create_test_archive() -> NamedTempFile {
    let temp_file = NamedTempFile::new().unwrap();
    let mut archive = Archive::new();
    archive.append_file("test.txt", b"Hello, World!").unwrap();
    archive.append_file("data.bin", &vec![0xAB; 1024]).unwrap();
    archive.write_to_file(temp_file.path()).unwrap();
    temp_file
}

/// Helper: Corrupt bytes at specific offset
fn corrupt_byte_at(path: &std::path::Path, offset: u64, new_value: u8) {
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .unwrap();
    file.seek(SeekFrom::Start(offset)).unwrap();
    file.write_all(&[new_value]).unwrap();
}

/// Helper: Truncate file at specific offset
fn truncate_at(path: &std::path::Path, new_length: u64) {
    let file = OpenOptions::new().write(true).open(path).unwrap();
    file.set_len(new_length).unwrap();
}

#[test]
fn test_corrupted_magic_number() {
    let temp_file = create_test_archive();
    let path = temp_file.path();

    corrupt_byte_at(path, 0, 0xFF);

    match ArchiveReader::open(path) {
        Err(KresError::InvalidArchive(_)) => {}
        other => panic!("Expected InvalidArchive, got: {:?}", other.map(|_| ())),
    }
    assert!(!validate_archive_file(path));
}

#[test]
fn test_magic_only_prefix_is_rejected_from_bytes() {
    let bytes = b"KRES\x01\x02\x03".to_vec();
    match Archive::from_bytes(bytes) {
        Err(e) => assert_eq!(e.kind(), ErrorKind::InvalidArchive),
        Ok(_) => panic!("Expected InvalidArchive"),
    }
}

#[test]
fn test_corrupted_version_major() {
    let temp_file = create_test_archive();
    let path = temp_file.path();

    // Major version lives in the third byte of the version word (offset 6)
    corrupt_byte_at(path, 6, FORMAT_VERSION.major.wrapping_add(1));

    // Still readable, but not valid for this engine
    let reader = ArchiveReader::open(path).unwrap();
    assert!(!reader.header().is_valid());
    assert!(!validate_archive_file(path));

    match ArchiveReader::open(path).unwrap().require_compatible() {
        Err(KresError::MismatchedVersion { .. }) => {}
        other => panic!("Expected MismatchedVersion, got: {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_minor_version_change_is_tolerated() {
    let temp_file = create_test_archive();
    let path = temp_file.path();

    // Minor version byte
    corrupt_byte_at(path, 5, 0x7F);

    assert!(validate_archive_file(path));
    let mut reader = ArchiveReader::open(path).unwrap().require_compatible().unwrap();
    assert_eq!(reader.read_file("test.txt").unwrap(), b"Hello, World!");
}

#[test]
fn test_truncated_header() {
    let temp_file = create_test_archive();
    let path = temp_file.path();

    // Cut inside the offset table
    truncate_at(path, 32);

    match ArchiveReader::open(path) {
        Err(KresError::EndOfData { .. }) => {}
        other => panic!("Expected EndOfData, got: {:?}", other.map(|_| ())),
    }

    let bytes = std::fs::read(path).unwrap();
    assert!(!validate_archive_bytes(&bytes));
    match ArchiveReader::from_bytes(&bytes) {
        Err(KresError::BufferOverflow { .. }) => {}
        other => panic!("Expected BufferOverflow, got: {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_truncated_file_data() {
    let temp_file = create_test_archive();
    let path = temp_file.path();
    let original_size = std::fs::metadata(path).unwrap().len();

    // Drop the tail of the last payload
    truncate_at(path, original_size - 100);

    // Header is intact, so the lazy reader opens
    let mut reader = ArchiveReader::open(path).unwrap();
    assert_eq!(reader.read_file("test.txt").unwrap(), b"Hello, World!");
    assert!(matches!(
        reader.read_file("data.bin"),
        Err(KresError::EndOfData { .. })
    ));

    // The full decode fails on the same entry
    assert!(matches!(
        Archive::load(path),
        Err(KresError::EndOfData { .. })
    ));
    let bytes = std::fs::read(path).unwrap();
    assert!(matches!(
        Archive::from_bytes(bytes),
        Err(KresError::BufferOverflow { .. })
    ));
}

#[test]
fn test_corrupted_payload_detected() {
    let temp_file = create_test_archive();
    let path = temp_file.path();
    let size = std::fs::metadata(path).unwrap().len();

    // Last byte belongs to data.bin's payload
    corrupt_byte_at(path, size - 1, 0x00);

    let mut reader = ArchiveReader::open(path).unwrap();
    match reader.read_file("data.bin") {
        Err(KresError::EntryCorrupted {
            filename,
            expected,
            actual,
        }) => {
            assert_eq!(filename, "data.bin");
            assert_ne!(expected, actual);
        }
        other => panic!("Expected EntryCorrupted, got: {:?}", other),
    }

    // Structure is fine, integrity is not
    assert!(validate_archive_file(path));
    let archive = Archive::load(path).unwrap();
    assert!(kres_rs::verify_archive(&archive).is_err());
}

#[test]
fn test_corrupted_offset_table() {
    let temp_file = create_test_archive();
    let path = temp_file.path();

    // First offset (bytes 28..36) pointed far past the end
    let mut file = OpenOptions::new().write(true).open(path).unwrap();
    file.seek(SeekFrom::Start(28)).unwrap();
    file.write_all(&u64::MAX.to_le_bytes()).unwrap();
    drop(file);

    let mut reader = ArchiveReader::open(path).unwrap();
    let result = reader.read_file("test.txt");
    assert!(result.is_err());
    assert!(matches!(
        result.unwrap_err().kind(),
        ErrorKind::EndOfData | ErrorKind::FailedIo
    ));
    assert_eq!(reader.read_file("data.bin").unwrap(), vec![0xAB; 1024]);
}

#[test]
fn test_not_a_regular_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        ArchiveReader::open(dir.path()),
        Err(KresError::InvalidArchiveFile(_))
    ));
    assert!(matches!(
        ArchiveReader::open(dir.path().join("missing.kres")),
        Err(KresError::InvalidArchiveFile(_))
    ));
    assert!(!validate_archive_file(dir.path()));
}

#[test]
fn test_every_truncation_fails_cleanly() {
    let archive = Archive::build(
        vec![
            kres_rs::Entry::new("a.txt", b"alpha".to_vec()).unwrap(),
            kres_rs::Entry::new("b.txt", b"beta".to_vec()).unwrap(),
        ],
        Some(b"user"),
    )
    .unwrap();
    let bytes = archive.raw_data().unwrap();

    for len in 0..bytes.len() {
        match Archive::from_bytes(bytes[..len].to_vec()) {
            Err(e) => assert_eq!(e.kind(), ErrorKind::BufferOverflow, "length {}", len),
            Ok(_) => panic!("Truncation to {} bytes decoded", len),
        }
    }
    assert!(Archive::from_bytes(bytes.to_vec()).is_ok());
}
