//! Structural and integrity validation
//!
//! Structural checks look at the magic number and the major version only;
//! minor and patch differences are accepted. Integrity checks recompute the
//! CRC32 of a payload. A failed check is reported, never repaired.

use crate::archive::builder::Archive;
use crate::archive::codec::ByteReader;
use crate::archive::entry::Entry;
use crate::archive::header::Header;
use crate::archive::reader::ArchiveReader;
use crate::error::Result;
use std::path::Path;
use tracing::debug;

/// Check that `data` starts with a decodable header of a compatible version
pub fn validate_archive_bytes(data: &[u8]) -> bool {
    match Header::read_from(&mut ByteReader::new(data)) {
        Ok(header) => header.is_valid(),
        Err(e) => {
            debug!("Archive buffer rejected: {}", e);
            false
        }
    }
}

/// Check that the file at `path` holds a decodable header of a compatible version
pub fn validate_archive_file<P: AsRef<Path>>(path: P) -> bool {
    match ArchiveReader::open(path.as_ref()) {
        Ok(reader) => reader.header().is_valid(),
        Err(e) => {
            debug!("Archive file {} rejected: {}", path.as_ref().display(), e);
            false
        }
    }
}

/// Check an entry's stored checksum against its payload
pub fn validate_entry(entry: &Entry) -> bool {
    entry.is_intact()
}

/// Verify every entry of an archive, failing on the first checksum mismatch
pub fn verify_archive(archive: &Archive) -> Result<()> {
    archive.entries().iter().try_for_each(Entry::verify)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::format::{Version, FORMAT_VERSION};
    use crate::error::KresError;

    fn archive_with_version(version: Version) -> Vec<u8> {
        let mut archive = Archive::new();
        archive.append_file("a.txt", b"a").unwrap();
        archive.header.version = version;
        archive.to_bytes()
    }

    #[test]
    fn test_version_tolerance() {
        let major = FORMAT_VERSION.major;
        assert!(validate_archive_bytes(&archive_with_version(FORMAT_VERSION)));
        assert!(validate_archive_bytes(&archive_with_version(Version::new(major, 7, 200))));
        assert!(!validate_archive_bytes(&archive_with_version(Version::new(major + 1, 0, 1))));
    }

    #[test]
    fn test_garbage_is_invalid() {
        assert!(!validate_archive_bytes(b""));
        assert!(!validate_archive_bytes(b"not an archive at all"));

        let bytes = archive_with_version(FORMAT_VERSION);
        assert!(!validate_archive_bytes(&bytes[..10]));
    }

    #[test]
    fn test_verify_archive() {
        let mut archive = Archive::new();
        archive.append_file("one", b"1111").unwrap();
        archive.append_file("two", b"2222").unwrap();
        assert!(verify_archive(&archive).is_ok());
        assert!(archive.entries().iter().all(validate_entry));

        archive.entries[1].data[0] = b'X';
        assert!(!validate_entry(&archive.entries()[1]));
        match verify_archive(&archive) {
            Err(KresError::EntryCorrupted { filename, .. }) => assert_eq!(filename, "two"),
            other => panic!("Expected EntryCorrupted, got: {:?}", other),
        }
    }
}
