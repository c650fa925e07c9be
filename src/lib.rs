//! Kres-rs: hash-indexed container format with per-entry integrity checks
//!
//! A kres archive bundles named byte payloads behind an offset-indexed header:
//! - Entry ids are the XXH3-64 hash of the filename, mapped to byte offsets
//! - Every payload carries a CRC32 checksum
//! - Optional opaque user section in the header
//! - Whole-buffer decode, or lazy reads from an open file
//!
//! # Example
//!
//! ```no_run
//! use kres_rs::{Archive, ArchiveReader};
//!
//! // Build an archive
//! let mut archive = Archive::new();
//! archive.append_file("test.txt", b"hello")?;
//! archive.append_file("foo.bar", b"foo")?;
//! archive.write_to_file("example.kres")?;
//!
//! // Read one file back without loading the rest
//! let mut reader = ArchiveReader::open("example.kres")?;
//! let data = reader.read_file("test.txt")?;
//! assert_eq!(data, b"hello");
//! # Ok::<(), kres_rs::error::KresError>(())
//! ```

pub mod archive;
pub mod error;
pub mod ingest;

pub use archive::{
    checksum, entry_id, make_header, validate_archive_bytes, validate_archive_file,
    validate_entry, verify_archive, AppendOutcome, Archive, ArchiveReader, ArchiveSource,
    ByteReader, ByteWriter, Entry, EntryId, FileReader, Header, OffsetTable, StreamReader,
    Version, FORMAT_VERSION, MAGIC_NUMBER,
};
pub use error::{ErrorKind, KresError, Result};
pub use ingest::{ingest_path, IngestOptions, IngestReport};
