use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for kres operations
pub type Result<T> = std::result::Result<T, KresError>;

/// Unified error type for all kres operations
#[derive(Debug, Error)]
pub enum KresError {
    #[error("Invalid state: {0}")]
    InvalidState(String),

    // Codec errors
    #[error("Buffer overflow at offset {offset}: needed {needed} bytes, {remaining} remaining")]
    BufferOverflow {
        offset: u64,
        needed: u64,
        remaining: u64,
    },

    #[error("Unexpected end of data: needed {needed} bytes, read {read}")]
    EndOfData { needed: u64, read: u64 },

    // Archive errors
    #[error("Invalid archive: {0}")]
    InvalidArchive(String),

    #[error("Not a regular archive file: {0}")]
    InvalidArchiveFile(PathBuf),

    #[error("Mismatched archive version: expected major {expected}, found {found}")]
    MismatchedVersion { expected: u8, found: u8 },

    // Entry errors
    #[error("Entry not found in archive: {0}")]
    EntryNotFound(String),

    #[error("Duplicate entry id {id:016x}: {incoming:?} collides with {existing:?}")]
    DuplicateEntry {
        id: u64,
        existing: String,
        incoming: String,
    },

    #[error("CRC mismatch for {filename}: expected {expected:08x}, got {actual:08x}")]
    EntryCorrupted {
        filename: String,
        expected: u32,
        actual: u32,
    },

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid input file: {0}")]
    InvalidInputFile(PathBuf),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Fieldless view of [`KresError`] for matching on the error class alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidState,
    BufferOverflow,
    EndOfData,
    InvalidArchive,
    InvalidArchiveFile,
    MismatchedVersion,
    EntryNotFound,
    DuplicateEntry,
    EntryCorrupted,
    FailedIo,
    InvalidInputFile,
    Serialization,
}

impl KresError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KresError::InvalidState(_) => ErrorKind::InvalidState,
            KresError::BufferOverflow { .. } => ErrorKind::BufferOverflow,
            KresError::EndOfData { .. } => ErrorKind::EndOfData,
            KresError::InvalidArchive(_) => ErrorKind::InvalidArchive,
            KresError::InvalidArchiveFile(_) => ErrorKind::InvalidArchiveFile,
            KresError::MismatchedVersion { .. } => ErrorKind::MismatchedVersion,
            KresError::EntryNotFound(_) => ErrorKind::EntryNotFound,
            KresError::DuplicateEntry { .. } => ErrorKind::DuplicateEntry,
            KresError::EntryCorrupted { .. } => ErrorKind::EntryCorrupted,
            KresError::Io(_) => ErrorKind::FailedIo,
            KresError::InvalidInputFile(_) => ErrorKind::InvalidInputFile,
            KresError::Json(_) => ErrorKind::Serialization,
        }
    }
}
