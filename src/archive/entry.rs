use crate::archive::codec::{ArchiveSource, ByteWriter};
use crate::archive::format::{checksum, entry_id, entry_record_size, EntryId};
use crate::error::{KresError, Result};

/// One packaged file record
///
/// Structure (variable length, little-endian):
/// - Filename Length: uint32 (4 bytes)
/// - Filename: Filename Length bytes + NUL terminator
/// - CRC32: uint32 (4 bytes)
/// - Payload Size: uint64 (8 bytes)
/// - Payload: Payload Size bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub filename: String,
    pub crc32: u32,
    pub data: Vec<u8>,
}

impl Entry {
    /// Create an entry, computing the checksum over `data`
    pub fn new(filename: impl Into<String>, data: impl Into<Vec<u8>>) -> Result<Self> {
        let filename = filename.into();
        validate_filename(&filename)?;
        let data = data.into();
        Ok(Self {
            crc32: checksum(&data),
            filename,
            data,
        })
    }

    pub fn id(&self) -> EntryId {
        entry_id(&self.filename)
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Serialized size of this record
    pub fn record_size(&self) -> u64 {
        entry_record_size(self.filename.len() as u64, self.size())
    }

    /// True if the stored checksum matches the payload
    pub fn is_intact(&self) -> bool {
        checksum(&self.data) == self.crc32
    }

    /// Checksum check reporting the mismatch as [`KresError::EntryCorrupted`]
    pub fn verify(&self) -> Result<()> {
        let actual = checksum(&self.data);
        if actual != self.crc32 {
            return Err(KresError::EntryCorrupted {
                filename: self.filename.clone(),
                expected: self.crc32,
                actual,
            });
        }
        Ok(())
    }

    /// Write the record to a byte writer
    pub fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_u32(self.filename.len() as u32);
        writer.write_string(&self.filename);
        writer.write_u32(self.crc32);
        writer.write_u64(self.size());
        writer.write_bytes(&self.data);
    }

    /// Read the record starting at `offset`
    pub fn read_at<S: ArchiveSource>(source: &mut S, offset: u64) -> Result<Self> {
        let filename = read_filename_at(source, offset)?;
        Self::read_body(source, filename)
    }

    /// Read checksum, size and payload following an already decoded filename
    pub(crate) fn read_body<S: ArchiveSource>(source: &mut S, filename: String) -> Result<Self> {
        let crc32 = source.read_u32()?;
        let size = source.read_u64()?;
        let data = source.read_bytes(size)?;
        Ok(Self {
            filename,
            crc32,
            data,
        })
    }
}

/// Read only the length-prefixed filename of the record at `offset`, leaving
/// the source positioned at the checksum field
pub fn read_filename_at<S: ArchiveSource>(source: &mut S, offset: u64) -> Result<String> {
    source.seek(offset)?;
    let len = source.read_u32()?;
    let bytes = source.read_bytes(u64::from(len))?;
    let terminator = source.read_bytes(1)?;
    if terminator != [0u8] {
        return Err(KresError::InvalidArchive(format!(
            "Filename at {} is not NUL-terminated (length prefix {})",
            offset, len
        )));
    }
    String::from_utf8(bytes).map_err(|e| {
        KresError::InvalidArchive(format!("Invalid UTF-8 in filename at {}: {}", offset, e))
    })
}

pub(crate) fn validate_filename(filename: &str) -> Result<()> {
    if filename.is_empty() {
        return Err(KresError::InvalidState("Empty filename".to_string()));
    }
    if filename.contains('\0') {
        return Err(KresError::InvalidState(format!(
            "Filename contains NUL byte: {:?}",
            filename
        )));
    }
    if u32::try_from(filename.len()).is_err() {
        return Err(KresError::InvalidState(format!(
            "Filename too long: {} bytes (max {})",
            filename.len(),
            u32::MAX
        )));
    }
    Ok(())
}
