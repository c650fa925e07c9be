use crate::archive::codec::{ArchiveSource, ByteWriter};
use crate::archive::format::{header_size, EntryId, Version, FORMAT_VERSION, MAGIC_NUMBER};
use crate::error::{KresError, Result};
use std::collections::HashMap;
use tracing::debug;

/// Upper bound on speculative table reservations while decoding untrusted counts
const MAX_TABLE_RESERVE: u64 = 4096;

/// Mapping from entry id to the byte offset of its record
///
/// Keeps the wire order of the pairs alongside an index for O(1) lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetTable {
    records: Vec<(EntryId, u64)>,
    index: HashMap<EntryId, usize>,
}

impl OffsetTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Add a record; returns false and leaves the table untouched if the id is present
    pub fn insert(&mut self, id: EntryId, offset: u64) -> bool {
        if self.index.contains_key(&id) {
            return false;
        }
        self.index.insert(id, self.records.len());
        self.records.push((id, offset));
        true
    }

    pub fn get(&self, id: EntryId) -> Option<u64> {
        self.index.get(&id).map(|&i| self.records[i].1)
    }

    pub fn contains(&self, id: EntryId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// (id, offset) pairs in wire order
    pub fn iter(&self) -> impl Iterator<Item = (EntryId, u64)> + '_ {
        self.records.iter().copied()
    }

    pub fn ids(&self) -> impl Iterator<Item = EntryId> + '_ {
        self.records.iter().map(|&(id, _)| id)
    }
}

/// Archive header
///
/// Layout (little-endian):
/// - Magic: uint32
/// - Version: uint32 (`major << 16 | minor << 8 | patch`)
/// - Flags: uint32 (reserved)
/// - Entry Count: uint64
/// - Offset Table: Entry Count * (id: uint64, offset: uint64)
/// - User Section Size: uint64
/// - User Section: variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub magic: u32,
    pub version: Version,
    pub flags: u32,
    pub offset_table: OffsetTable,
    pub user_section: Vec<u8>,
    /// id -> filename, filled by full decodes and builds; never written
    pub filename_table: HashMap<EntryId, String>,
}

impl Header {
    pub fn new() -> Self {
        Self {
            magic: MAGIC_NUMBER,
            version: FORMAT_VERSION,
            flags: 0,
            offset_table: OffsetTable::new(),
            user_section: Vec::new(),
            filename_table: HashMap::new(),
        }
    }

    pub fn entry_count(&self) -> u64 {
        self.offset_table.len() as u64
    }

    pub fn user_section_size(&self) -> u64 {
        self.user_section.len() as u64
    }

    /// Serialized size of this header
    pub fn encoded_len(&self) -> u64 {
        header_size(self.entry_count(), self.user_section_size())
    }

    /// Look up the filename cached for an id, if this header came from a full parse
    pub fn filename(&self, id: EntryId) -> Option<&str> {
        self.filename_table.get(&id).map(String::as_str)
    }

    /// Write header to a byte writer
    pub fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_u32(self.magic);
        writer.write_u32(self.version.encode());
        writer.write_u32(self.flags);
        writer.write_u64(self.entry_count());

        for (id, offset) in self.offset_table.iter() {
            writer.write_u64(id);
            writer.write_u64(offset);
        }

        writer.write_u64(self.user_section_size());
        if !self.user_section.is_empty() {
            writer.write_bytes(&self.user_section);
        }
    }

    /// Read header from any archive source, positioned at the start of the archive
    ///
    /// Stops at the magic number without reading further if it does not match.
    pub fn read_from<S: ArchiveSource>(source: &mut S) -> Result<Self> {
        let magic = source.read_u32()?;
        if magic != MAGIC_NUMBER {
            return Err(KresError::InvalidArchive(format!(
                "Invalid magic number: expected {:08x}, found {:08x}",
                MAGIC_NUMBER, magic
            )));
        }

        let version = Version::decode(source.read_u32()?);
        let flags = source.read_u32()?;
        let entry_count = source.read_u64()?;

        let mut offset_table = OffsetTable::with_capacity(entry_count.min(MAX_TABLE_RESERVE) as usize);
        for _ in 0..entry_count {
            let id = source.read_u64()?;
            let offset = source.read_u64()?;
            if !offset_table.insert(id, offset) {
                return Err(KresError::InvalidArchive(format!(
                    "Duplicate id {:016x} in offset table",
                    id
                )));
            }
        }

        let user_section_size = source.read_u64()?;
        let user_section = if user_section_size > 0 {
            source.read_bytes(user_section_size)?
        } else {
            Vec::new()
        };

        debug!(
            "Decoded header v{}: {} entries, {} byte user section",
            version, entry_count, user_section_size
        );

        Ok(Self {
            magic,
            version,
            flags,
            offset_table,
            user_section,
            filename_table: HashMap::new(),
        })
    }

    /// Magic and major version check against this engine
    pub fn is_valid(&self) -> bool {
        self.magic == MAGIC_NUMBER && self.version.is_compatible_with(&FORMAT_VERSION)
    }

    /// Strict variant of [`Header::is_valid`], reporting the mismatch as an error
    pub fn check_version(&self) -> Result<()> {
        if !self.version.is_compatible_with(&FORMAT_VERSION) {
            return Err(KresError::MismatchedVersion {
                expected: FORMAT_VERSION.major,
                found: self.version.major,
            });
        }
        Ok(())
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::new()
    }
}
