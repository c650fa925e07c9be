use serde::{Deserialize, Serialize};
use std::fmt;

/// Magic number: the u32 `0x4B524553` ("KRES"), stored little-endian so the
/// first four bytes on disk read "SERK"
pub const MAGIC_NUMBER: u32 = 0x4B52_4553;

/// Current engine version: 0.0.1
pub const FORMAT_VERSION: Version = Version::new(0, 0, 1);

/// Fixed part of the header: magic, version, flags, entry count
pub const HEADER_FIXED_SIZE: u64 = 4 + 4 + 4 + 8;

/// One offset table record: id (8 bytes) + offset (8 bytes)
pub const OFFSET_RECORD_SIZE: u64 = 16;

/// Size prefix of the user section
pub const USER_SECTION_PREFIX_SIZE: u64 = 8;

/// Fixed part of an entry record: filename length, NUL terminator, checksum, payload size
pub const ENTRY_FIXED_SIZE: u64 = 4 + 1 + 4 + 8;

/// Entry identifier, the XXH3-64 hash of the filename
pub type EntryId = u64;

/// Derive the identifier of an entry from its filename
pub fn entry_id(filename: &str) -> EntryId {
    xxhash_rust::xxh3::xxh3_64(filename.as_bytes())
}

/// CRC-32 (IEEE) over a payload
pub fn checksum(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Serialized header size for a given entry count and user section length
pub fn header_size(entry_count: u64, user_section_len: u64) -> u64 {
    HEADER_FIXED_SIZE + OFFSET_RECORD_SIZE * entry_count + USER_SECTION_PREFIX_SIZE + user_section_len
}

/// Serialized size of one entry record
pub fn entry_record_size(filename_len: u64, payload_len: u64) -> u64 {
    ENTRY_FIXED_SIZE + filename_len + payload_len
}

/// Format version, packed on the wire as `major << 16 | minor << 8 | patch`
///
/// The top byte of the packed word is reserved and ignored on decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl Version {
    pub const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Pack into the wire word; the reserved top byte is always written as zero
    pub const fn encode(self) -> u32 {
        (self.major as u32) << 16 | (self.minor as u32) << 8 | self.patch as u32
    }

    /// Unpack a wire word, discarding the reserved top byte
    ///
    /// A header decoded and written back therefore clears that byte.
    pub const fn decode(raw: u32) -> Self {
        Self {
            major: (raw >> 16) as u8,
            minor: (raw >> 8) as u8,
            patch: raw as u8,
        }
    }

    /// Layout compatibility: only the major component has to agree
    pub fn is_compatible_with(&self, other: &Version) -> bool {
        self.major == other.major
    }
}

impl Default for Version {
    fn default() -> Self {
        FORMAT_VERSION
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
