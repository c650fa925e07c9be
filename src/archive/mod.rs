mod builder;
mod codec;
mod entry;
mod format;
mod header;
mod reader;
mod stream;
mod validate;

pub use builder::{make_header, AppendOutcome, Archive};
pub use codec::{ArchiveSource, ByteReader, ByteWriter};
pub use entry::{read_filename_at, Entry};
pub use format::{
    checksum, entry_id, entry_record_size, header_size, EntryId, Version, ENTRY_FIXED_SIZE,
    FORMAT_VERSION, HEADER_FIXED_SIZE, MAGIC_NUMBER, OFFSET_RECORD_SIZE,
};
pub use header::{Header, OffsetTable};
pub use reader::ArchiveReader;
pub use stream::{FileReader, StreamReader};
pub use validate::{validate_archive_bytes, validate_archive_file, validate_entry, verify_archive};
