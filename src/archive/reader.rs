use crate::archive::builder::{make_header, Archive};
use crate::archive::codec::{ArchiveSource, ByteReader};
use crate::archive::entry::{read_filename_at, Entry};
use crate::archive::format::{entry_id, EntryId};
use crate::archive::header::Header;
use crate::archive::stream::FileReader;
use crate::error::{KresError, Result};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, trace, warn};

/// Archive reader with O(1) id lookup and on-demand entry reads
///
/// Only the header is decoded up front. Works over an in-memory buffer
/// ([`ArchiveReader::from_bytes`]) or an open file ([`ArchiveReader::open`]);
/// both share the same decode routines.
#[derive(Debug)]
pub struct ArchiveReader<S> {
    source: S,
    header: Header,
}

impl ArchiveReader<FileReader> {
    /// Open an archive file, reading only its header
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let is_file = fs::metadata(path).map(|m| m.is_file()).unwrap_or(false);
        if !is_file {
            return Err(KresError::InvalidArchiveFile(path.to_path_buf()));
        }

        let reader = Self::new(FileReader::open(path)?)?;
        debug!(
            "Opened {}: {} entries",
            path.display(),
            reader.header.entry_count()
        );
        Ok(reader)
    }
}

impl<'a> ArchiveReader<ByteReader<'a>> {
    /// Read an archive held in memory, decoding only its header
    pub fn from_bytes(data: &'a [u8]) -> Result<Self> {
        Self::new(ByteReader::new(data))
    }
}

impl<S: ArchiveSource> ArchiveReader<S> {
    /// Decode the header from the start of `source`
    pub fn new(mut source: S) -> Result<Self> {
        source.seek(0)?;
        let header = Header::read_from(&mut source)?;
        Ok(Self { source, header })
    }

    /// Fail with [`KresError::MismatchedVersion`] unless the major version matches this engine
    pub fn require_compatible(self) -> Result<Self> {
        self.header.check_version()?;
        Ok(self)
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn entry_count(&self) -> u64 {
        self.header.entry_count()
    }

    pub fn user_data(&self) -> &[u8] {
        &self.header.user_section
    }

    /// Parse the user section as JSON
    pub fn user_json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.header.user_section)?)
    }

    fn offset_of(&self, id: EntryId) -> Option<u64> {
        self.header.offset_table.get(id)
    }

    /// Read the entry recorded under `id`
    pub fn extract_by_id(&mut self, id: EntryId) -> Result<Entry> {
        let offset = self
            .offset_of(id)
            .ok_or_else(|| KresError::EntryNotFound(format!("{:016x}", id)))?;
        let entry = Entry::read_at(&mut self.source, offset)?;
        check_id(id, &entry.filename)?;
        trace!("Extracted {:?} ({} bytes) at {}", entry.filename, entry.size(), offset);
        Ok(entry)
    }

    /// Read the entry stored under exactly `filename`
    ///
    /// The filename at the resolved offset is compared before the payload is
    /// read, so an id collision yields `EntryNotFound` rather than another file.
    pub fn extract_by_name(&mut self, filename: &str) -> Result<Entry> {
        let offset = self
            .offset_of(entry_id(filename))
            .ok_or_else(|| KresError::EntryNotFound(filename.to_string()))?;

        let stored = read_filename_at(&mut self.source, offset)?;
        if stored != filename {
            debug!("Id of {:?} resolves to {:?}", filename, stored);
            return Err(KresError::EntryNotFound(filename.to_string()));
        }

        let entry = Entry::read_body(&mut self.source, stored)?;
        trace!("Extracted {:?} ({} bytes) at {}", entry.filename, entry.size(), offset);
        Ok(entry)
    }

    /// Read only the filename recorded under `id`
    pub fn extract_filename(&mut self, id: EntryId) -> Result<String> {
        let offset = self
            .offset_of(id)
            .ok_or_else(|| KresError::EntryNotFound(format!("{:016x}", id)))?;
        let filename = read_filename_at(&mut self.source, offset)?;
        check_id(id, &filename)?;
        Ok(filename)
    }

    /// List (id, filename) for every entry in offset table order, without
    /// reading payloads
    pub fn filenames(&mut self) -> Result<Vec<(EntryId, String)>> {
        let records: Vec<_> = self.header.offset_table.iter().collect();
        let mut names = Vec::with_capacity(records.len());
        for (id, offset) in records {
            let filename = read_filename_at(&mut self.source, offset)?;
            check_id(id, &filename)?;
            names.push((id, filename));
        }
        Ok(names)
    }

    /// Check whether an entry named exactly `filename` exists
    pub fn contains(&mut self, filename: &str) -> Result<bool> {
        let Some(offset) = self.offset_of(entry_id(filename)) else {
            return Ok(false);
        };
        Ok(read_filename_at(&mut self.source, offset)? == filename)
    }

    /// Read a file's payload, verifying its checksum
    pub fn read_file(&mut self, filename: &str) -> Result<Vec<u8>> {
        let entry = self.extract_by_name(filename)?;
        if let Err(e) = entry.verify() {
            warn!("Integrity check failed for {:?}", filename);
            return Err(e);
        }
        Ok(entry.data)
    }

    /// Decode every entry into an in-memory [`Archive`]
    ///
    /// Records must follow the header without overlapping one another. Gaps
    /// are tolerated; the returned archive carries a header laid out afresh
    /// from the decoded entries in physical order, keeping version, flags and
    /// user section.
    pub fn into_archive(mut self) -> Result<Archive> {
        let mut records: Vec<_> = self.header.offset_table.iter().collect();
        records.sort_by_key(|&(_, offset)| offset);

        let mut entries = Vec::with_capacity(records.len());
        let mut index = HashMap::with_capacity(records.len());
        let mut next_free = self.header.encoded_len();

        for (id, offset) in records {
            if offset < next_free {
                return Err(KresError::InvalidArchive(format!(
                    "Entry {:016x} at offset {} overlaps preceding data ending at {}",
                    id, offset, next_free
                )));
            }
            let entry = Entry::read_at(&mut self.source, offset)?;
            check_id(id, &entry.filename)?;
            if offset > next_free {
                debug!(
                    "Entry {:016x} at offset {} leaves a {} byte gap",
                    id,
                    offset,
                    offset - next_free
                );
            }
            next_free = offset + entry.record_size();

            index.insert(id, entries.len());
            entries.push(entry);
        }

        let header = make_header(
            &entries,
            self.header.flags,
            self.header.version,
            &self.header.user_section,
        )?;
        debug!("Materialized archive with {} entries", entries.len());

        Ok(Archive {
            header,
            entries,
            index,
            raw_data: None,
        })
    }
}

impl Archive {
    /// Decode a complete archive from its serialized bytes
    ///
    /// The buffer is kept as [`Archive::raw_data`] when it is exactly the
    /// archive's own serialization. Input with gaps, trailing bytes or a
    /// differently ordered offset table is replaced by the re-serialized form.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let mut archive = ArchiveReader::from_bytes(&data)?.into_archive()?;
        let canonical = archive.to_bytes();
        if canonical == data {
            archive.raw_data = Some(data);
        } else {
            debug!(
                "Re-serialized non-canonical input: {} bytes in, {} bytes out",
                data.len(),
                canonical.len()
            );
            archive.raw_data = Some(canonical);
        }
        Ok(archive)
    }

    /// Decode a complete archive from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        ArchiveReader::open(path)?.into_archive()
    }
}

fn check_id(id: EntryId, filename: &str) -> Result<()> {
    if entry_id(filename) != id {
        return Err(KresError::InvalidArchive(format!(
            "Offset table id {:016x} does not match entry {:?}",
            id, filename
        )));
    }
    Ok(())
}
