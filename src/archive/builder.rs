use crate::archive::codec::ByteWriter;
use crate::archive::entry::{validate_filename, Entry};
use crate::archive::format::{entry_id, header_size, EntryId, Version};
use crate::archive::header::{Header, OffsetTable};
use crate::error::{KresError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, trace, warn};

/// Result of a successful append
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The entry was added and the header regenerated
    Added(EntryId),
    /// An identical entry (same filename and payload) was already present
    Unchanged(EntryId),
}

/// Lay out a header for `entries` in order
///
/// Offsets start right after the header's own serialized size and advance by
/// each record's full size. The returned header is complete: nothing from a
/// previous header survives except what is passed in.
pub fn make_header(
    entries: &[Entry],
    flags: u32,
    version: Version,
    user_section: &[u8],
) -> Result<Header> {
    let mut offset_table = OffsetTable::with_capacity(entries.len());
    let mut filename_table = HashMap::with_capacity(entries.len());
    let mut offset = header_size(entries.len() as u64, user_section.len() as u64);

    for entry in entries {
        let id = entry.id();
        if !offset_table.insert(id, offset) {
            let existing = filename_table
                .get(&id)
                .cloned()
                .unwrap_or_default();
            return Err(KresError::DuplicateEntry {
                id,
                existing,
                incoming: entry.filename.clone(),
            });
        }
        trace!("Laid out {:?} ({:016x}) at offset {}", entry.filename, id, offset);
        filename_table.insert(id, entry.filename.clone());
        offset += entry.record_size();
    }

    let mut header = Header::new();
    header.version = version;
    header.flags = flags;
    header.offset_table = offset_table;
    header.user_section = user_section.to_vec();
    header.filename_table = filename_table;
    Ok(header)
}

/// In-memory archive: header, entries in wire order, and the serialized
/// bytes once produced
///
/// A single writer mutates an archive at a time; share it across threads
/// behind a lock, or share the serialized bytes read-only.
#[derive(Debug, Clone)]
pub struct Archive {
    pub(crate) header: Header,
    pub(crate) entries: Vec<Entry>,
    pub(crate) index: HashMap<EntryId, usize>,
    pub(crate) raw_data: Option<Vec<u8>>,
}

impl Archive {
    /// Create an empty archive
    pub fn new() -> Self {
        Self {
            header: Header::new(),
            entries: Vec::new(),
            index: HashMap::new(),
            raw_data: None,
        }
    }

    /// Set the reserved flags word
    pub fn with_flags(mut self, flags: u32) -> Self {
        self.header.flags = flags;
        self.raw_data = None;
        self
    }

    /// Build and serialize an archive from `entries` in order
    ///
    /// Entries repeating an earlier filename and payload exactly are dropped;
    /// any other id collision fails with [`KresError::DuplicateEntry`].
    pub fn build(entries: Vec<Entry>, user_data: Option<&[u8]>) -> Result<Self> {
        let mut archive = Self::new();
        archive.entries.reserve(entries.len());

        for entry in entries {
            if archive.check_collision(&entry)?.is_none() {
                archive.index.insert(entry.id(), archive.entries.len());
                archive.entries.push(entry);
            }
        }

        archive.header = make_header(
            &archive.entries,
            archive.header.flags,
            archive.header.version,
            user_data.unwrap_or_default(),
        )?;
        archive.serialize();

        debug!(
            "Built archive: {} entries, {} bytes",
            archive.entries.len(),
            archive.raw_data.as_ref().map_or(0, Vec::len)
        );
        Ok(archive)
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn version(&self) -> Version {
        self.header.version
    }

    pub fn flags(&self) -> u32 {
        self.header.flags
    }

    /// Entries in wire order
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialized bytes, if produced since the last mutation
    pub fn raw_data(&self) -> Option<&[u8]> {
        self.raw_data.as_deref()
    }

    /// Look up an entry by exact filename
    pub fn entry(&self, filename: &str) -> Option<&Entry> {
        let id = entry_id(filename);
        self.index
            .get(&id)
            .map(|&pos| &self.entries[pos])
            .filter(|entry| entry.filename == filename)
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.entry(filename).is_some()
    }

    /// Append one entry and regenerate the header
    pub fn append_entry(&mut self, entry: Entry) -> Result<AppendOutcome> {
        let id = entry.id();
        if self.check_collision(&entry)?.is_some() {
            debug!("Skipping identical entry {:?}", entry.filename);
            return Ok(AppendOutcome::Unchanged(id));
        }

        trace!("Appending {:?} ({} bytes)", entry.filename, entry.size());
        self.entries.push(entry);
        if let Err(e) = self.regenerate_header() {
            self.entries.pop();
            return Err(e);
        }
        self.index.insert(id, self.entries.len() - 1);
        Ok(AppendOutcome::Added(id))
    }

    /// Append a payload under `filename`, computing its checksum
    pub fn append_file(&mut self, filename: &str, data: &[u8]) -> Result<AppendOutcome> {
        self.append_entry(Entry::new(filename, data)?)
    }

    /// Replace the user section and regenerate the header
    pub fn set_user_data(&mut self, data: impl Into<Vec<u8>>) -> Result<()> {
        let previous = std::mem::replace(&mut self.header.user_section, data.into());
        if let Err(e) = self.regenerate_header() {
            self.header.user_section = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Store a JSON document in the user section
    pub fn set_user_json<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let json = serde_json::to_vec(value)?;
        self.set_user_data(json)
    }

    pub fn user_data(&self) -> &[u8] {
        &self.header.user_section
    }

    /// Parse the user section as JSON
    pub fn user_json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.header.user_section)?)
    }

    /// Recompute every offset from the current entry order
    pub fn regenerate_header(&mut self) -> Result<()> {
        self.header = make_header(
            &self.entries,
            self.header.flags,
            self.header.version,
            &self.header.user_section,
        )?;
        self.raw_data = None;
        debug!(
            "Regenerated header: {} entries, {} header bytes",
            self.header.entry_count(),
            self.header.encoded_len()
        );
        Ok(())
    }

    /// Serialized size of the whole archive
    pub fn encoded_len(&self) -> u64 {
        self.header.encoded_len() + self.entries.iter().map(Entry::record_size).sum::<u64>()
    }

    /// Serialize header and entries into a fresh buffer
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::with_capacity(self.encoded_len() as usize);
        self.header.write_to(&mut writer);
        for entry in &self.entries {
            entry.write_to(&mut writer);
        }
        writer.into_inner()
    }

    /// Serialize and keep the bytes on the archive
    pub fn serialize(&mut self) -> &[u8] {
        let bytes = self.to_bytes();
        self.raw_data.insert(bytes)
    }

    /// Serialize to a file on disk
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = match &self.raw_data {
            Some(bytes) => std::borrow::Cow::Borrowed(bytes.as_slice()),
            None => std::borrow::Cow::Owned(self.to_bytes()),
        };
        fs::write(path.as_ref(), &bytes)?;
        debug!("Wrote {} bytes to {}", bytes.len(), path.as_ref().display());
        Ok(())
    }

    /// Returns `Some(id)` for an identical duplicate, `None` for a fresh id,
    /// and an error for a collision between different entries
    fn check_collision(&self, entry: &Entry) -> Result<Option<EntryId>> {
        validate_filename(&entry.filename)?;
        let id = entry.id();
        let Some(&pos) = self.index.get(&id) else {
            return Ok(None);
        };

        let existing = &self.entries[pos];
        if existing.filename == entry.filename && existing.data == entry.data {
            return Ok(Some(id));
        }

        warn!(
            "Rejecting {:?}: id {:016x} already used by {:?}",
            entry.filename, id, existing.filename
        );
        Err(KresError::DuplicateEntry {
            id,
            existing: existing.filename.clone(),
            incoming: entry.filename.clone(),
        })
    }
}

impl Default for Archive {
    fn default() -> Self {
        Self::new()
    }
}
