//! Little-endian byte codec over in-memory buffers
//!
//! Integers are always written and read little-endian, independent of the
//! host byte order. Every read is bounds-checked: a span that runs past the
//! end of the buffer fails with [`KresError::BufferOverflow`] and leaves the
//! cursor where it was.

use crate::error::{KresError, Result};

/// Positioned, fallible decode source shared by the in-memory and streaming
/// parse paths
///
/// Header and entry decoding are written once against this trait, so both
/// paths read fields in the same order and fail with the same error kinds.
pub trait ArchiveSource {
    fn read_u32(&mut self) -> Result<u32>;
    fn read_u64(&mut self) -> Result<u64>;
    fn read_bytes(&mut self, len: u64) -> Result<Vec<u8>>;
    fn skip(&mut self, len: u64) -> Result<()>;
    fn seek(&mut self, pos: u64) -> Result<()>;
    fn tell(&mut self) -> Result<u64>;
}

/// Append-only writer into an owned buffer
#[derive(Debug, Default)]
pub struct ByteWriter {
    buffer: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Write text followed by a NUL terminator
    pub fn write_string(&mut self, text: &str) {
        self.buffer.extend_from_slice(text.as_bytes());
        self.buffer.push(0);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }
}

/// Bounds-checked cursor over a borrowed buffer
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buffer: &'a [u8],
    pos: u64,
}

impl<'a> ByteReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, pos: 0 }
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn set_position(&mut self, pos: u64) {
        self.pos = pos;
    }

    pub fn remaining(&self) -> u64 {
        (self.buffer.len() as u64).saturating_sub(self.pos)
    }

    /// Borrow the next `len` bytes without copying
    pub fn read_slice(&mut self, len: u64) -> Result<&'a [u8]> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(KresError::BufferOverflow {
                offset: self.pos,
                needed: len,
                remaining,
            });
        }
        if len == 0 {
            return Ok(&[]);
        }
        // Both bounds lie inside the buffer, so they fit in usize
        let start = self.pos as usize;
        let end = start + len as usize;
        self.pos += len;
        Ok(&self.buffer[start..end])
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_slice(N as u64)?);
        Ok(out)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_bytes(&mut self, len: u64) -> Result<Vec<u8>> {
        Ok(self.read_slice(len)?.to_vec())
    }

    /// Read NUL-terminated text, consuming the terminator
    pub fn read_string(&mut self) -> Result<String> {
        let remaining = self.remaining();
        let start = self.pos.min(self.buffer.len() as u64) as usize;
        let nul = self.buffer[start..]
            .iter()
            .position(|&b| b == 0)
            .ok_or(KresError::BufferOverflow {
                offset: self.pos,
                needed: remaining + 1,
                remaining,
            })?;
        let text = self.read_slice(nul as u64)?;
        self.pos += 1;
        String::from_utf8(text.to_vec())
            .map_err(|e| KresError::InvalidArchive(format!("Invalid UTF-8 in string: {}", e)))
    }
}

impl ArchiveSource for ByteReader<'_> {
    fn read_u32(&mut self) -> Result<u32> {
        ByteReader::read_u32(self)
    }

    fn read_u64(&mut self) -> Result<u64> {
        ByteReader::read_u64(self)
    }

    fn read_bytes(&mut self, len: u64) -> Result<Vec<u8>> {
        ByteReader::read_bytes(self, len)
    }

    fn skip(&mut self, len: u64) -> Result<()> {
        self.read_slice(len).map(|_| ())
    }

    fn seek(&mut self, pos: u64) -> Result<()> {
        self.pos = pos;
        Ok(())
    }

    fn tell(&mut self) -> Result<u64> {
        Ok(self.pos)
    }
}
