use crate::archive::codec::ArchiveSource;
use crate::error::{KresError, Result};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// Chunk size used when growing buffers for length-prefixed reads, so a
/// corrupted length cannot force a huge up-front allocation
const READ_CHUNK: u64 = 64 * 1024;

/// Streaming reader over a seekable source (usually an open archive file)
///
/// Mirrors [`ByteReader`](crate::archive::ByteReader) but reads incrementally.
/// A short read is reported as [`KresError::EndOfData`] when the source ran
/// out of bytes, and as [`KresError::Io`] when the underlying read failed.
#[derive(Debug)]
pub struct StreamReader<R> {
    inner: R,
}

/// Streaming reader over a buffered archive file
pub type FileReader = StreamReader<BufReader<File>>;

impl FileReader {
    /// Open a file for streaming reads
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).map_err(|_| KresError::InvalidInputFile(path.to_path_buf()))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead + Seek> StreamReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn read_exact_or_eod(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => {
                    return Err(KresError::EndOfData {
                        needed: buf.len() as u64,
                        read: filled as u64,
                    })
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(KresError::Io(e)),
            }
        }
        Ok(())
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact_or_eod(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_exact_or_eod(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    pub fn read_bytes(&mut self, len: u64) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(len.min(READ_CHUNK) as usize);
        let read = (&mut self.inner).take(len).read_to_end(&mut out)? as u64;
        if read != len {
            return Err(KresError::EndOfData { needed: len, read });
        }
        Ok(out)
    }

    /// Read NUL-terminated text, consuming the terminator
    pub fn read_string(&mut self) -> Result<String> {
        let mut buf = Vec::new();
        self.inner.read_until(0, &mut buf)?;
        if buf.pop() != Some(0) {
            return Err(KresError::EndOfData {
                needed: buf.len() as u64 + 1,
                read: buf.len() as u64,
            });
        }
        String::from_utf8(buf)
            .map_err(|e| KresError::InvalidArchive(format!("Invalid UTF-8 in string: {}", e)))
    }

    pub fn seek(&mut self, pos: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    pub fn tell(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }

    pub fn skip(&mut self, len: u64) -> Result<()> {
        let delta = i64::try_from(len)
            .map_err(|_| KresError::InvalidState(format!("Skip of {} bytes too large", len)))?;
        self.inner.seek(SeekFrom::Current(delta))?;
        Ok(())
    }
}

impl<R: BufRead + Seek> ArchiveSource for StreamReader<R> {
    fn read_u32(&mut self) -> Result<u32> {
        StreamReader::read_u32(self)
    }

    fn read_u64(&mut self) -> Result<u64> {
        StreamReader::read_u64(self)
    }

    fn read_bytes(&mut self, len: u64) -> Result<Vec<u8>> {
        StreamReader::read_bytes(self, len)
    }

    fn skip(&mut self, len: u64) -> Result<()> {
        StreamReader::skip(self, len)
    }

    fn seek(&mut self, pos: u64) -> Result<()> {
        StreamReader::seek(self, pos)
    }

    fn tell(&mut self) -> Result<u64> {
        StreamReader::tell(self)
    }
}
