//! Streaming decoder for the newc payload container.

use std::io::{self, Read};

use crate::decompress::{self, Codec};
use crate::entry::CpioEntry;
use crate::error::{Error, Result};

/// Size of the fixed entry header: 6 magic bytes + 13 fields of 8 hex digits.
pub const HEADER_LEN: usize = 110;

/// Magic tag of the supported wire variant ("new ascii", no checksum).
const MAGIC: &[u8; 6] = b"070701";

/// Reserved filename closing the archive.
const TRAILER: &[u8] = b"TRAILER!!!";

/// Upper bound on the padded filename region; anything larger is corruption.
const NAME_MAX: usize = 4096;

#[inline]
fn align4(n: u64) -> u64 {
    (n + 3) & !3
}

/// Map an ASCII hex digit to its nibble value.
#[inline]
fn hex_nibble(byte: u8) -> Option<u32> {
    match byte {
        b'0'..=b'9' => Some(u32::from(byte - b'0')),
        b'a'..=b'f' => Some(u32::from(byte - b'a') + 10),
        b'A'..=b'F' => Some(u32::from(byte - b'A') + 10),
        _ => None,
    }
}

/// Forward-only reader over a decompressed payload stream.
///
/// Entries come out in archive order. After an entry is produced the caller
/// may read any amount of its data with [`read_data`](Self::read_data);
/// whatever is left over, including the alignment padding, is discarded on
/// the next [`next_entry`](Self::next_entry) call. Three cursors track the
/// stream: bytes consumed so far, the end of the current entry's data, and
/// the aligned start of the following header.
pub struct PayloadReader<R: Read> {
    inner: R,
    /// Archive identity, used in error messages.
    archive: String,
    pos: u64,
    data_end: u64,
    next_header: u64,
    entry: CpioEntry,
    name_buf: Vec<u8>,
    done: bool,
}

impl PayloadReader<Box<dyn Read>> {
    /// Open the payload of an archive: wrap `raw` in the decoder for `codec`
    /// and position a reader at the first entry.
    pub fn open<R: Read + 'static>(
        raw: R,
        codec: Codec,
        archive: impl Into<String>,
    ) -> Result<Self> {
        let archive = archive.into();
        let stream = match decompress::open_stream(raw, codec) {
            Ok(stream) => stream,
            Err(source) => return Err(Error::Open { archive, source }),
        };
        Ok(PayloadReader::new(stream, archive))
    }
}

impl<R: Read> PayloadReader<R> {
    /// Create a reader over an already-decompressed payload stream.
    ///
    /// `archive` identifies the package in error messages.
    pub fn new(inner: R, archive: impl Into<String>) -> Self {
        Self {
            inner,
            archive: archive.into(),
            pos: 0,
            data_end: 0,
            next_header: 0,
            entry: CpioEntry::default(),
            name_buf: Vec::new(),
            done: false,
        }
    }

    /// Get the archive identity this reader was opened with.
    #[inline]
    pub fn archive(&self) -> &str {
        &self.archive
    }

    /// Total bytes consumed from the decompressed stream so far.
    #[inline]
    pub fn bytes_consumed(&self) -> u64 {
        self.pos
    }

    /// Unread bytes of the current entry's data region.
    #[inline]
    pub fn data_remaining(&self) -> u64 {
        self.data_end.saturating_sub(self.pos)
    }

    /// Decode the next entry header.
    ///
    /// Returns `Ok(None)` once the trailer entry is reached; the reader is
    /// terminal from then on and keeps reporting `Ok(None)`. Any decode
    /// failure invalidates the reader as a whole; a misparsed header throws
    /// off every subsequent offset, so there is no per-entry recovery.
    pub fn next_entry(&mut self) -> Result<Option<&CpioEntry>> {
        if self.done {
            return Ok(None);
        }

        // Discard whatever the caller left unread of the previous entry,
        // data and alignment padding alike.
        if self.next_header > self.pos {
            let unread = self.next_header - self.pos;
            self.skip(unread)?;
            self.pos = self.next_header;
        }

        let mut header = [0u8; HEADER_LEN];
        Self::read_exact_inner(&mut self.inner, &self.archive, &mut header)?;
        if &header[..6] != MAGIC {
            return Err(Error::BadMagic {
                archive: self.archive.clone(),
            });
        }
        self.pos += HEADER_LEN as u64;

        let mut fields = [0u32; 13];
        for (i, digits) in header[6..].chunks_exact(8).enumerate() {
            let mut value = 0u32;
            for &byte in digits {
                let nibble = hex_nibble(byte).ok_or_else(|| Error::InvalidHex {
                    archive: self.archive.clone(),
                    byte,
                })?;
                value = (value << 4) | nibble;
            }
            fields[i] = value;
        }

        // The name region ends where header + name reaches a 4-byte
        // boundary; the header is 110 bytes, so the region is namesize
        // rounded up to the next 2 (mod 4) offset.
        let name_size = u64::from(fields[11]);
        let name_region = (align4(HEADER_LEN as u64 + name_size) - HEADER_LEN as u64) as usize;
        if name_region > NAME_MAX {
            return Err(Error::NameTooLong {
                archive: self.archive.clone(),
                size: name_size,
            });
        }
        self.name_buf.resize(name_region, 0);
        Self::read_exact_inner(&mut self.inner, &self.archive, &mut self.name_buf)?;
        self.pos += name_region as u64;

        let limit = (name_size as usize).min(name_region);
        let name_end = memchr::memchr(0, &self.name_buf[..limit]).unwrap_or(limit);
        let name_bytes = &self.name_buf[..name_end];

        self.data_end = self.pos + u64::from(fields[6]);
        self.next_header = align4(self.data_end);

        if name_bytes == TRAILER {
            self.done = true;
            return Ok(None);
        }

        self.entry.ino = fields[0];
        self.entry.mode = fields[1];
        self.entry.uid = fields[2];
        self.entry.gid = fields[3];
        self.entry.nlink = fields[4];
        self.entry.mtime = fields[5];
        self.entry.file_size = fields[6];
        self.entry.dev_major = fields[7];
        self.entry.dev_minor = fields[8];
        self.entry.rdev_major = fields[9];
        self.entry.rdev_minor = fields[10];
        self.entry.name_size = fields[11];
        self.entry.checksum = fields[12];
        self.entry.name.clear();
        self.entry.name.push_str(&String::from_utf8_lossy(name_bytes));

        Ok(Some(&self.entry))
    }

    /// Read data of the current entry into `buf`.
    ///
    /// Reads stop at the end of the entry's data region; returns 0 once the
    /// region is exhausted. Consuming the data is optional, see
    /// [`next_entry`](Self::next_entry).
    pub fn read_data(&mut self, buf: &mut [u8]) -> Result<usize> {
        let limit = (buf.len() as u64).min(self.data_remaining()) as usize;
        if limit == 0 {
            return Ok(0);
        }
        let n = self.inner.read(&mut buf[..limit]).map_err(|source| Error::Io {
            archive: self.archive.clone(),
            source,
        })?;
        self.pos += n as u64;
        Ok(n)
    }

    fn skip(&mut self, count: u64) -> Result<()> {
        let copied = io::copy(&mut self.inner.by_ref().take(count), &mut io::sink())
            .map_err(|source| Error::Io {
                archive: self.archive.clone(),
                source,
            })?;
        if copied != count {
            return Err(Error::Io {
                archive: self.archive.clone(),
                source: io::ErrorKind::UnexpectedEof.into(),
            });
        }
        Ok(())
    }

    fn read_exact_inner(inner: &mut R, archive: &str, buf: &mut [u8]) -> Result<()> {
        inner.read_exact(buf).map_err(|source| Error::Io {
            archive: archive.to_string(),
            source,
        })
    }
}
