//! Error types for the payload reader.

use std::io;

use thiserror::Error;

/// Errors that can occur while decoding an rpm payload.
///
/// Every variant is fatal for the reader that produced it: the container has
/// no resynchronization marker, so a misparse invalidates all subsequent
/// offsets. Variants carry the archive identity so callers can log them
/// without extra bookkeeping.
#[derive(Debug, Error)]
pub enum Error {
    /// The decompressed byte stream could not be established.
    #[error("{archive}: cannot open payload stream: {source}")]
    Open { archive: String, source: io::Error },

    /// I/O failure on the payload stream, including short reads.
    #[error("{archive}: cannot read payload: {source}")]
    Io { archive: String, source: io::Error },

    /// Entry header did not start with the supported magic tag.
    #[error("{archive}: bad cpio header magic")]
    BadMagic { archive: String },

    /// Non-hex byte inside one of the header's metadata fields.
    #[error("{archive}: invalid hex digit {byte:#04x} in cpio header")]
    InvalidHex { archive: String, byte: u8 },

    /// Filename region larger than any well-formed archive produces.
    #[error("{archive}: cpio filename too long ({size} bytes)")]
    NameTooLong { archive: String, size: u64 },
}

/// Result type for payload operations.
pub type Result<T> = std::result::Result<T, Error>;
