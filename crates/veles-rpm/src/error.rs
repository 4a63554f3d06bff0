//! Error types for table construction.

use thiserror::Error;

/// Errors raised while building the packaged-file table.
///
/// A failed build yields no table at all, so there is no partially usable
/// state to clean up. Lookup misses are not errors; `find` returns `None`.
#[derive(Debug, Error)]
pub enum Error {
    /// The package metadata was malformed or truncated.
    #[error("malformed package metadata: {0}")]
    Metadata(String),

    /// A path component does not fit the 16-bit length field.
    #[error("file name component too long: {len} bytes")]
    NameTooLong { len: usize },

    /// The shared string pool outgrew 32-bit offsets.
    #[error("string pool limit exceeded")]
    PoolOverflow,

    /// More files than the table can index.
    #[error("too many files in package metadata")]
    TooManyFiles,

    /// A file size beyond the 48-bit cap of the package format.
    #[error("file size {size} exceeds the 48-bit limit")]
    SizeTooLarge { size: u64 },

    /// An extended record referenced a nonexistent ordinal.
    #[error("no packaged file with ordinal {0}")]
    BadOrdinal(u32),
}

/// Result type for table operations.
pub type Result<T> = std::result::Result<T, Error>;
