//! Streaming reader for rpm payload archives.
//!
//! The payload of an rpm package is an SVR4 "newc" cpio stream, normally
//! wrapped in a compression filter named by a short code in the package
//! metadata. This crate decodes that container one entry at a time, in
//! archive order:
//!
//! - [`Codec`] and [`open_stream`] select and open the decompression filter
//!   from the compressor hint.
//! - [`PayloadReader`] walks the decompressed stream: a 110-byte ASCII-hex
//!   header per entry, the NUL-terminated filename padded to a 4-byte
//!   boundary, then the file data padded likewise. Callers may read as much
//!   or as little of an entry's data as they want; the reader discards the
//!   rest and resynchronizes on the next call.
//!
//! The per-file index of the same archive lives in the sibling `veles-rpm`
//! crate; the two compose by looking up each decoded entry name in the
//! table.
//!
//! # Example
//!
//! ```no_run
//! use veles_cpio::{Codec, PayloadReader};
//!
//! let raw = std::fs::File::open("payload.bin").unwrap();
//! let codec = Codec::from_hint(Some("xz"));
//! let mut cpio = PayloadReader::open(raw, codec, "pkg-1.0.rpm").unwrap();
//! while let Some(entry) = cpio.next_entry().unwrap() {
//!     println!("{} ({} bytes)", entry.name, entry.file_size);
//! }
//! ```

mod decompress;
mod entry;
mod error;
mod reader;

pub use decompress::{open_stream, Codec};
pub use entry::CpioEntry;
pub use error::{Error, Result};
pub use reader::{PayloadReader, HEADER_LEN};
