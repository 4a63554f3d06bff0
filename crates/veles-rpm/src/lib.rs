//! In-memory index of the files packaged in an rpm archive.
//!
//! Package metadata declares every packaged file up front. This crate holds
//! that declaration as a compact table: one dense record per file, with
//! names stored as offsets into a shared, de-duplicated string pool, plus a
//! sparse side table for files whose size or link count outgrows the
//! compact form. Lookup by full path is O(~1) amortized when callers probe
//! names in roughly construction order, e.g. while walking the archive
//! payload in lockstep.
//!
//! The producer that parses the metadata wire format is an external
//! collaborator: it fills a [`TableBuilder`] and the sealed [`FileTable`]
//! answers lookups. The payload side of the same archive lives in the
//! sibling `veles-cpio` crate.
//!
//! # Example
//!
//! ```
//! use veles_rpm::{FileFlags, FileTable};
//!
//! let table = FileTable::build_with(false, false, |b| {
//!     b.push_file(b"/usr/bin/", b"veles", FileFlags::empty(), 0o100755)?;
//!     b.push_file(b"/usr/share/doc/", b"README", FileFlags::DOC, 0o100644)?;
//!     Ok(())
//! })?;
//!
//! assert_eq!(table.find(b"/usr/bin/veles"), Some(0));
//! assert_eq!(table.find(b"/etc/missing"), None);
//! # Ok::<(), veles_rpm::Error>(())
//! ```

mod error;
mod flags;
mod table;

pub use error::{Error, Result};
pub use flags::FileFlags;
pub use table::{ExtendedInfo, FileInfoRef, FileTable, TableBuilder};
