//! The packaged-file table: one compact record per file declared in package
//! metadata, a sparse side table for wide fields, and a shared string pool.

use std::cell::Cell;

use memchr::memrchr;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::flags::{FileFlags, MODE_DIR, MODE_REGULAR, MODE_SYMLINK, MODE_TYPE_MASK};

/// Largest file size the package format can express (48 bits).
const SIZE_MAX: u64 = (1 << 48) - 1;

/// Compact per-file record; names live in the shared pool.
#[derive(Debug, Clone, Copy)]
struct FileInfoCompact {
    /// Basename offset into the pool.
    bn: u32,
    /// Dirname offset into the pool.
    dn: u32,
    blen: u16,
    dlen: u16,
    flags: FileFlags,
    mode: u16,
    /// Another ordinal earlier in the table names the same path.
    seen: bool,
}

/// Supplemental attributes for files that outgrow the compact record or are
/// excluded from the payload.
///
/// An ordinal without one of these derives its size, inode, mtime and link
/// count from the payload entry itself at decode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendedInfo {
    pub ino: u32,
    /// Seconds since the epoch.
    pub mtime: u32,
    /// Validated against the 48-bit cap at insertion.
    pub size: u64,
    pub nlink: u16,
}

/// Borrowed view of one packaged file.
///
/// The dirname keeps its trailing slash when it has one; the full path is
/// the plain concatenation of the two components.
#[derive(Debug, Clone, Copy)]
pub struct FileInfoRef<'a> {
    pub dirname: &'a [u8],
    pub basename: &'a [u8],
    pub flags: FileFlags,
    pub mode: u16,
    pub seen: bool,
    pub extended: Option<&'a ExtendedInfo>,
}

impl FileInfoRef<'_> {
    /// Full path of the file: dirname concatenated with basename.
    pub fn path(&self) -> Vec<u8> {
        let mut path = Vec::with_capacity(self.dirname.len() + self.basename.len());
        path.extend_from_slice(self.dirname);
        path.extend_from_slice(self.basename);
        path
    }

    /// Check if the recorded mode names a directory.
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.mode & MODE_TYPE_MASK == MODE_DIR
    }

    /// Check if the recorded mode names a regular file.
    #[inline]
    pub fn is_regular(&self) -> bool {
        self.mode & MODE_TYPE_MASK == MODE_REGULAR
    }

    /// Check if the recorded mode names a symbolic link.
    #[inline]
    pub fn is_symlink(&self) -> bool {
        self.mode & MODE_TYPE_MASK == MODE_SYMLINK
    }
}

/// Index of every file packaged in one archive.
///
/// Built once from package metadata, then read-mostly: lookups only move
/// the last-found hint, a locality heuristic for callers that probe names
/// in roughly construction order (e.g. walking the payload in lockstep).
/// The hint lives in a [`Cell`], so the table is not `Sync`; concurrent
/// lookups need a table per thread.
pub struct FileTable {
    files: Vec<FileInfoCompact>,
    extended: FxHashMap<u32, ExtendedInfo>,
    pool: Vec<u8>,
    last_found: Cell<usize>,
    source_package: bool,
    legacy_filenames: bool,
}

impl FileTable {
    /// Build a table by handing a [`TableBuilder`] to the metadata producer.
    ///
    /// `fill` is the external collaborator that parses the package metadata
    /// and appends one record per declared file. If it fails, no table is
    /// returned.
    pub fn build_with<F>(source_package: bool, legacy_filenames: bool, fill: F) -> Result<FileTable>
    where
        F: FnOnce(&mut TableBuilder) -> Result<()>,
    {
        let mut builder = TableBuilder::new(source_package, legacy_filenames);
        fill(&mut builder)?;
        Ok(builder.finish())
    }

    /// Number of packaged files.
    #[inline]
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Whether the metadata described a source package.
    #[inline]
    pub fn is_source_package(&self) -> bool {
        self.source_package
    }

    /// Whether the table was built from legacy full-path filename metadata.
    #[inline]
    pub fn has_legacy_filenames(&self) -> bool {
        self.legacy_filenames
    }

    /// Get one file record by ordinal.
    #[inline]
    pub fn get(&self, ordinal: u32) -> Option<FileInfoRef<'_>> {
        self.files
            .get(ordinal as usize)
            .map(|fi| self.info_ref(ordinal, fi))
    }

    /// Iterate over all file records in ordinal order.
    pub fn iter(&self) -> impl Iterator<Item = FileInfoRef<'_>> + '_ {
        self.files
            .iter()
            .enumerate()
            .map(move |(i, fi)| self.info_ref(i as u32, fi))
    }

    /// Get the extended record of an ordinal, if it has one.
    #[inline]
    pub fn extended(&self, ordinal: u32) -> Option<&ExtendedInfo> {
        self.extended.get(&ordinal)
    }

    /// Find a file by full path.
    ///
    /// Probes the last-found hint and its successor before falling back to
    /// a full scan; a hit moves the hint, a miss leaves it alone. Lookup
    /// never mutates anything else, in particular not the duplicate
    /// markers.
    pub fn find(&self, name: &[u8]) -> Option<u32> {
        let len = self.files.len();
        let hint = self.last_found.get();
        for idx in hint..(hint + 2).min(len) {
            if self.path_matches(idx, name) {
                self.last_found.set(idx);
                return Some(idx as u32);
            }
        }
        for idx in 0..len {
            if self.path_matches(idx, name) {
                self.last_found.set(idx);
                return Some(idx as u32);
            }
        }
        None
    }

    fn path_matches(&self, idx: usize, name: &[u8]) -> bool {
        let fi = &self.files[idx];
        let dlen = fi.dlen as usize;
        let blen = fi.blen as usize;
        if name.len() != dlen + blen {
            return false;
        }
        let dn = fi.dn as usize;
        let bn = fi.bn as usize;
        name[..dlen] == self.pool[dn..dn + dlen] && name[dlen..] == self.pool[bn..bn + blen]
    }

    fn info_ref<'a>(&'a self, ordinal: u32, fi: &FileInfoCompact) -> FileInfoRef<'a> {
        FileInfoRef {
            dirname: &self.pool[fi.dn as usize..fi.dn as usize + fi.dlen as usize],
            basename: &self.pool[fi.bn as usize..fi.bn as usize + fi.blen as usize],
            flags: fi.flags,
            mode: fi.mode,
            seen: fi.seen,
            extended: self.extended.get(&ordinal),
        }
    }
}

impl std::fmt::Debug for FileTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileTable")
            .field("files", &self.files.len())
            .field("extended", &self.extended.len())
            .field("pool_bytes", &self.pool.len())
            .finish()
    }
}

/// Table-building context handed to the metadata producer.
///
/// Appended strings are interned: identical components share one pool
/// range, so two records name the same path exactly when their offset
/// pairs are equal. [`finish`](Self::finish) seals the table and marks
/// ordinals that revisit an already recorded path.
pub struct TableBuilder {
    files: Vec<FileInfoCompact>,
    extended: FxHashMap<u32, ExtendedInfo>,
    pool: Vec<u8>,
    interned: FxHashMap<Box<[u8]>, u32>,
    source_package: bool,
    legacy_filenames: bool,
}

impl TableBuilder {
    pub fn new(source_package: bool, legacy_filenames: bool) -> Self {
        Self {
            files: Vec::new(),
            extended: FxHashMap::default(),
            pool: Vec::new(),
            interned: FxHashMap::default(),
            source_package,
            legacy_filenames,
        }
    }

    /// Append one file record; returns its ordinal.
    pub fn push_file(
        &mut self,
        dirname: &[u8],
        basename: &[u8],
        flags: FileFlags,
        mode: u16,
    ) -> Result<u32> {
        let (dn, dlen) = self.intern(dirname)?;
        let (bn, blen) = self.intern(basename)?;
        let ordinal = u32::try_from(self.files.len()).map_err(|_| Error::TooManyFiles)?;
        self.files.push(FileInfoCompact {
            bn,
            dn,
            blen,
            dlen,
            flags,
            mode,
            seen: false,
        });
        Ok(ordinal)
    }

    /// Append one file from a full path (legacy filename metadata).
    ///
    /// The path splits after its last `/`, the dirname keeping the slash; a
    /// path without one gets an empty dirname, the shape source packages
    /// use.
    pub fn push_path(&mut self, path: &[u8], flags: FileFlags, mode: u16) -> Result<u32> {
        match memrchr(b'/', path) {
            Some(slash) => self.push_file(&path[..slash + 1], &path[slash + 1..], flags, mode),
            None => self.push_file(b"", path, flags, mode),
        }
    }

    /// Attach an extended record to an existing ordinal.
    pub fn set_extended(&mut self, ordinal: u32, info: ExtendedInfo) -> Result<()> {
        if ordinal as usize >= self.files.len() {
            return Err(Error::BadOrdinal(ordinal));
        }
        if info.size > SIZE_MAX {
            return Err(Error::SizeTooLarge { size: info.size });
        }
        self.extended.insert(ordinal, info);
        Ok(())
    }

    /// Seal the table.
    ///
    /// Walks the records in construction order and marks every ordinal
    /// whose path was already recorded by an earlier one; the earlier
    /// ordinal stays unmarked. The table itself never rejects duplicates;
    /// surfacing them is the caller's concern.
    pub fn finish(self) -> FileTable {
        let mut files = self.files;
        let mut first_at: FxHashMap<(u32, u32), u32> = FxHashMap::default();
        for idx in 0..files.len() {
            // Interning makes offset-pair equality the same as path
            // equality.
            let key = (files[idx].dn, files[idx].bn);
            if first_at.insert(key, idx as u32).is_some() {
                files[idx].seen = true;
            }
        }
        FileTable {
            files,
            extended: self.extended,
            pool: self.pool,
            last_found: Cell::new(0),
            source_package: self.source_package,
            legacy_filenames: self.legacy_filenames,
        }
    }

    fn intern(&mut self, s: &[u8]) -> Result<(u32, u16)> {
        let len = u16::try_from(s.len()).map_err(|_| Error::NameTooLong { len: s.len() })?;
        if let Some(&offset) = self.interned.get(s) {
            return Ok((offset, len));
        }
        let offset = u32::try_from(self.pool.len()).map_err(|_| Error::PoolOverflow)?;
        self.pool.extend_from_slice(s);
        self.interned.insert(s.into(), offset);
        Ok((offset, len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> FileTable {
        FileTable::build_with(false, false, |b| {
            b.push_file(b"/etc/", b"veles.conf", FileFlags::CONFIG, 0o100644)?;
            b.push_file(b"/usr/bin/", b"veles", FileFlags::empty(), 0o100755)?;
            b.push_file(b"/usr/share/doc/", b"README", FileFlags::DOC, 0o100644)?;
            Ok(())
        })
        .unwrap()
    }

    #[test]
    fn finds_every_present_name() {
        let table = sample_table();
        assert_eq!(table.find(b"/etc/veles.conf"), Some(0));
        assert_eq!(table.find(b"/usr/bin/veles"), Some(1));
        assert_eq!(table.find(b"/usr/share/doc/README"), Some(2));
        assert_eq!(table.find(b"/usr/bin/missing"), None);
        assert_eq!(table.find(b""), None);
    }

    #[test]
    fn lookup_order_does_not_matter() {
        let table = sample_table();
        assert_eq!(table.find(b"/usr/share/doc/README"), Some(2));
        assert_eq!(table.find(b"/usr/bin/veles"), Some(1));
        assert_eq!(table.find(b"/etc/veles.conf"), Some(0));
    }

    #[test]
    fn repeated_lookups_are_idempotent() {
        let table = sample_table();
        for _ in 0..3 {
            assert_eq!(table.find(b"/usr/bin/veles"), Some(1));
            assert_eq!(table.find(b"/nope"), None);
        }
    }

    #[test]
    fn lookup_does_not_mark_seen() {
        let table = sample_table();
        table.find(b"/usr/bin/veles");
        table.find(b"/usr/bin/veles");
        assert!(table.iter().all(|fi| !fi.seen));
    }

    #[test]
    fn later_duplicate_is_marked_seen() {
        let table = FileTable::build_with(false, false, |b| {
            b.push_file(b"/etc/", b"motd", FileFlags::empty(), 0o100644)?;
            b.push_file(b"/etc/", b"issue", FileFlags::empty(), 0o100644)?;
            b.push_file(b"/etc/", b"motd", FileFlags::empty(), 0o100644)?;
            Ok(())
        })
        .unwrap();

        assert!(!table.get(0).unwrap().seen);
        assert!(!table.get(1).unwrap().seen);
        assert!(table.get(2).unwrap().seen);
        // Lookup still resolves to the earlier ordinal.
        assert_eq!(table.find(b"/etc/motd"), Some(0));
    }

    #[test]
    fn shared_components_share_pool_bytes() {
        let table = FileTable::build_with(false, false, |b| {
            b.push_file(b"/usr/bin/", b"a", FileFlags::empty(), 0o100755)?;
            b.push_file(b"/usr/bin/", b"b", FileFlags::empty(), 0o100755)?;
            Ok(())
        })
        .unwrap();

        let first = table.get(0).unwrap();
        let second = table.get(1).unwrap();
        assert_eq!(first.dirname.as_ptr(), second.dirname.as_ptr());
    }

    #[test]
    fn legacy_paths_split_at_last_slash() {
        let table = FileTable::build_with(true, true, |b| {
            b.push_path(b"/etc/veles/veles.conf", FileFlags::CONFIG, 0o100644)?;
            b.push_path(b"COPYING", FileFlags::LICENSE, 0o100644)?;
            Ok(())
        })
        .unwrap();

        let split = table.get(0).unwrap();
        assert_eq!(split.dirname, b"/etc/veles/");
        assert_eq!(split.basename, b"veles.conf");
        assert_eq!(split.path(), b"/etc/veles/veles.conf");

        let bare = table.get(1).unwrap();
        assert_eq!(bare.dirname, b"");
        assert_eq!(bare.basename, b"COPYING");

        assert_eq!(table.find(b"/etc/veles/veles.conf"), Some(0));
        assert_eq!(table.find(b"COPYING"), Some(1));
        assert!(table.is_source_package());
        assert!(table.has_legacy_filenames());
    }

    #[test]
    fn extended_records_are_sparse() {
        let info = ExtendedInfo {
            ino: 7,
            mtime: 1_700_000_000,
            size: (1 << 48) - 1,
            nlink: 2,
        };
        let table = FileTable::build_with(false, false, |b| {
            b.push_file(b"/var/lib/", b"big.img", FileFlags::empty(), 0o100600)?;
            b.push_file(b"/var/lib/", b"small", FileFlags::empty(), 0o100600)?;
            b.set_extended(0, info)?;
            Ok(())
        })
        .unwrap();

        assert_eq!(table.extended(0), Some(&info));
        assert_eq!(table.extended(1), None);
        assert_eq!(table.get(0).unwrap().extended, Some(&info));
    }

    #[test]
    fn size_beyond_48_bits_is_rejected() {
        let err = FileTable::build_with(false, false, |b| {
            b.push_file(b"/var/lib/", b"huge", FileFlags::empty(), 0o100600)?;
            b.set_extended(
                0,
                ExtendedInfo {
                    ino: 0,
                    mtime: 0,
                    size: 1 << 48,
                    nlink: 1,
                },
            )
        })
        .unwrap_err();
        assert!(matches!(err, Error::SizeTooLarge { size } if size == 1 << 48));
    }

    #[test]
    fn extended_record_needs_a_real_ordinal() {
        let err = FileTable::build_with(false, false, |b| {
            b.set_extended(
                3,
                ExtendedInfo {
                    ino: 0,
                    mtime: 0,
                    size: 0,
                    nlink: 1,
                },
            )
        })
        .unwrap_err();
        assert!(matches!(err, Error::BadOrdinal(3)));
    }

    #[test]
    fn component_longer_than_length_field_is_rejected() {
        let long = vec![b'x'; usize::from(u16::MAX) + 1];
        let err = FileTable::build_with(false, false, |b| {
            b.push_file(b"/", &long, FileFlags::empty(), 0o100644)?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, Error::NameTooLong { .. }));
    }

    #[test]
    fn producer_failure_aborts_build() {
        let err = FileTable::build_with(false, false, |b| {
            b.push_file(b"/etc/", b"ok", FileFlags::empty(), 0o100644)?;
            Err(Error::Metadata("truncated file digest list".into()))
        })
        .unwrap_err();
        assert!(matches!(err, Error::Metadata(_)));
    }

    #[test]
    fn empty_table_finds_nothing() {
        let table = FileTable::build_with(false, false, |_| Ok(())).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.file_count(), 0);
        assert_eq!(table.find(b"/anything"), None);
    }
}
