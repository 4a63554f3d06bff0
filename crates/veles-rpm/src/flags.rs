//! Per-file attribute bits recorded in package metadata.

use bitflags::bitflags;

bitflags! {
    /// Attribute bits attached to a packaged file.
    ///
    /// The values mirror the package metadata verbatim; bits this crate
    /// does not know about are retained.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FileFlags: u32 {
        /// Configuration file.
        const CONFIG = 1 << 0;
        /// Documentation.
        const DOC = 1 << 1;
        /// Obsolete icon bit, still seen in old packages.
        const ICON = 1 << 2;
        /// Absence from the filesystem is not an error.
        const MISSINGOK = 1 << 3;
        /// Config file that must not be replaced on upgrade.
        const NOREPLACE = 1 << 4;
        /// The build recipe itself (source packages).
        const SPECFILE = 1 << 5;
        /// Listed in metadata but carried without contents.
        const GHOST = 1 << 6;
        /// License text.
        const LICENSE = 1 << 7;
        /// Readme file.
        const README = 1 << 8;
        /// Excluded from the payload.
        const EXCLUDE = 1 << 9;

        // Retain unknown bits.
        const _ = !0;
    }
}

/// File-type portion of a mode word.
pub(crate) const MODE_TYPE_MASK: u16 = 0o170000;
pub(crate) const MODE_DIR: u16 = 0o040000;
pub(crate) const MODE_REGULAR: u16 = 0o100000;
pub(crate) const MODE_SYMLINK: u16 = 0o120000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_bits_are_retained() {
        let flags = FileFlags::from_bits(FileFlags::DOC.bits() | 1 << 30).unwrap();
        assert!(flags.contains(FileFlags::DOC));
        assert_eq!(flags.bits() & (1 << 30), 1 << 30);
    }
}
