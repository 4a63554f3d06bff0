//! Payload stream opening for compressed rpm payloads.

use std::io::{self, Read};

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use xz2::read::XzDecoder;

/// Compression codec applied to the payload stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Gzip,
    Bzip2,
    Xz,
    Zstd,
}

impl Codec {
    /// Map a payload compressor hint from package metadata.
    ///
    /// The hint is the leading one or two characters of the compressor name
    /// recorded in the package ("gz", "bz", "xz", "zs"). An absent or
    /// unrecognized hint falls back to gzip, the historical default.
    pub fn from_hint(hint: Option<&str>) -> Self {
        match hint.and_then(|s| s.as_bytes().first()) {
            Some(b'b') => Codec::Bzip2,
            Some(b'x') => Codec::Xz,
            Some(b'z') => Codec::Zstd,
            _ => Codec::Gzip,
        }
    }

    /// Canonical compressor name.
    pub fn name(self) -> &'static str {
        match self {
            Codec::Gzip => "gzip",
            Codec::Bzip2 => "bzip2",
            Codec::Xz => "xz",
            Codec::Zstd => "zstd",
        }
    }
}

/// Wrap a raw byte stream in the decoder for `codec`.
pub fn open_stream<R: Read + 'static>(raw: R, codec: Codec) -> io::Result<Box<dyn Read>> {
    Ok(match codec {
        Codec::Gzip => Box::new(GzDecoder::new(raw)),
        Codec::Bzip2 => Box::new(BzDecoder::new(raw)),
        Codec::Xz => Box::new(XzDecoder::new(raw)),
        Codec::Zstd => Box::new(zstd::Decoder::new(raw)?),
    })
}
